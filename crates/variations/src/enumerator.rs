//! Cartesian product of attribute values, minus the combinations already in use.
//!
//! The walk is an odometer over per-field cursors: the first field is the outermost
//! digit and the last field changes fastest, which yields the same depth-first order
//! as a recursive descent without growing the call stack with the field count.

use std::collections::HashMap;

use tracing::debug;

use crate::attribute::AttributeField;
use crate::combination::Combination;

/// Lazy iterator over not-used combinations.
///
/// Every exclude entry suppresses at most one candidate and is consumed when it does;
/// entries that never match are ignored. Enumeration stops as soon as `limit`
/// combinations have been yielded.
#[derive(Debug)]
pub struct NotUsedCombinations<'a> {
    fields: &'a [AttributeField],
    exclude: HashMap<Combination, usize>,
    cursor: Vec<usize>,
    limit: Option<usize>,
    emitted: usize,
    exhausted: bool,
}

impl<'a> NotUsedCombinations<'a> {
    /// # Panics
    ///
    /// When an exclude combination does not name exactly the given fields. That is a
    /// caller bug (combinations must come from the same option index).
    pub fn new<'c, I>(fields: &'a [AttributeField], exclude: I, limit: Option<usize>) -> Self
    where
        I: IntoIterator<Item = &'c Combination>,
    {
        let mut counts: HashMap<Combination, usize> = HashMap::new();
        for combination in exclude {
            assert!(
                combination.matches_fields(fields),
                "exclude combination {combination:?} does not match the attribute fields"
            );
            *counts.entry(combination.clone()).or_default() += 1;
        }

        let exhausted = fields.is_empty() || fields.iter().any(AttributeField::is_empty);

        Self {
            fields,
            exclude: counts,
            cursor: vec![0; fields.len()],
            limit,
            emitted: 0,
            exhausted,
        }
    }

    /// Exclude entries that have not suppressed anything (yet).
    pub fn remaining_excluded(&self) -> usize {
        self.exclude.values().sum()
    }

    fn current(&self) -> Combination {
        self.fields
            .iter()
            .zip(&self.cursor)
            .map(|(field, &i)| (field.name.clone(), field.ids[i].clone()))
            .collect()
    }

    /// Move the odometer one step; marks the walk exhausted after the last combination.
    fn advance(&mut self) {
        for position in (0..self.cursor.len()).rev() {
            self.cursor[position] += 1;
            if self.cursor[position] < self.fields[position].ids.len() {
                return;
            }
            self.cursor[position] = 0;
        }
        self.exhausted = true;
    }

    /// Consume one matching exclude entry; returns whether the candidate is used.
    fn consume_excluded(&mut self, candidate: &Combination) -> bool {
        match self.exclude.get_mut(candidate) {
            Some(count) => {
                *count -= 1;
                if *count == 0 {
                    self.exclude.remove(candidate);
                }
                true
            }
            None => false,
        }
    }
}

impl Iterator for NotUsedCombinations<'_> {
    type Item = Combination;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.exhausted {
                return None;
            }
            if self.limit.is_some_and(|limit| self.emitted >= limit) {
                return None;
            }

            let candidate = self.current();
            self.advance();

            if self.consume_excluded(&candidate) {
                continue;
            }
            self.emitted += 1;
            return Some(candidate);
        }
    }
}

/// Collect the not-used combinations of `fields` (see [`NotUsedCombinations`]).
pub fn enumerate_not_used<'c, I>(fields: &[AttributeField], used: I, limit: Option<usize>) -> Vec<Combination>
where
    I: IntoIterator<Item = &'c Combination>,
{
    let combinations: Vec<Combination> = NotUsedCombinations::new(fields, used, limit).collect();
    debug!(
        fields = fields.len(),
        limit = ?limit,
        not_used = combinations.len(),
        "not-used combinations enumerated"
    );
    combinations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeValueId;

    const NOTHING_USED: &[Combination] = &[];

    fn color_size() -> Vec<AttributeField> {
        vec![
            AttributeField::required("color", ["red", "blue"]),
            AttributeField::required("size", ["S", "M"]),
        ]
    }

    fn combo(color: &str, size: &str) -> Combination {
        Combination::new().with("color", color).with("size", size)
    }

    #[test]
    fn excludes_used_in_depth_first_order() {
        let used = vec![combo("red", "S")];
        let not_used = enumerate_not_used(&color_size(), &used, None);
        assert_eq!(
            not_used,
            vec![combo("red", "M"), combo("blue", "S"), combo("blue", "M")]
        );
    }

    #[test]
    fn no_exclusions_yield_full_product() {
        let not_used = enumerate_not_used(&color_size(), NOTHING_USED, None);
        assert_eq!(
            not_used,
            vec![combo("red", "S"), combo("red", "M"), combo("blue", "S"), combo("blue", "M")]
        );
    }

    #[test]
    fn limit_is_a_hard_cap_after_exclusion() {
        let used = vec![combo("red", "S")];
        let not_used = enumerate_not_used(&color_size(), &used, Some(2));
        assert_eq!(not_used, vec![combo("red", "M"), combo("blue", "S")]);

        assert!(enumerate_not_used(&color_size(), &used, Some(0)).is_empty());
        assert_eq!(enumerate_not_used(&color_size(), &used, Some(10)).len(), 3);
    }

    #[test]
    fn iterator_stops_without_walking_the_rest() {
        let fields: Vec<AttributeField> = (0..8)
            .map(|i| AttributeField::required(format!("f{i}"), 0..10))
            .collect();
        // 10^8 candidates; only the first three are ever built.
        let mut it = NotUsedCombinations::new(&fields, NOTHING_USED, Some(3));
        assert_eq!(it.by_ref().count(), 3);
        assert_eq!(it.next(), None);
    }

    #[test]
    fn field_without_values_yields_nothing() {
        let fields = vec![
            AttributeField::required("color", ["red"]),
            AttributeField::required("size", Vec::<String>::new()),
        ];
        assert!(enumerate_not_used(&fields, NOTHING_USED, None).is_empty());
        assert!(enumerate_not_used(&[], NOTHING_USED, None).is_empty());
    }

    #[test]
    fn optional_fields_include_none_choice_first() {
        let fields = vec![AttributeField::optional("fit", ["A"])];
        let not_used = enumerate_not_used(&fields, NOTHING_USED, None);
        assert_eq!(
            not_used,
            vec![
                Combination::new().with("fit", AttributeValueId::None),
                Combination::new().with("fit", "A"),
            ]
        );
    }

    #[test]
    fn duplicate_exclude_entries_suppress_once() {
        let fields = color_size();
        let used = vec![combo("red", "S"), combo("red", "S")];
        let mut it = NotUsedCombinations::new(&fields, &used, None);
        assert_eq!(it.remaining_excluded(), 2);
        let not_used: Vec<_> = it.by_ref().collect();
        assert_eq!(not_used.len(), 3);
        assert_eq!(it.remaining_excluded(), 1);
    }

    #[test]
    fn unmatched_exclude_entries_are_ignored() {
        let used = vec![combo("green", "XL")];
        assert_eq!(enumerate_not_used(&color_size(), &used, None).len(), 4);
    }

    #[test]
    #[should_panic(expected = "does not match the attribute fields")]
    fn exclude_with_wrong_keys_is_a_contract_violation() {
        let used = vec![Combination::new().with("color", "red")];
        let _ = enumerate_not_used(&color_size(), &used, None);
    }

    #[test]
    fn enumeration_is_deterministic() {
        let used = vec![combo("blue", "S")];
        assert_eq!(
            enumerate_not_used(&color_size(), &used, None),
            enumerate_not_used(&color_size(), &used, None)
        );
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        /// 1..=4 fields with 1..=4 values each, some optional.
        fn arb_fields() -> impl Strategy<Value = Vec<AttributeField>> {
            prop::collection::vec((1usize..=4, any::<bool>()), 1..=4).prop_map(|shape| {
                shape
                    .into_iter()
                    .enumerate()
                    .map(|(i, (n, optional))| {
                        let ids = (0..n).map(|v| format!("v{v}"));
                        if optional {
                            AttributeField::optional(format!("f{i}"), ids)
                        } else {
                            AttributeField::required(format!("f{i}"), ids)
                        }
                    })
                    .collect()
            })
        }

        fn product_size(fields: &[AttributeField]) -> usize {
            fields.iter().map(AttributeField::len).product()
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: with nothing used, the enumeration is the whole cartesian product.
            #[test]
            fn empty_exclude_yields_product_size(fields in arb_fields()) {
                let all = enumerate_not_used(&fields, NOTHING_USED, None);
                prop_assert_eq!(all.len(), product_size(&fields));
                let unique: HashSet<_> = all.iter().collect();
                prop_assert_eq!(unique.len(), all.len());
                for c in &all {
                    prop_assert!(c.matches_fields(&fields));
                }
            }

            /// Property: not-used ∪ used reconstructs the product exactly once per combination.
            #[test]
            fn not_used_and_used_partition_the_product(
                fields in arb_fields(),
                mask in prop::collection::vec(any::<bool>(), 256),
            ) {
                let all = enumerate_not_used(&fields, NOTHING_USED, None);
                let used: Vec<Combination> = all
                    .iter()
                    .zip(mask.iter().cycle())
                    .filter(|(_, take)| **take)
                    .map(|(c, _)| c.clone())
                    .collect();

                let not_used = enumerate_not_used(&fields, &used, None);
                prop_assert_eq!(not_used.len() + used.len(), all.len());

                let mut union: Vec<Combination> = not_used.iter().chain(&used).cloned().collect();
                union.sort();
                let mut expected = all.clone();
                expected.sort();
                prop_assert_eq!(union, expected);
            }

            /// Property: a limit caps the output at min(limit, not-used total).
            #[test]
            fn limit_is_min_of_limit_and_total(
                fields in arb_fields(),
                used_count in 0usize..8,
                limit in 0usize..40,
            ) {
                let all = enumerate_not_used(&fields, NOTHING_USED, None);
                let used: Vec<Combination> = all.iter().take(used_count).cloned().collect();
                let total = enumerate_not_used(&fields, &used, None);
                let limited = enumerate_not_used(&fields, &used, Some(limit));

                prop_assert_eq!(limited.len(), limit.min(total.len()));
                prop_assert_eq!(&limited[..], &total[..limited.len()]);
            }

            /// Property: identical inputs produce identical ordered output.
            #[test]
            fn enumeration_is_reproducible(fields in arb_fields(), used_count in 0usize..8) {
                let all = enumerate_not_used(&fields, NOTHING_USED, None);
                let used: Vec<Combination> = all.iter().rev().take(used_count).cloned().collect();
                prop_assert_eq!(
                    enumerate_not_used(&fields, &used, None),
                    enumerate_not_used(&fields, &used, None)
                );
            }
        }
    }
}
