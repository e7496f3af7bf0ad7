//! Attribute signatures of existing variations.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::attribute::{AttributeField, AttributeOptionIndex};
use crate::combination::Combination;
use crate::variation::Variation;

/// Combinations already taken by existing variations, keyed by variation position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsedCombinations {
    pub used: BTreeMap<usize, Combination>,
    /// Variations repeating an earlier variation's combination.
    pub duplicated: BTreeMap<usize, Combination>,
}

impl UsedCombinations {
    pub fn used_count(&self) -> usize {
        self.used.len()
    }

    pub fn duplicated_count(&self) -> usize {
        self.duplicated.len()
    }

    pub fn has_duplicates(&self) -> bool {
        !self.duplicated.is_empty()
    }

    /// Human readable list of duplicated combinations (one entry per duplicate).
    pub fn duplication_report(&self, index: &AttributeOptionIndex) -> Vec<String> {
        self.duplicated.values().map(|c| c.label(index)).collect()
    }
}

/// Extract the combination of every variation and split unique from duplicated ones.
///
/// Fields the variation leaves empty are filled with the empty choice. Values for
/// fields unknown to `fields` are dropped so every collected combination has exactly
/// the index's key set.
pub fn collect_used_combinations(variations: &[Variation], fields: &[AttributeField]) -> UsedCombinations {
    let nones = Combination::all_none(fields);

    let mut result = UsedCombinations::default();
    let mut seen: HashSet<Combination> = HashSet::with_capacity(variations.len());

    for (index, variation) in variations.iter().enumerate() {
        let mut combination = nones.clone();
        for (field, id) in variation.attributes.iter() {
            if id.is_none() {
                continue;
            }
            if combination.get(field).is_some() {
                combination.insert(field, id.clone());
            } else {
                debug!(sku = %variation.sku, field, "ignoring value of unknown attribute field");
            }
        }

        if seen.contains(&combination) {
            result.duplicated.insert(index, combination);
        } else {
            seen.insert(combination.clone());
            result.used.insert(index, combination);
        }
    }

    if result.has_duplicates() {
        warn!(
            duplicated = result.duplicated_count(),
            "variations share attribute combinations"
        );
    }
    debug!(
        variations = variations.len(),
        used = result.used_count(),
        "used combinations collected"
    );

    result
}
