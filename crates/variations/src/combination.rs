use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use varietal_core::ValueObject;

use crate::attribute::{AttributeField, AttributeOptionIndex, AttributeValueId};

/// One value per attribute field: the signature of a (candidate) variation.
///
/// Keyed by field name in an ordered map, so equality and hashing do not depend on
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Combination(BTreeMap<String, AttributeValueId>);

impl ValueObject for Combination {}

impl Combination {
    pub fn new() -> Self {
        Self::default()
    }

    /// The empty choice for every field.
    pub fn all_none(fields: &[AttributeField]) -> Self {
        fields
            .iter()
            .map(|f| (f.name.clone(), AttributeValueId::None))
            .collect()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, id: impl Into<AttributeValueId>) -> Self {
        self.0.insert(field.into(), id.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, id: AttributeValueId) -> Option<AttributeValueId> {
        self.0.insert(field.into(), id)
    }

    pub fn get(&self, field: &str) -> Option<&AttributeValueId> {
        self.0.get(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<AttributeValueId> {
        self.0.remove(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValueId)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Only the fields holding an actual value (the empty choice dropped).
    pub fn without_none(&self) -> Self {
        self.0
            .iter()
            .filter(|(_, id)| !id.is_none())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Whether this combination names exactly the given fields, no more, no less.
    pub fn matches_fields(&self, fields: &[AttributeField]) -> bool {
        self.0.len() == fields.len() && fields.iter().all(|f| self.0.contains_key(&f.name))
    }

    /// Comma separated labels in field order, skipping values without a label.
    pub fn label(&self, index: &AttributeOptionIndex) -> String {
        index
            .fields()
            .iter()
            .filter_map(|field| self.get(&field.name).and_then(|id| field.label_of(id)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl<K, V> FromIterator<(K, V)> for Combination
where
    K: Into<String>,
    V: Into<AttributeValueId>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<'a> IntoIterator for &'a Combination {
    type Item = (&'a String, &'a AttributeValueId);
    type IntoIter = std::collections::btree_map::Iter<'a, String, AttributeValueId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{AttributeOption, AttributeSchema, FieldDefinition};

    #[test]
    fn equality_ignores_insertion_order() {
        let a = Combination::new().with("color", "red").with("size", "S");
        let b = Combination::new().with("size", "S").with("color", "red");
        assert_eq!(a, b);
    }

    #[test]
    fn without_none_drops_empty_choices() {
        let c = Combination::new()
            .with("color", "red")
            .with("fit", AttributeValueId::None);
        let stripped = c.without_none();
        assert_eq!(stripped.len(), 1);
        assert_eq!(stripped.get("color"), Some(&AttributeValueId::new("red")));
    }

    #[test]
    fn matches_fields_requires_exact_key_set() {
        let fields = vec![
            AttributeField::required("color", ["red"]),
            AttributeField::required("size", ["S"]),
        ];
        assert!(Combination::new().with("color", "red").with("size", "S").matches_fields(&fields));
        assert!(!Combination::new().with("color", "red").matches_fields(&fields));
        assert!(!Combination::new()
            .with("color", "red")
            .with("size", "S")
            .with("fit", "A")
            .matches_fields(&fields));
    }

    #[test]
    fn label_uses_index_order_and_skips_unlabelled() {
        let schema = AttributeSchema::new(vec![
            FieldDefinition {
                name: "color".to_string(),
                label: "Color".to_string(),
                required: true,
                values: vec![AttributeOption::new(1, "Red")],
            },
            FieldDefinition {
                name: "fit".to_string(),
                label: "Fit".to_string(),
                required: false,
                values: vec![AttributeOption::new(5, "Slim")],
            },
            FieldDefinition {
                name: "size".to_string(),
                label: "Size".to_string(),
                required: true,
                values: vec![AttributeOption::new(9, "M")],
            },
        ]);
        let index = AttributeOptionIndex::compute(&schema, None);
        let c = Combination::new()
            .with("size", "9")
            .with("fit", AttributeValueId::None)
            .with("color", "1");
        assert_eq!(c.label(&index), "Red, M");
    }
}
