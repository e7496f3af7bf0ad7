//! Attribute fields and the option index computed from a variation type's schema.
//!
//! The index is the starting point of every combination computation: it fixes the
//! field order, the ordered value ids per field (including the `_none` choice for
//! optional fields) and the size of the cartesian product.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

use crate::combination::Combination;
use crate::variation::Product;

/// Wire form of the "no value" choice for optional attribute fields.
pub const NONE_ID: &str = "_none";

/// Identifier of an attribute value, normalized to string form.
///
/// `None` is the explicit "field left empty" choice of an optional field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeValueId {
    None,
    Value(String),
}

impl AttributeValueId {
    /// Normalize any id (numeric or textual) to its string form.
    ///
    /// `"_none"` maps to [`AttributeValueId::None`].
    pub fn new(id: impl ToString) -> Self {
        let id = id.to_string();
        if id == NONE_ID {
            Self::None
        } else {
            Self::Value(id)
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The referenced value id, or `None` for the empty choice.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Value(id) => Some(id),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::None => NONE_ID,
            Self::Value(id) => id,
        }
    }
}

impl fmt::Display for AttributeValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for AttributeValueId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AttributeValueId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Serialize for AttributeValueId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AttributeValueId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ValueIdVisitor;

        impl Visitor<'_> for ValueIdVisitor {
            type Value = AttributeValueId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or integer attribute value id")
            }

            fn visit_str<E: de::Error>(self, s: &str) -> Result<Self::Value, E> {
                Ok(AttributeValueId::new(s))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(AttributeValueId::new(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(AttributeValueId::new(v))
            }
        }

        deserializer.deserialize_any(ValueIdVisitor)
    }
}

/// One selectable attribute value as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeOption {
    pub id: AttributeValueId,
    pub label: String,
    /// Sort key; lighter values come first.
    #[serde(default)]
    pub weight: i32,
}

impl AttributeOption {
    pub fn new(id: impl ToString, label: impl Into<String>) -> Self {
        Self {
            id: AttributeValueId::new(id),
            label: label.into(),
            weight: 0,
        }
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }
}

/// Attribute field definition of a variation type, as resolved from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    pub values: Vec<AttributeOption>,
}

impl FieldDefinition {
    pub fn position(&self, id: &AttributeValueId) -> Option<usize> {
        self.values.iter().position(|v| &v.id == id)
    }

    /// Stable sort by weight; values of equal weight keep their order.
    pub fn sort_by_weight(&mut self) {
        self.values.sort_by_key(|v| v.weight);
    }
}

/// Ordered attribute fields of one variation type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSchema {
    pub fields: Vec<FieldDefinition>,
}

impl AttributeSchema {
    pub fn new(fields: Vec<FieldDefinition>) -> Self {
        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldDefinition> {
        self.fields.iter_mut().find(|f| f.name == name)
    }
}

/// Per-field allow-list of value ids.
///
/// Used both as the product-level option restriction and as the selection a user
/// narrows a duplicate operation with. As a product restriction, a field missing
/// from a non-empty restriction allows nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeRestriction(BTreeMap<String, BTreeSet<AttributeValueId>>);

impl AttributeRestriction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style: allow `ids` for `field`.
    pub fn allow<I, V>(mut self, field: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<AttributeValueId>,
    {
        self.0
            .entry(field.into())
            .or_default()
            .extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, id: AttributeValueId) {
        self.0.entry(field.into()).or_default().insert(id);
    }

    pub fn allows(&self, field: &str, id: &AttributeValueId) -> bool {
        self.0.get(field).is_some_and(|ids| ids.contains(id))
    }

    pub fn allowed(&self, field: &str) -> Option<&BTreeSet<AttributeValueId>> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<AttributeValueId>)> {
        self.0.iter()
    }
}

/// A field of the option index: the ordered value ids a combination may pick from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeField {
    pub name: String,
    pub label: String,
    /// Ordered choices; starts with [`AttributeValueId::None`] when `allows_none` and
    /// any value is left.
    pub ids: Vec<AttributeValueId>,
    labels: BTreeMap<AttributeValueId, String>,
    pub allows_none: bool,
}

impl AttributeField {
    /// Field built directly from value ids (labels equal the ids).
    pub fn required<I, V>(name: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        let options: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let id = id.to_string();
                AttributeOption::new(&id, id.clone())
            })
            .collect();
        let name = name.into();
        Self::from_options(name.clone(), name, &options, false)
    }

    /// Optional variant of [`AttributeField::required`]; `_none` is prepended when
    /// there is at least one value.
    pub fn optional<I, V>(name: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        let mut field = Self::required(name, ids);
        field.make_optional();
        field
    }

    fn from_options(
        name: String,
        label: String,
        options: &[AttributeOption],
        allows_none: bool,
    ) -> Self {
        let mut ids = Vec::with_capacity(options.len() + 1);
        let mut labels = BTreeMap::new();
        for option in options {
            if option.id.is_none() {
                continue;
            }
            if labels.contains_key(&option.id) {
                // Same id listed twice (several attributes on one field).
                continue;
            }
            labels.insert(option.id.clone(), option.label.clone());
            ids.push(option.id.clone());
        }
        let mut field = Self {
            name,
            label,
            ids,
            labels,
            allows_none: false,
        };
        if allows_none {
            field.make_optional();
        }
        field
    }

    // An optional field with no values offers no choice at all, not even `_none`.
    fn make_optional(&mut self) {
        self.allows_none = true;
        if !self.ids.is_empty() && !self.ids.contains(&AttributeValueId::None) {
            self.ids.insert(0, AttributeValueId::None);
        }
    }

    /// Label of a value; the empty choice has none.
    pub fn label_of(&self, id: &AttributeValueId) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &AttributeValueId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Problems found while resolving the option index. Reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SchemaIssue {
    /// A field (required or optional) has no value left after restriction; nothing
    /// can be generated.
    EmptyField { field: String },
    /// The variation type has no attribute fields at all.
    NoFields,
}

/// Resolved fields and the size of their cartesian product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeOptionIndex {
    fields: Vec<AttributeField>,
    total_combination_count: u128,
    issues: Vec<SchemaIssue>,
}

impl AttributeOptionIndex {
    /// Resolve the index for a schema, optionally narrowed by a restriction.
    ///
    /// Restrictions apply to catalog values only. The empty choice of an optional field
    /// survives as long as one of its values does.
    pub fn compute(schema: &AttributeSchema, restriction: Option<&AttributeRestriction>) -> Self {
        let restriction = restriction.filter(|r| !r.is_empty());
        let mut fields = Vec::with_capacity(schema.fields.len());
        let mut issues = Vec::new();
        let mut count: u128 = if schema.is_empty() { 0 } else { 1 };

        if schema.is_empty() {
            issues.push(SchemaIssue::NoFields);
        }

        for definition in &schema.fields {
            let mut options: Vec<AttributeOption> = match restriction {
                Some(r) => definition
                    .values
                    .iter()
                    .filter(|o| r.allows(&definition.name, &o.id))
                    .cloned()
                    .collect(),
                None => definition.values.clone(),
            };
            options.sort_by_key(|o| o.weight);

            let field = AttributeField::from_options(
                definition.name.clone(),
                definition.label.clone(),
                &options,
                !definition.required,
            );

            if field.is_empty() {
                warn!(field = %field.name, "attribute field has no resolvable values");
                issues.push(SchemaIssue::EmptyField {
                    field: field.name.clone(),
                });
            }
            count = count.saturating_mul(field.len() as u128);
            fields.push(field);
        }

        debug!(
            fields = fields.len(),
            total = %count,
            restricted = restriction.is_some(),
            "attribute option index computed"
        );

        Self {
            fields,
            total_combination_count: count,
            issues,
        }
    }

    /// Index for a product, narrowed by the product's own restriction.
    pub fn compute_for_product(product: &Product, schema: &AttributeSchema) -> Self {
        Self::compute(schema, product.restriction.as_ref())
    }

    /// Index built from already-resolved fields (e.g. in tests or by callers that cache).
    pub fn from_fields(fields: Vec<AttributeField>) -> Self {
        let mut issues = Vec::new();
        if fields.is_empty() {
            issues.push(SchemaIssue::NoFields);
        }
        issues.extend(fields.iter().filter(|f| f.is_empty()).map(|f| SchemaIssue::EmptyField {
            field: f.name.clone(),
        }));
        let total = if fields.is_empty() {
            0
        } else {
            fields
                .iter()
                .fold(1u128, |acc, f| acc.saturating_mul(f.len() as u128))
        };
        Self {
            fields,
            total_combination_count: total,
            issues,
        }
    }

    pub fn fields(&self) -> &[AttributeField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&AttributeField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn total_combination_count(&self) -> u128 {
        self.total_combination_count
    }

    pub fn issues(&self) -> &[SchemaIssue] {
        &self.issues
    }

    /// Whether at least one combination can be formed.
    pub fn can_generate(&self) -> bool {
        self.total_combination_count > 0
    }

    pub fn label(&self, field: &str, id: &AttributeValueId) -> Option<&str> {
        self.field(field).and_then(|f| f.label_of(id))
    }

    /// Field name -> empty choice, for every field.
    pub fn none_defaults(&self) -> Combination {
        Combination::all_none(&self.fields)
    }

    /// Field name -> ordered value ids, in field order.
    pub fn ids(&self) -> Vec<(&str, &[AttributeValueId])> {
        self.fields
            .iter()
            .map(|f| (f.name.as_str(), f.ids.as_slice()))
            .collect()
    }
}
