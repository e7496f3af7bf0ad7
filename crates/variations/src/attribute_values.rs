//! Bulk edits of the attribute values a field offers.
//!
//! These change the schema the option index is computed from. Variations that
//! already point at a deleted value keep their (now unknown) id.

use tracing::{debug, info};

use varietal_core::DomainError;

use crate::attribute::{AttributeOption, AttributeValueId, FieldDefinition};
use crate::bulk_lines::{BulkLineReport, apply_bulk_lines_or_else};
use crate::error::VariationResult;

/// What an [`AttributeValueHook`] gets to see about the value being named.
#[derive(Debug, Clone, Copy)]
pub struct ValueContext<'a> {
    pub field: &'a str,
    /// The value as it is before renaming (id, current label, weight).
    pub value: &'a AttributeOption,
    /// Whether the value is created by this edit.
    pub is_new: bool,
}

/// Extension point run for every value a bulk rename touches.
///
/// Receives the submitted name and returns the name to store.
pub trait AttributeValueHook: Send + Sync {
    fn on_value_name(&self, proposed: String, context: &ValueContext<'_>) -> String;
}

impl<F> AttributeValueHook for F
where
    F: Fn(String, &ValueContext<'_>) -> String + Send + Sync,
{
    fn on_value_name(&self, proposed: String, context: &ValueContext<'_>) -> String {
        self(proposed, context)
    }
}

/// Hook that stores the submitted name as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepProposedName;

impl AttributeValueHook for KeepProposedName {
    fn on_value_name(&self, proposed: String, _context: &ValueContext<'_>) -> String {
        proposed
    }
}

fn named(
    hook: &(impl AttributeValueHook + ?Sized),
    field: &str,
    value: &AttributeOption,
    is_new: bool,
    name: &str,
) -> VariationResult<String> {
    let context = ValueContext { field, value, is_new };
    let name = hook.on_value_name(name.to_string(), &context);
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation(format!("empty name for value '{}' of {field}", value.id)).into());
    }
    Ok(name.to_string())
}

/// Rename the `selected` values of `field` from bulk text, one name per line.
///
/// Lines go to the selected values in selection order (ids the field does not have
/// are skipped). Surplus lines create new values: `new_id` supplies their ids and
/// their weights continue after the heaviest existing value.
pub fn bulk_rename_values<F, H>(
    field: &mut FieldDefinition,
    selected: &[AttributeValueId],
    text: &str,
    mut new_id: F,
    hook: &H,
) -> BulkLineReport
where
    F: FnMut() -> AttributeValueId,
    H: AttributeValueHook + ?Sized,
{
    let positions: Vec<usize> = selected.iter().filter_map(|id| field.position(id)).collect();
    let mut renamed: Vec<AttributeOption> = positions.iter().map(|&p| field.values[p].clone()).collect();
    let mut created: Vec<AttributeOption> = Vec::new();
    let mut weight = field.values.iter().map(|v| v.weight).max().unwrap_or_default();

    let name = field.name.clone();
    let existing = &field.values;
    let report = apply_bulk_lines_or_else(
        &mut renamed,
        text,
        |value, line| {
            value.label = named(hook, &name, value, false, line)?;
            Ok(())
        },
        |line| {
            let id = new_id();
            if id.is_none() || existing.iter().chain(&created).any(|v| v.id == id) {
                return Err(DomainError::validation(format!("value id '{id}' is already taken in {name}")).into());
            }
            let mut value = AttributeOption::new(&id, "").with_weight(weight.saturating_add(1));
            value.label = named(hook, &name, &value, true, line)?;
            weight = value.weight;
            created.push(value);
            Ok(())
        },
    );

    for (position, value) in positions.into_iter().zip(renamed) {
        field.values[position] = value;
    }
    info!(field = %field.name, applied = report.applied, created = created.len(), "attribute values renamed");
    field.values.extend(created);
    report
}

/// Remove the `selected` values from `field`; returns the removed ones.
pub fn delete_values(field: &mut FieldDefinition, selected: &[AttributeValueId]) -> Vec<AttributeOption> {
    let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut field.values)
        .into_iter()
        .partition(|v| selected.contains(&v.id));
    field.values = kept;
    debug!(field = %field.name, removed = removed.len(), "attribute values deleted");
    removed
}

/// Put the `selected` values before every other value of `field`, in selection
/// order, by weighing them lighter than the current first value. Returns how many
/// values moved.
pub fn move_values_to_top(field: &mut FieldDefinition, selected: &[AttributeValueId]) -> usize {
    let mut positions: Vec<usize> = Vec::with_capacity(selected.len());
    for id in selected {
        if let Some(position) = field.position(id).filter(|p| !positions.contains(p)) {
            positions.push(position);
        }
    }
    let Some(lightest) = field.values.iter().map(|v| v.weight).min() else {
        return 0;
    };

    let count = positions.len();
    for (offset, position) in positions.into_iter().enumerate() {
        let above = i32::try_from(count - offset).unwrap_or(i32::MAX);
        field.values[position].weight = lightest.saturating_sub(above);
    }
    field.sort_by_weight();
    debug!(field = %field.name, moved = count, "attribute values moved to top");
    count
}
