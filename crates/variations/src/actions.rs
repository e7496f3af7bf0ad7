//! Bulk actions over a product's variation list.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use varietal_core::VariationId;

use crate::attribute::AttributeRestriction;
use crate::combination::Combination;
use crate::error::{VariationError, VariationResult};
use crate::variation::{Price, PriceTarget, Variation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustOp {
    Add,
    Subtract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustKind {
    /// The value is an amount in the variation's own currency.
    Fixed,
    /// The value is a percentage of the current price.
    Percentage,
}

/// A price change requested for many variations at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAdjustment {
    pub op: AdjustOp,
    /// Raw user input; validated before anything changes.
    pub value: String,
    pub kind: AdjustKind,
}

impl PriceAdjustment {
    pub fn new(op: AdjustOp, value: impl Into<String>, kind: AdjustKind) -> Self {
        Self {
            op,
            value: value.into(),
            kind,
        }
    }

    fn parsed_value(&self) -> VariationResult<Decimal> {
        let raw = self.value.trim();
        Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .map_err(|_| VariationError::NonNumericAdjustment(self.value.clone()))
    }

    /// New amount for `current`, never below zero. `None` when the result does not fit
    /// a `Decimal`.
    fn apply_to(&self, current: Decimal, value: Decimal) -> Option<Decimal> {
        let delta = match self.kind {
            AdjustKind::Fixed => value,
            AdjustKind::Percentage => current.checked_div(Decimal::ONE_HUNDRED)?.checked_mul(value)?,
        };
        let adjusted = match self.op {
            AdjustOp::Add => current.checked_add(delta)?,
            // Underflow lands below zero, which clamps anyway.
            AdjustOp::Subtract => current.checked_sub(delta).unwrap_or(Decimal::ZERO),
        };
        Some(adjusted.max(Decimal::ZERO))
    }
}

/// Activate or deactivate every variation; returns how many changed.
pub fn set_status(variations: &mut [Variation], active: bool) -> usize {
    let mut changed = 0;
    for variation in variations.iter_mut().filter(|v| v.active != active) {
        variation.active = active;
        changed += 1;
    }
    debug!(active, changed, "variation status set");
    changed
}

/// Set the targeted price of every variation.
pub fn set_price(variations: &mut [Variation], target: PriceTarget, price: &Price) {
    for variation in variations.iter_mut() {
        variation.set_price_of(target, price.clone());
    }
    debug!(?target, %price, count = variations.len(), "variation prices set");
}

/// Adjust the targeted price of every variation that has one.
///
/// The value is validated and every new price computed before any variation is
/// touched, so a failing adjustment changes nothing. Returns the number of
/// variations adjusted.
pub fn adjust_price(
    variations: &mut [Variation],
    target: PriceTarget,
    adjustment: &PriceAdjustment,
) -> VariationResult<usize> {
    let value = adjustment.parsed_value()?;

    let mut updates = Vec::with_capacity(variations.len());
    for (position, variation) in variations.iter().enumerate() {
        let Some(price) = variation.price_of(target) else {
            continue;
        };
        let number = adjustment.apply_to(price.number, value).ok_or_else(|| {
            VariationError::AdjustmentOverflow {
                price: price.to_string(),
                value: adjustment.value.clone(),
            }
        })?;
        updates.push((position, price.with_number(number)));
    }

    let adjusted = updates.len();
    for (position, price) in updates {
        variations[position].set_price_of(target, price);
    }

    info!(
        ?target,
        op = ?adjustment.op,
        kind = ?adjustment.kind,
        %value,
        adjusted,
        "variation prices adjusted"
    );
    Ok(adjusted)
}

/// Selected variations first (in selection order), then the others in their order.
pub fn move_to_top(variations: Vec<Variation>, selected: &[VariationId]) -> Vec<Variation> {
    let mut rest: Vec<Option<Variation>> = variations.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(rest.len());

    for id in selected {
        let position = rest
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|v| v.id.as_ref() == Some(id)));
        if let Some(variation) = position.and_then(|p| rest[p].take()) {
            ordered.push(variation);
        }
    }
    ordered.extend(rest.into_iter().flatten());
    ordered
}

/// Split `variations` into kept and removed ones; removed ones are to be deleted.
pub fn remove_variations(variations: Vec<Variation>, selected: &[VariationId]) -> (Vec<Variation>, Vec<Variation>) {
    let selected: BTreeSet<&VariationId> = selected.iter().collect();
    let (removed, kept): (Vec<_>, Vec<_>) = variations
        .into_iter()
        .partition(|v| v.id.as_ref().is_some_and(|id| selected.contains(id)));
    debug!(kept = kept.len(), removed = removed.len(), "variations selected for removal");
    (kept, removed)
}

/// Not-used combinations whose every value is allowed.
///
/// Fields the restriction does not mention are unrestricted.
pub fn filter_combinations(not_used: &[Combination], allowed: &AttributeRestriction) -> Vec<Combination> {
    not_used
        .iter()
        .filter(|combination| {
            combination.iter().all(|(field, id)| match allowed.allowed(field) {
                Some(ids) => ids.contains(id),
                None => true,
            })
        })
        .cloned()
        .collect()
}

/// Per field, the values still present in some not-used combination.
pub fn available_options(not_used: &[Combination]) -> AttributeRestriction {
    let mut options: BTreeMap<&str, BTreeSet<_>> = BTreeMap::new();
    for combination in not_used {
        for (field, id) in combination.iter() {
            options.entry(field).or_default().insert(id.clone());
        }
    }

    let mut restriction = AttributeRestriction::new();
    for (field, ids) in options {
        for id in ids {
            restriction.insert(field, id);
        }
    }
    restriction
}
