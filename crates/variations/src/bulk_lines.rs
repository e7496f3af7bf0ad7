//! Line-oriented bulk editing: one value per line, applied positionally.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{VariationError, VariationResult};
use crate::sku::MAX_SKU_LENGTH;
use crate::variation::Variation;

/// Read access to the catalog needed while validating bulk input.
pub trait CatalogLookup {
    /// Whether any variation in the catalog carries `sku`.
    fn sku_exists(&self, sku: &str) -> bool;
}

impl<C: CatalogLookup + ?Sized> CatalogLookup for &C {
    fn sku_exists(&self, sku: &str) -> bool {
        (**self).sku_exists(sku)
    }
}

impl<C: CatalogLookup + ?Sized> CatalogLookup for Arc<C> {
    fn sku_exists(&self, sku: &str) -> bool {
        (**self).sku_exists(sku)
    }
}

/// A line that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineRejection {
    /// 1-based line number in the submitted text.
    pub line: usize,
    pub value: String,
    #[serde(serialize_with = "serialize_error")]
    pub error: VariationError,
}

fn serialize_error<S: serde::Serializer>(error: &VariationError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Outcome of one bulk edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkLineReport {
    pub applied: usize,
    pub rejected: Vec<LineRejection>,
}

impl BulkLineReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Rejected values in submission order.
    pub fn rejected_values(&self) -> Vec<&str> {
        self.rejected.iter().map(|r| r.value.as_str()).collect()
    }
}

/// Apply `text` line by line to `entities`.
///
/// The Nth non-blank (trimmed) line goes to the Nth entity. Blank lines take no slot,
/// trailing entities without a line stay as they are and surplus lines are rejected.
/// A failing line is recorded and the rest still go through.
pub fn apply_bulk_lines<T, F>(entities: &mut [T], text: &str, apply: F) -> BulkLineReport
where
    F: FnMut(&mut T, &str) -> VariationResult<()>,
{
    apply_bulk_lines_or_else(entities, text, apply, |value| {
        Err(VariationError::UnmatchedLine(value.to_string()))
    })
}

/// Like [`apply_bulk_lines`], but surplus lines go to `surplus` instead of being
/// rejected outright.
pub fn apply_bulk_lines_or_else<T, F, G>(
    entities: &mut [T],
    text: &str,
    mut apply: F,
    mut surplus: G,
) -> BulkLineReport
where
    F: FnMut(&mut T, &str) -> VariationResult<()>,
    G: FnMut(&str) -> VariationResult<()>,
{
    let mut report = BulkLineReport::default();
    let mut slots = entities.iter_mut();

    for (number, raw) in text.lines().enumerate() {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }
        let outcome = match slots.next() {
            Some(entity) => apply(entity, value),
            None => surplus(value),
        };
        match outcome {
            Ok(()) => report.applied += 1,
            Err(error) => report.rejected.push(LineRejection {
                line: number + 1,
                value: value.to_string(),
                error,
            }),
        }
    }

    if !report.is_clean() {
        warn!(
            applied = report.applied,
            rejected = report.rejected.len(),
            "bulk lines partially rejected"
        );
    }
    debug!(applied = report.applied, "bulk lines applied");
    report
}

/// Replace SKUs from bulk text.
///
/// A line equal to the variation's current SKU is accepted as is. Other SKUs must fit
/// [`MAX_SKU_LENGTH`], must not exist in the catalog and must not repeat an earlier
/// line of the same batch.
pub fn bulk_set_skus<C>(variations: &mut [Variation], text: &str, catalog: &C) -> BulkLineReport
where
    C: CatalogLookup + ?Sized,
{
    let mut batch: HashSet<String> = HashSet::new();

    apply_bulk_lines(variations, text, |variation, sku| {
        if sku.chars().count() > MAX_SKU_LENGTH {
            return Err(VariationError::SkuTooLong {
                sku: sku.to_string(),
                max: MAX_SKU_LENGTH,
            });
        }
        if !batch.insert(sku.to_string()) {
            return Err(VariationError::DuplicateSku(sku.to_string()));
        }
        if variation.sku == sku {
            return Ok(());
        }
        if catalog.sku_exists(sku) {
            return Err(VariationError::DuplicateSku(sku.to_string()));
        }
        variation.sku = sku.to_string();
        Ok(())
    })
}

/// Replace titles from bulk text.
pub fn bulk_set_titles(variations: &mut [Variation], text: &str) -> BulkLineReport {
    apply_bulk_lines(variations, text, |variation, title| {
        variation.title = title.to_string();
        Ok(())
    })
}

/// Current values, one per line (the text a bulk edit starts from).
pub fn bulk_lines_text<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    values.into_iter().collect::<Vec<_>>().join("\n")
}
