//! Errors raised by the variation engine and the bulk operations.

use thiserror::Error;

use varietal_core::DomainError;

/// Result type used by the bulk operations.
pub type VariationResult<T> = Result<T, VariationError>;

/// Recoverable variation-level failure.
///
/// Most of these are collected into reports (one per rejected line) rather than
/// aborting a whole batch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VariationError {
    /// A price adjustment value could not be parsed as a number.
    #[error("the adjust value '{0}' is not numeric")]
    NonNumericAdjustment(String),

    /// Applying an adjustment would leave the representable price range.
    #[error("adjusting {price} by '{value}' overflows")]
    AdjustmentOverflow { price: String, value: String },

    /// A SKU exceeded the catalog length limit.
    #[error("SKU '{sku}' is longer than {max} characters")]
    SkuTooLong { sku: String, max: usize },

    /// A SKU is already used somewhere in the catalog (or earlier in the same batch).
    #[error("SKU '{0}' already exists")]
    DuplicateSku(String),

    /// A bulk line had no entity left to apply to.
    #[error("no variation left for line value '{0}'")]
    UnmatchedLine(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}
