use thiserror::Error;

use varietal_core::{DomainError, ProductId};

/// Catalog store failures.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// The SKU belongs to another variation (or repeats within the saved batch).
    #[error("SKU '{0}' is already used by another variation")]
    SkuConflict(String),

    #[error("catalog state unavailable: {0}")]
    Lock(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}
