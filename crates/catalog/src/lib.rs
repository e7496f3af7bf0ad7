//! Catalog side of the variation engine: the store port, an in-memory store and the
//! chunked creation loop that commits variations between chunks.

pub mod chunked;
pub mod error;
pub mod store;


pub use chunked::{BatchSummary, ChunkedVariationCreator};
pub use error::CatalogError;
pub use store::{CatalogStore, InMemoryCatalogStore};
