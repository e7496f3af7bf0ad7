//! `varietal-core`: catalog domain building blocks.
//!
//! This crate contains **pure domain** primitives (no storage, no IO) shared by the
//! variation engine and the catalog boundary.

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ProductId, VariationId};
pub use value_object::ValueObject;
