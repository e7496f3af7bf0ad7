//! Errors shared by the catalog crates.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Input the catalog refuses to work with.
///
/// Engine-level outcomes (rejected bulk lines, SKU conflicts in a store) have their
/// own error types; this one covers malformed values and identifiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value or setting is out of range or malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A product or variation identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
