//! Engine configuration: SKU settings, defaults for new variations, batch sizing.

use serde::{Deserialize, Serialize};
use tracing::debug;

use varietal_core::{DomainError, DomainResult};

use crate::sku::SkuSettings;

/// Configuration of the variation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariationsConfig {
    pub sku: SkuSettings,
    /// Currency of the placeholder price given to variations created without one.
    pub default_currency: String,
    /// Variations created per committed chunk by batch callers.
    pub chunk_size: usize,
}

impl Default for VariationsConfig {
    fn default() -> Self {
        Self {
            sku: SkuSettings::default(),
            default_currency: "USD".to_string(),
            chunk_size: 100,
        }
    }
}

impl VariationsConfig {
    /// Parse from JSON; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> DomainResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DomainError::validation(format!("invalid variations config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `VARIETAL_*` environment variables.
    pub fn from_env() -> DomainResult<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn with_overrides<F>(mut self, lookup: F) -> DomainResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(prefix) = lookup("VARIETAL_SKU_PREFIX") {
            self.sku.prefix = prefix;
        }
        if let Some(suffix) = lookup("VARIETAL_SKU_SUFFIX") {
            self.sku.suffix = suffix;
        }
        if let Some(maximum) = lookup("VARIETAL_SKU_MAXIMUM") {
            self.sku.maximum = parse_usize("VARIETAL_SKU_MAXIMUM", &maximum)?;
        }
        if let Some(chunk_size) = lookup("VARIETAL_CHUNK_SIZE") {
            self.chunk_size = parse_usize("VARIETAL_CHUNK_SIZE", &chunk_size)?;
        }
        if let Some(currency) = lookup("VARIETAL_DEFAULT_CURRENCY") {
            self.default_currency = currency;
        }
        self.validate()?;
        debug!(config = ?self, "variations config resolved");
        Ok(self)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.sku.maximum < 3 {
            return Err(DomainError::validation("sku.maximum must be at least 3"));
        }
        if self.chunk_size == 0 {
            return Err(DomainError::validation("chunk_size must be at least 1"));
        }
        if self.default_currency.trim().is_empty() {
            return Err(DomainError::validation("default_currency cannot be empty"));
        }
        Ok(())
    }
}

fn parse_usize(key: &str, value: &str) -> DomainResult<usize> {
    value
        .trim()
        .parse()
        .map_err(|e| DomainError::validation(format!("{key}: {e}")))
}
