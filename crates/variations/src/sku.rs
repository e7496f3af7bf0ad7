//! SKU generation for new variations and the hook that may override it.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::combination::Combination;
use crate::variation::Variation;

/// Maximum SKU length accepted by the catalog.
pub const MAX_SKU_LENGTH: usize = 60;

/// How SKUs are generated for a variation type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkuSettings {
    /// Append a unique token between prefix and suffix.
    pub uniqid_enabled: bool,
    /// Make the token longer (random fractional part).
    pub more_entropy: bool,
    pub prefix: String,
    pub suffix: String,
    /// Upper bound of combinations computed in one go when no explicit limit is given.
    pub maximum: usize,
}

impl Default for SkuSettings {
    fn default() -> Self {
        Self {
            uniqid_enabled: true,
            more_entropy: false,
            prefix: "sku-".to_string(),
            suffix: String::new(),
            maximum: 500,
        }
    }
}

impl SkuSettings {
    /// Settings used when the variation type has none configured.
    pub fn fallback() -> Self {
        Self {
            prefix: "default_sku-".to_string(),
            ..Self::default()
        }
    }
}

/// Produces `prefix + token + suffix` SKUs.
///
/// Tokens are 13 hex digits of the current time in microseconds (seconds then
/// microseconds), strictly increasing per generator even when the clock stalls.
#[derive(Debug)]
pub struct SkuGenerator {
    settings: SkuSettings,
    last_micros: i64,
    rng: StdRng,
}

impl SkuGenerator {
    pub fn new(settings: SkuSettings) -> Self {
        Self {
            settings,
            last_micros: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic entropy source (for `more_entropy` tokens) in tests.
    pub fn seeded(settings: SkuSettings, seed: u64) -> Self {
        Self {
            settings,
            last_micros: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn settings(&self) -> &SkuSettings {
        &self.settings
    }

    /// Unique token without prefix/suffix.
    pub fn token(&mut self) -> String {
        let now = Utc::now().timestamp_micros();
        let micros = if now <= self.last_micros {
            self.last_micros + 1
        } else {
            now
        };
        self.last_micros = micros;

        let mut token = format!("{:08x}{:05x}", micros / 1_000_000, micros % 1_000_000);
        if self.settings.more_entropy {
            let fraction: u32 = self.rng.gen_range(0..100_000_000);
            token.push_str(&format!(".{fraction:08}"));
        }
        token
    }

    /// Next SKU; without unique tokens this is just `prefix + suffix`.
    pub fn next_sku(&mut self) -> String {
        if !self.settings.uniqid_enabled {
            return format!("{}{}", self.settings.prefix, self.settings.suffix);
        }
        let token = self.token();
        format!("{}{}{}", self.settings.prefix, token, self.settings.suffix)
    }
}

/// What a [`SkuAssignHook`] gets to see about the SKU being assigned.
#[derive(Debug, Clone, Copy)]
pub struct SkuContext<'a> {
    pub settings: &'a SkuSettings,
    /// Combination the new variation will carry.
    pub combination: &'a Combination,
    /// Variation the new one is cloned from.
    pub template: &'a Variation,
}

/// Extension point to override generated SKUs.
///
/// Receives the proposed SKU and returns the SKU to assign (possibly unchanged).
/// Uniqueness of the returned value is the hook's responsibility.
pub trait SkuAssignHook: Send + Sync {
    fn on_sku_assign(&self, proposed: String, context: &SkuContext<'_>) -> String;
}

impl<F> SkuAssignHook for F
where
    F: Fn(String, &SkuContext<'_>) -> String + Send + Sync,
{
    fn on_sku_assign(&self, proposed: String, context: &SkuContext<'_>) -> String {
        self(proposed, context)
    }
}

/// Hook that keeps the generated SKU.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepProposedSku;

impl SkuAssignHook for KeepProposedSku {
    fn on_sku_assign(&self, proposed: String, _context: &SkuContext<'_>) -> String {
        proposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use varietal_core::ProductId;

    #[test]
    fn skus_are_prefixed_suffixed_and_unique() {
        let mut generator = SkuGenerator::new(SkuSettings {
            suffix: "-x".to_string(),
            ..SkuSettings::default()
        });
        let skus: Vec<String> = (0..1000).map(|_| generator.next_sku()).collect();

        let unique: std::collections::HashSet<_> = skus.iter().collect();
        assert_eq!(unique.len(), skus.len());
        for sku in &skus {
            assert!(sku.starts_with("sku-"));
            assert!(sku.ends_with("-x"));
            assert_eq!(sku.len(), "sku-".len() + 13 + "-x".len());
        }
    }

    #[test]
    fn tokens_increase_monotonically() {
        let mut generator = SkuGenerator::new(SkuSettings::default());
        let a = generator.token();
        let b = generator.token();
        assert!(b > a);
    }

    #[test]
    fn more_entropy_appends_fraction() {
        let mut generator = SkuGenerator::seeded(
            SkuSettings {
                more_entropy: true,
                prefix: String::new(),
                ..SkuSettings::default()
            },
            7,
        );
        let sku = generator.next_sku();
        assert_eq!(sku.len(), 13 + 1 + 8);
        assert_eq!(&sku[13..14], ".");
    }

    #[test]
    fn disabled_uniqid_yields_prefix_and_suffix_only() {
        let mut generator = SkuGenerator::new(SkuSettings {
            uniqid_enabled: false,
            prefix: "P-".to_string(),
            suffix: "-S".to_string(),
            ..SkuSettings::default()
        });
        assert_eq!(generator.next_sku(), "P--S");
    }

    fn shout(proposed: String, context: &SkuContext<'_>) -> String {
        format!("{}{}", proposed.to_uppercase(), context.combination.len())
    }

    #[test]
    fn functions_act_as_hooks() {
        let settings = SkuSettings::default();
        let combination = Combination::new().with("color", "red");
        let template = Variation::new(ProductId::new(), Utc::now());
        let context = SkuContext {
            settings: &settings,
            combination: &combination,
            template: &template,
        };

        assert_eq!(shout.on_sku_assign("abc".to_string(), &context), "ABC1");
        assert_eq!(KeepProposedSku.on_sku_assign("abc".to_string(), &context), "abc");
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let settings: SkuSettings = serde_json::from_str(r#"{"prefix": "tee-"}"#).unwrap();
        assert_eq!(settings.prefix, "tee-");
        assert_eq!(settings.maximum, 500);
        assert!(settings.uniqid_enabled);
        assert_eq!(SkuSettings::fallback().prefix, "default_sku-");
    }
}
