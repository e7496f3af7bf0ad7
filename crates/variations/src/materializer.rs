//! Turning not-used combinations into new (unsaved) variations.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::combination::Combination;
use crate::sku::{KeepProposedSku, SkuAssignHook, SkuContext, SkuGenerator, SkuSettings};
use crate::variation::{Product, Variation};

/// Options of one materialization call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterializeOptions {
    /// Upper bound of variations created by this call; `None` consumes everything.
    pub max_count: Option<usize>,
    /// Randomly permute the combinations before consuming them.
    pub shuffle: bool,
    /// Timestamp of the first created variation; later ones go back one second each.
    pub now: DateTime<Utc>,
}

impl MaterializeOptions {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            max_count: None,
            shuffle: false,
            now,
        }
    }

    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = Some(max_count);
        self
    }

    pub fn shuffled(mut self) -> Self {
        self.shuffle = true;
        self
    }
}

/// Creates variations from combinations, assigning SKUs and ordered timestamps.
///
/// The random source only drives shuffling; pass a seeded one for reproducible runs.
pub struct VariationMaterializer<R = StdRng> {
    generator: SkuGenerator,
    hook: Box<dyn SkuAssignHook>,
    rng: R,
}

impl VariationMaterializer<StdRng> {
    pub fn new(settings: SkuSettings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }
}

impl<R: Rng> VariationMaterializer<R> {
    pub fn with_rng(settings: SkuSettings, rng: R) -> Self {
        Self {
            generator: SkuGenerator::new(settings),
            hook: Box::new(KeepProposedSku),
            rng,
        }
    }

    /// Replace the SKU assignment hook.
    pub fn with_hook(mut self, hook: impl SkuAssignHook + 'static) -> Self {
        self.hook = Box::new(hook);
        self
    }

    pub fn sku_settings(&self) -> &SkuSettings {
        self.generator.settings()
    }

    /// Generate a SKU for `combination` and pass it through the hook.
    pub fn assign_sku(&mut self, combination: &Combination, template: &Variation) -> String {
        let proposed = self.generator.next_sku();
        self.finalize_sku(proposed, combination, template)
    }

    /// Pass an externally proposed SKU through the hook.
    pub fn finalize_sku(&self, proposed: String, combination: &Combination, template: &Variation) -> String {
        let context = SkuContext {
            settings: self.generator.settings(),
            combination,
            template,
        };
        self.hook.on_sku_assign(proposed, &context)
    }

    /// Bare unique token (no prefix or suffix).
    pub fn token(&mut self) -> String {
        self.generator.token()
    }

    /// Existing variations followed by one new variation per consumed combination.
    ///
    /// New variations copy everything but identifier, SKU, timestamps and attribute
    /// values from `template`. Nothing is persisted.
    pub fn materialize_variations(
        &mut self,
        product: &Product,
        mut not_used: Vec<Combination>,
        template: &Variation,
        options: &MaterializeOptions,
    ) -> Vec<Variation> {
        let mut variations = product.variations.clone();
        if not_used.is_empty() {
            debug!(product_id = %product.id, "no not-used combinations to materialize");
            return variations;
        }

        if options.shuffle {
            not_used.shuffle(&mut self.rng);
        }
        let take = options.max_count.unwrap_or(not_used.len()).min(not_used.len());
        variations.reserve(take);

        for (offset, combination) in not_used.iter().take(take).enumerate() {
            let mut variation = template.duplicate();
            variation.product_id = product.id;
            variation.set_timestamps(options.now - Duration::seconds(offset as i64));
            variation.sku = self.assign_sku(combination, template);
            variation.set_combination(combination);
            variations.push(variation);
        }

        info!(
            product_id = %product.id,
            created = take,
            available = not_used.len(),
            shuffled = options.shuffle,
            "variations materialized"
        );

        variations
    }
}

impl<R> core::fmt::Debug for VariationMaterializer<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VariationMaterializer")
            .field("generator", &self.generator)
            .finish_non_exhaustive()
    }
}
