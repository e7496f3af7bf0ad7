//! Variation engine: computes not-used combinations of a product and creates
//! variations for them.
//!
//! ```text
//! AttributeSchema (+ product restriction)
//!   ↓
//! AttributeOptionIndex ──► collect_used_combinations(existing variations)
//!   ↓                                  ↓
//! enumerate_not_used(fields, used, limit)
//!   ↓
//! VariationMaterializer ──► Vec<Variation> (handed back to the catalog store)
//! ```
//!
//! Nothing here performs IO: schemas and variations come in, variations go out.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::attribute::{AttributeOptionIndex, AttributeRestriction, AttributeSchema};
use crate::combination::Combination;
use crate::config::VariationsConfig;
use crate::enumerator::enumerate_not_used;
use crate::materializer::{MaterializeOptions, VariationMaterializer};
use crate::sku::SkuAssignHook;
use crate::used::{UsedCombinations, collect_used_combinations};
use crate::variation::{CustomFields, Price, Product, Variation};

/// How many not-used combinations to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinationScope {
    /// Every not-used combination, however many there are.
    All,
    /// Capped at the configured `sku.maximum` when the product is larger than that.
    Default,
    /// Capped at the given number.
    Limited(usize),
}

/// Used and not-used combinations of a variation list.
#[derive(Debug, Clone)]
pub struct AttributeCombinations {
    pub index: AttributeOptionIndex,
    pub used: UsedCombinations,
    pub not_used: Vec<Combination>,
    /// Template for new variations (the last existing one).
    pub last_variation: Option<Variation>,
}

impl AttributeCombinations {
    pub fn total_count(&self) -> u128 {
        self.index.total_combination_count()
    }

    pub fn not_used_count(&self) -> usize {
        self.not_used.len()
    }

    pub fn first_not_used(&self) -> Option<&Combination> {
        self.not_used.first()
    }

    pub fn duplication_report(&self) -> Vec<String> {
        self.used.duplication_report(&self.index)
    }
}

/// Facade over the combination pipeline and the materializer.
#[derive(Debug)]
pub struct VariationEngine<R = StdRng> {
    config: VariationsConfig,
    materializer: VariationMaterializer<R>,
}

impl VariationEngine<StdRng> {
    pub fn new(config: VariationsConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }
}

impl<R: Rng> VariationEngine<R> {
    pub fn with_rng(config: VariationsConfig, rng: R) -> Self {
        let materializer = VariationMaterializer::with_rng(config.sku.clone(), rng);
        Self {
            config,
            materializer,
        }
    }

    pub fn with_hook(mut self, hook: impl SkuAssignHook + 'static) -> Self {
        self.materializer = self.materializer.with_hook(hook);
        self
    }

    pub fn config(&self) -> &VariationsConfig {
        &self.config
    }

    pub fn materializer_mut(&mut self) -> &mut VariationMaterializer<R> {
        &mut self.materializer
    }

    fn limit_for(&self, scope: CombinationScope, total: u128) -> Option<usize> {
        match scope {
            CombinationScope::All => None,
            CombinationScope::Limited(limit) => Some(limit),
            CombinationScope::Default => {
                let maximum = self.config.sku.maximum;
                (total > maximum as u128).then_some(maximum)
            }
        }
    }

    /// Used, duplicated and not-used combinations of `variations`.
    pub fn attribute_combinations(
        &self,
        variations: &[Variation],
        schema: &AttributeSchema,
        restriction: Option<&AttributeRestriction>,
        scope: CombinationScope,
    ) -> AttributeCombinations {
        let index = AttributeOptionIndex::compute(schema, restriction);
        let used = collect_used_combinations(variations, index.fields());
        let limit = self.limit_for(scope, index.total_combination_count());
        let not_used = enumerate_not_used(index.fields(), used.used.values(), limit);

        debug!(
            total = %index.total_combination_count(),
            used = used.used_count(),
            duplicated = used.duplicated_count(),
            not_used = not_used.len(),
            "attribute combinations computed"
        );

        AttributeCombinations {
            index,
            used,
            not_used,
            last_variation: variations.last().cloned(),
        }
    }

    /// Template for new variations of `product`: its last variation, or a blank one.
    pub fn template_variation(&self, product: &Product, now: DateTime<Utc>) -> Variation {
        product
            .last_variation()
            .cloned()
            .unwrap_or_else(|| Variation::new(product.id, now))
    }

    /// One new variation for the first not-used combination.
    ///
    /// Returns `None` when the schema cannot generate anything or every combination
    /// is taken. The SKU comes from the settings (a bare token when they produce an
    /// empty SKU) and passes through the hook; a placeholder price of `1` in the
    /// default currency is set when the template carries none.
    pub fn create_product_variation(
        &mut self,
        product: &Product,
        schema: &AttributeSchema,
        custom_values: &CustomFields,
        scope: CombinationScope,
        now: DateTime<Utc>,
    ) -> Option<Variation> {
        let all = self.attribute_combinations(
            &product.variations,
            schema,
            product.restriction.as_ref(),
            scope,
        );
        if !all.index.can_generate() {
            warn!(
                product_id = %product.id,
                issues = ?all.index.issues(),
                "attribute schema cannot generate variations"
            );
            return None;
        }
        let Some(combination) = all.first_not_used().cloned() else {
            warn!(product_id = %product.id, "no not-used combination left for a new variation");
            return None;
        };

        let mut variation = self.template_variation(product, now).duplicate();
        variation.set_timestamps(now);
        variation.set_combination(&combination);

        let proposed = self.materializer.assign_sku(&combination, &variation);
        variation.sku = if proposed.is_empty() {
            let token = self.materializer.token();
            self.materializer.finalize_sku(token, &combination, &variation)
        } else {
            proposed
        };

        for (name, value) in custom_values {
            variation.custom.insert(name.clone(), value.clone());
        }
        if variation.price.is_none() {
            variation.price = Some(Price::new(Decimal::ONE, self.config.default_currency.clone()));
        }

        Some(variation)
    }

    /// Variations of `product` plus new ones for the not-used combinations.
    ///
    /// A product without variations (or a call with custom values) first gets one
    /// variation from [`VariationEngine::create_product_variation`], which then serves
    /// as the template of the rest. Nothing is added when the schema cannot generate
    /// or `max_count` is zero.
    pub fn create_all_product_variations(
        &mut self,
        product: &Product,
        schema: &AttributeSchema,
        custom_values: &CustomFields,
        options: &MaterializeOptions,
    ) -> Vec<Variation> {
        let scope = options
            .max_count
            .map_or(CombinationScope::Default, CombinationScope::Limited);
        let mut options = *options;
        let mut working = product.clone();

        if options.max_count == Some(0) {
            return working.variations;
        }

        if working.variations.is_empty() || !custom_values.is_empty() {
            let Some(first) =
                self.create_product_variation(&working, schema, custom_values, scope, options.now)
            else {
                return working.variations;
            };
            working.variations.push(first);
            options.now = options.now - Duration::seconds(1);
            options.max_count = options.max_count.map(|max| max.saturating_sub(1));
        }

        let all = self.attribute_combinations(
            &working.variations,
            schema,
            working.restriction.as_ref(),
            scope,
        );
        let Some(template) = all.last_variation.clone() else {
            return working.variations;
        };

        let variations = self
            .materializer
            .materialize_variations(&working, all.not_used, &template, &options);

        info!(
            product_id = %product.id,
            before = product.variations.len(),
            after = variations.len(),
            "all product variations created"
        );
        variations
    }

    /// Unsaved copies of every variation of `product`, each with a fresh SKU.
    pub fn duplicate_all_variations(&mut self, product: &Product) -> Vec<Variation> {
        product
            .variations
            .iter()
            .map(|variation| {
                let mut duplicate = variation.duplicate();
                duplicate.product_id = product.id;
                duplicate.sku = self.materializer.assign_sku(&variation.attributes, variation);
                duplicate
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{AttributeOption, AttributeValueId, FieldDefinition};
    use crate::sku::SkuContext;
    use std::collections::HashSet;
    use varietal_core::{ProductId, VariationId};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-05-10T08:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn definition(name: &str, required: bool, values: &[&str]) -> FieldDefinition {
        FieldDefinition {
            name: name.to_string(),
            label: name.to_string(),
            required,
            values: values.iter().map(|v| AttributeOption::new(v, v.to_uppercase())).collect(),
        }
    }

    fn schema() -> AttributeSchema {
        AttributeSchema::new(vec![
            definition("color", true, &["red", "blue"]),
            definition("size", true, &["s", "m", "l"]),
        ])
    }

    fn engine() -> VariationEngine<StdRng> {
        VariationEngine::with_rng(VariationsConfig::default(), StdRng::seed_from_u64(1))
    }

    fn saved(product: &Product, sku: &str, combination: Combination) -> Variation {
        let mut v = Variation::new(product.id, now() - Duration::days(1))
            .with_sku(sku)
            .with_attributes(&combination)
            .with_price(Price::new(Decimal::new(2500, 2), "EUR"));
        v.id = Some(VariationId::new());
        v
    }

    fn product_with(combos: &[(&str, &str)]) -> Product {
        let mut product = Product::new(ProductId::new(), "Hoodie", "default");
        let variations: Vec<Variation> = combos
            .iter()
            .enumerate()
            .map(|(i, (c, s))| {
                saved(
                    &product,
                    &format!("hoodie-{i}"),
                    Combination::new().with("color", *c).with("size", *s),
                )
            })
            .collect();
        product.variations = variations;
        product
    }

    #[test]
    fn attribute_combinations_reports_used_and_not_used() {
        let product = product_with(&[("red", "s"), ("blue", "m"), ("red", "s")]);
        let all = engine().attribute_combinations(&product.variations, &schema(), None, CombinationScope::All);

        assert_eq!(all.total_count(), 6);
        assert_eq!(all.used.used_count(), 2);
        assert_eq!(all.used.duplicated_count(), 1);
        assert_eq!(all.not_used_count(), 4);
        assert_eq!(all.duplication_report(), vec!["RED, S".to_string()]);
        assert_eq!(all.last_variation.unwrap().sku, "hoodie-2");
    }

    #[test]
    fn default_scope_caps_at_configured_maximum() {
        let mut config = VariationsConfig::default();
        config.sku.maximum = 3;
        let engine = VariationEngine::with_rng(config, StdRng::seed_from_u64(1));
        let product = product_with(&[("red", "s")]);

        let all = engine.attribute_combinations(&product.variations, &schema(), None, CombinationScope::Default);
        assert_eq!(all.not_used_count(), 3);

        let all = engine.attribute_combinations(&product.variations, &schema(), None, CombinationScope::Limited(1));
        assert_eq!(all.not_used_count(), 1);
    }

    #[test]
    fn restriction_of_the_product_is_applied() {
        let mut product = product_with(&[("red", "s")]);
        product.restriction = Some(
            AttributeRestriction::new()
                .allow("color", ["red"])
                .allow("size", ["s", "m"]),
        );
        let all = engine().attribute_combinations(
            &product.variations,
            &schema(),
            product.restriction.as_ref(),
            CombinationScope::All,
        );
        assert_eq!(all.not_used, vec![Combination::new().with("color", "red").with("size", "m")]);
    }

    #[test]
    fn create_product_variation_for_empty_product_takes_first_combination() {
        let product = Product::new(ProductId::new(), "Cap", "default");
        let schema = AttributeSchema::new(vec![definition("color", true, &["red", "blue"])]);
        let mut engine = engine();

        let v = engine.create_product_variation(
            &product,
            &schema,
            &CustomFields::new(),
            CombinationScope::Default,
            now(),
        )
        .unwrap();
        assert!(v.id.is_none());
        assert_eq!(v.product_id, product.id);
        assert!(v.sku.starts_with("sku-"));
        assert_eq!(v.price, Some(Price::new(Decimal::ONE, "USD")));
        assert_eq!(v.created, now());
        assert_eq!(v.attributes.len(), 1);
    }

    #[test]
    fn create_product_variation_uses_last_variation_as_template() {
        let product = product_with(&[("red", "s")]);
        let mut custom = CustomFields::new();
        custom.insert("weight".to_string(), serde_json::json!(120));

        let v = engine()
            .create_product_variation(&product, &schema(), &custom, CombinationScope::Default, now())
            .unwrap();
        assert_eq!(v.attributes, Combination::new().with("color", "red").with("size", "m"));
        assert_eq!(v.price, Some(Price::new(Decimal::new(2500, 2), "EUR")));
        assert_eq!(v.custom["weight"], serde_json::json!(120));
        assert_ne!(v.sku, "hoodie-0");
    }

    #[test]
    fn create_all_fills_every_missing_combination() {
        let product = product_with(&[("red", "s"), ("blue", "l")]);
        let variations = engine().create_all_product_variations(
            &product,
            &schema(),
            &CustomFields::new(),
            &MaterializeOptions::at(now()),
        );
        assert_eq!(variations.len(), 6);
        let combos: HashSet<_> = variations.iter().map(|v| v.attributes.clone()).collect();
        assert_eq!(combos.len(), 6);
        let skus: HashSet<_> = variations.iter().map(|v| v.sku.clone()).collect();
        assert_eq!(skus.len(), 6);
    }

    #[test]
    fn create_all_on_empty_product_creates_first_then_rest() {
        let product = Product::new(ProductId::new(), "Hoodie", "default");
        let variations = engine().create_all_product_variations(
            &product,
            &schema(),
            &CustomFields::new(),
            &MaterializeOptions::at(now()),
        );
        assert_eq!(variations.len(), 6);
        assert_eq!(variations[0].created, now());
        for pair in variations.windows(2) {
            assert!(pair[0].created > pair[1].created);
        }
        assert!(variations.iter().all(|v| v.price.is_some()));
    }

    #[test]
    fn create_all_respects_max_count() {
        let product = product_with(&[("red", "s")]);
        let options = MaterializeOptions::at(now()).with_max_count(2);
        let variations =
            engine().create_all_product_variations(&product, &schema(), &CustomFields::new(), &options);
        assert_eq!(variations.len(), 3);
    }

    #[test]
    fn custom_values_on_a_full_product_add_nothing() {
        let schema = AttributeSchema::new(vec![definition("color", true, &["red"])]);
        let mut product = Product::new(ProductId::new(), "Cap", "default");
        let existing = saved(&product, "cap-0", Combination::new().with("color", "red"));
        product.variations.push(existing);
        let mut custom = CustomFields::new();
        custom.insert("weight".to_string(), serde_json::json!(1));

        let mut engine = engine();
        assert!(engine
            .create_product_variation(&product, &schema, &custom, CombinationScope::Default, now())
            .is_none());

        let variations =
            engine.create_all_product_variations(&product, &schema, &custom, &MaterializeOptions::at(now()));
        assert_eq!(variations, product.variations);
        let all = engine.attribute_combinations(&variations, &schema, None, CombinationScope::All);
        assert!(!all.used.has_duplicates());
    }

    #[test]
    fn unsatisfiable_schema_creates_nothing() {
        let schema = AttributeSchema::new(vec![
            definition("color", true, &[]),
            definition("fit", false, &["slim"]),
        ]);
        let product = Product::new(ProductId::new(), "Cap", "default");
        let mut engine = engine();

        assert!(engine
            .create_product_variation(&product, &schema, &CustomFields::new(), CombinationScope::All, now())
            .is_none());
        let variations = engine.create_all_product_variations(
            &product,
            &schema,
            &CustomFields::new(),
            &MaterializeOptions::at(now()),
        );
        assert!(variations.is_empty());
    }

    #[test]
    fn zero_max_count_leaves_an_empty_product_empty() {
        let product = Product::new(ProductId::new(), "Hoodie", "default");
        let options = MaterializeOptions::at(now()).with_max_count(0);
        let variations =
            engine().create_all_product_variations(&product, &schema(), &CustomFields::new(), &options);
        assert!(variations.is_empty());
    }

    #[test]
    fn optional_field_combinations_map_none_to_absent() {
        let schema = AttributeSchema::new(vec![
            definition("color", true, &["red"]),
            definition("fit", false, &["slim"]),
        ]);
        let mut product = Product::new(ProductId::new(), "Shirt", "default");
        let existing = saved(&product, "shirt-0", Combination::new().with("color", "red"));
        product.variations.push(existing);

        let all = engine().attribute_combinations(&product.variations, &schema, None, CombinationScope::All);
        assert_eq!(
            all.used.used[&0],
            Combination::new()
                .with("color", "red")
                .with("fit", AttributeValueId::None)
        );
        assert_eq!(all.not_used, vec![Combination::new().with("color", "red").with("fit", "slim")]);
    }

    #[test]
    fn duplicate_all_gives_fresh_skus() {
        let product = product_with(&[("red", "s"), ("blue", "m")]);
        let duplicates = engine().duplicate_all_variations(&product);
        assert_eq!(duplicates.len(), 2);
        for (dup, original) in duplicates.iter().zip(&product.variations) {
            assert!(dup.id.is_none());
            assert_ne!(dup.sku, original.sku);
            assert_eq!(dup.attributes, original.attributes);
        }
        assert!(engine().duplicate_all_variations(&Product::new(ProductId::new(), "x", "y")).is_empty());
    }

    fn per_color(proposed: String, context: &SkuContext<'_>) -> String {
        match context.combination.get("color") {
            Some(id) => format!("{}-{}", context.settings.prefix, id),
            None => proposed,
        }
    }

    #[test]
    fn hook_sees_the_combination() {
        let product = product_with(&[("red", "s")]);
        let mut engine = engine().with_hook(per_color);
        let v = engine.create_product_variation(
            &product,
            &schema(),
            &CustomFields::new(),
            CombinationScope::Default,
            now(),
        )
        .unwrap();
        assert_eq!(v.sku, "sku--red");
    }
}
