use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::Utc;
use serde::Deserialize;

use varietal_catalog::{CatalogStore, ChunkedVariationCreator, InMemoryCatalogStore};
use varietal_core::ProductId;
use varietal_variations::{
    AttributeRestriction, AttributeSchema, CombinationScope, Product, VariationEngine,
    VariationsConfig,
};

/// Input document of the generator.
#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    config: VariationsConfig,
    product: ProductDocument,
    schema: AttributeSchema,
}

#[derive(Debug, Deserialize)]
struct ProductDocument {
    title: String,
    #[serde(default = "default_variation_type")]
    variation_type: String,
    #[serde(default)]
    restriction: Option<AttributeRestriction>,
}

fn default_variation_type() -> String {
    "default".to_string()
}

fn main() -> anyhow::Result<()> {
    varietal_observability::init();

    let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        bail!("usage: varietal-generate <catalog.json>");
    };
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let document: CatalogDocument =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?;

    let config = document
        .config
        .with_overrides(|key| std::env::var(key).ok())
        .context("invalid variations config")?;
    let chunk_size = config.chunk_size;

    let store = InMemoryCatalogStore::new();
    let mut product = Product::new(
        ProductId::new(),
        document.product.title,
        document.product.variation_type,
    );
    product.restriction = document.product.restriction;
    let product_id = store.save_product(product)?.id;

    let mut creator = ChunkedVariationCreator::new(store, VariationEngine::new(config.clone()));
    let summary = creator
        .run(product_id, &document.schema, chunk_size, Utc::now())
        .context("variation generation failed")?;

    let store = creator.into_store();
    let product = store.load_product(product_id)?;
    let engine = VariationEngine::new(config);
    let combinations = engine.attribute_combinations(
        &product.variations,
        &document.schema,
        product.restriction.as_ref(),
        CombinationScope::All,
    );

    tracing::info!(%product_id, created = summary.created, "generation finished");

    let output = serde_json::json!({
        "product_id": product_id,
        "title": product.title,
        "summary": summary,
        "total_combinations": combinations.total_count().to_string(),
        "issues": combinations.index.issues(),
        "duplicated": combinations.duplication_report(),
        "variations": product
            .variations
            .iter()
            .map(|v| serde_json::json!({
                "sku": v.sku,
                "label": v.attributes.label(&combinations.index),
            }))
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
