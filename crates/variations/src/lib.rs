//! Product variation engine.
//!
//! Computes which attribute combinations of a product are not yet covered by a
//! variation and creates variations for them, plus the bulk edits an admin runs over a
//! variation list or an attribute's values. Everything here is deterministic in-memory
//! logic (no IO, no storage); persistence lives behind the catalog store.

pub mod actions;
pub mod attribute;
pub mod attribute_values;
pub mod bulk_lines;
pub mod combination;
pub mod config;
pub mod engine;
pub mod enumerator;
pub mod error;
pub mod materializer;
pub mod sku;
pub mod used;
pub mod variation;

pub use actions::{
    AdjustKind, AdjustOp, PriceAdjustment, adjust_price, available_options, filter_combinations,
    move_to_top, remove_variations, set_price, set_status,
};
pub use attribute::{
    AttributeField, AttributeOption, AttributeOptionIndex, AttributeRestriction, AttributeSchema,
    AttributeValueId, FieldDefinition, NONE_ID, SchemaIssue,
};
pub use attribute_values::{
    AttributeValueHook, KeepProposedName, ValueContext, bulk_rename_values, delete_values,
    move_values_to_top,
};
pub use bulk_lines::{
    BulkLineReport, CatalogLookup, LineRejection, apply_bulk_lines, apply_bulk_lines_or_else,
    bulk_lines_text, bulk_set_skus, bulk_set_titles,
};
pub use combination::Combination;
pub use config::VariationsConfig;
pub use engine::{AttributeCombinations, CombinationScope, VariationEngine};
pub use enumerator::{NotUsedCombinations, enumerate_not_used};
pub use error::{VariationError, VariationResult};
pub use materializer::{MaterializeOptions, VariationMaterializer};
pub use sku::{KeepProposedSku, MAX_SKU_LENGTH, SkuAssignHook, SkuContext, SkuGenerator, SkuSettings};
pub use used::{UsedCombinations, collect_used_combinations};
pub use variation::{CustomFields, Price, PriceTarget, Product, Variation};
