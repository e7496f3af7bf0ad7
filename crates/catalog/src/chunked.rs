//! Creating all variations of a large product in committed chunks.
//!
//! Every chunk is computed from what the store holds at that moment, so a run can be
//! interrupted after any chunk and resumed later by calling it again.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, info};

use varietal_core::{DomainError, ProductId};
use varietal_variations::{AttributeSchema, CustomFields, MaterializeOptions, VariationEngine};

use crate::error::CatalogError;
use crate::store::CatalogStore;

/// Result of a chunked run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Chunks that created (and committed) at least one variation.
    pub chunks: usize,
    pub created: usize,
}

/// Drives the variation engine chunk by chunk against a catalog store.
#[derive(Debug)]
pub struct ChunkedVariationCreator<S, R = StdRng> {
    store: S,
    engine: VariationEngine<R>,
}

impl<S, R> ChunkedVariationCreator<S, R>
where
    S: CatalogStore,
    R: Rng,
{
    pub fn new(store: S, engine: VariationEngine<R>) -> Self {
        Self { store, engine }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Create and commit at most `chunk_size` new variations; returns how many.
    ///
    /// Zero means nothing was left to create.
    pub fn run_chunk(
        &mut self,
        product_id: ProductId,
        schema: &AttributeSchema,
        chunk_size: usize,
        now: DateTime<Utc>,
    ) -> Result<usize, CatalogError> {
        let product = self.store.load_product(product_id)?;
        let options = MaterializeOptions::at(now).with_max_count(chunk_size);
        let variations =
            self.engine
                .create_all_product_variations(&product, schema, &CustomFields::new(), &options);

        let created = variations.len().saturating_sub(product.variations.len());
        if created == 0 {
            debug!(%product_id, "no variations left to create");
            return Ok(0);
        }

        self.store.save_variations(product_id, variations)?;
        info!(%product_id, created, "variation chunk committed");
        Ok(created)
    }

    /// Run chunks until the product has a variation for every combination.
    ///
    /// Each chunk's timestamps continue below the oldest of the previous chunk.
    pub fn run(
        &mut self,
        product_id: ProductId,
        schema: &AttributeSchema,
        chunk_size: usize,
        now: DateTime<Utc>,
    ) -> Result<BatchSummary, CatalogError> {
        if chunk_size == 0 {
            return Err(DomainError::validation("chunk_size must be at least 1").into());
        }

        let mut summary = BatchSummary::default();
        let mut at = now;
        loop {
            let created = self.run_chunk(product_id, schema, chunk_size, at)?;
            if created == 0 {
                break;
            }
            summary.chunks += 1;
            summary.created += created;
            at = at - Duration::seconds(created as i64);
        }

        info!(
            %product_id,
            chunks = summary.chunks,
            created = summary.created,
            "chunked variation run finished"
        );
        Ok(summary)
    }
}
