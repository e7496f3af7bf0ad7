//! Catalog persistence port and its in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use varietal_core::{DomainError, ProductId, VariationId};
use varietal_variations::{CatalogLookup, Product, Variation};

use crate::error::CatalogError;

/// Products and their variations.
///
/// SKUs are unique across the whole catalog, not only within a product. Saving
/// commits a whole variation list at once: either every variation is stored or none.
pub trait CatalogStore: CatalogLookup + Send + Sync {
    /// Product with its variations, in display order.
    fn load_product(&self, product_id: ProductId) -> Result<Product, CatalogError>;

    /// Insert or update a product together with the variations it carries.
    fn save_product(&self, product: Product) -> Result<Product, CatalogError>;

    fn load_variations(&self, product_id: ProductId) -> Result<Vec<Variation>, CatalogError>;

    /// Store `variations` as the product's list, in the given order.
    ///
    /// Unsaved variations get an identifier. Stored variations missing from the list
    /// are kept after it; removing them takes [`CatalogStore::delete_variations`].
    fn save_variations(
        &self,
        product_id: ProductId,
        variations: Vec<Variation>,
    ) -> Result<Vec<Variation>, CatalogError>;

    /// Delete the given variations of a product; returns the removed ones.
    fn delete_variations(
        &self,
        product_id: ProductId,
        ids: &[VariationId],
    ) -> Result<Vec<Variation>, CatalogError>;
}

impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    fn load_product(&self, product_id: ProductId) -> Result<Product, CatalogError> {
        (**self).load_product(product_id)
    }

    fn save_product(&self, product: Product) -> Result<Product, CatalogError> {
        (**self).save_product(product)
    }

    fn load_variations(&self, product_id: ProductId) -> Result<Vec<Variation>, CatalogError> {
        (**self).load_variations(product_id)
    }

    fn save_variations(
        &self,
        product_id: ProductId,
        variations: Vec<Variation>,
    ) -> Result<Vec<Variation>, CatalogError> {
        (**self).save_variations(product_id, variations)
    }

    fn delete_variations(
        &self,
        product_id: ProductId,
        ids: &[VariationId],
    ) -> Result<Vec<Variation>, CatalogError> {
        (**self).delete_variations(product_id, ids)
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    products: HashMap<ProductId, Product>,
    /// SKU -> owning variation.
    skus: HashMap<String, VariationId>,
}

impl CatalogState {
    fn commit_variations(
        &mut self,
        product_id: ProductId,
        variations: Vec<Variation>,
    ) -> Result<Vec<Variation>, CatalogError> {
        let product = self
            .products
            .get_mut(&product_id)
            .ok_or(CatalogError::ProductNotFound(product_id))?;

        let incoming: Vec<Variation> = variations
            .into_iter()
            .map(|mut variation| {
                variation.id.get_or_insert_with(VariationId::new);
                variation.product_id = product_id;
                variation
            })
            .collect();

        let mut batch: HashSet<&str> = HashSet::with_capacity(incoming.len());
        for variation in &incoming {
            if variation.sku.trim().is_empty() {
                return Err(DomainError::validation("variation SKU cannot be empty").into());
            }
            if !batch.insert(variation.sku.as_str()) {
                return Err(CatalogError::SkuConflict(variation.sku.clone()));
            }
            if let Some(owner) = self.skus.get(&variation.sku) {
                // The owner may be renamed away within this very batch.
                let released = incoming
                    .iter()
                    .any(|other| other.id == Some(*owner) && other.sku != variation.sku);
                if variation.id != Some(*owner) && !released {
                    return Err(CatalogError::SkuConflict(variation.sku.clone()));
                }
            }
        }

        let incoming_ids: HashSet<VariationId> = incoming.iter().filter_map(|v| v.id).collect();
        let previous = std::mem::take(&mut product.variations);
        for variation in &previous {
            self.skus.remove(&variation.sku);
        }
        let leftover = previous
            .into_iter()
            .filter(|v| v.id.is_none_or(|id| !incoming_ids.contains(&id)));

        product.variations = incoming.into_iter().chain(leftover).collect();
        for variation in &product.variations {
            if let Some(id) = variation.id {
                self.skus.insert(variation.sku.clone(), id);
            }
        }

        debug!(%product_id, variations = product.variations.len(), "variations committed");
        Ok(product.variations.clone())
    }
}

/// In-memory catalog.
///
/// Intended for tests, the demo binary and single-process tools.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, CatalogState>, CatalogError> {
        self.state
            .read()
            .map_err(|_| CatalogError::Lock("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, CatalogState>, CatalogError> {
        self.state
            .write()
            .map_err(|_| CatalogError::Lock("lock poisoned".to_string()))
    }

    pub fn product_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .products
            .len()
    }
}

impl CatalogLookup for InMemoryCatalogStore {
    fn sku_exists(&self, sku: &str) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .skus
            .contains_key(sku)
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn load_product(&self, product_id: ProductId) -> Result<Product, CatalogError> {
        self.read()?
            .products
            .get(&product_id)
            .cloned()
            .ok_or(CatalogError::ProductNotFound(product_id))
    }

    fn save_product(&self, mut product: Product) -> Result<Product, CatalogError> {
        let mut state = self.write()?;
        let variations = std::mem::take(&mut product.variations);
        let product_id = product.id;

        let existing = state.products.insert(product_id, product);
        if let Some(existing) = existing {
            // Keep the stored list so the commit below can diff against it.
            if let Some(stored) = state.products.get_mut(&product_id) {
                stored.variations = existing.variations;
            }
        }

        let variations = state.commit_variations(product_id, variations)?;
        let mut saved = state
            .products
            .get(&product_id)
            .cloned()
            .ok_or(CatalogError::ProductNotFound(product_id))?;
        saved.variations = variations;
        Ok(saved)
    }

    fn load_variations(&self, product_id: ProductId) -> Result<Vec<Variation>, CatalogError> {
        self.read()?
            .products
            .get(&product_id)
            .map(|product| product.variations.clone())
            .ok_or(CatalogError::ProductNotFound(product_id))
    }

    fn save_variations(
        &self,
        product_id: ProductId,
        variations: Vec<Variation>,
    ) -> Result<Vec<Variation>, CatalogError> {
        self.write()?.commit_variations(product_id, variations)
    }

    fn delete_variations(
        &self,
        product_id: ProductId,
        ids: &[VariationId],
    ) -> Result<Vec<Variation>, CatalogError> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        let product = state
            .products
            .get_mut(&product_id)
            .ok_or(CatalogError::ProductNotFound(product_id))?;

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut product.variations)
            .into_iter()
            .partition(|v| v.id.is_some_and(|id| ids.contains(&id)));
        product.variations = kept;
        for variation in &removed {
            state.skus.remove(&variation.sku);
        }

        debug!(%product_id, removed = removed.len(), "variations deleted");
        Ok(removed)
    }
}
