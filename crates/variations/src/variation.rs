use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use varietal_core::{Entity, ProductId, ValueObject, VariationId};

use crate::attribute::AttributeRestriction;
use crate::combination::Combination;

/// Additional, type-specific variation fields (opaque to the engine).
pub type CustomFields = BTreeMap<String, JsonValue>;

/// A decimal amount tagged with an ISO currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub number: Decimal,
    pub currency_code: String,
}

impl ValueObject for Price {}

impl Price {
    pub fn new(number: Decimal, currency_code: impl Into<String>) -> Self {
        Self {
            number,
            currency_code: currency_code.into(),
        }
    }

    pub fn is_negative(&self) -> bool {
        self.number.is_sign_negative() && !self.number.is_zero()
    }

    /// Same currency, different amount.
    pub fn with_number(&self, number: Decimal) -> Self {
        Self::new(number, self.currency_code.clone())
    }
}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.number, self.currency_code)
    }
}

/// Which price of a variation an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTarget {
    Unit,
    List,
}

/// A purchasable variation of a product.
///
/// `attributes` holds only the values actually set; an unset optional field is
/// absent rather than stored as the empty choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    pub id: Option<VariationId>,
    pub product_id: ProductId,
    pub sku: String,
    pub title: String,
    pub attributes: Combination,
    pub price: Option<Price>,
    pub list_price: Option<Price>,
    pub active: bool,
    pub created: DateTime<Utc>,
    pub changed: DateTime<Utc>,
    #[serde(default)]
    pub custom: CustomFields,
}

impl Variation {
    /// Blank, unsaved variation for a product.
    pub fn new(product_id: ProductId, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            product_id,
            sku: String::new(),
            title: String::new(),
            attributes: Combination::new(),
            price: None,
            list_price: None,
            active: true,
            created: now,
            changed: now,
            custom: CustomFields::new(),
        }
    }

    /// Builder-style SKU setter.
    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = sku.into();
        self
    }

    pub fn with_attributes(mut self, combination: &Combination) -> Self {
        self.set_combination(combination);
        self
    }

    pub fn with_price(mut self, price: Price) -> Self {
        self.price = Some(price);
        self
    }

    /// Unsaved copy: every field kept except the identifier.
    pub fn duplicate(&self) -> Self {
        Self {
            id: None,
            ..self.clone()
        }
    }

    /// Set attribute values from a combination; empty choices clear the field.
    pub fn set_combination(&mut self, combination: &Combination) {
        for (field, id) in combination.iter() {
            if id.is_none() {
                self.attributes.remove(field);
            } else {
                self.attributes.insert(field, id.clone());
            }
        }
    }

    pub fn set_timestamps(&mut self, at: DateTime<Utc>) {
        self.created = at;
        self.changed = at;
    }

    pub fn price_of(&self, target: PriceTarget) -> Option<&Price> {
        match target {
            PriceTarget::Unit => self.price.as_ref(),
            PriceTarget::List => self.list_price.as_ref(),
        }
    }

    pub fn set_price_of(&mut self, target: PriceTarget, price: Price) {
        match target {
            PriceTarget::Unit => self.price = Some(price),
            PriceTarget::List => self.list_price = Some(price),
        }
    }
}

impl Entity for Variation {
    type Id = VariationId;

    fn entity_id(&self) -> Option<&Self::Id> {
        self.id.as_ref()
    }
}

/// A product and the variations it exclusively owns, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub variation_type: String,
    /// Narrows the attribute values considered for this product.
    #[serde(default)]
    pub restriction: Option<AttributeRestriction>,
    #[serde(default)]
    pub variations: Vec<Variation>,
}

impl Product {
    pub fn new(id: ProductId, title: impl Into<String>, variation_type: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            variation_type: variation_type.into(),
            restriction: None,
            variations: Vec::new(),
        }
    }

    pub fn variations(&self) -> &[Variation] {
        &self.variations
    }

    pub fn last_variation(&self) -> Option<&Variation> {
        self.variations.last()
    }

    pub fn set_variations(&mut self, variations: Vec<Variation>) {
        self.variations = variations;
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn entity_id(&self) -> Option<&Self::Id> {
        Some(&self.id)
    }
}
