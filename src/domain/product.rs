use serde::{Deserialize, Serialize};

use super::price::{format_price, normalize_price};
use super::sku::derive_sku;

/// Column order of the product table
pub const PRODUCT_COLUMNS: [&str; 6] = ["name", "price", "url", "image", "source_category", "sku"];

/// Product basic information from category listing pages
///
/// One row of the product table. `url` is the unique key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    /// Canonical decimal text (`89.90`) when the scraped price parsed, raw text otherwise
    #[serde(default)]
    pub price: Option<String>,
    pub url: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub source_category: String,
    /// Site-provided SKU, if the card carried one
    #[serde(default)]
    pub sku: Option<String>,
}

impl Product {
    /// Build a product from an extracted card, canonicalizing the price text
    pub fn from_card(card: CardCandidate, source_category: &str) -> Self {
        let price = card.price_text.map(|text| match normalize_price(&text) {
            Some(value) => format_price(value),
            None => text,
        });

        Self {
            name: card.name,
            price,
            url: card.url,
            image: card.image,
            source_category: source_category.to_string(),
            sku: card.sku,
        }
    }

    /// Site SKU when present, otherwise the derived one
    pub fn effective_sku(&self) -> String {
        self.sku
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(|| derive_sku(&self.url, &self.name), str::to_string)
    }
}

/// A product card as a selector strategy sees it, before dedup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardCandidate {
    pub name: String,
    pub price_text: Option<String>,
    /// Absolute URL
    pub url: String,
    pub image: Option<String>,
    pub sku: Option<String>,
}
