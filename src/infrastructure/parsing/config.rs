//! Selector configuration for listing pages
//!
//! Strategies are data: the config file may replace the built-in list, and the
//! parser compiles whatever it is given once per run.

use serde::{Deserialize, Serialize};

/// Main parsing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Card strategies, tried in order; the first with a valid card wins
    pub strategies: Vec<SelectorStrategy>,

    /// Selectors for the "next page" link, tried in order
    pub next_page_selectors: Vec<String>,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            strategies: SelectorStrategy::defaults(),
            next_page_selectors: strings(&[
                "a[rel='next']",
                "ul.pagination li.active + li a",
                ".pagination .next a",
                ".results .next a",
                "a.next",
            ]),
        }
    }
}

/// One named way of reading product cards off a page.
///
/// Every field except `card` is an ordered list of fallbacks, evaluated inside the
/// card element. An empty `link` list means the card itself is the anchor. When no
/// title matches, the link text with the price match removed is the name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorStrategy {
    pub name: String,
    pub card: String,
    #[serde(default)]
    pub title: Vec<String>,
    #[serde(default)]
    pub price: Vec<String>,
    #[serde(default)]
    pub link: Vec<String>,
    #[serde(default)]
    pub image: Vec<String>,
    #[serde(default)]
    pub sku: Vec<String>,
    /// Regex over the card text, used when no price selector matches.
    /// The first capture group is the price (whole match without groups).
    #[serde(default)]
    pub price_pattern: Option<String>,
}

/// A lira amount followed by its marker. Grouping is `.` or a non-breaking space
/// between three-digit groups; a plain space never joins two numbers.
const TL_PRICE_PATTERN: &str = r"(\d{1,3}(?:[.\x{00A0}\x{202F}]\d{3})+(?:,\d{2})?|\d+(?:[.,]\d{2})?)\s*(?:TL|₺)";

impl SelectorStrategy {
    /// Themes seen on the storefront over time, most specific first
    pub fn defaults() -> Vec<Self> {
        let sku = strings(&["[data-sku]", ".sku", ".product-sku"]);
        let image = strings(&[".image img", "img"]);

        vec![
            Self {
                name: "opencart".to_string(),
                card: ".product-layout .product-thumb".to_string(),
                title: strings(&[".caption h4 a", "h4 a"]),
                price: strings(&[".price-new", ".price"]),
                link: strings(&[".caption h4 a", "h4 a", ".image a"]),
                image: image.clone(),
                sku: sku.clone(),
                price_pattern: Some(TL_PRICE_PATTERN.to_string()),
            },
            Self {
                name: "grid".to_string(),
                card: ".product-grid .product-thumb, .product-item".to_string(),
                title: strings(&[".product-name a", ".title a", ".name a"]),
                price: strings(&[".price", ".product-price"]),
                link: strings(&[".product-name a", ".title a", ".name a", "a"]),
                image: image.clone(),
                sku: sku.clone(),
                price_pattern: Some(TL_PRICE_PATTERN.to_string()),
            },
            Self {
                name: "prestashop".to_string(),
                card: ".product-miniature".to_string(),
                title: strings(&[".product-title a"]),
                price: strings(&[".price"]),
                link: strings(&[".product-title a", "a.thumbnail"]),
                image: image.clone(),
                sku: sku.clone(),
                price_pattern: None,
            },
            Self {
                name: "generic".to_string(),
                card: ".product-card, article.product, li.product, div.product".to_string(),
                title: strings(&[
                    ".product-title",
                    ".card-title",
                    "h2 a",
                    "h3 a",
                    "a.product-name",
                ]),
                price: strings(&[
                    ".price",
                    ".current-price",
                    ".product-price",
                    ".amount",
                    "span.woocommerce-Price-amount",
                ]),
                link: strings(&["a.product-link", ".product-title a", "a.card-link", "a"]),
                image,
                sku,
                price_pattern: Some(TL_PRICE_PATTERN.to_string()),
            },
            Self {
                name: "product-anchors".to_string(),
                card: "a[href*='/urun-'], a[href*='/p-'], a[href*='/Product-']".to_string(),
                title: strings(&["[itemprop='name']", ".product-name", ".name", "h3", "h2", "h4", "span"]),
                price: Vec::new(),
                link: Vec::new(),
                image: strings(&["img"]),
                sku: Vec::new(),
                price_pattern: Some(TL_PRICE_PATTERN.to_string()),
            },
        ]
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
