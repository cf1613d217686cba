use serde::{Deserialize, Serialize};

use super::price::round_to_cents;
use super::sku::normalize_url;

/// Column order of the report table
pub const REPORT_COLUMNS: [&str; 7] = [
    "sku",
    "name",
    "price",
    "commission",
    "estimated_commission",
    "url",
    "image",
];

/// One row of the "pretty" report, derived deterministically from a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub sku: String,
    pub name: String,
    /// `None` when the scraped price could not be parsed; written as an empty cell
    #[serde(default, with = "optional_money")]
    pub price: Option<f64>,
    /// Commission rate in percent
    #[serde(rename = "commission", with = "rate")]
    pub commission_rate: f64,
    #[serde(with = "money")]
    pub estimated_commission: f64,
    pub url: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl ReportRow {
    /// Key used by the post log: the normalized URL, or the SKU when the URL is empty
    pub fn identifier(&self) -> String {
        if self.url.trim().is_empty() {
            self.sku.clone()
        } else {
            normalize_url(&self.url)
        }
    }

    /// Image URL worth sending as media
    pub fn image_url(&self) -> Option<&str> {
        self.image
            .as_deref()
            .map(str::trim)
            .filter(|s| s.starts_with("http://") || s.starts_with("https://"))
    }
}

/// `price * rate / 100`, rounded to cents; a missing price counts as zero
pub fn estimate_commission(price: Option<f64>, commission_rate: f64) -> f64 {
    round_to_cents(price.unwrap_or(0.0) * commission_rate / 100.0)
}

/// Rate as written in the report: `20.0`, `12.5`
pub fn format_rate(rate: f64) -> String {
    if rate.fract() == 0.0 {
        format!("{rate:.1}")
    } else {
        format!("{rate}")
    }
}

mod money {
    use serde::{Deserialize, Deserializer, Serializer, de};

    use crate::domain::price::{format_price, normalize_price};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_price(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        normalize_price(&raw).ok_or_else(|| de::Error::custom(format!("invalid amount '{raw}'")))
    }
}

mod optional_money {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::domain::price::{format_price, normalize_price};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&format_price(*v)),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(normalize_price(&raw))
    }
}

mod rate {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_rate(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.trim()
            .trim_end_matches('%')
            .replace(',', ".")
            .parse::<f64>()
            .map_err(|e| de::Error::custom(format!("invalid commission rate '{raw}': {e}")))
    }
}
