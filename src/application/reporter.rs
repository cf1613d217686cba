//! Reporter: products in, priced report rows with commission out

use tracing::{debug, info, warn};

use crate::domain::price::normalize_price;
use crate::domain::product::Product;
use crate::domain::report::{ReportRow, estimate_commission};
use crate::infrastructure::config::{CategoryRate, CommissionConfig};

/// Commission rate lookup: per-category overrides matched by substring of the
/// product's source category (case-insensitive, first match wins), else the default
#[derive(Debug, Clone)]
pub struct CommissionPolicy {
    default_rate: f64,
    overrides: Vec<CategoryRate>,
}

impl CommissionPolicy {
    pub fn new(default_rate: f64) -> Self {
        Self {
            default_rate,
            overrides: Vec::new(),
        }
    }

    pub fn from_config(config: &CommissionConfig) -> Self {
        Self {
            default_rate: config.default_rate,
            overrides: config
                .category_rates
                .iter()
                .filter(|o| !o.pattern.trim().is_empty())
                .map(|o| CategoryRate {
                    pattern: o.pattern.trim().to_lowercase(),
                    rate: o.rate,
                })
                .collect(),
        }
    }

    pub fn rate_for(&self, source_category: &str) -> f64 {
        let category = source_category.to_lowercase();
        self.overrides
            .iter()
            .find(|o| category.contains(&o.pattern))
            .map_or(self.default_rate, |o| o.rate)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReportStats {
    pub rows: usize,
    pub unpriced: usize,
}

pub struct Reporter {
    policy: CommissionPolicy,
}

impl Reporter {
    pub fn new(policy: CommissionPolicy) -> Self {
        Self { policy }
    }

    /// One report row per product, in input order
    pub fn build_report(&self, products: &[Product]) -> (Vec<ReportRow>, ReportStats) {
        let rows: Vec<ReportRow> = products.iter().map(|p| self.build_row(p)).collect();
        let stats = ReportStats {
            rows: rows.len(),
            unpriced: rows.iter().filter(|r| r.price.is_none()).count(),
        };

        info!("Built {} report rows ({} without a usable price)", stats.rows, stats.unpriced);
        (rows, stats)
    }

    pub fn build_row(&self, product: &Product) -> ReportRow {
        let price = match product.price.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(text) => {
                let parsed = normalize_price(text);
                if parsed.is_none() {
                    warn!("Unparseable price '{}' for {}", text, product.url);
                }
                parsed
            }
            None => {
                debug!("No price for {}", product.url);
                None
            }
        };

        let commission_rate = self.policy.rate_for(&product.source_category);

        ReportRow {
            sku: product.effective_sku(),
            name: product.name.trim().to_string(),
            price,
            commission_rate,
            estimated_commission: estimate_commission(price, commission_rate),
            url: product.url.clone(),
            image: product.image.clone().filter(|s| !s.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, price: Option<&str>, url: &str, category: &str) -> Product {
        Product {
            name: name.to_string(),
            price: price.map(str::to_string),
            url: url.to_string(),
            image: None,
            source_category: category.to_string(),
            sku: None,
        }
    }

    #[test]
    fn test_acer_scenario() {
        let reporter = Reporter::new(CommissionPolicy::new(20.0));
        let row = reporter.build_row(&product("Acer B", Some("89,90 TL"), "https://x/b", "https://x/c"));

        assert_eq!(row.price, Some(89.90));
        assert_eq!(row.commission_rate, 20.0);
        assert_eq!(row.estimated_commission, 17.98);
        assert_eq!(row.sku, crate::domain::sku::derive_sku("https://x/b", "Acer B"));
    }

    #[test]
    fn test_unparseable_price_is_flagged() {
        let reporter = Reporter::new(CommissionPolicy::new(10.0));
        let (rows, stats) = reporter.build_report(&[
            product("A", Some("Tükendi"), "https://x/a", ""),
            product("B", None, "https://x/b", ""),
            product("C", Some("1.299,00"), "https://x/c", ""),
        ]);

        assert_eq!(rows[0].price, None);
        assert_eq!(rows[0].estimated_commission, 0.0);
        assert_eq!(rows[2].estimated_commission, 129.9);
        assert_eq!(stats, ReportStats { rows: 3, unpriced: 2 });
    }

    #[test]
    fn test_category_override() {
        let policy = CommissionPolicy::from_config(&CommissionConfig {
            default_rate: 10.0,
            category_rates: vec![
                CategoryRate {
                    pattern: "Elektronik".to_string(),
                    rate: 5.0,
                },
                CategoryRate {
                    pattern: "kozmetik".to_string(),
                    rate: 15.0,
                },
            ],
        });

        assert_eq!(policy.rate_for("https://x/elektronik/telefon"), 5.0);
        assert_eq!(policy.rate_for("https://x/KOZMETIK"), 15.0);
        assert_eq!(policy.rate_for("https://x/ev"), 10.0);
    }

    #[test]
    fn test_canonical_price_is_stable() {
        let reporter = Reporter::new(CommissionPolicy::new(10.0));
        let row = reporter.build_row(&product("A", Some("1299.00"), "https://x/a", ""));
        assert_eq!(row.price, Some(1299.0));
    }
}
