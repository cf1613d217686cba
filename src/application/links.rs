//! UTM link builder

use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::product::Product;
use crate::infrastructure::config::{LinkMode, LinksConfig};

/// Column order of the links table
pub const LINK_COLUMNS: [&str; 4] = ["name", "price", "url", "utm_link"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRow {
    pub name: String,
    pub price: Option<String>,
    pub url: String,
    pub utm_link: String,
}

pub struct LinkBuilder<'a> {
    config: &'a LinksConfig,
}

impl<'a> LinkBuilder<'a> {
    pub fn new(config: &'a LinksConfig) -> Self {
        Self { config }
    }

    /// `url` with the UTM parameters set, replacing existing ones; unparseable
    /// input is returned unchanged
    pub fn tag_url(&self, url: &str) -> String {
        let Ok(mut parsed) = Url::parse(url.trim()) else {
            return url.to_string();
        };

        let utm = self.utm_pairs();
        let retained: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(key, _)| !utm.iter().any(|(k, _)| k == key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        parsed.query_pairs_mut().clear().extend_pairs(retained).extend_pairs(utm);
        parsed.to_string()
    }

    /// Storefront search for `name`, UTM-tagged
    pub fn search_link(&self, name: &str) -> String {
        let base = self.config.site_base.trim_end_matches('/');
        let mut url = match Url::parse(&format!("{base}/")) {
            Ok(url) => url,
            Err(_) => return String::new(),
        };
        url.query_pairs_mut()
            .append_pair("s", name.trim())
            .extend_pairs(self.utm_pairs());
        url.to_string()
    }

    /// The link for one product according to the configured mode
    pub fn link_for(&self, name: &str, url: &str) -> String {
        match self.config.mode {
            LinkMode::Tag if !url.trim().is_empty() => self.tag_url(url),
            LinkMode::Tag | LinkMode::Search => self.search_link(name),
        }
    }

    /// Links for every product with a non-empty name
    pub fn build(&self, products: &[Product]) -> Vec<LinkRow> {
        products
            .iter()
            .filter(|p| !p.name.trim().is_empty())
            .map(|p| LinkRow {
                name: p.name.trim().to_string(),
                price: p.price.clone(),
                url: p.url.clone(),
                utm_link: self.link_for(&p.name, &p.url),
            })
            .collect()
    }

    fn utm_pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("utm_source", self.config.utm_source.as_str()),
            ("utm_medium", self.config.utm_medium.as_str()),
            ("utm_campaign", self.config.utm_campaign.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_url_replaces_existing_utm() {
        let config = LinksConfig::default();
        let builder = LinkBuilder::new(&config);
        assert_eq!(
            builder.tag_url("https://x/urun-1?renk=mavi&utm_source=old"),
            "https://x/urun-1?renk=mavi&utm_source=telegram&utm_medium=bot&utm_campaign=trm"
        );
    }

    #[test]
    fn test_search_link_encodes_name() {
        let config = LinksConfig {
            mode: LinkMode::Search,
            ..Default::default()
        };
        let builder = LinkBuilder::new(&config);
        assert_eq!(
            builder.link_for("Çay Bardağı 6'lı", "https://x/a"),
            "https://trendurunlermarket.com/?s=%C3%87ay+Barda%C4%9F%C4%B1+6%27l%C4%B1&utm_source=telegram&utm_medium=bot&utm_campaign=trm"
        );
    }

    #[test]
    fn test_tag_mode_without_url_falls_back_to_search() {
        let config = LinksConfig::default();
        let builder = LinkBuilder::new(&config);
        assert!(builder.link_for("Kupa", "").contains("?s=Kupa&"));
    }

    #[test]
    fn test_build_skips_nameless_products() {
        let config = LinksConfig::default();
        let builder = LinkBuilder::new(&config);
        let products = vec![
            Product {
                name: "  ".to_string(),
                price: None,
                url: "https://x/a".to_string(),
                image: None,
                source_category: String::new(),
                sku: None,
            },
            Product {
                name: "Kupa".to_string(),
                price: Some("49.90".to_string()),
                url: "https://x/kupa".to_string(),
                image: None,
                source_category: String::new(),
                sku: None,
            },
        ];

        let rows = builder.build(&products);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].utm_link, "https://x/kupa?utm_source=telegram&utm_medium=bot&utm_campaign=trm");
    }
}
