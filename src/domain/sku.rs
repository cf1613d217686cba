//! Stable SKU derivation
//!
//! The post log keys on these values, so the same product must map to the same
//! SKU on every run and every machine. BLAKE3 of the normalized URL gives that.

use url::Url;

use super::constants::site::{SKU_HASH_LEN, SKU_PREFIX};

/// Normalize a product URL for identity comparisons.
///
/// Scheme and host are lower-cased, the fragment is dropped and a trailing slash
/// on a non-root path is removed. Unparseable input is trimmed and lower-cased.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            let path = url.path().to_string();
            if path.len() > 1 && path.ends_with('/') {
                url.set_path(path.trim_end_matches('/'));
            }
            url.to_string()
        }
        Err(_) => trimmed.to_lowercase(),
    }
}

/// Derive the SKU for a product without a site-provided one.
///
/// The URL is the identity; the name is only hashed when the URL is empty.
pub fn derive_sku(url: &str, name: &str) -> String {
    let key = if url.trim().is_empty() {
        name.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    } else {
        normalize_url(url)
    };

    let hash = blake3::hash(key.as_bytes()).to_hex();
    format!("{SKU_PREFIX}-{}", hash.as_str()[..SKU_HASH_LEN].to_uppercase())
}
