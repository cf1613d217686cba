//! Next-page discovery for category listings

use scraper::{Html, Selector};
use url::Url;

/// First "next" link found by `selectors`, resolved against `page_url`.
///
/// Links that do not resolve to `http`/`https`, or that point back at the
/// current page, are ignored.
pub fn find_next_link(html: &Html, page_url: &Url, selectors: &[Selector]) -> Option<Url> {
    selectors
        .iter()
        .flat_map(|selector| html.select(selector))
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_http_url(page_url, href))
        .find(|next| next != page_url)
}

/// `url` with `param` set to `page`, replacing any existing value
pub fn with_page_param(url: &Url, param: &str, page: u32) -> Url {
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != param)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut next = url.clone();
    next.set_fragment(None);
    next.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair(param, &page.to_string());
    next
}

/// Resolve `href` against `base`, keeping only web URLs and dropping the fragment
pub fn resolve_http_url(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}
