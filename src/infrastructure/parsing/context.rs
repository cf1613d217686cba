//! Parsing context for listing pages

use url::Url;

/// Context information for parsing one listing page
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// URL the page was fetched from; relative links resolve against it
    pub page_url: Url,

    /// 1-based position within the category
    pub page_number: u32,

    /// Category URL as listed in the category file
    pub category: String,
}

impl ParseContext {
    pub fn new(page_url: Url, page_number: u32, category: impl Into<String>) -> Self {
        Self {
            page_url,
            page_number,
            category: category.into(),
        }
    }
}
