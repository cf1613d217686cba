//! Parsing error types for listing-page extraction

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ParsingError {
    #[error("Required field '{field}' not found by strategy '{strategy}'")]
    RequiredFieldMissing { field: String, strategy: String },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid price pattern: {pattern} - {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("No products found on page {page_number} (tried: {})", tried_strategies.join(", "))]
    NoProductsFound {
        page_number: u32,
        tried_strategies: Vec<String>,
    },

    #[error("URL resolution failed: {url} - {reason}")]
    UrlResolutionFailed { url: String, reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}

impl ParsingError {
    pub fn required_field_missing(field: &str, strategy: &str) -> Self {
        Self::RequiredFieldMissing {
            field: field.to_string(),
            strategy: strategy.to_string(),
        }
    }

    pub fn invalid_selector(selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_pattern(pattern: &str, reason: impl ToString) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a no products found error with the strategies that were tried
    pub fn no_products_found(page_number: u32, tried_strategies: Vec<String>) -> Self {
        Self::NoProductsFound {
            page_number,
            tried_strategies,
        }
    }

    pub fn url_resolution_failed(url: &str, reason: impl ToString) -> Self {
        Self::UrlResolutionFailed {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// An empty page is a normal end-of-listing signal, not a failure
    pub fn is_empty_page(&self) -> bool {
        matches!(self, Self::NoProductsFound { .. })
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
