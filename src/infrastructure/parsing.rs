//! HTML parsing for category listing pages
//!
//! Cards are extracted by an ordered list of selector strategies, and the
//! "next page" link is located by its own selector list.

pub mod config;
pub mod context;
pub mod pagination;
pub mod product_list_parser;

// Re-export public types
pub use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};
pub use config::{ParsingConfig, SelectorStrategy};
pub use context::ParseContext;
pub use product_list_parser::ProductListParser;

use scraper::Html;

/// Parser trait with context support
pub trait ContextualParser {
    type Output;
    type Context;

    /// Parse HTML with contextual information
    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output>;
}
