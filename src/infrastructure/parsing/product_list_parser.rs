//! Product list parser for category pages
//!
//! Each configured [`SelectorStrategy`] is compiled once into a
//! [`CompiledStrategy`]. On every page the strategies run in order and the first
//! one producing a valid card wins; results of different strategies are never
//! merged.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::config::{ParsingConfig, SelectorStrategy};
use super::pagination::{find_next_link, resolve_http_url};
use super::{ContextualParser, ParseContext, ParsingError, ParsingResult};
use crate::domain::price::is_grouping_space;
use crate::domain::product::CardCandidate;

/// Parser for extracting product cards from listing pages
pub struct ProductListParser {
    strategies: Vec<CompiledStrategy>,
    next_page_selectors: Vec<Selector>,
}

impl ProductListParser {
    /// Parser with the built-in strategies
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&ParsingConfig::default())
    }

    /// Compile the configured strategies. Invalid field selectors are skipped with
    /// a warning; a strategy whose card selector or price pattern is invalid is
    /// dropped entirely.
    pub fn with_config(config: &ParsingConfig) -> ParsingResult<Self> {
        let strategies: Vec<CompiledStrategy> = config
            .strategies
            .iter()
            .filter_map(|strategy| match CompiledStrategy::compile(strategy) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    warn!("Dropping selector strategy '{}': {}", strategy.name, e);
                    None
                }
            })
            .collect();

        if strategies.is_empty() {
            return Err(ParsingError::ConfigurationError {
                message: "no usable selector strategy configured".to_string(),
            });
        }

        Ok(Self {
            strategies,
            next_page_selectors: compile_selectors(&config.next_page_selectors),
        })
    }

    pub fn strategy_names(&self) -> Vec<String> {
        self.strategies.iter().map(|s| s.name().to_string()).collect()
    }

    /// Link to the next listing page, if the page has one
    pub fn next_page_url(&self, html: &Html, page_url: &Url) -> Option<Url> {
        find_next_link(html, page_url, &self.next_page_selectors)
    }
}

impl ContextualParser for ProductListParser {
    type Output = Vec<CardCandidate>;
    type Context = ParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        debug!("Parsing product list for page {} of {}", context.page_number, context.category);

        let mut tried_strategies = Vec::new();

        for strategy in &self.strategies {
            tried_strategies.push(strategy.name().to_string());

            let cards = strategy.extract(html, &context.page_url);
            if !cards.is_empty() {
                debug!(
                    "Strategy '{}' extracted {} cards from page {}",
                    strategy.name(),
                    cards.len(),
                    context.page_number
                );
                return Ok(cards);
            }
        }

        Err(ParsingError::no_products_found(context.page_number, tried_strategies))
    }
}

/// A selector strategy with its selectors and pattern compiled
pub struct CompiledStrategy {
    name: String,
    card: Selector,
    title: Vec<Selector>,
    price: Vec<Selector>,
    link: Vec<Selector>,
    image: Vec<Selector>,
    sku: Vec<Selector>,
    price_pattern: Option<Regex>,
}

impl CompiledStrategy {
    pub fn compile(strategy: &SelectorStrategy) -> ParsingResult<Self> {
        let card = Selector::parse(&strategy.card)
            .map_err(|e| ParsingError::invalid_selector(&strategy.card, e))?;

        let price_pattern = strategy
            .price_pattern
            .as_deref()
            .map(|pattern| Regex::new(pattern).map_err(|e| ParsingError::invalid_pattern(pattern, e)))
            .transpose()?;

        Ok(Self {
            name: strategy.name.clone(),
            card,
            title: compile_selectors(&strategy.title),
            price: compile_selectors(&strategy.price),
            link: compile_selectors(&strategy.link),
            image: compile_selectors(&strategy.image),
            sku: compile_selectors(&strategy.sku),
            price_pattern,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All valid cards on the page, in document order. Cards lacking a name or a
    /// web URL are skipped.
    pub fn extract(&self, html: &Html, page_url: &Url) -> Vec<CardCandidate> {
        html.select(&self.card)
            .filter_map(|element| match self.extract_card(element, page_url) {
                Ok(card) => Some(card),
                Err(e) => {
                    debug!("Skipping card: {}", e);
                    None
                }
            })
            .collect()
    }

    fn extract_card(&self, element: ElementRef<'_>, page_url: &Url) -> ParsingResult<CardCandidate> {
        let anchor = self.link_element(element);

        let url = anchor
            .and_then(|a| a.value().attr("href"))
            .ok_or_else(|| ParsingError::required_field_missing("url", &self.name))
            .and_then(|href| {
                resolve_http_url(page_url, href)
                    .ok_or_else(|| ParsingError::url_resolution_failed(href, "not a web URL"))
            })?;

        let name = self
            .title
            .iter()
            .flat_map(|selector| element.select(selector))
            .chain(anchor)
            .map(|e| self.without_price(&element_text(e)))
            .find(|text| !text.is_empty())
            .ok_or_else(|| ParsingError::required_field_missing("name", &self.name))?;

        Ok(CardCandidate {
            name,
            price_text: self.price_text(element),
            url: url.to_string(),
            image: self.image_url(element, page_url),
            sku: self.sku(element),
        })
    }

    /// The configured link, or the card itself when it is an anchor
    fn link_element<'a>(&self, element: ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.link
            .iter()
            .find_map(|selector| element.select(selector).find(|a| a.value().attr("href").is_some()))
            .or_else(|| (element.value().name() == "a").then_some(element))
    }

    fn price_text(&self, element: ElementRef<'_>) -> Option<String> {
        first_text(element, &self.price).or_else(|| {
            let pattern = self.price_pattern.as_ref()?;
            let text = element_text(element);
            let captures = pattern.captures(&text)?;
            captures
                .get(1)
                .or_else(|| captures.get(0))
                .map(|m| m.as_str().trim().to_string())
        })
    }

    /// `text` with the price pattern's match cut out
    fn without_price(&self, text: &str) -> String {
        let stripped = match &self.price_pattern {
            Some(pattern) => pattern.replace_all(text, " "),
            None => text.into(),
        };
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn image_url(&self, element: ElementRef<'_>, page_url: &Url) -> Option<String> {
        self.image
            .iter()
            .flat_map(|selector| element.select(selector))
            .find_map(|img| {
                ["data-src", "data-original", "src"]
                    .iter()
                    .filter_map(|attr| img.value().attr(attr))
                    .find_map(|src| resolve_http_url(page_url, src))
            })
            .map(|url| url.to_string())
    }

    fn sku(&self, element: ElementRef<'_>) -> Option<String> {
        let attr = |e: ElementRef<'_>| {
            e.value()
                .attr("data-sku")
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        attr(element).or_else(|| {
            self.sku
                .iter()
                .flat_map(|selector| element.select(selector))
                .find_map(|e| attr(e).or_else(|| Some(element_text(e)).filter(|t| !t.is_empty())))
        })
    }
}

/// Compile selector strings, warning about and skipping invalid ones
fn compile_selectors(selector_strings: &[String]) -> Vec<Selector> {
    selector_strings
        .iter()
        .filter_map(|selector_str| match Selector::parse(selector_str) {
            Ok(selector) => Some(selector),
            Err(e) => {
                warn!("Failed to compile selector '{}': {}", selector_str, e);
                None
            }
        })
        .collect()
}

/// Text of the first selector match with non-empty text
fn first_text(element: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors
        .iter()
        .flat_map(|selector| element.select(selector))
        .map(element_text)
        .find(|text| !text.is_empty())
}

/// Element text with whitespace runs collapsed. Non-breaking spaces are kept
/// since prices use them for digit grouping.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(|chunk| chunk.split(|c: char| c.is_whitespace() && !is_grouping_space(c)))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
