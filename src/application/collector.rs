//! Collector: category pages in, de-duplicated products out

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use governor::clock::DefaultClock;
use scraper::Html;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::product::{CardCandidate, Product};
use crate::domain::services::PageFetcher;
use crate::domain::sku::normalize_url;
use crate::infrastructure::config::CollectorConfig;
use crate::infrastructure::pacer::{Pacer, PacerClock};
use crate::infrastructure::parsing::pagination::with_page_param;
use crate::infrastructure::parsing::{ContextualParser, ParseContext, ParsingResult, ProductListParser};

/// Read the category list: one URL per line, blank lines and `#` comments
/// ignored. Invalid or non-web URLs are skipped with a warning; a missing file
/// is an empty list.
pub fn read_category_list(path: &Path) -> Result<Vec<Url>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Category list {} does not exist; nothing to collect", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };

    Ok(parse_category_list(&contents))
}

pub fn parse_category_list(contents: &str) -> Vec<Url> {
    let mut seen = HashSet::new();
    let mut categories = Vec::new();

    for (line_number, line) in contents.lines().enumerate() {
        let line = line.trim().trim_start_matches('\u{feff}');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match Url::parse(line) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                if seen.insert(url.to_string()) {
                    categories.push(url);
                }
            }
            Ok(url) => warn!("Line {}: unsupported scheme '{}', skipping", line_number + 1, url.scheme()),
            Err(e) => warn!("Line {}: invalid category URL '{}': {}", line_number + 1, line, e),
        }
    }

    categories
}

/// What one collection run produced
#[derive(Debug, Default)]
pub struct CollectionSummary {
    pub products: Vec<Product>,
    pub categories: usize,
    pub categories_skipped: usize,
    pub pages_fetched: usize,
    /// Cards already collected from an earlier category
    pub duplicates_dropped: usize,
}

/// Why pagination of a category ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    PageCap,
    EmptyPage,
    NothingNew,
    NoNextPage,
    AlreadyVisited,
    FetchFailed,
}

/// Result of parsing one page, computed without holding the document across an await
struct ParsedPage {
    cards: ParsingResult<Vec<CardCandidate>>,
    next: Option<Url>,
}

pub struct Collector<C: PacerClock = DefaultClock> {
    fetcher: Arc<dyn PageFetcher>,
    parser: ProductListParser,
    pacer: Pacer<C>,
    max_pages: u32,
    page_query_param: Option<String>,
}

impl Collector<DefaultClock> {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: &CollectorConfig) -> Result<Self> {
        let pacer = Pacer::new(Duration::from_millis(config.request_delay_ms));
        Self::with_pacer(fetcher, config, pacer)
    }
}

impl<C: PacerClock> Collector<C> {
    pub fn with_pacer(fetcher: Arc<dyn PageFetcher>, config: &CollectorConfig, pacer: Pacer<C>) -> Result<Self> {
        let parser = ProductListParser::with_config(&config.parsing).context("Invalid selector configuration")?;
        let page_query_param = Some(config.page_query_param.trim().to_string()).filter(|p| !p.is_empty());

        Ok(Self {
            fetcher,
            parser,
            pacer,
            max_pages: config.max_pages,
            page_query_param,
        })
    }

    pub fn pacer(&self) -> &Pacer<C> {
        &self.pacer
    }

    /// Collect every category in order, de-duplicating by normalized URL across
    /// the whole run. The first occurrence of a product wins.
    pub async fn collect(&mut self, categories: &[Url]) -> CollectionSummary {
        let mut summary = CollectionSummary {
            categories: categories.len(),
            ..Default::default()
        };
        let mut seen = HashSet::new();
        info!(
            "Collecting {} categories, {:?} between requests",
            categories.len(),
            self.pacer.delay()
        );

        for (index, category) in categories.iter().enumerate() {
            info!("[{}/{}] Collecting category {}", index + 1, categories.len(), category);
            let before = summary.products.len();
            let (pages, reason) = self.collect_category(category, &mut seen, &mut summary).await;

            if pages == 0 {
                summary.categories_skipped += 1;
            }
            info!(
                "Category {} done: {} pages, {} new products ({:?})",
                category,
                pages,
                summary.products.len() - before,
                reason
            );
        }

        info!(
            "Collected {} products from {} categories ({} skipped, {} pages, {} cross-category duplicates)",
            summary.products.len(),
            summary.categories,
            summary.categories_skipped,
            summary.pages_fetched,
            summary.duplicates_dropped
        );
        summary
    }

    /// Walk one category's pages; returns successfully fetched pages and why it stopped
    async fn collect_category(
        &mut self,
        category: &Url,
        seen: &mut HashSet<String>,
        summary: &mut CollectionSummary,
    ) -> (usize, StopReason) {
        let mut page_url = category.clone();
        let mut visited: HashSet<String> = HashSet::new();
        let mut category_keys: HashSet<String> = HashSet::new();
        let mut fetched = 0;

        for page_number in 1..=self.max_pages {
            visited.insert(normalize_url(page_url.as_str()));

            self.pacer.ready().await;
            let body = match self.fetcher.fetch_page(&page_url).await {
                Ok(body) => body,
                Err(e) => {
                    if page_number == 1 {
                        warn!("Skipping category {}: {}", category, e);
                    } else {
                        warn!("Stopping {} at page {}: {}", category, page_number, e);
                    }
                    return (fetched, StopReason::FetchFailed);
                }
            };
            fetched += 1;
            summary.pages_fetched += 1;

            let page = self.parse_page(&body, &page_url, page_number, category);
            let cards = match page.cards {
                Ok(cards) => cards,
                Err(e) => {
                    debug!("Page {} of {}: {}", page_number, category, e);
                    return (fetched, StopReason::EmptyPage);
                }
            };

            let mut new_in_category = 0;
            for card in cards {
                let key = normalize_url(&card.url);
                if !category_keys.insert(key.clone()) {
                    continue;
                }
                new_in_category += 1;

                if seen.insert(key) {
                    summary.products.push(Product::from_card(card, category.as_str()));
                } else {
                    summary.duplicates_dropped += 1;
                }
            }

            if new_in_category == 0 {
                return (fetched, StopReason::NothingNew);
            }

            let next = page.next.or_else(|| {
                self.page_query_param
                    .as_deref()
                    .map(|param| with_page_param(&page_url, param, page_number + 1))
            });

            match next {
                Some(next) if visited.contains(&normalize_url(next.as_str())) => {
                    debug!("Next page {} already visited", next);
                    return (fetched, StopReason::AlreadyVisited);
                }
                Some(next) => page_url = next,
                None => return (fetched, StopReason::NoNextPage),
            }
        }

        info!("Reached the page cap ({}) for {}", self.max_pages, category);
        (fetched, StopReason::PageCap)
    }

    fn parse_page(&self, body: &str, page_url: &Url, page_number: u32, category: &Url) -> ParsedPage {
        let document = Html::parse_document(body);
        let context = ParseContext::new(page_url.clone(), page_number, category.as_str());

        ParsedPage {
            cards: self.parser.parse_with_context(&document, &context),
            next: self.parser.next_page_url(&document, page_url),
        }
    }
}
