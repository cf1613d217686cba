//! The pipeline steps as file-to-file jobs
//!
//! Every step reads its input table from disk and writes its output table
//! atomically, so steps can run as separate processes.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::domain::product::{PRODUCT_COLUMNS, Product};
use crate::domain::report::{REPORT_COLUMNS, ReportRow};
use crate::domain::services::{MessageChannel, PageFetcher};
use crate::infrastructure::config::PipelineConfig;
use crate::infrastructure::csv_store::{read_table, write_table};
use crate::infrastructure::http_client::HttpClient;
use crate::infrastructure::post_log::PostLog;
use crate::infrastructure::telegram::TelegramChannel;

use super::collector::{CollectionSummary, Collector, read_category_list};
use super::links::{LINK_COLUMNS, LinkBuilder};
use super::publisher::{PublishSummary, Publisher};
use super::reporter::{CommissionPolicy, ReportStats, Reporter};

/// Publish step switches from the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct PublishOptions {
    pub digest: bool,
    pub batch_size: Option<usize>,
}

#[derive(Debug)]
pub enum PublishOutcome {
    /// No credentials configured; nothing was attempted
    Skipped,
    Posted(PublishSummary),
    Digest { parts: usize },
}

pub async fn run_collect(config: &PipelineConfig) -> Result<CollectionSummary> {
    let fetcher = Arc::new(HttpClient::new(&config.http)?);
    run_collect_with(config, fetcher).await
}

pub async fn run_collect_with(config: &PipelineConfig, fetcher: Arc<dyn PageFetcher>) -> Result<CollectionSummary> {
    let categories = read_category_list(&config.paths.categories)?;
    info!("{} categories from {}", categories.len(), config.paths.categories.display());

    let mut collector = Collector::new(fetcher, &config.collector)?;
    let summary = collector.collect(&categories).await;

    write_table(
        &config.paths.products,
        &PRODUCT_COLUMNS,
        &summary.products,
        config.csv.options(),
    )
    .with_context(|| format!("Failed to write {}", config.paths.products.display()))?;

    info!("Wrote {} products to {}", summary.products.len(), config.paths.products.display());
    Ok(summary)
}

pub fn run_report(config: &PipelineConfig) -> Result<ReportStats> {
    let products: Vec<Product> = read_table(&config.paths.products)?;
    let reporter = Reporter::new(CommissionPolicy::from_config(&config.commission));
    let (rows, stats) = reporter.build_report(&products);

    write_table(&config.paths.report, &REPORT_COLUMNS, &rows, config.csv.options())
        .with_context(|| format!("Failed to write {}", config.paths.report.display()))?;

    info!("Wrote {} report rows to {}", rows.len(), config.paths.report.display());
    Ok(stats)
}

pub fn run_links(config: &PipelineConfig) -> Result<usize> {
    let products: Vec<Product> = read_table(&config.paths.products)?;
    let rows = LinkBuilder::new(&config.links).build(&products);

    write_table(&config.paths.links, &LINK_COLUMNS, &rows, config.csv.options())
        .with_context(|| format!("Failed to write {}", config.paths.links.display()))?;

    info!("Wrote {} links to {}", rows.len(), config.paths.links.display());
    Ok(rows.len())
}

pub async fn run_publish(config: &PipelineConfig, options: PublishOptions) -> Result<PublishOutcome> {
    let Some(channel) = TelegramChannel::from_config(&config.telegram)? else {
        info!("Telegram bot token or chat id not configured; skipping publish");
        return Ok(PublishOutcome::Skipped);
    };
    run_publish_with(config, Arc::new(channel), options).await
}

pub async fn run_publish_with(
    config: &PipelineConfig,
    channel: Arc<dyn MessageChannel>,
    options: PublishOptions,
) -> Result<PublishOutcome> {
    let rows: Vec<ReportRow> = read_table(&config.paths.report)?;

    let mut publisher_config = config.publisher.clone();
    if let Some(batch_size) = options.batch_size.filter(|n| *n > 0) {
        publisher_config.batch_size = batch_size;
    }
    let mut publisher = Publisher::new(channel, &publisher_config, &config.links);

    if options.digest {
        let parts = publisher.publish_digest(&rows).await?;
        return Ok(PublishOutcome::Digest { parts });
    }

    let mut log = PostLog::load(&config.paths.post_log)?;
    let summary = publisher.publish(&rows, &mut log).await?;
    Ok(PublishOutcome::Posted(summary))
}

/// Collect, report, link and publish in sequence. Publishing without
/// credentials is a no-op and never fails the run.
pub async fn run_all(config: &PipelineConfig) -> Result<()> {
    run_collect(config).await?;
    run_report(config)?;
    run_links(config)?;

    let outcome = run_publish(config, PublishOptions::default())
        .await
        .context("Publish step failed")?;
    info!("Publish step: {:?}", outcome);
    Ok(())
}
