//! Publisher: report rows to the message channel, at most once per identifier

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use governor::clock::DefaultClock;
use tracing::{info, warn};

use crate::domain::constants::publisher::{CAPTION_LIMIT, DIGEST_CHUNK_CHARS, TEXT_LIMIT};
use crate::domain::report::ReportRow;
use crate::domain::services::{ChannelError, MessageChannel};
use crate::infrastructure::config::{LinksConfig, PublisherConfig};
use crate::infrastructure::pacer::{Pacer, PacerClock};
use crate::infrastructure::post_log::PostLog;

use super::caption::format_caption;
use super::digest::{build_digest, chunk_text};
use super::links::LinkBuilder;

#[derive(Debug, Clone, Copy)]
enum Outgoing<'a> {
    Text(&'a str),
    Photo { url: &'a str, caption: &'a str },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishSummary {
    /// Rows not in the post log before this run
    pub eligible: usize,
    pub sent: usize,
    pub failed: usize,
    /// Eligible rows left for a later run by the batch cap
    pub deferred: usize,
}

/// Rows whose identifier is not in `log`, each identifier once, in report order
pub fn select_eligible<'a>(rows: &'a [ReportRow], log: &PostLog) -> Vec<(String, &'a ReportRow)> {
    let mut seen = HashSet::new();
    rows.iter()
        .map(|row| (row.identifier(), row))
        .filter(|(id, _)| !id.is_empty() && !log.contains(id) && seen.insert(id.clone()))
        .collect()
}

pub struct Publisher<C: PacerClock = DefaultClock> {
    channel: Arc<dyn MessageChannel>,
    pacer: Pacer<C>,
    config: PublisherConfig,
    links: Option<LinksConfig>,
}

impl Publisher<DefaultClock> {
    pub fn new(channel: Arc<dyn MessageChannel>, config: &PublisherConfig, links: &LinksConfig) -> Self {
        let pacer = Pacer::new(Duration::from_millis(config.message_delay_ms));
        Self::with_pacer(channel, config, links, pacer)
    }
}

impl<C: PacerClock> Publisher<C> {
    pub fn with_pacer(
        channel: Arc<dyn MessageChannel>,
        config: &PublisherConfig,
        links: &LinksConfig,
        pacer: Pacer<C>,
    ) -> Self {
        Self {
            channel,
            pacer,
            config: config.clone(),
            links: config.utm_links.then(|| links.clone()),
        }
    }

    pub fn pacer(&self) -> &Pacer<C> {
        &self.pacer
    }

    /// Deliver up to `batch_size` eligible rows. Each success is recorded in
    /// `log` and persisted before the next send.
    pub async fn publish(&mut self, rows: &[ReportRow], log: &mut PostLog) -> Result<PublishSummary> {
        let eligible = select_eligible(rows, log);
        let batch_size = self.config.batch_size;
        let mut summary = PublishSummary {
            eligible: eligible.len(),
            deferred: eligible.len().saturating_sub(batch_size),
            ..Default::default()
        };

        info!(
            "{} report rows, {} already posted, {} eligible (batch size {})",
            rows.len(),
            log.len(),
            eligible.len(),
            batch_size
        );
        if eligible.is_empty() {
            info!("Nothing new to publish");
            return Ok(summary);
        }

        if let Some(header) = self.config.header.clone().filter(|h| !h.trim().is_empty()) {
            self.announce(&header).await;
        }

        for (id, row) in eligible.into_iter().take(batch_size) {
            let link = self.product_link(row);
            let photo = row
                .image_url()
                .and_then(|image| Some((image, format_caption(row, &self.config.labels, &link, CAPTION_LIMIT)?)));
            let outcome = match photo {
                Some((image, caption)) => {
                    self.send(Outgoing::Photo {
                        url: image,
                        caption: &caption,
                    })
                    .await
                }
                // No image, or a caption too long for a photo
                None => match format_caption(row, &self.config.labels, &link, TEXT_LIMIT) {
                    Some(text) => self.send(Outgoing::Text(&text)).await,
                    None => {
                        summary.failed += 1;
                        warn!("Skipping {} ({}): link does not fit in a message", row.sku, id);
                        continue;
                    }
                },
            };

            match outcome {
                Ok(()) => {
                    log.record(&id);
                    log.save()?;
                    summary.sent += 1;
                    info!("Posted {} ({})", row.sku, id);
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!("Failed to post {} ({}): {}", row.sku, id, e);
                }
            }
        }

        if let Some(footer) = self.config.footer.clone().filter(|f| !f.trim().is_empty()) {
            self.announce(&footer.replace("{sent}", &summary.sent.to_string())).await;
        }

        info!(
            "Publish finished: {} sent, {} failed, {} deferred to a later run",
            summary.sent, summary.failed, summary.deferred
        );
        Ok(summary)
    }

    /// Send the digest of the first `digest_limit` rows; the post log is not touched
    pub async fn publish_digest(&mut self, rows: &[ReportRow]) -> Result<usize> {
        if rows.is_empty() {
            info!("Report is empty; no digest sent");
            return Ok(0);
        }

        let digest = build_digest(rows, &self.config);
        let chunks = chunk_text(&digest, DIGEST_CHUNK_CHARS);
        let mut sent = 0;

        for (index, chunk) in chunks.iter().enumerate() {
            match self.send(Outgoing::Text(chunk)).await {
                Ok(()) => sent += 1,
                Err(e) => warn!("Digest part {}/{} failed: {}", index + 1, chunks.len(), e),
            }
        }

        if sent < chunks.len() {
            anyhow::bail!("Digest delivery incomplete: {} of {} parts sent", sent, chunks.len());
        }
        info!("Digest sent in {} part(s)", sent);
        Ok(sent)
    }

    async fn announce(&mut self, text: &str) {
        if let Err(e) = self.send(Outgoing::Text(text)).await {
            warn!("Announcement failed: {}", e);
        }
    }

    fn product_link(&self, row: &ReportRow) -> String {
        match &self.links {
            Some(links) => LinkBuilder::new(links).link_for(&row.name, &row.url),
            None => row.url.clone(),
        }
    }

    /// Paced send; a flood-wait is honoured once and the message retried
    async fn send(&mut self, message: Outgoing<'_>) -> Result<(), ChannelError> {
        self.pacer.ready().await;
        let Err(e) = self.dispatch(message).await else {
            return Ok(());
        };
        let Some(wait) = e.retry_after() else {
            return Err(e);
        };

        warn!("Flood control, waiting {:?} before retrying", wait);
        self.pacer.pause(wait).await;
        self.pacer.ready().await;
        self.dispatch(message).await
    }

    async fn dispatch(&self, message: Outgoing<'_>) -> Result<(), ChannelError> {
        match message {
            Outgoing::Text(text) => self.channel.send_text(text).await,
            Outgoing::Photo { url, caption } => self.channel.send_photo(url, caption).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(url: &str, sku: &str) -> ReportRow {
        ReportRow {
            sku: sku.to_string(),
            name: "n".to_string(),
            price: Some(1.0),
            commission_rate: 10.0,
            estimated_commission: 0.1,
            url: url.to_string(),
            image: None,
        }
    }

    #[test]
    fn test_select_eligible_skips_logged_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = PostLog::load(&dir.path().join("log.json")).unwrap();
        log.record("https://x/a");

        let rows = vec![
            row("https://x/a", "A"),
            row("https://x/b", "B"),
            row("https://x/b/", "B2"),
            row("", "TRM-C"),
        ];

        let ids: Vec<String> = select_eligible(&rows, &log).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, ["https://x/b", "TRM-C"]);
    }
}
