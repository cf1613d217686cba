//! Service seams between the pipeline and the outside world
//!
//! The collector only needs "give me the body of this URL" and the publisher only
//! needs "deliver this text / photo". Keeping those as traits lets the tests swap in
//! in-memory fakes.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP request failed with status {status}: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to fetch URL {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Failed to read response body from {url}: {message}")]
    Body { url: String, message: String },
}

/// Fetches listing pages
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Return the body of a 2xx response; anything else is an error
    async fn fetch_page(&self, url: &Url) -> Result<String, FetchError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Flood control: retry after {}s", retry_after.as_secs())]
    FloodWait { retry_after: Duration },

    #[error("Message rejected ({code}): {description}")]
    Rejected { code: i64, description: String },

    #[error("Channel transport error: {message}")]
    Transport { message: String },
}

impl ChannelError {
    /// Server-mandated wait, if this is a flood-control response
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::FloodWait { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Rate-limited message sink
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Send a plain text message
    async fn send_text(&self, text: &str) -> Result<(), ChannelError>;

    /// Send a photo by URL with a caption
    async fn send_photo(&self, photo_url: &str, caption: &str) -> Result<(), ChannelError>;
}
