//! HTTP client for fetching category pages
//!
//! Pacing is not done here: the collector owns the [`Pacer`](super::pacer::Pacer)
//! and calls the fetcher only when a slot is free.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    Client,
    header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::constants::collector::{DEFAULT_REQUEST_TIMEOUT_SECONDS, DEFAULT_USER_AGENT};
use crate::domain::services::{FetchError, PageFetcher};

/// HTTP client configuration for crawling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub follow_redirects: bool,
    pub accept_language: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            follow_redirects: true,
            accept_language: "tr-TR,tr;q=0.9,en;q=0.8".to_string(),
        }
    }
}

pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: &HttpClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language).context("Invalid Accept-Language header")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch_page(&self, url: &Url) -> Result<String, FetchError> {
        tracing::info!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let text = response.text().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        tracing::debug!("Successfully fetched: {} ({} chars)", url, text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_creation() {
        let client = HttpClient::new(&HttpClientConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_user_agent_is_rejected() {
        let config = HttpClientConfig {
            user_agent: "bad\nagent".to_string(),
            ..Default::default()
        };
        assert!(HttpClient::new(&config).is_err());
    }
}
