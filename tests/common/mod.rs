//! In-memory fakes shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use trm_affiliate::domain::services::{ChannelError, FetchError, MessageChannel, PageFetcher};

/// Serves canned pages; unknown URLs are 404s
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, Result<String, FetchError>>,
    requested: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), Ok(body.into()));
        self
    }

    pub fn failing(mut self, url: &str, status: u16) -> Self {
        self.pages.insert(
            url.to_string(),
            Err(FetchError::HttpStatus {
                status,
                url: url.to_string(),
            }),
        );
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch_page(&self, url: &Url) -> Result<String, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        self.pages.get(url.as_str()).cloned().unwrap_or_else(|| {
            Err(FetchError::HttpStatus {
                status: 404,
                url: url.to_string(),
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text(String),
    Photo { url: String, caption: String },
}

impl Sent {
    pub fn body(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Photo { caption, .. } => caption,
        }
    }
}

/// Records every attempt; scripted results are consumed first, then every send succeeds
#[derive(Default)]
pub struct FakeChannel {
    script: Mutex<VecDeque<Result<(), ChannelError>>>,
    attempts: Mutex<Vec<Sent>>,
    delivered: Mutex<Vec<Sent>>,
}

impl FakeChannel {
    pub fn scripted(results: Vec<Result<(), ChannelError>>) -> Self {
        Self {
            script: Mutex::new(results.into()),
            ..Default::default()
        }
    }

    pub fn delivered(&self) -> Vec<Sent> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    fn record(&self, message: Sent) -> Result<(), ChannelError> {
        self.attempts.lock().unwrap().push(message.clone());
        let result = self.script.lock().unwrap().pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            self.delivered.lock().unwrap().push(message);
        }
        result
    }
}

#[async_trait]
impl MessageChannel for FakeChannel {
    async fn send_text(&self, text: &str) -> Result<(), ChannelError> {
        self.record(Sent::Text(text.to_string()))
    }

    async fn send_photo(&self, photo_url: &str, caption: &str) -> Result<(), ChannelError> {
        self.record(Sent::Photo {
            url: photo_url.to_string(),
            caption: caption.to_string(),
        })
    }
}

/// An opencart-style listing page
pub fn listing_page(products: &[(&str, &str, &str)], next: Option<&str>) -> String {
    let cards: String = products
        .iter()
        .map(|(name, price, href)| {
            format!(
                r#"<div class="product-layout"><div class="product-thumb">
                     <div class="caption"><h4><a href="{href}">{name}</a></h4><p class="price">{price}</p></div>
                   </div></div>"#
            )
        })
        .collect();
    let next = next
        .map(|href| format!(r#"<ul class="pagination"><li><a rel="next" href="{href}">&gt;</a></li></ul>"#))
        .unwrap_or_default();

    format!("<html><body><div class=\"row\">{cards}</div>{next}</body></html>")
}
