//! Telegram Bot API channel
//!
//! Only `sendMessage` and `sendPhoto` are used. Error responses follow the Bot
//! API contract `{ok, error_code, description, parameters.retry_after}`; a 429
//! becomes [`ChannelError::FloodWait`].

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::domain::constants::publisher::DEFAULT_FLOOD_WAIT_SECONDS;
use crate::domain::services::{ChannelError, MessageChannel};

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    /// Numeric id or `@channelname`
    pub chat_id: Option<String>,
    pub api_base: String,
    pub parse_mode: String,
    pub disable_web_page_preview: bool,
    pub timeout_seconds: u64,
    /// Wait applied when a 429 response carries no `retry_after`
    pub flood_wait_default_seconds: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: "https://api.telegram.org".to_string(),
            parse_mode: "HTML".to_string(),
            disable_web_page_preview: false,
            timeout_seconds: 30,
            flood_wait_default_seconds: DEFAULT_FLOOD_WAIT_SECONDS,
        }
    }
}

// The token never goes to the logs
impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .field("parse_mode", &self.parse_mode)
            .field("disable_web_page_preview", &self.disable_web_page_preview)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("flood_wait_default_seconds", &self.flood_wait_default_seconds)
            .finish()
    }
}

impl TelegramConfig {
    /// Token and chat id, when both are set and non-blank
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let token = self.bot_token.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let chat_id = self.chat_id.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((token, chat_id))
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

pub struct TelegramChannel {
    client: Client,
    endpoint_base: String,
    chat_id: String,
    parse_mode: String,
    disable_web_page_preview: bool,
    default_flood_wait: Duration,
}

impl TelegramChannel {
    /// Channel for the configured chat, or `None` when credentials are missing
    pub fn from_config(config: &TelegramConfig) -> Result<Option<Self>> {
        let Some((token, chat_id)) = config.credentials() else {
            return Ok(None);
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create Telegram HTTP client")?;

        Ok(Some(Self {
            client,
            endpoint_base: format!("{}/bot{}", config.api_base.trim_end_matches('/'), token),
            chat_id: chat_id.to_string(),
            parse_mode: config.parse_mode.clone(),
            disable_web_page_preview: config.disable_web_page_preview,
            default_flood_wait: Duration::from_secs(config.flood_wait_default_seconds),
        }))
    }

    async fn call(&self, method: &str, payload: serde_json::Value) -> Result<(), ChannelError> {
        debug!("Telegram {} to {}", method, self.chat_id);

        let response = self
            .client
            .post(format!("{}/{}", self.endpoint_base, method))
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;
        interpret_response(status, &body, self.default_flood_wait)
    }
}

/// Strip the URL, which carries the bot token, before the error is displayed
fn transport_error(e: reqwest::Error) -> ChannelError {
    ChannelError::Transport {
        message: e.without_url().to_string(),
    }
}

/// Map a Bot API response to the channel contract
pub fn interpret_response(status: u16, body: &str, default_flood_wait: Duration) -> Result<(), ChannelError> {
    let parsed = serde_json::from_str::<ApiResponse>(body).ok();

    if let Some(response) = &parsed {
        if response.ok && (200..300).contains(&status) {
            return Ok(());
        }
    }

    let error_code = parsed
        .as_ref()
        .and_then(|r| r.error_code)
        .unwrap_or_else(|| i64::from(status));

    if status == 429 || error_code == 429 {
        let retry_after = parsed
            .as_ref()
            .and_then(|r| r.parameters.as_ref())
            .and_then(|p| p.retry_after)
            .map_or(default_flood_wait, Duration::from_secs);
        return Err(ChannelError::FloodWait { retry_after });
    }

    match parsed {
        Some(response) => Err(ChannelError::Rejected {
            code: error_code,
            description: response.description.unwrap_or_else(|| "no description".to_string()),
        }),
        None if (200..300).contains(&status) => Err(ChannelError::Transport {
            message: "unexpected non-JSON response".to_string(),
        }),
        None => Err(ChannelError::Rejected {
            code: error_code,
            description: body.chars().take(200).collect(),
        }),
    }
}

#[async_trait]
impl MessageChannel for TelegramChannel {
    async fn send_text(&self, text: &str) -> Result<(), ChannelError> {
        self.call(
            "sendMessage",
            json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": self.parse_mode,
                "disable_web_page_preview": self.disable_web_page_preview,
            }),
        )
        .await
    }

    async fn send_photo(&self, photo_url: &str, caption: &str) -> Result<(), ChannelError> {
        self.call(
            "sendPhoto",
            json!({
                "chat_id": self.chat_id,
                "photo": photo_url,
                "caption": caption,
                "parse_mode": self.parse_mode,
            }),
        )
        .await
    }
}
