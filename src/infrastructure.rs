//! Infrastructure layer for HTTP, HTML parsing, flat files and the Telegram channel
//!
//! This module provides the concrete implementations behind the domain seams,
//! plus configuration loading and logging setup.

pub mod config; // Layered configuration (defaults, file, environment)
pub mod csv_store; // BOM-aware CSV tables with atomic replace
pub mod http_client; // reqwest-backed page fetcher
pub mod logging; // Logging infrastructure
pub mod pacer; // Fixed-interval request scheduler
pub mod parsing; // Selector strategies and pagination
pub mod parsing_error;
pub mod post_log; // Delivered-identifier log
pub mod telegram; // Telegram Bot API channel

// Re-export commonly used items
pub use config::{ConfigError, PipelineConfig};
pub use csv_store::CsvOptions;
pub use http_client::{HttpClient, HttpClientConfig};
pub use logging::init_logging_with_config;
pub use pacer::{Pacer, PacerClock};
pub use parsing::{ParsingConfig, ProductListParser};
pub use parsing_error::{ParsingError, ParsingResult};
pub use post_log::PostLog;
pub use telegram::{TelegramChannel, TelegramConfig};
