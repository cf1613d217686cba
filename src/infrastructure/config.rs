//! Configuration infrastructure
//!
//! One [`PipelineConfig`] is loaded at start-up and passed by reference to each
//! step. Sources, later ones winning:
//! 1. Built-in defaults
//! 2. Optional config file (`config/default.{toml,json,...}` or `--config FILE`)
//! 3. `TRM_*` environment variables, `__` separating sections
//!    (`TRM_PUBLISHER__BATCH_SIZE=5`)
//!
//! The legacy `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID` variables fill in the
//! Telegram credentials when nothing else set them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::constants::{collector, files, publisher, reporter, site};
use crate::infrastructure::csv_store::CsvOptions;
use crate::infrastructure::http_client::HttpClientConfig;
use crate::infrastructure::parsing::ParsingConfig;
use crate::infrastructure::telegram::TelegramConfig;

const ENV_PREFIX: &str = "TRM";
const LEGACY_TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
const LEGACY_CHAT_VAR: &str = "TELEGRAM_CHAT_ID";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    FileLoad {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

impl ConfigError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub csv: CsvConfig,
    pub http: HttpClientConfig,
    pub collector: CollectorConfig,
    pub commission: CommissionConfig,
    pub publisher: PublisherConfig,
    pub telegram: TelegramConfig,
    pub links: LinksConfig,
    pub logging: LoggingConfig,
}

/// Flat files exchanged between the steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub categories: PathBuf,
    pub products: PathBuf,
    pub report: PathBuf,
    pub links: PathBuf,
    pub post_log: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            categories: PathBuf::from(files::CATEGORIES),
            products: PathBuf::from(files::PRODUCTS_CSV),
            report: PathBuf::from(files::REPORT_CSV),
            links: PathBuf::from(files::LINKS_CSV),
            post_log: PathBuf::from(files::POST_LOG),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    /// Field delimiter for written tables; `;` suits Turkish-locale Excel
    pub delimiter: String,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
        }
    }
}

impl CsvConfig {
    pub fn options(&self) -> CsvOptions {
        CsvOptions {
            delimiter: self.delimiter.bytes().next().unwrap_or(b','),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Spacing between HTTP requests in milliseconds
    pub request_delay_ms: u64,

    /// Hard cap on pages followed per category
    pub max_pages: u32,

    /// Query parameter incremented when a page has no "next" link; empty disables
    pub page_query_param: String,

    pub parsing: ParsingConfig,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: collector::DEFAULT_REQUEST_DELAY_MS,
            max_pages: collector::MAX_PAGES_PER_CATEGORY,
            page_query_param: collector::DEFAULT_PAGE_QUERY_PARAM.to_string(),
            parsing: ParsingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommissionConfig {
    /// Rate in percent when no category override matches
    pub default_rate: f64,

    /// Overrides matched by substring of the product's source category, first match wins
    pub category_rates: Vec<CategoryRate>,
}

impl Default for CommissionConfig {
    fn default() -> Self {
        Self {
            default_rate: reporter::DEFAULT_COMMISSION_RATE,
            category_rates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRate {
    pub pattern: String,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Rows delivered per run
    pub batch_size: usize,

    /// Spacing between messages in milliseconds
    pub message_delay_ms: u64,

    /// Sent before the first row of a batch
    pub header: Option<String>,

    /// Sent after the batch; `{sent}` is replaced by the number of rows delivered
    pub footer: Option<String>,

    pub labels: CaptionLabels,

    /// Tag product links in captions with the `links` UTM parameters
    pub utm_links: bool,

    /// Rows listed in a digest message
    pub digest_limit: usize,

    pub digest_title: String,

    /// Closing line of a digest, typically hashtags
    pub digest_footer: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            batch_size: publisher::DEFAULT_BATCH_SIZE,
            message_delay_ms: publisher::DEFAULT_MESSAGE_DELAY_MS,
            header: None,
            footer: None,
            labels: CaptionLabels::default(),
            utm_links: false,
            digest_limit: publisher::DEFAULT_DIGEST_LIMIT,
            digest_title: "TRM Günlük Ürün Özeti".to_string(),
            digest_footer: "#trendurunler #otopost #trm".to_string(),
        }
    }
}

/// Caption wording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionLabels {
    pub price: String,
    pub commission: String,
    pub earnings: String,
    pub link: String,
    pub currency: String,
}

impl Default for CaptionLabels {
    fn default() -> Self {
        Self {
            price: "Fiyat".to_string(),
            commission: "Komisyon".to_string(),
            earnings: "Tahmini Kazanç".to_string(),
            link: "Ürüne git".to_string(),
            currency: "₺".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// Product URL with UTM parameters appended
    Tag,
    /// Storefront search for the product name
    Search,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    pub mode: LinkMode,
    pub site_base: String,
    pub utm_source: String,
    pub utm_medium: String,
    pub utm_campaign: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            mode: LinkMode::Tag,
            site_base: site::BASE_URL.to_string(),
            utm_source: "telegram".to_string(),
            utm_medium: "bot".to_string(),
            utm_campaign: "trm".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// JSON formatted file logs
    pub json_format: bool,

    pub console_output: bool,

    pub file_output: bool,

    pub log_dir: PathBuf,

    pub file_name: String,

    /// Number of log files to keep (older files will be deleted)
    pub max_files: u32,

    /// Offset applied to log timestamps
    pub utc_offset_hours: i32,

    /// Module-specific log level filters (e.g., "reqwest": "debug")
    pub module_filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            log_dir: PathBuf::from("logs"),
            file_name: "trm-affiliate.log".to_string(),
            max_files: 10,
            utc_offset_hours: 3,
            module_filters: HashMap::new(),
        }
    }
}

impl PipelineConfig {
    /// Load from defaults, the config file and the process environment.
    ///
    /// `path` given explicitly must exist; otherwise `config/default.*` is used
    /// when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::load_with_env(path, &env)
    }

    /// Same as [`load`](Self::load) with an explicit environment
    pub fn load_with_env(path: Option<&Path>, env: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(files::CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(env.clone())),
            )
            .build()?;

        let mut config: Self = settings.try_deserialize()?;
        config.apply_legacy_env(env);
        config.validate()?;
        Ok(config)
    }

    fn apply_legacy_env(&mut self, env: &HashMap<String, String>) {
        let legacy = |key: &str| env.get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if self.telegram.bot_token.as_deref().is_none_or(str::is_empty) {
            self.telegram.bot_token = legacy(LEGACY_TOKEN_VAR);
        }
        if self.telegram.chat_id.as_deref().is_none_or(str::is_empty) {
            self.telegram.chat_id = legacy(LEGACY_CHAT_VAR);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.csv.delimiter.len() != 1 || !self.csv.delimiter.is_ascii() {
            return Err(ConfigError::validation(format!(
                "csv.delimiter must be a single ASCII character, got '{}'",
                self.csv.delimiter
            )));
        }

        if self.http.timeout_seconds == 0 {
            return Err(ConfigError::validation("http.timeout_seconds must be greater than 0"));
        }

        if self.collector.max_pages == 0 {
            return Err(ConfigError::validation("collector.max_pages must be greater than 0"));
        }

        if self.collector.parsing.strategies.is_empty() {
            return Err(ConfigError::validation(
                "collector.parsing.strategies must contain at least one strategy",
            ));
        }

        let rates = std::iter::once(("commission.default_rate", self.commission.default_rate)).chain(
            self.commission
                .category_rates
                .iter()
                .map(|c| ("commission.category_rates", c.rate)),
        );
        for (name, rate) in rates {
            if !(0.0..=100.0).contains(&rate) {
                return Err(ConfigError::validation(format!(
                    "{name} must be between 0 and 100, got {rate}"
                )));
            }
        }

        if self.publisher.batch_size == 0 {
            return Err(ConfigError::validation("publisher.batch_size must be greater than 0"));
        }

        if self.publisher.digest_limit == 0 {
            return Err(ConfigError::validation("publisher.digest_limit must be greater than 0"));
        }

        if url::Url::parse(&self.links.site_base).is_err() {
            return Err(ConfigError::validation(format!(
                "links.site_base is not a valid URL: {}",
                self.links.site_base
            )));
        }

        if !(-12..=14).contains(&self.logging.utc_offset_hours) {
            return Err(ConfigError::validation("logging.utc_offset_hours must be between -12 and 14"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.publisher.batch_size, 20);
        assert_eq!(config.collector.request_delay_ms, 800);
        assert_eq!(config.commission.default_rate, 10.0);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = write_config(
            r#"
            [publisher]
            batch_size = 5
            footer = "Toplam {sent} ürün"

            [[commission.category_rates]]
            pattern = "elektronik"
            rate = 5.0
            "#,
        );

        let config = PipelineConfig::load_with_env(Some(file.path()), &HashMap::new()).unwrap();
        assert_eq!(config.publisher.batch_size, 5);
        assert_eq!(config.publisher.footer.as_deref(), Some("Toplam {sent} ürün"));
        assert_eq!(config.publisher.message_delay_ms, 800);
        assert_eq!(config.commission.category_rates[0].pattern, "elektronik");
    }

    #[test]
    fn test_env_overrides_file() {
        let file = write_config("[publisher]\nbatch_size = 5\n");
        let config = PipelineConfig::load_with_env(
            Some(file.path()),
            &env(&[("TRM_PUBLISHER__BATCH_SIZE", "2"), ("TRM_CSV__DELIMITER", ";")]),
        )
        .unwrap();
        assert_eq!(config.publisher.batch_size, 2);
        assert_eq!(config.csv.options().delimiter, b';');
    }

    #[test]
    fn test_legacy_telegram_variables() {
        let file = write_config("");
        let config = PipelineConfig::load_with_env(
            Some(file.path()),
            &env(&[("TELEGRAM_BOT_TOKEN", "123:abc"), ("TELEGRAM_CHAT_ID", "@trm")]),
        )
        .unwrap();
        assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.telegram.chat_id.as_deref(), Some("@trm"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = PipelineConfig::load_with_env(Some(Path::new("/nonexistent/trm.toml")), &HashMap::new());
        assert!(matches!(result, Err(ConfigError::FileLoad { .. })));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.publisher.batch_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation { .. })));

        let mut config = PipelineConfig::default();
        config.csv.delimiter = ";;".to_string();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.commission.default_rate = 120.0;
        assert!(config.validate().is_err());
    }
}
