//! Logging system configuration and initialization
//!
//! This module provides the logging setup for the pipeline:
//! - Console and/or file output, plain or JSON
//! - Existing log file rotated with a timestamp on start-up
//! - Old log files pruned beyond `max_files`
//! - Timestamps rendered at a fixed UTC offset (Istanbul by default)

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use chrono::{FixedOffset, Offset, Utc};
use lazy_static::lazy_static;
use tracing::{Subscriber, info, warn};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

// Global guard to keep the log file writer alive
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> = Mutex::new(Vec::new());
}

/// Renders timestamps at a fixed UTC offset
#[derive(Clone, Copy)]
struct OffsetTimeFormatter {
    offset: FixedOffset,
}

impl OffsetTimeFormatter {
    fn new(utc_offset_hours: i32) -> Self {
        Self {
            offset: fixed_offset(utc_offset_hours),
        }
    }
}

impl FormatTime for OffsetTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        let local = Utc::now().with_timezone(&self.offset);
        write!(w, "{}", local.format("%Y-%m-%d %H:%M:%S%.3f %:z"))
    }
}

fn fixed_offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}

/// Rotate existing log file by renaming it with timestamp
fn rotate_existing_log_file(log_dir: &Path, log_file_name: &str, utc_offset_hours: i32) -> Result<()> {
    let log_file_path = log_dir.join(log_file_name);
    if !log_file_path.exists() {
        return Ok(());
    }

    let metadata = std::fs::metadata(&log_file_path)
        .map_err(|e| anyhow!("Failed to get log file metadata: {}", e))?;
    let file_time = metadata
        .modified()
        .or_else(|_| metadata.created())
        .unwrap_or_else(|_| std::time::SystemTime::now());

    let datetime: chrono::DateTime<Utc> = file_time.into();
    let local = datetime.with_timezone(&fixed_offset(utc_offset_hours));

    let file_stem = log_file_name.trim_end_matches(".log");
    let timestamped_name = format!("{}.{}.log", file_stem, local.format("%Y%m%dT%H%M%S"));
    let timestamped_path = log_dir.join(&timestamped_name);

    std::fs::rename(&log_file_path, &timestamped_path).map_err(|e| {
        anyhow!(
            "Failed to rotate log file {} to {}: {}",
            log_file_path.display(),
            timestamped_path.display(),
            e
        )
    })?;

    Ok(())
}

/// Filter directives: `RUST_LOG` wins, otherwise the configured level with
/// chatty dependencies capped unless tracing is requested
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut directives = vec![config.level.clone()];
    if !config.level.to_lowercase().contains("trace") {
        directives.extend(
            ["reqwest=info", "hyper=warn", "hyper_util=warn", "h2=warn", "rustls=warn", "tokio=info"]
                .iter()
                .map(|d| (*d).to_string()),
        );
        directives.push(format!("trm_affiliate={}", config.level));
    }
    directives.extend(
        config
            .module_filters
            .iter()
            .map(|(module, level)| format!("{module}={level}")),
    );

    EnvFilter::try_new(directives.join(","))
        .map_err(|e| anyhow!("Invalid log filter '{}': {}", directives.join(","), e))
}

/// Stdout layer, boxed so it stacks on either file layer flavour
fn console_layer<S>(enabled: bool, timer: OffsetTimeFormatter) -> Option<Box<dyn Layer<S> + Send + Sync + 'static>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    enabled.then(|| {
        fmt::Layer::new()
            .with_writer(std::io::stdout)
            .with_timer(timer)
            .with_target(false)
            .boxed()
    })
}

fn keep_guard(guard: tracing_appender::non_blocking::WorkerGuard) -> Result<()> {
    LOG_GUARDS
        .lock()
        .map_err(|_| anyhow!("Log guard registry poisoned"))?
        .push(guard);
    Ok(())
}

/// Initialize logging with custom configuration
///
/// `RUST_LOG` overrides the configured level entirely:
/// ```bash
/// RUST_LOG="debug,reqwest=debug" trm-affiliate collect
/// ```
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_env_filter(config)?;
    let registry = Registry::default().with(env_filter);
    let timer = OffsetTimeFormatter::new(config.utc_offset_hours);

    if config.file_output {
        std::fs::create_dir_all(&config.log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", config.log_dir, e))?;
        rotate_existing_log_file(&config.log_dir, &config.file_name, config.utc_offset_hours)?;
    }

    let init_result = match (config.file_output, config.console_output) {
        (true, console) => {
            let file_appender = rolling::never(&config.log_dir, &config.file_name);
            let (file_writer, file_guard) = non_blocking(file_appender);
            keep_guard(file_guard)?;

            if config.json_format {
                let file_layer = fmt::Layer::new()
                    .json()
                    .with_writer(file_writer)
                    .with_timer(timer)
                    .with_target(true)
                    .with_current_span(true)
                    .with_ansi(false);
                registry
                    .with(file_layer)
                    .with(console_layer(console, timer))
                    .try_init()
            } else {
                let file_layer = fmt::Layer::new()
                    .with_writer(file_writer)
                    .with_timer(timer)
                    .with_target(false)
                    .with_ansi(false);
                registry
                    .with(file_layer)
                    .with(console_layer(console, timer))
                    .try_init()
            }
        }
        (false, true) => registry.with(console_layer(true, timer)).try_init(),
        (false, false) => return Err(anyhow!("No logging output configured")),
    };
    init_result.map_err(|e| anyhow!("Failed to install log subscriber: {}", e))?;

    if config.file_output {
        cleanup_old_logs(&config.log_dir, config.max_files)?;
    }

    info!(
        "Logging initialized (level: {}, json: {}, console: {}, file: {})",
        config.level, config.json_format, config.console_output, config.file_output
    );
    if config.file_output {
        info!("Log file: {:?}", config.log_dir.join(&config.file_name));
    }

    Ok(())
}

/// Log files in `log_dir`, newest first
fn list_log_files(log_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut log_files = Vec::new();

    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_log = path.extension().is_some_and(|ext| ext == "log");
        if !path.is_file() || !is_log {
            continue;
        }
        if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
            log_files.push((path, modified));
        }
    }

    log_files.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
    Ok(log_files.into_iter().map(|(path, _)| path).collect())
}

/// Clean up old log files, keeping the newest `max_files`
fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<usize> {
    if !log_dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for path in list_log_files(log_dir)?.iter().skip(max_files as usize) {
        match std::fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to remove old log file {:?}: {}", path, e),
        }
    }

    if removed > 0 {
        info!("Removed {} old log files (keeping {})", removed, max_files);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.console_output);
        assert!(!config.file_output);
        assert_eq!(config.utc_offset_hours, 3);
    }

    #[test]
    fn test_rotate_existing_log_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("trm-affiliate.log"), "old run\n").unwrap();

        rotate_existing_log_file(dir.path(), "trm-affiliate.log", 3).unwrap();

        assert!(!dir.path().join("trm-affiliate.log").exists());
        let rotated = list_log_files(dir.path()).unwrap();
        assert_eq!(rotated.len(), 1);
        let name = rotated[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("trm-affiliate.2"));
    }

    #[test]
    fn test_rotate_without_existing_file_is_noop() {
        let dir = tempdir().unwrap();
        rotate_existing_log_file(dir.path(), "trm-affiliate.log", 3).unwrap();
        assert!(list_log_files(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_cleanup_old_logs_keeps_max_files() {
        let dir = tempdir().unwrap();
        for i in 0..5 {
            std::fs::write(dir.path().join(format!("run-{i}.log")), "x").unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        let removed = cleanup_old_logs(dir.path(), 2).unwrap();

        assert_eq!(removed, 3);
        assert_eq!(list_log_files(dir.path()).unwrap().len(), 2);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_console_layer_stacks_on_both_file_formats() {
        let timer = OffsetTimeFormatter::new(3);

        let plain = Captured::default();
        let writer = plain.clone();
        let subscriber = Registry::default()
            .with(
                fmt::Layer::new()
                    .with_writer(move || writer.clone())
                    .with_timer(timer)
                    .with_ansi(false),
            )
            .with(console_layer(true, timer));
        tracing::subscriber::with_default(subscriber, || info!("plain line"));
        assert!(plain.text().contains("plain line"));

        let json = Captured::default();
        let writer = json.clone();
        let subscriber = Registry::default()
            .with(
                fmt::Layer::new()
                    .json()
                    .with_writer(move || writer.clone())
                    .with_timer(timer)
                    .with_current_span(true),
            )
            .with(console_layer(false, timer));
        tracing::subscriber::with_default(subscriber, || info!(sku = "TRM-1", "json line"));
        let event: serde_json::Value = serde_json::from_str(json.text().trim()).unwrap();
        assert_eq!(event["fields"]["message"], "json line");
        assert_eq!(event["fields"]["sku"], "TRM-1");
    }

    #[test]
    fn test_fixed_offset_falls_back_to_utc() {
        assert_eq!(fixed_offset(3).local_minus_utc(), 3 * 3600);
        assert_eq!(fixed_offset(99).local_minus_utc(), 0);
    }
}
