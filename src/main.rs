use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use trm_affiliate::application::{PublishOptions, PublishOutcome, pipeline};
use trm_affiliate::infrastructure::{PipelineConfig, init_logging_with_config};

#[derive(Parser, Debug)]
#[command(name = "trm-affiliate", version, about = "Category scraping, commission report and Telegram posting")]
struct Cli {
    /// Configuration file (TOML/JSON); defaults to config/default.* when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape the categories into the product table
    Collect,
    /// Build the commission report from the product table
    Report,
    /// Post new report rows to Telegram
    Publish {
        /// Send one summary message instead of individual posts
        #[arg(long)]
        digest: bool,
        /// Override the configured number of rows per run
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Write UTM-tagged links for every product
    Links,
    /// Collect, report, link and publish
    Run,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Collect => "collect",
            Self::Report => "report",
            Self::Publish { .. } => "publish",
            Self::Links => "links",
            Self::Run => "run",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match PipelineConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging_with_config(&config.logging) {
        eprintln!("Failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    let span = info_span!("run", id = %Uuid::new_v4(), command = cli.command.name());
    match execute(cli.command, &config).instrument(span).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(command: Command, config: &PipelineConfig) -> Result<()> {
    info!("trm-affiliate {} starting", env!("CARGO_PKG_VERSION"));

    match command {
        Command::Collect => {
            pipeline::run_collect(config).await.context("Collect failed")?;
        }
        Command::Report => {
            pipeline::run_report(config).context("Report failed")?;
        }
        Command::Publish { digest, batch_size } => {
            let outcome = pipeline::run_publish(config, PublishOptions { digest, batch_size })
                .await
                .context("Publish failed")?;
            if let PublishOutcome::Posted(summary) = outcome {
                info!("{} sent, {} failed, {} left for the next run", summary.sent, summary.failed, summary.deferred);
            }
        }
        Command::Links => {
            pipeline::run_links(config).context("Link building failed")?;
        }
        Command::Run => {
            pipeline::run_all(config).await?;
        }
    }

    info!("Done");
    Ok(())
}
