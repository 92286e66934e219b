//! srep - school survey reporting tool
//!
//! Startup order: `.env`, command line, tracing, config file, command.

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

use srep_cli::{load_config, run, Cli};

const DEFAULT_LOG_LEVEL: &str = "info";

type FilterHandle = reload::Handle<EnvFilter, Registry>;

fn main() -> Result<()> {
    // Missing .env is fine; variables may come from the real environment
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let filter_handle = init_tracing(cli.log_level.as_deref())?;

    info!("Starting srep v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_deref())?;

    // Config file level applies only when neither RUST_LOG nor --log-level is set
    if let Some(handle) = filter_handle {
        let filter = EnvFilter::try_new(&config.logging.level)
            .with_context(|| format!("Invalid log level in config: {}", config.logging.level))?;
        handle.reload(filter).context("Failed to apply log level")?;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(&cli, &config, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Install the stderr subscriber
///
/// Returns a reload handle when the level may still come from the config file.
fn init_tracing(cli_level: Option<&str>) -> Result<Option<FilterHandle>> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(io::stderr))
            .init();
        return Ok(None);
    }

    let level = cli_level.unwrap_or(DEFAULT_LOG_LEVEL);
    let filter =
        EnvFilter::try_new(level).with_context(|| format!("Invalid log level: {}", level))?;
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    Ok(cli_level.is_none().then_some(handle))
}
