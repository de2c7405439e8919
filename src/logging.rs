use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Used when `RUST_LOG` is unset or unparsable.
const DEFAULT_FILTER: &str = "sheet_insights=info,tower_http=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init_logging() -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .context("failed to install tracing subscriber")?;

    tracing::debug!("Logging initialized");
    Ok(())
}
