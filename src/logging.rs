//! Tracing subscriber setup shared by all binaries

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the library, the calling binary
/// (`bin_target`, usually `env!("CARGO_CRATE_NAME")`) and HTTP tracing log
/// at the configured level and everything else at `warn`.
pub fn init_tracing(config: &LoggingConfig, bin_target: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("warn")
            .add_directive(format!("bot_detection={}", config.level).parse()?)
            .add_directive(format!("{}={}", bin_target, config.level).parse()?)
            .add_directive(format!("tower_http={}", config.level).parse()?),
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    }
    .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}
