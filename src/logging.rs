//! Structured logging via `tracing`

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::error::{BriefError, Result};

/// Build the filter: `RUST_LOG` when set, otherwise `level`
pub fn env_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).map_err(|e| BriefError::InvalidConfig {
            message: format!("invalid log level {:?}: {}", level, e),
        }),
    }
}

/// Install the global subscriber, writing human-readable lines to stderr
///
/// Calling this more than once is harmless; later calls keep the first
/// subscriber.
pub fn init(level: &str) -> Result<()> {
    let filter = env_filter(level)?;
    let layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    let _ = Registry::default().with(filter).with(layer).try_init();
    Ok(())
}
