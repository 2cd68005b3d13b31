//! Tracing subscriber setup
//!
//! Library code only emits `tracing` events; the embedding application calls
//! [`init_tracing`] once at startup to decide where they go.

use amfe_domain::{AmfeError, LoggingConfig, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Build the event filter: `RUST_LOG` when set, otherwise `config.level`
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|err| {
            AmfeError::Config(format!("invalid logging.level '{}': {}", config.level, err))
        }),
    }
}

/// Install the global subscriber
///
/// # Errors
/// `Config` for an unparsable level; `Internal` if a global subscriber is
/// already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    installed.map_err(|err| AmfeError::Internal(format!("failed to install tracing subscriber: {err}")))
}
