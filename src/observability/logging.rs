//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Pick the log level from config, the debug flag, or `RUST_LOG`
//!
//! # Design Decisions
//! - `RUST_LOG` wins over configuration when set
//! - The debug flag raises this crate to `debug`; dependencies stay at the configured level

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Filter directives used when `RUST_LOG` is not set.
pub fn default_directives(config: &ObservabilityConfig, debug: bool) -> String {
    let crate_level = if debug { "debug" } else { config.log_level.as_str() };
    format!("{},tcp_path_router={}", config.log_level, crate_level)
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &ObservabilityConfig, debug: bool) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config, debug)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_raises_crate_level_only() {
        let config = ObservabilityConfig::default();
        assert_eq!(default_directives(&config, false), "info,tcp_path_router=info");
        assert_eq!(default_directives(&config, true), "info,tcp_path_router=debug");
    }
}
