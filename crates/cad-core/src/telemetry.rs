//! Process-wide tracing setup.
//!
//! [`init_tracing`] installs the global subscriber once. Later calls are
//! ignored, since a process can only have one global subscriber.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// `RUST_LOG` takes precedence over `config.level`. Returns whether this
/// call installed the subscriber.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).json().flatten_event(true))
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_ignored() {
        let config = LoggingConfig::default();
        init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
