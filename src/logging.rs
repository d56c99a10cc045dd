//! Logging setup for the command-line tools.
//!
//! Installs a global `tracing` subscriber writing to stderr. `RUST_LOG`
//! takes precedence over the configured level.

use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

use crate::config::Config;

/// Errors that may occur while initializing logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The configured level is not a valid filter directive.
    #[error("Invalid log filter {filter:?}: {source}")]
    InvalidFilter {
        filter: String,
        source: tracing_subscriber::filter::ParseError,
    },
    /// Failed to set the global tracing subscriber.
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Initialize tracing for a binary.
pub fn init(config: &Config) -> Result<(), LoggingError> {
    let env_filter = build_env_filter(config.log_level())?;
    let subscriber = Registry::default()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn build_env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level).map_err(|source| {
            LoggingError::InvalidFilter {
                filter: default_level.to_string(),
                source,
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_level() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert!(build_env_filter("debug").is_ok());
        assert!(build_env_filter("wavscan=trace,warn").is_ok());
        assert!(matches!(
            build_env_filter("wavscan=loudest"),
            Err(LoggingError::InvalidFilter { .. })
        ));
    }
}
