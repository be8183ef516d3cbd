//! Logging and tracing setup.
//!
//! All logs are written to **stderr**; stdout belongs to the host that spawned
//! the provider. Filtering follows `RUST_LOG`.
//!
//! ```bash
//! # Log every GraphQL operation the provider sends
//! RUST_LOG=hemmer_provider_humio=debug ./my-provider
//! ```
//!
//! API tokens never reach the logs: requests are logged by operation name
//! only, and the configured token is kept out of every `Debug` output.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn try_init_with(default_level: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
}

/// Initialize the default logging subscriber at `info` level.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Initialize logging with a custom default level, used when `RUST_LOG` is unset.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    if let Err(e) = try_init_with(default_level) {
        panic!("failed to install tracing subscriber: {}", e);
    }
}

/// Try to initialize logging, returning false if a subscriber was already set.
///
/// Safe to call from every test.
pub fn try_init_logging() -> bool {
    try_init_with("info").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("hemmer_provider_humio=debug").is_ok());
        assert!(EnvFilter::try_new("warn,hemmer_provider_humio::api=trace").is_ok());
    }

    #[test]
    fn test_try_init_is_idempotent() {
        let _ = try_init_logging();
        assert!(!try_init_logging());
    }
}
