// Logging module for structured logging using the tracing crate

use std::error::Error;

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber for structured logging
///
/// Filtering follows `RUST_LOG` when set, defaulting to `info`. Output goes
/// to stdout for container/cloud-native deployments.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init_subscriber() -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_subscriber_is_callable() {
        // Only the first initialization in the test process can win the
        // global subscriber slot, so both outcomes are acceptable here.
        let _ = init_subscriber();
    }

    #[test]
    fn test_init_subscriber_twice_fails() {
        let _ = init_subscriber();
        assert!(init_subscriber().is_err());
    }
}
