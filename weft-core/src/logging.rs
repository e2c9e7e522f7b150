//! Tracing subscriber setup
//!
//! The framework emits diagnostics through `tracing`; nothing is printed
//! unless a subscriber is installed. [`init`] wires a stderr subscriber
//! filtered by the `WEFT_LOG` environment variable.

use tracing_subscriber::EnvFilter;

/// Environment variable controlling the diagnostic filter.
pub const ENV_FILTER: &str = "WEFT_LOG";

/// Install a stderr `tracing` subscriber filtered by `WEFT_LOG`, falling
/// back to `info` when the variable is unset or invalid.
///
/// Safe to call more than once; only the first call installs.
pub fn init() {
    let filter = EnvFilter::try_from_env(ENV_FILTER).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
    }
}
