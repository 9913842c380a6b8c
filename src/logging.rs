//! Logging setup
//!
//! Installs a `tracing` subscriber writing to stderr. `RUST_LOG` takes precedence;
//! otherwise development builds log this crate at `debug` and production builds
//! only log errors, which keeps cache and transport diagnostics out of production
//! output.

use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Environment;

/// Default filter directive for an environment
pub fn default_directive(environment: Environment) -> &'static str {
    if environment.is_production() {
        "warmfetch=error"
    } else {
        "warmfetch=debug"
    }
}

/// Installs the global subscriber
///
/// Returns an error if a global subscriber is already set.
pub fn init_logging(environment: Environment) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(environment)));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_by_environment() {
        assert_eq!(default_directive(Environment::Development), "warmfetch=debug");
        assert_eq!(default_directive(Environment::Production), "warmfetch=error");
    }
}
