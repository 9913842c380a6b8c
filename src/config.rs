//! Runtime configuration
//!
//! Defaults mirror the deployed API: a 25 second request timeout, a 30 minute
//! cache lifetime shared by both backends and the warm-cache interval, and a
//! 1000-entry capacity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// API base URL used in development
pub const DEV_API_URL: &str = "http://localhost:3001/";

/// API base URL used in production
pub const PRODUCTION_API_URL: &str = "https://api.your-website.com/api/";

/// Timeout applied to every remote call
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(25_000);

/// Interval between warm-cache cycles; also the cache entry lifetime
pub const WARM_CACHE_REFRESH: Duration = Duration::from_secs(30 * 60);

/// Maximum number of entries held by a backend
pub const CACHE_CAPACITY: usize = 1000;

/// Requests kept warm by default
pub const DEFAULT_WARM_CACHE: &[&str] = &["GET_TEST1"];

/// Deployment environment, controlling the default base URL and log verbosity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Environment::Development => DEV_API_URL,
            Environment::Production => PRODUCTION_API_URL,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Production => f.write_str("production"),
        }
    }
}

/// Which side of the deployment the fetcher runs on
///
/// The server role keeps an in-memory cache and runs the warm-cache loop; the
/// client role persists entries to disk and never warms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Server,
    Client,
}

impl Role {
    pub fn runs_warm_cache(&self) -> bool {
        matches!(self, Role::Server)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "server" => Ok(Role::Server),
            "client" => Ok(Role::Client),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Server => f.write_str("server"),
            Role::Client => f.write_str("client"),
        }
    }
}

/// Settings for building a [`crate::Fetcher`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub environment: Environment,
    /// Overrides the environment's base URL when non-blank
    pub base_url: Option<String>,
    pub request_timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    /// Registry names refreshed by the warm-cache loop
    pub warm_cache: Vec<String>,
    pub warm_interval: Duration,
    /// Location of the persistent store; platform cache dir when unset
    pub cache_dir: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            base_url: None,
            request_timeout: REQUEST_TIMEOUT,
            cache_ttl: WARM_CACHE_REFRESH,
            cache_capacity: CACHE_CAPACITY,
            warm_cache: DEFAULT_WARM_CACHE.iter().map(|s| s.to_string()).collect(),
            warm_interval: WARM_CACHE_REFRESH,
            cache_dir: None,
        }
    }
}

impl FetchConfig {
    /// Creates the default configuration for an environment
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            ..Default::default()
        }
    }

    /// The base URL remote paths are joined to
    pub fn resolved_base_url(&self) -> &str {
        match self.base_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url,
            _ => self.environment.default_base_url(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.request_timeout, Duration::from_millis(25_000));
        assert_eq!(config.cache_ttl, Duration::from_secs(1800));
        assert_eq!(config.warm_interval, Duration::from_secs(1800));
        assert_eq!(config.cache_capacity, 1000);
        assert_eq!(config.warm_cache, vec!["GET_TEST1".to_string()]);
        assert_eq!(config.resolved_base_url(), DEV_API_URL);
    }

    #[test]
    fn test_production_base_url() {
        let config = FetchConfig::for_environment(Environment::Production);
        assert_eq!(config.resolved_base_url(), PRODUCTION_API_URL);
    }

    #[test]
    fn test_explicit_base_url_wins_unless_blank() {
        let mut config = FetchConfig {
            base_url: Some("http://127.0.0.1:9000/".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolved_base_url(), "http://127.0.0.1:9000/");

        config.base_url = Some("   ".to_string());
        assert_eq!(config.resolved_base_url(), DEV_API_URL);
    }

    #[test]
    fn test_parse_environment_and_role() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("Development".parse::<Environment>().unwrap(), Environment::Development);
        assert!("staging".parse::<Environment>().is_err());

        assert_eq!("server".parse::<Role>().unwrap(), Role::Server);
        assert_eq!(" CLIENT ".parse::<Role>().unwrap(), Role::Client);
        assert!("browser".parse::<Role>().is_err());
    }

    #[test]
    fn test_only_server_role_warms() {
        assert!(Role::Server.runs_warm_cache());
        assert!(!Role::Client.runs_warm_cache());
    }
}
