//! Command-line interface parsing for warmfetch
//!
//! Global flags describe the deployment (environment, role, base URL, cache
//! directory, endpoint file) and fall back to `WARMFETCH_*` environment variables.
//! The `fetch` subcommand runs one request; `warm` runs the refresh loop.

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::{Environment, FetchConfig, Role};
use crate::endpoints::{EndpointRegistry, Method};
use crate::error::{ResolveError, SetupError};
use crate::fetcher::FetchRequest;
use crate::warm::WarmCacheConfig;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// `--data` is not valid JSON
    #[error("Invalid JSON body: {0}")]
    InvalidData(#[from] serde_json::Error),

    /// Neither a request name nor `--path` was given
    #[error("A request name or --path is required")]
    MissingRequest,

    /// `--method` could not be parsed
    #[error("{0}")]
    InvalidMethod(#[from] ResolveError),
}

/// warmfetch - fingerprinting fetch-and-cache client
#[derive(Parser, Debug)]
#[command(name = "warmfetch")]
#[command(about = "Fetch API endpoints through a fingerprinting cache")]
#[command(version)]
pub struct Cli {
    /// Deployment environment (development or production)
    #[arg(long = "env", env = "WARMFETCH_ENV", default_value = "development", global = true)]
    pub environment: Environment,

    /// Role of this process (server keeps an in-memory cache and warms it,
    /// client persists to disk)
    #[arg(long, env = "WARMFETCH_ROLE", default_value = "server", global = true)]
    pub role: Role,

    /// API base URL; defaults to the environment's URL
    #[arg(long, env = "WARMFETCH_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Directory for the client-role persistent cache
    #[arg(long, env = "WARMFETCH_CACHE_DIR", value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// JSON endpoint registry replacing the built-in table
    #[arg(long, env = "WARMFETCH_ENDPOINTS", value_name = "FILE", global = true)]
    pub endpoints: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a single request and print the payload as JSON
    Fetch(FetchArgs),

    /// Run the warm-cache loop (server role only)
    ///
    /// Examples:
    ///   warmfetch warm                 # refresh forever
    ///   warmfetch warm --cycles 1      # refresh once and exit
    Warm(WarmArgs),
}

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Registry name, e.g. GET_CARS
    pub request: Option<String>,

    /// Query string appended verbatim, e.g. "?start=2008&end=2010"
    #[arg(long)]
    pub query: Option<String>,

    /// JSON body for POST/PUT; also part of the data-cache key
    #[arg(long, value_name = "JSON")]
    pub data: Option<String>,

    /// Read from / write to the plain cache
    #[arg(long)]
    pub allow_cache: bool,

    /// Read from / write to the data cache (keyed by body)
    #[arg(long)]
    pub allow_data_cache: bool,

    /// Skip the cache read and overwrite the entry
    #[arg(long)]
    pub rebuild_cache: bool,

    /// Custom endpoint path, bypassing the registry
    #[arg(long, value_name = "PATH")]
    pub path: Option<String>,

    /// Verb for a custom endpoint (ignored without --path)
    #[arg(long, default_value = "GET")]
    pub method: String,
}

#[derive(Args, Debug, Clone, Default)]
pub struct WarmArgs {
    /// Stop after this many refresh cycles
    #[arg(long)]
    pub cycles: Option<u64>,

    /// Seconds between cycles; defaults to the cache lifetime
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,
}

impl Cli {
    /// Builds the fetcher configuration from the global flags
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            base_url: self.base_url.clone(),
            cache_dir: self.cache_dir.clone(),
            ..FetchConfig::for_environment(self.environment)
        }
    }

    /// Loads the endpoint registry from `--endpoints` or uses the built-in table
    pub fn registry(&self) -> Result<EndpointRegistry, SetupError> {
        match &self.endpoints {
            Some(path) => EndpointRegistry::from_path(path),
            None => Ok(EndpointRegistry::default()),
        }
    }
}

impl FetchArgs {
    /// Converts the arguments into a request
    pub fn to_request(&self) -> Result<FetchRequest, CliError> {
        let mut request = match (&self.path, &self.request) {
            (Some(path), _) => FetchRequest::custom(path.clone(), self.method.parse::<Method>()?),
            (None, Some(name)) => FetchRequest::named(name.clone()),
            (None, None) => return Err(CliError::MissingRequest),
        };

        if let Some(query) = &self.query {
            request = request.query(query.clone());
        }
        if let Some(data) = &self.data {
            request = request.body(serde_json::from_str::<Value>(data)?);
        }
        request.policy.allow_cache = self.allow_cache;
        request.policy.allow_data_cache = self.allow_data_cache;
        request.policy.rebuild_cache = self.rebuild_cache;

        Ok(request)
    }
}

impl WarmArgs {
    pub fn warm_config(&self, config: &FetchConfig) -> WarmCacheConfig {
        let mut warm = WarmCacheConfig::from(config);
        if let Some(secs) = self.interval.filter(|secs| *secs > 0) {
            warm.interval = Duration::from_secs(secs);
        }
        warm
    }
}
