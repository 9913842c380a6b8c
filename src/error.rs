//! Error types for the fetch layer
//!
//! None of these are raised to callers of [`crate::Fetcher::make`]; they surface in
//! [`crate::FetchOutcome`] and in log output.

use thiserror::Error;

/// The request could not be mapped to an endpoint
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// No request name was given
    #[error("Empty request identifier")]
    EmptyRequest,

    /// The name is not present in the endpoint registry
    #[error("Unknown request: '{0}'")]
    UnknownRequest(String),

    /// A caller-supplied endpoint is missing its path or has a bad verb
    #[error("Invalid custom endpoint: {0}")]
    InvalidCustomEndpoint(String),
}

/// The remote call failed
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection, timeout, body decoding)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Failure raised by a non-HTTP transport implementation
    #[error("Transport failure: {0}")]
    Other(String),
}

/// A cache backend lookup or write failed
#[derive(Debug, Error)]
pub enum BackendError {
    /// Filesystem operation failed
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Stored entry could not be encoded or decoded
    #[error("Cache entry serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A thread panicked while holding the store lock
    #[error("Cache store lock poisoned")]
    Poisoned,
}

/// The orchestrator could not be constructed
#[derive(Debug, Error)]
pub enum SetupError {
    /// No platform cache directory is available and none was configured
    #[error("Could not determine a cache directory")]
    NoCacheDir,

    /// HTTP client construction failed
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Reading a registry file failed
    #[error("Failed to read endpoint registry: {0}")]
    Io(#[from] std::io::Error),

    /// Registry file is not valid JSON or has invalid entries
    #[error("Failed to parse endpoint registry: {0}")]
    RegistryParse(#[from] serde_json::Error),

    /// Registry parsed but contains unusable entries
    #[error("Invalid endpoint registry: {0}")]
    InvalidRegistry(String),

    /// Cache capacity must be at least one entry
    #[error("Cache capacity must be greater than zero")]
    ZeroCapacity,
}
