//! warmfetch library
//!
//! A fetch-and-cache layer that deduplicates remote calls by a fingerprint of
//! (endpoint, query, body), with an in-memory or persistent cache backend and a
//! background warm-cache loop.

pub mod cache;
pub mod cli;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod fetcher;
pub mod fingerprint;
pub mod logging;
pub mod transport;
pub mod warm;

pub use cache::{CacheBackend, CacheEntry, DiskCache, MemoryCache};
pub use config::{Environment, FetchConfig, Role};
pub use endpoints::{EndpointDescriptor, EndpointRegistry, LogicalRequest, Method};
pub use error::{BackendError, ResolveError, SetupError, TransportError};
pub use fetcher::{BatchItem, CachePolicy, FetchOutcome, FetchRequest, Fetcher};
pub use fingerprint::{build_key, CacheKey, Fingerprint};
pub use transport::{HttpTransport, Transport};
pub use warm::{WarmCacheConfig, WarmCacheHandle, WarmEvent};
