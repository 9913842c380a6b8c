//! Fetch orchestrator
//!
//! [`Fetcher`] resolves a logical request to an endpoint, decides whether the
//! answer can come from the cache, performs the remote call otherwise, and writes
//! the result back under the right fingerprint.
//!
//! # Cache modes
//! - *plain cache* (`allow_cache`): keyed by request and query; the body is ignored.
//! - *data cache* (`allow_data_cache`): keyed by request, query and body.
//! - *rebuild* (`rebuild_cache`): skips the lookup, always calls the remote and
//!   writes the result as if both modes were enabled.
//!
//! Nothing here raises to the caller. Every failure becomes a [`FetchOutcome`]
//! variant, and [`Fetcher::make`] collapses that to `Option<Value>`.

use futures::future::join_all;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{CacheBackend, CacheEntry, DiskCache, MemoryCache};
use crate::config::{FetchConfig, Role};
use crate::endpoints::{EndpointRegistry, LogicalRequest, Method};
use crate::error::{ResolveError, SetupError, TransportError};
use crate::fingerprint::{build_key, CacheKey};
use crate::transport::{HttpTransport, Transport};

/// Caching flags for a single fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
    pub allow_cache: bool,
    pub allow_data_cache: bool,
    pub rebuild_cache: bool,
}

impl CachePolicy {
    /// No cache reads or writes
    pub fn none() -> Self {
        Self::default()
    }

    /// Plain cache keyed by request and query
    pub fn cached() -> Self {
        Self {
            allow_cache: true,
            ..Self::default()
        }
    }

    /// Data cache keyed by request, query and body
    pub fn data_cached() -> Self {
        Self {
            allow_data_cache: true,
            ..Self::default()
        }
    }

    /// Forced refresh used by the warm-cache loop
    pub fn rebuild() -> Self {
        Self {
            allow_cache: true,
            allow_data_cache: false,
            rebuild_cache: true,
        }
    }

    /// Flags that govern the write after a successful remote call
    fn write_modes(&self) -> (bool, bool) {
        if self.rebuild_cache {
            (true, true)
        } else {
            (self.allow_cache, self.allow_data_cache)
        }
    }
}

/// A request as issued by a caller
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub request: LogicalRequest,
    /// Raw query string appended verbatim to the path, e.g. `?start=2008`
    pub query: Option<String>,
    /// Body for POST/PUT; also part of the data-cache fingerprint
    pub body: Option<Value>,
    pub policy: CachePolicy,
}

impl FetchRequest {
    pub fn new(request: LogicalRequest) -> Self {
        Self {
            request,
            query: None,
            body: None,
            policy: CachePolicy::none(),
        }
    }

    /// A request for a registry entry
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(LogicalRequest::named(name))
    }

    /// A request for a caller-supplied endpoint
    pub fn custom(path: impl Into<String>, method: Method) -> Self {
        Self::new(LogicalRequest::custom(path, method))
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn allow_cache(mut self) -> Self {
        self.policy.allow_cache = true;
        self
    }

    pub fn allow_data_cache(mut self) -> Self {
        self.policy.allow_data_cache = true;
        self
    }

    pub fn rebuild_cache(mut self) -> Self {
        self.policy.rebuild_cache = true;
        self
    }

    /// Key for plain-cache reads and writes
    pub fn plain_key(&self) -> CacheKey {
        build_key::<Value>(&self.request.identifier(), self.query.as_deref(), None).key
    }

    /// Key for data-cache reads and writes
    ///
    /// Falls back to the plain key when the body cannot be encoded.
    pub fn data_key(&self) -> CacheKey {
        let fingerprint = build_key(
            &self.request.identifier(),
            self.query.as_deref(),
            self.body.as_ref(),
        );
        if let Some(e) = fingerprint.body_error {
            warn!(request = %self.request, error = %e, "body excluded from cache key");
        }
        fingerprint.key
    }

    /// Path plus query, as sent to the transport
    fn remote_path(&self, endpoint_path: &str) -> String {
        match self.query.as_deref().map(str::trim) {
            Some(query) => format!("{}{}", endpoint_path, query),
            None => endpoint_path.to_string(),
        }
    }
}

/// Per-entry parameters for [`Fetcher::fetch_many`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchItem {
    pub query: Option<String>,
    pub data: Option<Value>,
}

/// How a fetch ended
#[derive(Debug)]
pub enum FetchOutcome {
    /// Served from the cache without a remote call
    Cached(Value),
    /// Fetched from the remote
    Fetched(Value),
    /// The request did not map to an endpoint; nothing was attempted
    Unresolved(ResolveError),
    /// The remote call failed
    Failed(TransportError),
}

impl FetchOutcome {
    pub fn payload(&self) -> Option<&Value> {
        match self {
            FetchOutcome::Cached(payload) | FetchOutcome::Fetched(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn into_payload(self) -> Option<Value> {
        match self {
            FetchOutcome::Cached(payload) | FetchOutcome::Fetched(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn is_cache_hit(&self) -> bool {
        matches!(self, FetchOutcome::Cached(_))
    }

    pub fn is_success(&self) -> bool {
        self.payload().is_some()
    }
}

/// The fetch-and-cache orchestrator
///
/// Built once at startup and shared (typically behind an `Arc`) by every call site.
/// The backend it holds is never replaced.
pub struct Fetcher {
    role: Role,
    registry: EndpointRegistry,
    cache: Arc<dyn CacheBackend>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("role", &self.role)
            .field("endpoints", &self.registry.len())
            .field("cache", &self.cache.name())
            .finish()
    }
}

impl Fetcher {
    pub fn new(
        role: Role,
        registry: EndpointRegistry,
        cache: Arc<dyn CacheBackend>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            role,
            registry,
            cache,
            transport,
        }
    }

    /// Builds a fetcher with the backend that matches `role`
    ///
    /// Server role gets an in-memory LRU store; client role gets a disk store in
    /// `config.cache_dir` or the platform cache directory.
    pub fn from_config(
        config: &FetchConfig,
        role: Role,
        registry: EndpointRegistry,
    ) -> Result<Self, SetupError> {
        let cache: Arc<dyn CacheBackend> = match role {
            Role::Server => Arc::new(MemoryCache::new(config.cache_capacity, config.cache_ttl)?),
            Role::Client => match &config.cache_dir {
                Some(dir) => Arc::new(DiskCache::with_dir(
                    dir.clone(),
                    config.cache_capacity,
                    config.cache_ttl,
                )?),
                None => Arc::new(DiskCache::new(config.cache_capacity, config.cache_ttl)?),
            },
        };
        let transport = HttpTransport::new(config.resolved_base_url(), config.request_timeout)?;

        info!(
            role = %role,
            base_url = config.resolved_base_url(),
            cache = cache.name(),
            "fetcher initialized"
        );

        Ok(Self::new(role, registry, cache, Arc::new(transport)))
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<dyn CacheBackend> {
        &self.cache
    }

    /// Runs one request through the resolve / lookup / call / store chain
    pub async fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        let endpoint = match self.registry.resolve(&request.request) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                warn!(request = %request.request, error = %e, "quitting unresolved request");
                return FetchOutcome::Unresolved(e);
            }
        };
        debug!(request = %request.request, "processing request");

        let policy = request.policy;
        if policy.rebuild_cache {
            info!(request = %request.request, "(re)building cache");
        } else {
            let lookup_key = if policy.allow_data_cache {
                Some(request.data_key())
            } else if policy.allow_cache {
                Some(request.plain_key())
            } else {
                None
            };
            if let Some(key) = lookup_key {
                if let Some(payload) = self.lookup(&key).await {
                    debug!(request = %request.request, key = %key, "cache hit");
                    return FetchOutcome::Cached(payload);
                }
            }
        }

        let path = request.remote_path(&endpoint.path);
        let body = request
            .body
            .as_ref()
            .filter(|_| endpoint.method.sends_body());
        debug!(method = %endpoint.method, path = %path, "calling remote");

        let payload = match self.transport.send(endpoint.method, &path, body).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(method = %endpoint.method, path = %path, error = %e, "remote call failed");
                return FetchOutcome::Failed(e);
            }
        };

        let (allow_cache, allow_data_cache) = policy.write_modes();
        let write_key = if allow_data_cache {
            Some(request.data_key())
        } else if allow_cache {
            Some(request.plain_key())
        } else {
            None
        };
        if let Some(key) = write_key {
            self.store(&key, CacheEntry::new(payload.clone())).await;
        }

        FetchOutcome::Fetched(payload)
    }

    /// Best-effort variant of [`Fetcher::fetch`] returning only the payload
    pub async fn make(&self, request: &FetchRequest) -> Option<Value> {
        let outcome = self.fetch(request).await;
        if !outcome.is_success() {
            debug!(request = %request.request, "no response");
        }
        outcome.into_payload()
    }

    /// Fetches every named request concurrently under one policy
    ///
    /// Waits for all of them; a failing entry never affects the others.
    pub async fn fetch_many(
        &self,
        batch: &BTreeMap<String, BatchItem>,
        policy: CachePolicy,
    ) -> BTreeMap<String, FetchOutcome> {
        let requests: Vec<(String, FetchRequest)> = batch
            .iter()
            .map(|(name, item)| {
                let request = FetchRequest {
                    request: LogicalRequest::named(name.clone()),
                    query: item.query.clone(),
                    body: item.data.clone(),
                    policy,
                };
                (name.clone(), request)
            })
            .collect();

        let outcomes = join_all(requests.iter().map(|(_, request)| self.fetch(request))).await;

        requests
            .into_iter()
            .map(|(name, _)| name)
            .zip(outcomes)
            .collect()
    }

    /// Drops both the plain and the data-cache entry for a request
    pub async fn invalidate(&self, request: &FetchRequest) {
        for key in [request.plain_key(), request.data_key()] {
            if let Err(e) = self.cache.remove(&key).await {
                warn!(key = %key, error = %e, "cache remove failed");
            }
        }
    }

    /// Reads a fresh payload; backend failures count as a miss
    async fn lookup(&self, key: &CacheKey) -> Option<Value> {
        match self.cache.has(key).await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                warn!(key = %key, backend = self.cache.name(), error = %e, "cache lookup failed");
                return None;
            }
        }
        match self.cache.get(key).await {
            Ok(entry) => entry.map(|entry| entry.payload),
            Err(e) => {
                warn!(key = %key, backend = self.cache.name(), error = %e, "cache read failed");
                None
            }
        }
    }

    /// Writes an entry; failures are logged and dropped
    async fn store(&self, key: &CacheKey, entry: CacheEntry) {
        if let Err(e) = self.cache.set(key, entry).await {
            warn!(key = %key, backend = self.cache.name(), error = %e, "cache write failed");
        }
    }
}
