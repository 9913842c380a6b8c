//! Cache key construction
//!
//! A cache key is built from the request identifier, the raw query string and,
//! for data-cache lookups, the request body. Bodies are canonicalized (object keys
//! sorted at every depth) before encoding so that semantically equal bodies always
//! produce the same key. The finished key only contains `[A-Za-z0-9_-]`, which makes
//! it usable as a file name or index key in any backend.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// Separates the request identifier from the query string
pub const QUERY_DELIMITER: &str = "----";

/// Separates the body component from the rest of the key
pub const BODY_DELIMITER: &str = "____";

/// Replaces runs of unsafe characters inside the body component
const BODY_PLACEHOLDER: &str = "__";

/// Replaces each unsafe character left in the final key
const KEY_MARKER: &str = "_---_";

/// Number of hex digits of the body digest kept in the key
const DIGEST_LEN: usize = 16;

/// A storage-safe cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Result of building a key
///
/// When the body cannot be serialized the key is still produced, without its body
/// component, and the error is handed back so the caller can log it.
#[derive(Debug)]
pub struct Fingerprint {
    pub key: CacheKey,
    pub body_error: Option<serde_json::Error>,
}

/// Builds the cache key for `(request, query, body)`
pub fn build_key<B>(request: &str, query: Option<&str>, body: Option<&B>) -> Fingerprint
where
    B: Serialize + ?Sized,
{
    let mut raw = request.trim().to_string();

    if let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) {
        raw.push_str(QUERY_DELIMITER);
        raw.push_str(query);
    }

    let mut body_error = None;
    if let Some(body) = body {
        match body_component(body) {
            Ok(Some(component)) => {
                raw.push_str(BODY_DELIMITER);
                raw.push_str(&component);
            }
            Ok(None) => {}
            Err(e) => body_error = Some(e),
        }
    }

    Fingerprint {
        key: CacheKey(sanitize_key(&raw)),
        body_error,
    }
}

/// Encodes a body into its key component, or `None` when the body is empty
fn body_component<B>(body: &B) -> Result<Option<String>, serde_json::Error>
where
    B: Serialize + ?Sized,
{
    let value = serde_json::to_value(body)?;
    if is_empty_body(&value) {
        return Ok(None);
    }

    let canonical = serde_json::to_string(&canonicalize(&value))?;
    let digest = hex::encode(Sha256::digest(canonical.as_bytes()));

    Ok(Some(format!(
        "{}{}{}",
        sanitize_body(&canonical),
        BODY_PLACEHOLDER,
        &digest[..DIGEST_LEN]
    )))
}

fn is_empty_body(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Rebuilds a JSON value with object keys in sorted order at every depth
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Replaces unsafe characters with the placeholder and collapses long underscore runs
fn sanitize_body(encoded: &str) -> String {
    let mut expanded = String::with_capacity(encoded.len() * 2);
    for c in encoded.chars() {
        if is_key_char(c) {
            expanded.push(c);
        } else {
            expanded.push_str(BODY_PLACEHOLDER);
        }
    }

    // Runs of three or more underscores become a single placeholder
    let mut collapsed = String::with_capacity(expanded.len());
    let mut run = 0usize;
    for c in expanded.chars() {
        if c == '_' {
            run += 1;
            continue;
        }
        flush_underscores(&mut collapsed, run);
        run = 0;
        collapsed.push(c);
    }
    flush_underscores(&mut collapsed, run);
    collapsed
}

fn flush_underscores(out: &mut String, run: usize) {
    if run >= 3 {
        out.push_str(BODY_PLACEHOLDER);
    } else {
        out.extend(std::iter::repeat('_').take(run));
    }
}

fn sanitize_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    for c in raw.chars() {
        if is_key_char(c) {
            key.push(c);
        } else {
            key.push_str(KEY_MARKER);
        }
    }
    key
}
