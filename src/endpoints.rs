//! Endpoint registry
//!
//! Maps logical request names (e.g. `GET_CARS`) to the URL path and HTTP verb used
//! to reach them. The registry is plain configuration: it can be built from the
//! built-in table or loaded from a JSON file of the form
//! `{"NAME": {"apiUrl": "path/", "method": "GET"}}`.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ResolveError, SetupError};

/// HTTP verbs supported by the remote transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Returns the canonical upper-case name of the verb
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Whether requests with this verb carry a body
    pub fn sends_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ResolveError;

    /// Parses a verb case-insensitively, ignoring surrounding whitespace
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            _ => Err(ResolveError::InvalidCustomEndpoint(format!(
                "unsupported method '{}'",
                s.trim()
            ))),
        }
    }
}

impl TryFrom<String> for Method {
    type Error = ResolveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Method> for String {
    fn from(method: Method) -> Self {
        method.as_str().to_string()
    }
}

/// A resolved endpoint: URL path relative to the base URL plus the verb
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// Path appended to the base URL
    #[serde(rename = "apiUrl")]
    pub path: String,
    /// HTTP verb
    pub method: Method,
}

impl EndpointDescriptor {
    pub fn new(path: impl Into<String>, method: Method) -> Self {
        Self {
            path: path.into(),
            method,
        }
    }

    /// Checks that the path is non-blank, returning a trimmed copy
    pub fn validated(&self) -> Result<Self, ResolveError> {
        let path = self.path.trim();
        if path.is_empty() {
            return Err(ResolveError::InvalidCustomEndpoint(
                "endpoint path is empty".to_string(),
            ));
        }
        Ok(Self::new(path, self.method))
    }
}

/// What the caller asks for: a registry entry or an ad-hoc endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalRequest {
    /// Registry identifier such as `GET_CARS`
    Named(String),
    /// Endpoint supplied directly by the caller, bypassing the registry
    Custom(EndpointDescriptor),
}

impl LogicalRequest {
    pub fn named(name: impl Into<String>) -> Self {
        LogicalRequest::Named(name.into())
    }

    pub fn custom(path: impl Into<String>, method: Method) -> Self {
        LogicalRequest::Custom(EndpointDescriptor::new(path, method))
    }

    /// Identifier used as the leading component of cache keys
    ///
    /// Custom endpoints are identified by verb and path, so a `GET` and a `DELETE`
    /// on the same path never share entries.
    pub fn identifier(&self) -> Cow<'_, str> {
        match self {
            LogicalRequest::Named(name) => Cow::Borrowed(name.trim()),
            LogicalRequest::Custom(endpoint) => {
                Cow::Owned(format!("{} {}", endpoint.method, endpoint.path.trim()))
            }
        }
    }
}

impl fmt::Display for LogicalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalRequest::Named(name) => f.write_str(name),
            LogicalRequest::Custom(endpoint) => {
                write!(f, "{} {}", endpoint.method, endpoint.path)
            }
        }
    }
}

/// Static mapping of logical request names to endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointRegistry {
    endpoints: BTreeMap<String, EndpointDescriptor>,
}

impl Default for EndpointRegistry {
    /// The built-in endpoint table
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.insert("GET_CARS", EndpointDescriptor::new("cars/", Method::Get));
        registry.insert("POST_CITIES", EndpointDescriptor::new("cities/", Method::Post));
        registry.insert("PUT_DELETE", EndpointDescriptor::new("try_delete/", Method::Delete));
        registry.insert("PUT_TRY", EndpointDescriptor::new("try_put/", Method::Put));
        registry.insert("GET_TEST1", EndpointDescriptor::new("test_cache1/", Method::Get));
        registry.insert("POST_TEST2", EndpointDescriptor::new("test_cache2/", Method::Post));
        registry
    }
}

impl EndpointRegistry {
    /// Creates a registry with no endpoints
    pub fn empty() -> Self {
        Self {
            endpoints: BTreeMap::new(),
        }
    }

    /// Parses a registry from its JSON representation
    pub fn from_json_str(json: &str) -> Result<Self, SetupError> {
        let registry: Self = serde_json::from_str(json)?;
        for (name, endpoint) in &registry.endpoints {
            if name.trim().is_empty() || endpoint.path.trim().is_empty() {
                return Err(SetupError::InvalidRegistry(format!(
                    "entry '{}' has an empty name or path",
                    name
                )));
            }
        }
        Ok(registry)
    }

    /// Loads a registry from a JSON file
    pub fn from_path(path: &Path) -> Result<Self, SetupError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn insert(&mut self, name: impl Into<String>, endpoint: EndpointDescriptor) {
        self.endpoints.insert(name.into(), endpoint);
    }

    pub fn get(&self, name: &str) -> Option<&EndpointDescriptor> {
        self.endpoints.get(name)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Resolves a logical request to a validated endpoint
    pub fn resolve(&self, request: &LogicalRequest) -> Result<EndpointDescriptor, ResolveError> {
        match request {
            LogicalRequest::Custom(endpoint) => endpoint.validated(),
            LogicalRequest::Named(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(ResolveError::EmptyRequest);
                }
                self.get(name)
                    .ok_or_else(|| ResolveError::UnknownRequest(name.to_string()))?
                    .validated()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!(" Post ".parse::<Method>().unwrap(), Method::Post);
        assert_eq!("DELETE".parse::<Method>().unwrap(), Method::Delete);
        assert!("PATCH".parse::<Method>().is_err());
    }

    #[test]
    fn test_only_post_and_put_send_body() {
        assert!(Method::Post.sends_body());
        assert!(Method::Put.sends_body());
        assert!(!Method::Get.sends_body());
        assert!(!Method::Delete.sends_body());
    }

    #[test]
    fn test_default_registry_resolves_known_requests() {
        let registry = EndpointRegistry::default();
        let endpoint = registry.resolve(&LogicalRequest::named("GET_CARS")).unwrap();

        assert_eq!(endpoint.path, "cars/");
        assert_eq!(endpoint.method, Method::Get);
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn test_unknown_request_fails_to_resolve() {
        let registry = EndpointRegistry::default();
        let err = registry.resolve(&LogicalRequest::named("NOPE")).unwrap_err();

        assert!(matches!(err, ResolveError::UnknownRequest(ref name) if name == "NOPE"));
    }

    #[test]
    fn test_blank_request_fails_to_resolve() {
        let registry = EndpointRegistry::default();
        let err = registry.resolve(&LogicalRequest::named("  ")).unwrap_err();

        assert!(matches!(err, ResolveError::EmptyRequest));
    }

    #[test]
    fn test_custom_endpoint_with_blank_path_is_rejected() {
        let registry = EndpointRegistry::empty();
        let result = registry.resolve(&LogicalRequest::custom("   ", Method::Get));

        assert!(matches!(result, Err(ResolveError::InvalidCustomEndpoint(_))));
    }

    #[test]
    fn test_custom_endpoint_is_trimmed() {
        let registry = EndpointRegistry::empty();
        let endpoint = registry
            .resolve(&LogicalRequest::custom(" users/ ", Method::Post))
            .unwrap();

        assert_eq!(endpoint.path, "users/");
        assert_eq!(endpoint.method, Method::Post);
    }

    #[test]
    fn test_registry_from_json() {
        let json = r#"{
            "GET_USERS": {"apiUrl": "users/", "method": "get"},
            "POST_LOGIN": {"apiUrl": "login/", "method": "POST"}
        }"#;

        let registry = EndpointRegistry::from_json_str(json).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("GET_USERS").unwrap().method, Method::Get);
        assert_eq!(registry.get("POST_LOGIN").unwrap().path, "login/");
    }

    #[test]
    fn test_registry_from_json_rejects_bad_method() {
        let json = r#"{"X": {"apiUrl": "x/", "method": "PATCH"}}"#;
        assert!(EndpointRegistry::from_json_str(json).is_err());
    }

    #[test]
    fn test_registry_from_json_rejects_empty_path() {
        let json = r#"{"X": {"apiUrl": "  ", "method": "GET"}}"#;
        assert!(matches!(
            EndpointRegistry::from_json_str(json),
            Err(SetupError::InvalidRegistry(_))
        ));
    }

    #[test]
    fn test_custom_identifier_includes_verb() {
        let request = LogicalRequest::custom("reports/daily/", Method::Get);
        assert_eq!(request.identifier(), "GET reports/daily/");
        assert_ne!(
            request.identifier(),
            LogicalRequest::custom("reports/daily/", Method::Delete).identifier()
        );
        assert_eq!(LogicalRequest::named("GET_CARS").identifier(), "GET_CARS");
    }
}
