//! Domain-specific newtypes for type safety and validation.

use super::ValidationError;
use crate::constants::{ACCESS_TOKEN_HEADER, DEFAULT_API_VERSION};
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Access token for the upstream API.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccessToken(String);

impl AccessToken {
    /// Create a new access token with validation
    pub fn new(token: impl Into<String>) -> Result<Self, ValidationError> {
        let token = token.into();

        if token.trim().is_empty() {
            return Err(ValidationError::InvalidAccessToken {
                reason: "access token cannot be empty".to_string(),
            });
        }

        if token.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ValidationError::InvalidAccessToken {
                reason: "access token cannot contain whitespace".to_string(),
            });
        }

        Ok(Self(token))
    }

    /// Get the token as a string reference
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Redact token in display
        let visible: String = self.0.chars().take(4).collect();
        write!(f, "{}...", visible)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken({})", self)
    }
}

impl TryFrom<String> for AccessToken {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccessToken> for String {
    fn from(token: AccessToken) -> Self {
        token.0
    }
}

/// The tenant's store host, e.g. `acme.myshopify.com`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoreDomain(String);

impl StoreDomain {
    pub fn new(domain: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = domain.into();
        let trimmed = raw
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');

        if trimmed.is_empty() {
            return Err(ValidationError::EmptyField("store_domain"));
        }

        // Must be usable as the host part of a URL and nothing more
        let host = trimmed.to_lowercase();
        let probe = format!("https://{}/", host);
        match Url::parse(&probe) {
            Ok(url) if url.host_str() == Some(host.as_str()) && url.path() == "/" => Ok(Self(host)),
            Ok(_) => Err(ValidationError::InvalidUrl {
                url: raw,
                reason: "store domain must be a bare host name".to_string(),
            }),
            Err(e) => Err(ValidationError::InvalidUrl {
                url: raw,
                reason: e.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for StoreDomain {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StoreDomain> for String {
    fn from(domain: StoreDomain) -> Self {
        domain.0
    }
}

/// Upstream API version segment, e.g. `2024-10` or `unstable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiVersion(String);

impl ApiVersion {
    pub fn new(version: impl Into<String>) -> Result<Self, ValidationError> {
        static VERSION: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^(\d{4}-\d{2}|unstable)$").expect("api version pattern is a valid regex")
        });

        let version = version.into();
        if VERSION.is_match(version.trim()) {
            Ok(Self(version.trim().to_string()))
        } else {
            Err(ValidationError::InvalidApiVersion(version))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self(DEFAULT_API_VERSION.to_string())
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ApiVersion {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ApiVersion> for String {
    fn from(version: ApiVersion) -> Self {
        version.0
    }
}

/// How the access token is presented to the upstream API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    /// App token in the dedicated access-token header.
    #[default]
    AccessTokenHeader,
    /// `Authorization: Bearer <token>`.
    Bearer,
}

impl AuthScheme {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "header" | "access_token_header" => Ok(Self::AccessTokenHeader),
            "bearer" => Ok(Self::Bearer),
            other => Err(ValidationError::InvalidAuthScheme(other.to_string())),
        }
    }

    /// Header name carrying the token under this scheme.
    pub fn header_name(&self) -> &'static str {
        match self {
            Self::AccessTokenHeader => ACCESS_TOKEN_HEADER,
            Self::Bearer => "Authorization",
        }
    }

    /// Header value carrying `token` under this scheme.
    pub fn header_value(&self, token: &AccessToken) -> String {
        match self {
            Self::AccessTokenHeader => token.as_str().to_string(),
            Self::Bearer => format!("Bearer {}", token.as_str()),
        }
    }
}

/// Opaque per-tenant configuration used to reach the upstream API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCredentials {
    pub store_domain: StoreDomain,
    #[serde(default)]
    pub api_version: ApiVersion,
    pub access_token: AccessToken,
    #[serde(default)]
    pub auth_scheme: AuthScheme,
    /// Full GraphQL endpoint, replacing the one derived from the store domain.
    #[serde(default)]
    pub endpoint_override: Option<Url>,
}

impl SourceCredentials {
    pub fn new(store_domain: StoreDomain, access_token: AccessToken) -> Self {
        Self {
            store_domain,
            api_version: ApiVersion::default(),
            access_token,
            auth_scheme: AuthScheme::default(),
            endpoint_override: None,
        }
    }

    /// The GraphQL endpoint these credentials address.
    pub fn endpoint(&self) -> Result<Url, ValidationError> {
        if let Some(endpoint) = &self.endpoint_override {
            return Ok(endpoint.clone());
        }

        let raw = format!(
            "https://{}/admin/api/{}/graphql.json",
            self.store_domain, self.api_version
        );
        Url::parse(&raw).map_err(|e| ValidationError::InvalidUrl {
            url: raw,
            reason: e.to_string(),
        })
    }
}

/// A dotted path through nested documents, e.g. `lineItems.edges.node.product.id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self, ValidationError> {
        let raw = path.trim();
        if raw.is_empty() {
            return Err(ValidationError::InvalidFieldPath {
                path: path.to_string(),
                reason: "path cannot be empty".to_string(),
            });
        }

        let segments: Vec<String> = raw.split('.').map(|s| s.trim().to_string()).collect();
        if segments.iter().any(String::is_empty) {
            return Err(ValidationError::InvalidFieldPath {
                path: path.to_string(),
                reason: "path contains an empty segment".to_string(),
            });
        }

        Ok(Self {
            raw: segments.join("."),
            segments,
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.raw
    }
}

static IDS_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*ids\s*\}\}").expect("placeholder pattern is a valid regex"));

/// A GraphQL document with an `{{ids}}` slot for one batch of identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueryTemplate(String);

impl QueryTemplate {
    pub fn parse(template: impl Into<String>) -> Result<Self, ValidationError> {
        let template = template.into();
        if IDS_PLACEHOLDER.is_match(&template) {
            Ok(Self(template))
        } else {
            Err(ValidationError::MissingPlaceholder {
                placeholder: "{{ids}}",
            })
        }
    }

    /// Substitutes `ids` as a JSON array literal at every placeholder.
    pub fn render(&self, ids: &[String]) -> String {
        // Serializing a slice of strings cannot fail
        let literal = serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string());
        IDS_PLACEHOLDER
            .replace_all(&self.0, NoExpand(&literal))
            .into_owned()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for QueryTemplate {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<QueryTemplate> for String {
    fn from(template: QueryTemplate) -> Self {
        template.0
    }
}
