//! Pure HTTP client wrapper for the upstream GraphQL API.
//!
//! This module provides a thin wrapper around reqwest for POSTing GraphQL
//! documents. It handles authentication headers and timeouts, and hands the
//! raw body back without parsing or business logic.

use super::types::GraphQlRequest;
use crate::config::ExtractionSettings;
use crate::error::AppError;
use crate::types::SourceCredentials;
use reqwest::{header, Client, Response};
use std::time::Duration;
use url::Url;

/// A thin wrapper around reqwest Client for upstream GraphQL requests.
///
/// Credentials travel with each request rather than living in default
/// headers, so one client can serve every tenant.
#[derive(Clone)]
pub struct UpstreamHttpClient {
    client: Client,
}

impl UpstreamHttpClient {
    /// Creates a new HTTP client with the configured timeouts.
    pub fn new(settings: &ExtractionSettings) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(Self::create_headers())
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;
        Ok(Self { client })
    }

    /// Creates the default headers shared by every request.
    fn create_headers() -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers
    }

    /// Builds the per-tenant authentication header.
    fn auth_header(
        credentials: &SourceCredentials,
    ) -> Result<(header::HeaderName, header::HeaderValue), AppError> {
        let scheme = credentials.auth_scheme;
        let name = header::HeaderName::from_bytes(scheme.header_name().as_bytes())
            .map_err(|e| AppError::MissingConfiguration(format!("Invalid auth header name: {}", e)))?;
        let mut value = header::HeaderValue::from_str(
            &scheme.header_value(&credentials.access_token),
        )
        .map_err(|e| AppError::MissingConfiguration(format!("Invalid access token format: {}", e)))?;
        value.set_sensitive(true);
        Ok((name, value))
    }

    /// Makes a POST request with a GraphQL body to `endpoint`.
    pub async fn post(
        &self,
        endpoint: &Url,
        credentials: &SourceCredentials,
        body: &GraphQlRequest,
    ) -> Result<Response, AppError> {
        let (name, value) = Self::auth_header(credentials)?;
        log::debug!("POST {} ({} bytes of query)", endpoint, body.query.len());

        let response = self
            .client
            .post(endpoint.clone())
            .header(name, value)
            .json(body)
            .send()
            .await?;

        log::debug!("Response from {}: {}", endpoint, response.status());
        Ok(response)
    }
}

#[async_trait::async_trait]
impl super::GraphQlTransport for UpstreamHttpClient {
    async fn execute(
        &self,
        endpoint: &Url,
        credentials: &SourceCredentials,
        request: &GraphQlRequest,
    ) -> Result<ApiResponse<String>, AppError> {
        let response = self.post(endpoint, credentials, request).await?;
        extract_response_text(response).await
    }
}

/// Result of an HTTP operation with response metadata.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: reqwest::StatusCode,
    pub url: String,
}

/// Extracts the response body as text with metadata.
pub async fn extract_response_text(response: Response) -> Result<ApiResponse<String>, AppError> {
    let status = response.status();
    let url = response.url().to_string();
    let text = response.text().await?;

    Ok(ApiResponse {
        data: text,
        status,
        url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccessToken, AuthScheme, StoreDomain};

    fn credentials(scheme: AuthScheme) -> SourceCredentials {
        let mut creds = SourceCredentials::new(
            StoreDomain::new("acme.myshopify.com").unwrap(),
            AccessToken::new("shpat_secret").unwrap(),
        );
        creds.auth_scheme = scheme;
        creds
    }

    #[test]
    fn test_auth_header_per_scheme() {
        let (name, value) =
            UpstreamHttpClient::auth_header(&credentials(AuthScheme::AccessTokenHeader)).unwrap();
        assert_eq!(name.as_str(), "x-shopify-access-token");
        assert_eq!(value.to_str().unwrap(), "shpat_secret");
        assert!(value.is_sensitive());

        let (name, value) = UpstreamHttpClient::auth_header(&credentials(AuthScheme::Bearer)).unwrap();
        assert_eq!(name, header::AUTHORIZATION);
        assert_eq!(value.to_str().unwrap(), "Bearer shpat_secret");
    }

    #[test]
    fn test_client_builds_with_default_settings() {
        assert!(UpstreamHttpClient::new(&ExtractionSettings::default()).is_ok());
    }
}
