//! Tollgate API client utilities.
//!
//! A lightweight client for the business API the orchestration core drives.
//! It focuses on:
//!
//! - Constructing an HTTP client with sensible defaults (JSON accept header, timeout)
//! - Resolving the base URL from configuration or `TOLLGATE_API_BASE`
//! - Validating the base URL for safety
//! - Attaching a caller-scoped bearer credential per request
//!
//! # Example
//!
//! ```ignore
//! use tollgate_api::ApiClient;
//!
//! let client = ApiClient::new("http://localhost:3000", std::time::Duration::from_secs(30))?;
//! let response = client
//!     .request(reqwest::Method::GET, "/api/classes", Some("token"))
//!     .send()
//!     .await?;
//! ```

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, RequestBuilder, Url, header};
use tracing::debug;

/// Environment override for the API base URL.
pub const API_BASE_ENV: &str = "TOLLGATE_API_BASE";
/// Environment source for the caller credential.
pub const API_TOKEN_ENV: &str = "TOLLGATE_API_TOKEN";
/// Base URL used when neither configuration nor environment provides one.
pub const DEFAULT_API_BASE: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Hostnames allowed for local development regardless of scheme.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1", "::1", "[::1]"];

/// Thin wrapper around a configured `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub base_url: String,
    pub http: Client,
    pub user_agent: String,
}

impl ApiClient {
    /// Builds a client for `base_url` after validating it.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        validate_base_url(&base_url)?;

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()
            .context("build http client")?;

        Ok(Self {
            base_url,
            http,
            user_agent: format!("tollgate/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
        })
    }

    /// Resolution order for the base URL: `TOLLGATE_API_BASE`, then
    /// `configured_base`, then [`DEFAULT_API_BASE`].
    pub fn from_env(configured_base: Option<&str>, timeout: Duration) -> Result<Self> {
        let base_url = env::var(API_BASE_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| configured_base.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        Self::new(&base_url, timeout)
    }

    /// Builds a request for an API-relative path, attaching `Authorization:
    /// Bearer` when a credential is supplied.
    pub fn request(&self, method: reqwest::Method, path: &str, bearer_token: Option<&str>) -> RequestBuilder {
        let url = self.url_for(path);
        debug!(%url, %method, authenticated = bearer_token.is_some(), "building request");

        let builder = self
            .http
            .request(method, url)
            .header(header::USER_AGENT, &self.user_agent);
        match bearer_token {
            Some(token) if !token.trim().is_empty() => builder.bearer_auth(token.trim()),
            _ => builder,
        }
    }

    /// Joins an API-relative path onto the base URL.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

/// Reads the caller credential from `TOLLGATE_API_TOKEN`.
pub fn token_from_env() -> Option<String> {
    env::var(API_TOKEN_ENV).ok().filter(|token| !token.trim().is_empty())
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - loopback hosts: any scheme is allowed
/// - otherwise: scheme must be HTTPS
pub fn validate_base_url(base: &str) -> Result<()> {
    let parsed_base_url = Url::parse(base).map_err(|e| anyhow!("Invalid API base URL '{}': {}", base, e))?;

    let host_name = parsed_base_url
        .host_str()
        .ok_or_else(|| anyhow!("API base URL must include a host"))?;

    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(());
    }

    if parsed_base_url.scheme() != "https" {
        return Err(anyhow!(
            "API base URL must use https for non-localhost hosts; got '{}://'",
            parsed_base_url.scheme()
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_localhost_over_http() {
        assert!(validate_base_url("http://localhost:3000").is_ok());
        assert!(validate_base_url("http://127.0.0.1:8080").is_ok());
    }

    #[test]
    fn rejects_plain_http_for_remote_hosts() {
        let error = validate_base_url("http://api.example.com").unwrap_err();
        assert!(error.to_string().contains("https"));
        assert!(validate_base_url("https://api.example.com").is_ok());
    }

    #[test]
    fn rejects_unparseable_urls() {
        assert!(validate_base_url("not a url").is_err());
    }

    #[test]
    fn env_override_wins_over_configuration() {
        temp_env::with_var(API_BASE_ENV, Some("https://override.example.com/"), || {
            let client = ApiClient::from_env(Some("http://localhost:3000"), DEFAULT_TIMEOUT).unwrap();
            assert_eq!(client.base_url, "https://override.example.com");
            assert_eq!(client.url_for("api/classes"), "https://override.example.com/api/classes");
        });
    }

    #[test]
    fn falls_back_to_configured_then_default_base() {
        temp_env::with_var_unset(API_BASE_ENV, || {
            let configured = ApiClient::from_env(Some("http://127.0.0.1:9000"), DEFAULT_TIMEOUT).unwrap();
            assert_eq!(configured.base_url, "http://127.0.0.1:9000");
            let fallback = ApiClient::from_env(None, DEFAULT_TIMEOUT).unwrap();
            assert_eq!(fallback.base_url, DEFAULT_API_BASE);
        });
    }
}
