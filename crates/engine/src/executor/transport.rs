use std::time::Instant;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;
use tollgate_api::ApiClient;
use tollgate_types::HttpMethod;
use tollgate_util::{redact_sensitive, truncate_chars};
use tracing::{debug, warn};

const LOGGED_BODY_CHARS: usize = 512;

/// A fully prepared business API call.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    /// API-relative path with every placeholder substituted.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    /// Parsed JSON, the raw text as a string when it is not JSON, or `null` when empty.
    pub body: Value,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced an HTTP response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {path} timed out")]
    Timeout { path: String },
    #[error("request to {path} failed: {message}")]
    Network { path: String, message: String },
    #[error("response from {path} could not be read: {message}")]
    Body { path: String, message: String },
}

/// Sends prepared requests to the business API.
///
/// Implementations must not retry: a mutating call reaches the upstream at
/// most once per confirmed request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] over the shared [`ApiClient`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: ApiClient,
}

impl HttpTransport {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let start = Instant::now();
        debug!(
            method = %request.method,
            path = %request.path,
            query_parameter_count = request.query.len(),
            has_body = request.body.is_some(),
            authenticated = request.bearer_token.is_some(),
            "http request started"
        );

        let mut request_builder = self
            .client
            .request(to_reqwest_method(request.method), &request.path, request.bearer_token.as_deref());
        if !request.query.is_empty() {
            request_builder = request_builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            request_builder = request_builder.json(body);
        }

        let response = request_builder.send().await.map_err(|error| {
            if error.is_timeout() {
                TransportError::Timeout {
                    path: request.path.clone(),
                }
            } else {
                TransportError::Network {
                    path: request.path.clone(),
                    message: error.to_string(),
                }
            }
        })?;
        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|error| TransportError::Body {
            path: request.path.clone(),
            message: error.to_string(),
        })?;

        if (200..300).contains(&status) {
            debug!(
                method = %request.method,
                path = %request.path,
                status,
                duration_ms = start.elapsed().as_millis(),
                "http request completed"
            );
        } else {
            warn!(
                method = %request.method,
                path = %request.path,
                status,
                body = %redact_sensitive(&truncate_chars(&body_text, LOGGED_BODY_CHARS)),
                duration_ms = start.elapsed().as_millis(),
                "http request failed"
            );
        }

        Ok(TransportResponse {
            status,
            body: parse_body(&body_text),
        })
    }
}

fn parse_body(body_text: &str) -> Value {
    if body_text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body_text).unwrap_or_else(|_| Value::String(body_text.to_string()))
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bodies_parse_as_json_text_or_null() {
        assert_eq!(parse_body(r#"{"success": true}"#), json!({"success": true}));
        assert_eq!(parse_body("Bad Gateway"), json!("Bad Gateway"));
        assert_eq!(parse_body("  "), Value::Null);
    }

    #[test]
    fn success_covers_2xx_only() {
        let response = |status| TransportResponse { status, body: Value::Null };
        assert!(response(204).is_success());
        assert!(!response(302).is_success());
        assert!(!response(404).is_success());
    }
}
