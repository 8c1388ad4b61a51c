//! Name-based request proxy for the API gateway.
//!
//! [`ServiceProxy::forward`] resolves a logical service name against the
//! [`ServiceRegistry`], forwards the inbound method, path, query, body,
//! and headers to the resolved base URL, and normalizes the downstream
//! response. Transport failures are translated into a closed error
//! taxonomy:
//!
//! | Condition | Error | HTTP status |
//! |-----------|-------|-------------|
//! | Unknown service name | [`ProxyError::ServiceNotFound`] | 404 |
//! | Downstream unreachable / timed out | [`ProxyError::ServiceUnavailable`] | 503 |
//! | Anything else | [`ProxyError::Internal`] | 500 (sanitized) |
//!
//! The proxy makes exactly one attempt per inbound request. Retry
//! policy, if any, belongs to the caller.

use axum::body::Bytes;
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::registry::ServiceRegistry;

/// Timeout applied to every forwarded request.
const FORWARD_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure modes of a single proxied request.
///
/// These three variants are the only errors that cross the proxy
/// boundary; any unexpected failure while forwarding is collapsed into
/// [`ProxyError::Internal`] with its cause logged but not leaked.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Service '{0}' not found")]
    ServiceNotFound(String),
    #[error("Service '{0}' unavailable")]
    ServiceUnavailable(String),
    #[error("Internal server error")]
    Internal,
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::ServiceNotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = json!({ "detail": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

/// The forwardable parts of an inbound request.
///
/// Constructed once per inbound call and never mutated after
/// forwarding. The query string is kept raw so parameter order and
/// repeated keys survive the hop untouched.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub headers: HeaderMap,
    pub query: Option<String>,
    pub body: Bytes,
}

/// Normalized downstream response: the original status code plus the
/// body as JSON — parsed when the downstream spoke JSON, wrapped as
/// `{"data": <text>}` otherwise.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub content: Value,
}

/// Forwards inbound requests to registered backend services.
///
/// Holds the shared HTTP client (an immutable handle over an internal
/// connection pool) so it can be cloned into any number of concurrent
/// request handlers.
#[derive(Clone)]
pub struct ServiceProxy {
    registry: Arc<ServiceRegistry>,
    client: reqwest::Client,
}

impl ServiceProxy {
    pub fn new(registry: Arc<ServiceRegistry>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FORWARD_TIMEOUT)
            .build()?;
        Ok(Self { registry, client })
    }

    /// Forward one request to the service named `service_name`.
    ///
    /// The target URL is the registered base URL with `/{sub_path}`
    /// appended when `sub_path` is non-empty — literal concatenation,
    /// no normalization; the downstream is trusted. The `host` and
    /// `content-length` headers are stripped (the transport re-derives
    /// both for the new connection); every other header passes through.
    pub async fn forward(
        &self,
        service_name: &str,
        sub_path: &str,
        request: ProxyRequest,
    ) -> Result<ProxyResponse, ProxyError> {
        let base_url = self
            .registry
            .resolve(service_name)
            .ok_or_else(|| ProxyError::ServiceNotFound(service_name.to_string()))?;

        let mut target_url = if sub_path.is_empty() {
            base_url.to_string()
        } else {
            format!("{}/{}", base_url, sub_path)
        };
        if let Some(query) = request.query.as_deref() {
            if !query.is_empty() {
                target_url = format!("{}?{}", target_url, query);
            }
        }

        let mut headers = request.headers;
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);

        info!(method = %request.method, url = %target_url, "proxying request");

        let response = self
            .client
            .request(request.method, &target_url)
            .headers(headers)
            .body(request.body)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    error!(service = service_name, error = %e, "failed to build proxied request");
                    ProxyError::Internal
                } else {
                    warn!(service = service_name, error = %e, "downstream request failed");
                    ProxyError::ServiceUnavailable(service_name.to_string())
                }
            })?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/json"))
            .unwrap_or(false);

        let text = response.text().await.map_err(|e| {
            error!(service = service_name, error = %e, "failed to read downstream body");
            ProxyError::Internal
        })?;

        let content = if is_json {
            serde_json::from_str(&text).map_err(|e| {
                error!(service = service_name, error = %e, "downstream sent malformed JSON");
                ProxyError::Internal
            })?
        } else {
            json!({ "data": text })
        };

        Ok(ProxyResponse { status, content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(
            ProxyError::ServiceNotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn unavailable_maps_to_503() {
        assert_eq!(
            ProxyError::ServiceUnavailable("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn internal_message_is_sanitized() {
        // The Display form carries no cause detail.
        assert_eq!(ProxyError::Internal.to_string(), "Internal server error");
    }

    #[test]
    fn not_found_names_the_service() {
        let err = ProxyError::ServiceNotFound("billing".into());
        assert_eq!(err.to_string(), "Service 'billing' not found");
    }
}
