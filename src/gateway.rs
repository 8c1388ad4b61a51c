//! API gateway front door.
//!
//! Routes `/api/v1/{service}/{path...}` through the [`ServiceProxy`]
//! and exposes the thin informational endpoints:
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Health check with registered service names |
//! | `GET` | `/` | Informational message |
//! | `GET` | `/api/v1/services` | Service name → URL table |
//! | `*` | `/api/v1/{service}` | Proxied with empty sub-path |
//! | `*` | `/api/v1/{service}/{*path}` | Proxied |
//!
//! Proxy failures surface as `{"detail": <message>}` with the status
//! mapped by [`ProxyError`]. Cross-origin access is limited to the
//! configured origins (credentials allowed).

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{header, HeaderMap, HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::Config;
use crate::proxy::{ProxyError, ProxyRequest, ServiceProxy};
use crate::registry::ServiceRegistry;

/// Shared state for all gateway route handlers.
#[derive(Clone)]
struct GatewayState {
    registry: Arc<ServiceRegistry>,
    proxy: ServiceProxy,
}

/// Build the gateway router around a service registry.
pub fn router(registry: Arc<ServiceRegistry>) -> anyhow::Result<Router> {
    let proxy = ServiceProxy::new(registry.clone())?;
    let state = GatewayState { registry, proxy };

    Ok(Router::new()
        .route("/health", get(handle_health))
        .route("/", get(handle_root))
        .route("/api/v1/services", get(handle_list_services))
        .route("/api/v1/{service}", any(handle_proxy_root))
        .route("/api/v1/{service}/{*path}", any(handle_proxy))
        .with_state(state))
}

/// Start the gateway server on the configured bind address.
pub async fn run_gateway(config: &Config) -> anyhow::Result<()> {
    let registry = Arc::new(ServiceRegistry::from_config(&config.gateway));
    info!(services = ?registry.names(), "starting API gateway");

    let cors = cors_layer(&config.gateway.cors_origins)?;
    let app = router(registry)?.layer(cors);

    info!(bind = %config.gateway.bind, "API gateway listening");
    let listener = tokio::net::TcpListener::bind(&config.gateway.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// CORS layer restricted to the configured origins, with credentials.
///
/// Methods and headers are listed explicitly: tower-http rejects
/// wildcard lists when credentials are allowed.
fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| o.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
    services: Vec<String>,
}

async fn handle_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "api-gateway".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services: state
            .registry
            .names()
            .into_iter()
            .map(String::from)
            .collect(),
    })
}

// ============ GET / ============

async fn handle_root() -> Json<Value> {
    Json(serde_json::json!({
        "message": "Knowledge Assistant API Gateway",
        "health": "/health",
    }))
}

// ============ GET /api/v1/services ============

#[derive(Serialize)]
struct ServicesResponse {
    services: HashMap<String, String>,
}

async fn handle_list_services(State(state): State<GatewayState>) -> Json<ServicesResponse> {
    Json(ServicesResponse {
        services: state.registry.entries().clone(),
    })
}

// ============ /api/v1/{service}[/{path...}] ============

async fn handle_proxy(
    State(state): State<GatewayState>,
    Path((service, path)): Path<(String, String)>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    forward(&state, &service, &path, method, query, headers, body).await
}

async fn handle_proxy_root(
    State(state): State<GatewayState>,
    Path(service): Path<String>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    forward(&state, &service, "", method, query, headers, body).await
}

async fn forward(
    state: &GatewayState,
    service: &str,
    path: &str,
    method: Method,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let request = ProxyRequest {
        method,
        headers,
        query,
        body,
    };
    let result = state.proxy.forward(service, path, request).await?;
    Ok((result.status, Json(result.content)).into_response())
}
