//! Integration tests for the gateway's request proxy, driven against
//! wiremock downstreams.

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, Method};
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::matchers::{any, body_bytes, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use knowledge_mesh::config::GatewayConfig;
use knowledge_mesh::gateway;
use knowledge_mesh::proxy::{ProxyError, ProxyRequest, ServiceProxy};
use knowledge_mesh::registry::ServiceRegistry;

fn registry_with(entries: &[(&str, &str)]) -> Arc<ServiceRegistry> {
    let config = GatewayConfig {
        services: entries
            .iter()
            .map(|(name, url)| (name.to_string(), url.to_string()))
            .collect::<HashMap<_, _>>(),
        ..GatewayConfig::default()
    };
    Arc::new(ServiceRegistry::from_config(&config))
}

fn simple_request(method: Method) -> ProxyRequest {
    ProxyRequest {
        method,
        headers: HeaderMap::new(),
        query: None,
        body: Bytes::new(),
    }
}

#[tokio::test]
async fn unknown_service_is_not_found_and_no_call_is_made() {
    let server = MockServer::start().await;
    // Any request reaching the downstream would fail the expectation.
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let proxy = ServiceProxy::new(registry_with(&[("backend", &server.uri())])).unwrap();
    let err = proxy
        .forward("missing", "anything", simple_request(Method::GET))
        .await
        .unwrap_err();

    assert!(matches!(err, ProxyError::ServiceNotFound(_)));
    assert_eq!(err.to_string(), "Service 'missing' not found");
}

#[tokio::test]
async fn forwards_method_path_query_body_and_headers_exactly() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/items/list"))
        .and(query_param("a", "1"))
        .and(query_param("b", "2"))
        .and(header("x-custom-header", "yes"))
        .and(body_bytes(b"payload-bytes".to_vec()))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let proxy = ServiceProxy::new(registry_with(&[("backend", &server.uri())])).unwrap();

    let mut headers = HeaderMap::new();
    headers.insert("x-custom-header", HeaderValue::from_static("yes"));
    // Transport-framing headers from the inbound request must not leak
    // through to the downstream connection.
    headers.insert("host", HeaderValue::from_static("original-gateway:9999"));
    headers.insert("content-length", HeaderValue::from_static("999"));

    let request = ProxyRequest {
        method: Method::POST,
        headers,
        query: Some("a=1&b=2".to_string()),
        body: Bytes::from_static(b"payload-bytes"),
    };

    let result = proxy.forward("backend", "items/list", request).await.unwrap();
    assert_eq!(result.status.as_u16(), 201);
    assert_eq!(result.content, serde_json::json!({"ok": true}));

    // The downstream saw its own host, not the inbound one, and a
    // content-length recomputed from the actual body.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let received = &requests[0];
    let host = received.headers.get("host").unwrap().to_str().unwrap();
    assert_ne!(host, "original-gateway:9999");
    if let Some(content_length) = received.headers.get("content-length") {
        assert_eq!(content_length.to_str().unwrap(), "13");
    }
}

#[tokio::test]
async fn json_body_and_status_pass_through_unchanged() {
    let server = MockServer::start().await;
    let body = serde_json::json!({"items": [1, 2, 3], "nested": {"deep": true}});
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(418).set_body_json(body.clone()))
        .mount(&server)
        .await;

    let proxy = ServiceProxy::new(registry_with(&[("backend", &server.uri())])).unwrap();
    let result = proxy
        .forward("backend", "data", simple_request(Method::GET))
        .await
        .unwrap();

    assert_eq!(result.status.as_u16(), 418);
    assert_eq!(result.content, body);
}

#[tokio::test]
async fn downstream_error_statuses_are_passed_through_not_translated() {
    // A downstream that *answers* with 503 is not "unavailable" — its
    // response passes through as-is.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(serde_json::json!({"detail": "overloaded"})),
        )
        .mount(&server)
        .await;

    let proxy = ServiceProxy::new(registry_with(&[("backend", &server.uri())])).unwrap();
    let result = proxy
        .forward("backend", "", simple_request(Method::GET))
        .await
        .unwrap();

    assert_eq!(result.status.as_u16(), 503);
    assert_eq!(result.content["detail"], "overloaded");
}

#[tokio::test]
async fn non_json_body_is_wrapped_in_data_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("hello world")
                .insert_header("content-type", "text/plain"),
        )
        .mount(&server)
        .await;

    let proxy = ServiceProxy::new(registry_with(&[("backend", &server.uri())])).unwrap();
    let result = proxy
        .forward("backend", "greeting", simple_request(Method::GET))
        .await
        .unwrap();

    assert_eq!(result.status.as_u16(), 200);
    assert_eq!(result.content, serde_json::json!({"data": "hello world"}));
}

#[tokio::test]
async fn unreachable_downstream_is_service_unavailable() {
    // Nothing listens on this port.
    let proxy = ServiceProxy::new(registry_with(&[("backend", "http://127.0.0.1:9")])).unwrap();
    let err = proxy
        .forward("backend", "x", simple_request(Method::GET))
        .await
        .unwrap_err();

    assert!(matches!(err, ProxyError::ServiceUnavailable(_)));
    assert_eq!(err.to_string(), "Service 'backend' unavailable");
}

#[tokio::test]
async fn empty_sub_path_hits_the_base_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"root": true})))
        .expect(1)
        .mount(&server)
        .await;

    let proxy = ServiceProxy::new(registry_with(&[("backend", &server.uri())])).unwrap();
    let result = proxy
        .forward("backend", "", simple_request(Method::GET))
        .await
        .unwrap();
    assert_eq!(result.content, serde_json::json!({"root": true}));
}

// ============ Full-router tests ============

async fn spawn_gateway(registry: Arc<ServiceRegistry>) -> String {
    let app = gateway::router(registry).unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn gateway_routes_proxy_health_and_service_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"state": "up"})))
        .mount(&server)
        .await;

    let registry = registry_with(&[("backend", &server.uri())]);
    let base = spawn_gateway(registry).await;
    let client = reqwest::Client::new();

    // Proxied route
    let response = client
        .get(format!("{}/api/v1/backend/status", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["state"], "up");

    // Unknown service surfaces 404 with a detail message
    let response = client
        .get(format!("{}/api/v1/unknown/whatever", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Service 'unknown' not found");

    // Health lists registered services
    let body: serde_json::Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "api-gateway");
    assert_eq!(body["services"][0], "backend");

    // Service discovery returns the name → URL table
    let body: serde_json::Value = client
        .get(format!("{}/api/v1/services", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["services"]["backend"], server.uri());
}
