//! HTTP surface of the LLM service.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat/` | Full chat turn (retrieval + tools + generation) |
//! | `POST` | `/chat/extract` | Entity extraction |
//! | `POST` | `/chat/tasks` | Task extraction |
//! | `POST` | `/chat/embeddings` | Embedding generation |
//! | `POST` | `/chat/summarize` | Text summarization |
//! | `GET` | `/chat/health` | Runtime availability probe |
//! | `GET` | `/health` | Service health |
//! | `GET` | `/` | Informational message |
//!
//! A failed generation is the only turn-level error and surfaces as
//! `{"detail": <message>}` with status 500, the message passed through
//! verbatim from the generation collaborator.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

use crate::chat::{ChatError, ChatService, LlmHealth};
use crate::config::Config;
use crate::models::{ChatTurn, DocumentSource, EntityExtraction, TaskExtraction};

/// Build the LLM service router around a chat service.
pub fn router(service: Arc<ChatService>) -> Router {
    let chat_routes = Router::new()
        .route("/", post(handle_chat))
        .route("/extract", post(handle_extract))
        .route("/tasks", post(handle_tasks))
        .route("/embeddings", post(handle_embeddings))
        .route("/summarize", post(handle_summarize))
        .route("/health", get(handle_chat_health));

    Router::new()
        .nest("/chat", chat_routes)
        // axum 0.8 nesting does not match the trailing-slash root of a nested
        // router, so register `/chat/` explicitly to preserve the documented path.
        .route("/chat/", post(handle_chat))
        .route("/health", get(handle_health))
        .route("/", get(handle_root))
        .with_state(service)
}

/// Start the LLM service on the configured bind address.
pub async fn run_llm_server(config: &Config) -> anyhow::Result<()> {
    let service = Arc::new(ChatService::new(&config.llm)?);
    let app = router(service);

    info!(bind = %config.llm.bind, model = %config.llm.model, "LLM service listening");
    let listener = tokio::net::TcpListener::bind(&config.llm.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

struct AppError {
    status: StatusCode,
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "detail": self.detail });
        (self.status, Json(body)).into_response()
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: err.to_string(),
        }
    }
}

fn internal_error(err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        detail: err.to_string(),
    }
}

// ============ POST /chat/ ============

#[derive(Serialize)]
struct ChatResponse {
    response: String,
    model: String,
    sources: Vec<DocumentSource>,
    tool_data: Map<String, Value>,
    tools_used: Vec<String>,
}

async fn handle_chat(
    State(service): State<Arc<ChatService>>,
    Json(turn): Json<ChatTurn>,
) -> Result<Json<ChatResponse>, AppError> {
    let outcome = service.chat_turn(turn).await?;
    Ok(Json(ChatResponse {
        response: outcome.response,
        model: outcome.model,
        sources: outcome.sources,
        tool_data: outcome.tool_data,
        tools_used: outcome.tools_used,
    }))
}

// ============ POST /chat/extract ============

#[derive(Deserialize)]
struct ExtractRequest {
    text: String,
}

#[derive(Serialize)]
struct ExtractResponse {
    entities: EntityExtraction,
    model: String,
}

async fn handle_extract(
    State(service): State<Arc<ChatService>>,
    Json(request): Json<ExtractRequest>,
) -> Json<ExtractResponse> {
    let entities = service.extract_entities(&request.text).await;
    Json(ExtractResponse {
        entities,
        model: service.model().to_string(),
    })
}

// ============ POST /chat/tasks ============

#[derive(Serialize)]
struct TasksResponse {
    #[serde(flatten)]
    extraction: TaskExtraction,
    model: String,
}

async fn handle_tasks(
    State(service): State<Arc<ChatService>>,
    Json(request): Json<ExtractRequest>,
) -> Json<TasksResponse> {
    let extraction = service.extract_tasks(&request.text).await;
    Json(TasksResponse {
        extraction,
        model: service.model().to_string(),
    })
}

// ============ POST /chat/embeddings ============

#[derive(Serialize)]
struct EmbeddingsResponse {
    embeddings: Vec<f32>,
    dimensions: usize,
    model: String,
}

async fn handle_embeddings(
    State(service): State<Arc<ChatService>>,
    Json(request): Json<ExtractRequest>,
) -> Json<EmbeddingsResponse> {
    let embeddings = service.create_embeddings(&request.text).await;
    let dimensions = embeddings.len();
    Json(EmbeddingsResponse {
        embeddings,
        dimensions,
        model: service.model().to_string(),
    })
}

// ============ POST /chat/summarize ============

fn default_max_length() -> usize {
    200
}

#[derive(Deserialize)]
struct SummarizeRequest {
    text: String,
    #[serde(default = "default_max_length")]
    max_length: usize,
}

#[derive(Serialize)]
struct SummarizeResponse {
    summary: String,
    original_length: usize,
    summary_length: usize,
    compression_ratio: f64,
    model: String,
}

async fn handle_summarize(
    State(service): State<Arc<ChatService>>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, AppError> {
    let summary = service
        .summarize_text(&request.text, request.max_length)
        .await
        .map_err(internal_error)?;

    let original_length = request.text.len();
    let summary_length = summary.len();
    let compression_ratio = if original_length > 0 {
        summary_length as f64 / original_length as f64
    } else {
        0.0
    };

    Ok(Json(SummarizeResponse {
        summary,
        original_length,
        summary_length,
        compression_ratio,
        model: service.model().to_string(),
    }))
}

// ============ Health & root ============

async fn handle_chat_health(State(service): State<Arc<ChatService>>) -> Json<LlmHealth> {
    Json(service.health().await)
}

async fn handle_health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "llm-service",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handle_root() -> Json<Value> {
    Json(serde_json::json!({ "message": "LLM Service", "health": "/health" }))
}
