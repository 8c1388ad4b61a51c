//! Core data types shared across the services.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_search_limit() -> usize {
    3
}

/// One inbound chat request to the LLM service.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatTurn {
    pub message: String,
    /// Caller-supplied context documents, prepended to anything the
    /// orchestrator retrieves.
    #[serde(default)]
    pub context: Vec<String>,
    /// Maximum number of documents to pull from the search service.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

/// A retrieved document reference reported back to the caller.
///
/// Scores are taken verbatim from the search service — no re-ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSource {
    pub id: String,
    pub score: f64,
    pub preview: String,
}

/// The aggregated result of one chat turn.
///
/// Built incrementally across the orchestration steps; best-effort
/// steps that fail simply leave their fields empty. `tools_used` holds
/// exactly the tools whose non-empty results were folded into context.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub response: String,
    pub model: String,
    pub sources: Vec<DocumentSource>,
    pub tool_data: Map<String, Value>,
    pub tools_used: Vec<String>,
}

/// Structured result of entity extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityExtraction {
    #[serde(default)]
    pub people: Vec<String>,
    #[serde(default)]
    pub organizations: Vec<String>,
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

/// One actionable task pulled out of free text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskItem {
    pub task: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default = "default_estimated_hours")]
    pub estimated_hours: u32,
}

fn default_category() -> String {
    "general".to_string()
}
fn default_estimated_hours() -> u32 {
    1
}

/// Structured result of task extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskExtraction {
    #[serde(default)]
    pub tasks: Vec<TaskItem>,
    #[serde(default)]
    pub estimated_time: String,
}
