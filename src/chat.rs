//! Chat orchestration and the LLM service's core operations.
//!
//! [`ChatService`] composes the generation client, the GitHub tool
//! client, the search client, and the response cache into a single
//! answer pipeline. One chat turn runs four strictly sequential steps:
//!
//! 1. **Retrieval** — pull scored documents from the search service
//!    into the working context (best-effort).
//! 2. **Tool selection** — ask the model which GitHub tools would help,
//!    scanning its free-text reply for the first JSON array
//!    (best-effort, fail-open to no tools).
//! 3. **Tool execution** — invoke each selected tool; only non-error,
//!    non-empty results contribute context, `tools_used`, and
//!    `tool_data` (best-effort, isolated per tool).
//! 4. **Generation** — produce the answer from the accumulated context.
//!    This is the only step whose failure fails the turn.
//!
//! Every best-effort step is a separate method returning `Result`; the
//! orchestrator branches on each outcome explicitly and logs the
//! degradation, so a failed enrichment is visible in the logs but
//! invisible to the caller beyond emptier response fields.

use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{error, warn};

use crate::cache::{cache_key, create_cache, Cache, CHAT_TTL, EMBEDDINGS_TTL};
use crate::config::LlmConfig;
use crate::json_scan;
use crate::mcp_client::McpClient;
use crate::models::{ChatOutcome, ChatTurn, DocumentSource, EntityExtraction, TaskExtraction};
use crate::ollama::OllamaClient;
use crate::prompts;
use crate::search_client::SearchClient;

/// GitHub tools in their fixed execution order, paired with the
/// `tool_data` category each one feeds.
const GITHUB_TOOLS: [(&str, &str); 4] = [
    ("github_repos", "repos"),
    ("github_code", "code"),
    ("github_issues", "issues"),
    ("github_commits", "commits"),
];

/// Characters of document content kept in a source preview.
const PREVIEW_CHARS: usize = 100;

/// Turn-level failure. Only the final generation step can produce one;
/// its message passes through verbatim since it originates from our
/// own collaborator, not external input.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    Generation(anyhow::Error),
}

/// Health snapshot for the LLM service.
#[derive(Debug, Serialize)]
pub struct LlmHealth {
    pub ollama_available: bool,
    pub model: String,
    pub status: String,
}

pub struct ChatService {
    ollama: OllamaClient,
    tools: McpClient,
    search: SearchClient,
    cache: Box<dyn Cache>,
    model: String,
    embedding_model: String,
    embedding_dims: usize,
}

impl ChatService {
    /// Wire up all collaborators from configuration.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            ollama: OllamaClient::new(&config.ollama_url)?,
            tools: McpClient::new(&config.github_url)?,
            search: SearchClient::new(&config.search_url)?,
            cache: create_cache(&config.cache)?,
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
            embedding_dims: config.embedding_dims,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    // ============ Chat turn orchestration ============

    /// Run one full chat turn: retrieval, tool selection, tool
    /// execution, generation.
    pub async fn chat_turn(&self, turn: ChatTurn) -> Result<ChatOutcome, ChatError> {
        let mut context = turn.context.clone();
        let mut sources = Vec::new();

        // Step 1: retrieval. Failure leaves context untouched.
        match self.retrieve(&turn.message, turn.search_limit).await {
            Ok(hits) => {
                for hit in hits {
                    sources.push(DocumentSource {
                        id: hit.document_id,
                        score: hit.score,
                        preview: preview(&hit.content, PREVIEW_CHARS),
                    });
                    context.push(hit.content);
                }
            }
            Err(reason) => {
                warn!(%reason, "retrieval degraded, continuing without documents");
            }
        }

        // Step 2: tool selection. Fail-open to no tools, no retries.
        let requested = match self.select_tools(&turn.message).await {
            Ok(tools) => tools,
            Err(reason) => {
                warn!(%reason, "tool selection degraded, skipping tools");
                Vec::new()
            }
        };

        // Step 3: tool execution, isolated per tool, fixed order.
        let mut tools_used = Vec::new();
        let mut tool_data = Map::new();
        for (tool, category) in GITHUB_TOOLS {
            if !requested.iter().any(|r| r == tool) {
                continue;
            }
            match self.run_tool(tool, &turn.message).await {
                Ok(Some((summary, result))) => {
                    context.push(summary);
                    tools_used.push(tool.to_string());
                    tool_data.insert(category.to_string(), result);
                }
                Ok(None) => {} // nothing to contribute, silently skipped
                Err(reason) => {
                    warn!(tool, %reason, "tool call degraded, skipping");
                }
            }
        }

        // Step 4: generation. The only step allowed to fail the turn.
        let response = self
            .chat(&turn.message, &context)
            .await
            .map_err(ChatError::Generation)?;

        Ok(ChatOutcome {
            response,
            model: self.model.clone(),
            sources,
            tool_data,
            tools_used,
        })
    }

    async fn retrieve(
        &self,
        message: &str,
        limit: usize,
    ) -> Result<Vec<crate::search_client::SearchHit>> {
        self.search.query(message, limit).await
    }

    /// Ask the model which tools to use and scan its reply for the
    /// first JSON array. An unparseable reply is an empty selection,
    /// not an error.
    async fn select_tools(&self, message: &str) -> Result<Vec<String>> {
        let prompt = prompts::build_tool_selection_prompt(message);
        let raw = self.ollama.generate(&self.model, &prompt).await?;

        let requested = json_scan::first_json_array(&raw)
            .map(|items| {
                items
                    .into_iter()
                    .filter_map(|v| v.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default();
        Ok(requested)
    }

    /// Execute one GitHub tool.
    ///
    /// Returns `Ok(Some((context summary, raw result)))` for a usable
    /// result, `Ok(None)` when the tool legitimately has nothing
    /// (empty result, no resources to query), and `Err` for failures.
    async fn run_tool(&self, tool: &str, message: &str) -> Result<Option<(String, Value)>> {
        let response = match tool {
            "github_repos" => {
                self.tools
                    .call_tool("search_repos", json!({ "query": "", "limit": 10 }))
                    .await?
            }
            "github_code" => {
                self.tools
                    .call_tool("search_code", json!({ "query": message, "limit": 5 }))
                    .await?
            }
            "github_issues" => {
                let Some(repo) = self.first_resource_name().await? else {
                    return Ok(None);
                };
                self.tools
                    .call_tool(
                        "get_issues",
                        json!({ "repo": repo, "state": "open", "limit": 10 }),
                    )
                    .await?
            }
            "github_commits" => {
                let Some(repo) = self.first_resource_name().await? else {
                    return Ok(None);
                };
                self.tools
                    .call_tool("get_commits", json!({ "repo": repo, "limit": 10 }))
                    .await?
            }
            other => return Err(anyhow!("unknown tool: {}", other)),
        };

        if let Some(error) = response.get("error") {
            return Err(anyhow!("tool returned error: {}", error));
        }

        let result = response.get("result").cloned().unwrap_or(Value::Null);
        let items = match result.as_array() {
            Some(items) if !items.is_empty() => items.clone(),
            _ => return Ok(None),
        };

        Ok(Some((summarize_tool_result(tool, &items), result)))
    }

    /// Name of the first listed resource, if any.
    async fn first_resource_name(&self) -> Result<Option<String>> {
        let resources = self.tools.list_resources().await?;
        Ok(resources
            .first()
            .and_then(|r| r.get("name"))
            .and_then(|n| n.as_str())
            .map(str::to_owned))
    }

    // ============ Cached generation operations ============

    /// Chat with optional context. Cached for an hour on the exact
    /// (message, context) pair; a hit skips generation entirely.
    pub async fn chat(&self, message: &str, context: &[String]) -> Result<String> {
        let context_joined = context.join("\n");
        let key = cache_key("chat", &[message, &context_joined]);
        if let Some(hit) = self.cache.get(&key).await {
            if let Some(cached) = hit.as_str() {
                return Ok(cached.to_string());
            }
        }

        let messages = prompts::build_chat_messages(message, context);
        let response = self.ollama.chat(&self.model, &messages).await?;
        let result = response.trim().to_string();

        self.cache
            .set(&key, &Value::String(result.clone()), CHAT_TTL)
            .await;
        Ok(result)
    }

    /// Extract entities from text. Degrades to a typed fallback rather
    /// than failing — extraction is an enrichment, not a contract.
    pub async fn extract_entities(&self, text: &str) -> EntityExtraction {
        let key = cache_key("extract", &[text]);
        if let Some(hit) = self.cache.get(&key).await {
            if let Ok(cached) = serde_json::from_value(hit) {
                return cached;
            }
        }

        match self.generate_entities(text).await {
            Ok(extraction) => {
                if let Ok(value) = serde_json::to_value(&extraction) {
                    self.cache.set(&key, &value, CHAT_TTL).await;
                }
                extraction
            }
            Err(e) => {
                error!(error = %e, "entity extraction failed");
                EntityExtraction {
                    concepts: vec!["Error processing".to_string()],
                    summary: format!("Error: {}", e),
                    ..EntityExtraction::default()
                }
            }
        }
    }

    async fn generate_entities(&self, text: &str) -> Result<EntityExtraction> {
        let prompt = prompts::build_extraction_prompt(text);
        let raw = self.ollama.generate(&self.model, &prompt).await?;
        let value = json_scan::first_json_object(&raw)
            .ok_or_else(|| anyhow!("model output contained no JSON object"))?;
        Ok(serde_json::from_value(value)?)
    }

    /// Extract actionable tasks from text, with the same degrade shape
    /// as entity extraction.
    pub async fn extract_tasks(&self, text: &str) -> TaskExtraction {
        let key = cache_key("tasks", &[text]);
        if let Some(hit) = self.cache.get(&key).await {
            if let Ok(cached) = serde_json::from_value(hit) {
                return cached;
            }
        }

        match self.generate_tasks(text).await {
            Ok(extraction) => {
                if let Ok(value) = serde_json::to_value(&extraction) {
                    self.cache.set(&key, &value, CHAT_TTL).await;
                }
                extraction
            }
            Err(e) => {
                error!(error = %e, "task extraction failed");
                TaskExtraction {
                    tasks: Vec::new(),
                    estimated_time: format!("Failed to extract tasks: {}", e),
                }
            }
        }
    }

    async fn generate_tasks(&self, text: &str) -> Result<TaskExtraction> {
        let prompt = prompts::build_task_extraction_prompt(text);
        let raw = self.ollama.generate(&self.model, &prompt).await?;
        let value = json_scan::first_json_object(&raw)
            .ok_or_else(|| anyhow!("model output contained no JSON object"))?;
        Ok(serde_json::from_value(value)?)
    }

    /// Generate an embedding vector for `text`. Cached for a day;
    /// failure yields a zero vector so vector pipelines keep moving.
    pub async fn create_embeddings(&self, text: &str) -> Vec<f32> {
        let key = cache_key("embeddings", &[text]);
        if let Some(hit) = self.cache.get(&key).await {
            if let Ok(cached) = serde_json::from_value::<Vec<f32>>(hit) {
                return cached;
            }
        }

        match self.ollama.embed(&self.embedding_model, text).await {
            Ok(embedding) => {
                if let Ok(value) = serde_json::to_value(&embedding) {
                    self.cache.set(&key, &value, EMBEDDINGS_TTL).await;
                }
                embedding
            }
            Err(e) => {
                error!(error = %e, "embedding generation failed");
                vec![0.0; self.embedding_dims]
            }
        }
    }

    /// Summarize text to roughly `max_length` characters. Uncached.
    pub async fn summarize_text(&self, text: &str, max_length: usize) -> Result<String> {
        let prompt = prompts::build_summarization_prompt(text, max_length);
        let response = self.ollama.generate(&self.model, &prompt).await?;

        let summary = response.trim();
        if summary.chars().count() > max_length {
            let truncated: String = summary.chars().take(max_length).collect();
            Ok(format!("{}...", truncated))
        } else {
            Ok(summary.to_string())
        }
    }

    /// Service health with runtime availability.
    pub async fn health(&self) -> LlmHealth {
        let available = self.ollama.is_available().await;
        LlmHealth {
            ollama_available: available,
            model: self.model.clone(),
            status: if available {
                "healthy".to_string()
            } else {
                "ollama_unavailable".to_string()
            },
        }
    }
}

/// First `max` characters of a document, for source previews.
fn preview(content: &str, max: usize) -> String {
    content.chars().take(max).collect()
}

/// Render a tool result as a short text block for the chat context.
fn summarize_tool_result(tool: &str, items: &[Value]) -> String {
    let text = |v: &Value, key: &str| -> String {
        v.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    match tool {
        "github_repos" => {
            let mut out = String::from("GitHub repositories:\n");
            for item in items {
                out.push_str(&format!(
                    "- {}: {}\n",
                    text(item, "name"),
                    text(item, "description")
                ));
            }
            out
        }
        "github_code" => {
            let mut out = String::from("Code search results:\n");
            for item in items {
                out.push_str(&format!(
                    "- {} in {} ({})\n",
                    text(item, "file"),
                    text(item, "repository"),
                    text(item, "path")
                ));
            }
            out
        }
        "github_issues" => {
            let mut out = String::from("Open issues:\n");
            for item in items {
                let number = item.get("number").and_then(Value::as_u64).unwrap_or(0);
                out.push_str(&format!("- #{}: {}\n", number, text(item, "title")));
            }
            out
        }
        "github_commits" => {
            let mut out = String::from("Recent commits:\n");
            for item in items {
                out.push_str(&format!(
                    "- {}: {}\n",
                    text(item, "sha"),
                    text(item, "message")
                ));
            }
            out
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundaries() {
        let doc = "héllo wörld".repeat(20);
        let p = preview(&doc, 100);
        assert_eq!(p.chars().count(), 100);
    }

    #[test]
    fn preview_keeps_short_content_whole() {
        assert_eq!(preview("short", 100), "short");
    }

    #[test]
    fn repos_summary_lists_names() {
        let items = vec![
            json!({"name": "alpha", "description": "first"}),
            json!({"name": "beta", "description": "second"}),
        ];
        let summary = summarize_tool_result("github_repos", &items);
        assert!(summary.contains("- alpha: first"));
        assert!(summary.contains("- beta: second"));
    }

    #[test]
    fn issues_summary_includes_numbers() {
        let items = vec![json!({"number": 42, "title": "crash on start"})];
        let summary = summarize_tool_result("github_issues", &items);
        assert!(summary.contains("#42: crash on start"));
    }
}
