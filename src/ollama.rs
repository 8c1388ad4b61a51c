//! HTTP client for a local Ollama runtime.
//!
//! Wraps the three generation endpoints the LLM service uses:
//! `POST /api/chat` (message-based completion), `POST /api/generate`
//! (plain-prompt completion), and `POST /api/embed` (embedding
//! vectors), plus an availability probe against `GET /api/tags`.
//! Streaming is always disabled — callers get the full response text.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One message in a chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// Chat completion. Returns the assistant message content.
    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        debug!(model, "calling Ollama chat");
        let payload = json!({
            "model": model,
            "messages": messages,
            "stream": false,
        });

        let body = self.post_json("/api/chat", &payload).await?;
        body.get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_owned)
            .ok_or_else(|| anyhow!("Invalid Ollama chat response: missing message content"))
    }

    /// Plain-prompt completion. Returns the raw response text.
    pub async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        debug!(model, "calling Ollama generate");
        let payload = json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
        });

        let body = self.post_json("/api/generate", &payload).await?;
        body.get("response")
            .and_then(|r| r.as_str())
            .map(str::to_owned)
            .ok_or_else(|| anyhow!("Invalid Ollama generate response: missing response field"))
    }

    /// Embed a single input text. Returns the first embedding vector.
    pub async fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>> {
        debug!(model, "calling Ollama embed");
        let payload = json!({
            "model": model,
            "input": input,
        });

        let body = self.post_json("/api/embed", &payload).await?;
        let embedding = body
            .get("embeddings")
            .and_then(|e| e.as_array())
            .and_then(|e| e.first())
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow!("Invalid Ollama embed response: missing embeddings array"))?;

        Ok(embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect())
    }

    /// Returns `true` when the runtime answers its tag listing endpoint.
    pub async fn is_available(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn post_json(&self, path: &str, payload: &Value) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(payload)
            .send()
            .await
            .with_context(|| format!("Ollama request to {} failed (is Ollama running at {}?)", path, self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama API error {}: {}", status, body_text);
        }

        response
            .json()
            .await
            .with_context(|| format!("Invalid JSON from Ollama {}", path))
    }
}
