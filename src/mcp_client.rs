//! HTTP client for the GitHub tool service.
//!
//! Speaks the tool-invocation contract: `POST /tools/call` with
//! `{tool, arguments}` and the resource listing endpoints. The chat
//! orchestrator treats every call as best-effort, so errors propagate
//! as plain `anyhow::Error` values for the caller to absorb.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct McpClient {
    base_url: String,
    client: reqwest::Client,
}

impl McpClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// Invoke a named tool. Returns the full response payload, which is
    /// either `{"tool": ..., "result": ...}` or `{"error": ...}`.
    pub async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value> {
        debug!(tool, "calling GitHub tool");
        let response = self
            .client
            .post(format!("{}/tools/call", self.base_url))
            .json(&json!({ "tool": tool, "arguments": arguments }))
            .send()
            .await
            .with_context(|| format!("Tool call '{}' failed", tool))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Tool call '{}' returned {}", tool, status);
        }

        response
            .json()
            .await
            .with_context(|| format!("Invalid JSON from tool call '{}'", tool))
    }

    /// List available resources (repositories). Unwraps the `resources`
    /// array from the listing payload.
    pub async fn list_resources(&self) -> Result<Vec<Value>> {
        let response = self
            .client
            .get(format!("{}/resources", self.base_url))
            .send()
            .await
            .context("Resource listing failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Resource listing returned {}", status);
        }

        let body: Value = response
            .json()
            .await
            .context("Invalid JSON from resource listing")?;

        Ok(body
            .get("resources")
            .and_then(|r| r.as_array())
            .cloned()
            .unwrap_or_default())
    }

    /// Read a single resource (a repository's README payload).
    pub async fn read_resource(&self, name: &str) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}/resources/{}", self.base_url, name))
            .send()
            .await
            .with_context(|| format!("Reading resource '{}' failed", name))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Reading resource '{}' returned {}", name, status);
        }

        response
            .json()
            .await
            .with_context(|| format!("Invalid JSON from resource '{}'", name))
    }
}
