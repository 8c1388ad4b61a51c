//! Read-only client for the GitHub REST API.
//!
//! Scoped to a single user's account: repository listing, repository
//! and code search, README retrieval, and issue/commit listings. The
//! API base URL is configurable so tests (and GitHub Enterprise
//! deployments) can point it elsewhere.

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::GithubConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct GithubClient {
    api_url: String,
    token: String,
    username: String,
    client: reqwest::Client,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            api_url: config.api_url.clone(),
            token: config.token.clone(),
            username: config.username.clone(),
            client,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The user's own repositories, most recently updated first.
    pub async fn user_repos(&self, limit: usize) -> Result<Vec<Value>> {
        let url = format!("{}/users/{}/repos", self.api_url, self.username);
        let body = self
            .get_json(
                &url,
                &[
                    ("sort", "updated".to_string()),
                    ("per_page", limit.to_string()),
                    ("type", "owner".to_string()),
                ],
            )
            .await?;
        body.as_array()
            .cloned()
            .ok_or_else(|| anyhow!("GitHub repo listing was not an array"))
    }

    /// Search repositories, scoped to the user's account.
    pub async fn search_repositories(&self, query: &str, limit: usize) -> Result<Vec<Value>> {
        let url = format!("{}/search/repositories", self.api_url);
        let body = self
            .get_json(
                &url,
                &[
                    ("q", format!("{} user:{}", query, self.username)),
                    ("per_page", limit.to_string()),
                    ("sort", "updated".to_string()),
                ],
            )
            .await?;
        Ok(items(&body))
    }

    /// Search code across the user's repositories.
    pub async fn search_code(&self, query: &str, limit: usize) -> Result<Vec<Value>> {
        let url = format!("{}/search/code", self.api_url);
        let body = self
            .get_json(
                &url,
                &[
                    ("q", format!("{} user:{}", query, self.username)),
                    ("per_page", limit.to_string()),
                ],
            )
            .await?;
        Ok(items(&body))
    }

    /// A repository's README, decoded from the API's base64 payload.
    pub async fn repo_readme(&self, repo_name: &str) -> Result<String> {
        let url = format!(
            "{}/repos/{}/{}/readme",
            self.api_url, self.username, repo_name
        );
        let body = self.get_json(&url, &[]).await?;

        let encoded = body
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("README response had no content field"))?;

        // The API wraps base64 at 60 columns; strip the newlines first.
        let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(cleaned)
            .context("README content was not valid base64")?;
        String::from_utf8(bytes).context("README content was not valid UTF-8")
    }

    /// Issues for one repository.
    pub async fn repo_issues(
        &self,
        repo_name: &str,
        state: &str,
        limit: usize,
    ) -> Result<Vec<Value>> {
        let url = format!(
            "{}/repos/{}/{}/issues",
            self.api_url, self.username, repo_name
        );
        let body = self
            .get_json(
                &url,
                &[
                    ("state", state.to_string()),
                    ("per_page", limit.to_string()),
                ],
            )
            .await?;
        body.as_array()
            .cloned()
            .ok_or_else(|| anyhow!("GitHub issue listing was not an array"))
    }

    /// Recent commits for one repository.
    pub async fn recent_commits(&self, repo_name: &str, limit: usize) -> Result<Vec<Value>> {
        let url = format!(
            "{}/repos/{}/{}/commits",
            self.api_url, self.username, repo_name
        );
        let body = self
            .get_json(&url, &[("per_page", limit.to_string())])
            .await?;
        body.as_array()
            .cloned()
            .ok_or_else(|| anyhow!("GitHub commit listing was not an array"))
    }

    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> Result<Value> {
        debug!(url, "calling GitHub API");
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
            .query(params)
            .send()
            .await
            .with_context(|| format!("GitHub request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            anyhow::bail!("GitHub API error {}: {}", status, body_text);
        }

        response
            .json()
            .await
            .with_context(|| format!("Invalid JSON from GitHub {}", url))
    }
}

/// Unwrap the `items` array from a search response.
fn items(body: &Value) -> Vec<Value> {
    body.get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn items_unwraps_search_payload() {
        let body = json!({"total_count": 2, "items": [{"name": "a"}, {"name": "b"}]});
        assert_eq!(items(&body).len(), 2);
    }

    #[test]
    fn items_tolerates_missing_field() {
        assert!(items(&json!({"total_count": 0})).is_empty());
    }
}
