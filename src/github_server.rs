//! HTTP facade over the GitHub client: resource listings plus the
//! tool-invocation endpoint consumed by the chat orchestrator.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/resources` | Repositories as `github://repo/{name}` resources |
//! | `GET` | `/resources/{repo}` | A repository's README |
//! | `POST` | `/tools/call` | Invoke `search_repos`, `search_code`, `get_issues`, or `get_commits` |
//! | `GET` | `/health` | Service health |
//! | `GET` | `/` | Informational message |
//!
//! A GitHub API failure degrades to an empty result list (logged at
//! `warn`) rather than an error response — callers treat empty and
//! error alike, and the upstream rate limiter makes transient failures
//! routine.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::github::GithubClient;

/// Build the facade router around a GitHub client.
pub fn router(client: Arc<GithubClient>) -> Router {
    Router::new()
        .route("/resources", get(handle_list_resources))
        .route("/resources/{repo}", get(handle_read_resource))
        .route("/tools/call", post(handle_tool_call))
        .route("/health", get(handle_health))
        .route("/", get(handle_root))
        .with_state(client)
}

/// Start the GitHub facade on the configured bind address.
pub async fn run_github_server(config: &Config) -> anyhow::Result<()> {
    let client = Arc::new(GithubClient::new(&config.github)?);
    let app = router(client);

    info!(bind = %config.github.bind, user = %config.github.username, "GitHub service listening");
    let listener = tokio::net::TcpListener::bind(&config.github.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ GET /resources ============

async fn handle_list_resources(State(client): State<Arc<GithubClient>>) -> Json<Value> {
    let repos = client.user_repos(50).await.unwrap_or_else(|e| {
        warn!(error = %e, "failed to list repositories");
        Vec::new()
    });

    let resources: Vec<Value> = repos
        .iter()
        .map(|repo| {
            let name = field(repo, "name");
            json!({
                "uri": format!("github://repo/{}", name),
                "name": name,
                "description": repo
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or("No description"),
                "metadata": {
                    "language": repo.get("language").cloned().unwrap_or(Value::Null),
                    "stars": repo.get("stargazers_count").and_then(Value::as_u64).unwrap_or(0),
                    "updated_at": repo.get("updated_at").cloned().unwrap_or(Value::Null),
                    "url": repo.get("html_url").cloned().unwrap_or(Value::Null),
                },
            })
        })
        .collect();

    let total = resources.len();
    Json(json!({ "resources": resources, "total": total }))
}

// ============ GET /resources/{repo} ============

async fn handle_read_resource(
    State(client): State<Arc<GithubClient>>,
    Path(repo): Path<String>,
) -> Json<Value> {
    match client.repo_readme(&repo).await {
        Ok(readme) => Json(json!({
            "uri": format!("github://repo/{}", repo),
            "name": repo,
            "content": readme,
            "mimeType": "text/markdown",
        })),
        Err(e) => {
            warn!(repo, error = %e, "failed to read README");
            Json(json!({ "error": "README not found" }))
        }
    }
}

// ============ POST /tools/call ============

#[derive(Deserialize)]
struct ToolCallRequest {
    tool: String,
    #[serde(default)]
    arguments: Value,
}

async fn handle_tool_call(
    State(client): State<Arc<GithubClient>>,
    Json(request): Json<ToolCallRequest>,
) -> Json<Value> {
    info!(tool = %request.tool, "tool call");
    let args = &request.arguments;

    match request.tool.as_str() {
        "search_repos" => {
            let query = str_arg(args, "query", "");
            let limit = int_arg(args, "limit", 10);
            let repos = fetch(client.search_repositories(&query, limit).await, "search_repos");
            let result: Vec<Value> = repos
                .iter()
                .map(|repo| {
                    json!({
                        "name": field(repo, "name"),
                        "description": field(repo, "description"),
                        "language": repo.get("language").cloned().unwrap_or(Value::Null),
                        "stars": repo.get("stargazers_count").and_then(Value::as_u64).unwrap_or(0),
                        "url": repo.get("html_url").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect();
            Json(json!({ "tool": "search_repos", "result": result }))
        }

        "search_code" => {
            let query = str_arg(args, "query", "");
            let limit = int_arg(args, "limit", 10);
            let hits = fetch(client.search_code(&query, limit).await, "search_code");
            let result: Vec<Value> = hits
                .iter()
                .map(|item| {
                    json!({
                        "file": field(item, "name"),
                        "path": field(item, "path"),
                        "repository": item
                            .get("repository")
                            .and_then(|r| r.get("name"))
                            .cloned()
                            .unwrap_or(Value::Null),
                        "url": item.get("html_url").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect();
            Json(json!({ "tool": "search_code", "result": result }))
        }

        "get_issues" => {
            let repo = str_arg(args, "repo", "");
            let state = str_arg(args, "state", "open");
            let limit = int_arg(args, "limit", 30);
            let issues = fetch(client.repo_issues(&repo, &state, limit).await, "get_issues");
            let result: Vec<Value> = issues
                .iter()
                .map(|issue| {
                    json!({
                        "number": issue.get("number").and_then(Value::as_u64).unwrap_or(0),
                        "title": field(issue, "title"),
                        "state": field(issue, "state"),
                        "created_at": issue.get("created_at").cloned().unwrap_or(Value::Null),
                        "url": issue.get("html_url").cloned().unwrap_or(Value::Null),
                        "body": body_preview(issue),
                    })
                })
                .collect();
            Json(json!({ "tool": "get_issues", "result": result }))
        }

        "get_commits" => {
            let repo = str_arg(args, "repo", "");
            let limit = int_arg(args, "limit", 10);
            let commits = fetch(client.recent_commits(&repo, limit).await, "get_commits");
            let result: Vec<Value> = commits.iter().map(commit_summary).collect();
            Json(json!({ "tool": "get_commits", "result": result }))
        }

        other => Json(json!({ "error": format!("Unknown tool: {}", other) })),
    }
}

/// Short commit view: abbreviated sha, first message line, author, date.
fn commit_summary(commit: &Value) -> Value {
    let sha = field(commit, "sha");
    let short_sha: String = sha.chars().take(7).collect();
    let message = commit
        .get("commit")
        .and_then(|c| c.get("message"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let first_line = message.lines().next().unwrap_or_default();
    let author = commit.get("commit").and_then(|c| c.get("author"));

    json!({
        "sha": short_sha,
        "message": first_line,
        "author": author.and_then(|a| a.get("name")).cloned().unwrap_or(Value::Null),
        "date": author.and_then(|a| a.get("date")).cloned().unwrap_or(Value::Null),
        "url": commit.get("html_url").cloned().unwrap_or(Value::Null),
    })
}

/// First 200 characters of an issue body, ellipsized.
fn body_preview(issue: &Value) -> String {
    let body = issue
        .get("body")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if body.is_empty() {
        String::new()
    } else if body.chars().count() > 200 {
        let truncated: String = body.chars().take(200).collect();
        format!("{}...", truncated)
    } else {
        body.to_string()
    }
}

fn field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn str_arg(args: &Value, key: &str, default: &str) -> String {
    args.get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn int_arg(args: &Value, key: &str, default: usize) -> usize {
    args.get(key)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .unwrap_or(default)
}

/// Collapse a client failure into an empty listing, logging the cause.
fn fetch(result: anyhow::Result<Vec<Value>>, tool: &str) -> Vec<Value> {
    result.unwrap_or_else(|e| {
        warn!(tool, error = %e, "GitHub call failed, returning empty result");
        Vec::new()
    })
}

// ============ Health & root ============

async fn handle_health(State(client): State<Arc<GithubClient>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "github-mcp-server",
        "github_user": client.username(),
    }))
}

async fn handle_root(State(client): State<Arc<GithubClient>>) -> Json<Value> {
    Json(json!({
        "message": "GitHub MCP Server",
        "github_user": client.username(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_summary_shortens_sha_and_message() {
        let commit = json!({
            "sha": "0123456789abcdef",
            "html_url": "https://example.com/c/0123456",
            "commit": {
                "message": "Fix the bug\n\nLong explanation here.",
                "author": {"name": "Ada", "date": "2024-01-01T00:00:00Z"},
            },
        });
        let summary = commit_summary(&commit);
        assert_eq!(summary["sha"], "0123456");
        assert_eq!(summary["message"], "Fix the bug");
        assert_eq!(summary["author"], "Ada");
    }

    #[test]
    fn body_preview_ellipsizes_long_bodies() {
        let issue = json!({"body": "x".repeat(300)});
        let preview = body_preview(&issue);
        assert_eq!(preview.chars().count(), 203);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn body_preview_empty_when_missing() {
        assert_eq!(body_preview(&json!({})), "");
    }
}
