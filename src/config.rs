use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub github: GithubConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// Logical service name → base URL. Fixed at startup.
    #[serde(default = "default_services")]
    pub services: HashMap<String, String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_gateway_bind(),
            cors_origins: default_cors_origins(),
            services: default_services(),
        }
    }
}

fn default_gateway_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

fn default_services() -> HashMap<String, String> {
    HashMap::from([
        ("llm".to_string(), "http://localhost:8002".to_string()),
        ("content".to_string(), "http://localhost:8003".to_string()),
        ("search".to_string(), "http://localhost:8004".to_string()),
        ("ws".to_string(), "http://localhost:8005".to_string()),
    ])
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_bind")]
    pub bind: String,
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dims")]
    pub embedding_dims: usize,
    #[serde(default = "default_search_url")]
    pub search_url: String,
    #[serde(default = "default_github_url")]
    pub github_url: String,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            bind: default_llm_bind(),
            ollama_url: default_ollama_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            embedding_dims: default_embedding_dims(),
            search_url: default_search_url(),
            github_url: default_github_url(),
            cache: CacheConfig::default(),
        }
    }
}

fn default_llm_bind() -> String {
    "0.0.0.0:8002".to_string()
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "phi3:mini".to_string()
}
fn default_embedding_model() -> String {
    "mxbai-embed-large".to_string()
}
fn default_embedding_dims() -> usize {
    384
}
fn default_search_url() -> String {
    "http://localhost:8004".to_string()
}
fn default_github_url() -> String {
    "http://localhost:8006".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Cache backend: `redis`, `memory`, or `disabled`.
    #[serde(default = "default_cache_provider")]
    pub provider: String,
    #[serde(default = "default_redis_url")]
    pub url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            provider: default_cache_provider(),
            url: default_redis_url(),
        }
    }
}

fn default_cache_provider() -> String {
    "redis".to_string()
}
fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    #[serde(default = "default_github_bind")]
    pub bind: String,
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub username: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            bind: default_github_bind(),
            api_url: default_github_api_url(),
            token: String::new(),
            username: String::new(),
        }
    }
}

fn default_github_bind() -> String {
    "0.0.0.0:8006".to_string()
}
fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

/// Load configuration from a TOML file, then apply environment overrides.
///
/// A missing config file is not an error: the built-in defaults are used
/// and environment variables still apply, so a container deployment can
/// run with no file at all.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config);

    // Validate gateway registry
    for (name, url) in &config.gateway.services {
        if name.is_empty() || url.is_empty() {
            anyhow::bail!("gateway.services entries must have non-empty names and URLs");
        }
    }

    // Validate cache provider
    match config.llm.cache.provider.as_str() {
        "redis" | "memory" | "disabled" => {}
        other => anyhow::bail!(
            "Unknown cache provider: '{}'. Must be redis, memory, or disabled.",
            other
        ),
    }

    if config.llm.embedding_dims == 0 {
        anyhow::bail!("llm.embedding_dims must be > 0");
    }

    Ok(config)
}

/// Apply environment variable overrides on top of file/default values.
///
/// Every deployment-varying value can be set without a config file:
/// bind addresses, downstream URLs, model identifiers, the Redis address,
/// CORS origins, and the GitHub token/username.
fn apply_env_overrides(config: &mut Config) {
    if let Ok(v) = std::env::var("GATEWAY_BIND") {
        config.gateway.bind = v;
    }
    if let Ok(v) = std::env::var("CORS_ORIGINS") {
        config.gateway.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
    }
    if let Ok(v) = std::env::var("LLM_BIND") {
        config.llm.bind = v;
    }
    if let Ok(v) = std::env::var("OLLAMA_URL") {
        config.llm.ollama_url = v;
    }
    if let Ok(v) = std::env::var("OLLAMA_MODEL") {
        config.llm.model = v;
    }
    if let Ok(v) = std::env::var("OLLAMA_EMBEDDING_MODEL") {
        config.llm.embedding_model = v;
    }
    if let Ok(v) = std::env::var("SEARCH_SERVICE_URL") {
        config.llm.search_url = v;
    }
    if let Ok(v) = std::env::var("GITHUB_MCP_URL") {
        config.llm.github_url = v;
    }
    if let Ok(v) = std::env::var("REDIS_URL") {
        config.llm.cache.url = v;
    }
    if let Ok(v) = std::env::var("GITHUB_BIND") {
        config.github.bind = v;
    }
    if let Ok(v) = std::env::var("GITHUB_TOKEN") {
        config.github.token = v;
    }
    if let Ok(v) = std::env::var("GITHUB_USERNAME") {
        config.github.username = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.gateway.bind, "0.0.0.0:8000");
        assert_eq!(config.gateway.services["llm"], "http://localhost:8002");
        assert_eq!(config.llm.model, "phi3:mini");
        assert_eq!(config.llm.cache.provider, "redis");
    }

    #[test]
    fn parse_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kmesh.toml");
        std::fs::write(
            &path,
            r#"
[gateway]
bind = "127.0.0.1:9000"

[gateway.services]
llm = "http://llm:8002"

[llm.cache]
provider = "memory"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.gateway.bind, "127.0.0.1:9000");
        assert_eq!(config.gateway.services.len(), 1);
        assert_eq!(config.llm.cache.provider, "memory");
        // Untouched sections keep their defaults
        assert_eq!(config.llm.ollama_url, "http://localhost:11434");
    }

    #[test]
    fn rejects_unknown_cache_provider() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kmesh.toml");
        std::fs::write(&path, "[llm.cache]\nprovider = \"memcached\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
