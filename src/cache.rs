//! Response cache abstraction and implementations.
//!
//! The cache is an optional accelerator for operations that call the
//! generation runtime directly: a hit skips generation entirely, a miss
//! or store failure only loses the optimization. Both trait methods
//! therefore absorb backend errors — an unreachable store behaves like
//! a permanent miss and is never surfaced to callers.
//!
//! Implementations:
//! - **[`RedisCache`]** — shared store for multi-process deployments.
//! - **[`MemoryCache`]** — in-process TTL map for development and tests.
//! - **[`DisabledCache`]** — always misses; used when caching is off.
//!
//! Selection follows the configuration's `provider` field via
//! [`create_cache`]. Keys are deterministic SHA-256 digests built by
//! [`cache_key`], so identical `(operation, inputs)` pairs collide by
//! construction and overlapping writers converge on last-write-wins.

use async_trait::async_trait;
use redis::AsyncCommands;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::CacheConfig;

/// TTL for cached chat and extraction results.
pub const CHAT_TTL: Duration = Duration::from_secs(3600);
/// TTL for cached embedding vectors.
pub const EMBEDDINGS_TTL: Duration = Duration::from_secs(86_400);

/// Get/set interface over a JSON-value store with per-entry expiry.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Look up a key. `None` on miss, expiry, or backend failure.
    async fn get(&self, key: &str) -> Option<Value>;
    /// Store a value with a TTL. Failures are logged and swallowed.
    async fn set(&self, key: &str, value: &Value, ttl: Duration);
}

/// Deterministic cache key from an operation name and its inputs.
pub fn cache_key(operation: &str, parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    for part in parts {
        hasher.update(b":");
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Build the cache selected by configuration.
pub fn create_cache(config: &CacheConfig) -> anyhow::Result<Box<dyn Cache>> {
    match config.provider.as_str() {
        "redis" => Ok(Box::new(RedisCache::connect(&config.url))),
        "memory" => Ok(Box::new(MemoryCache::new())),
        "disabled" => Ok(Box::new(DisabledCache)),
        other => anyhow::bail!("Unknown cache provider: {}", other),
    }
}

// ============ Disabled ============

/// A cache that never hits and never stores.
pub struct DisabledCache;

#[async_trait]
impl Cache for DisabledCache {
    async fn get(&self, _key: &str) -> Option<Value> {
        None
    }
    async fn set(&self, _key: &str, _value: &Value, _ttl: Duration) {}
}

// ============ Memory ============

/// In-process TTL cache backed by a plain map.
///
/// Entries are dropped lazily on lookup; there is no background
/// sweeper, which is fine for the short-lived test and dev workloads
/// this implementation serves.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Value, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), (value.clone(), Instant::now() + ttl));
        }
    }
}

// ============ Redis ============

/// Redis-backed cache.
///
/// The client handle is created eagerly (URL parse only); connections
/// are established per operation. Any failure — bad URL, unreachable
/// server, serialization — degrades to miss/no-op with a warning.
pub struct RedisCache {
    client: Option<redis::Client>,
}

impl RedisCache {
    pub fn connect(url: &str) -> Self {
        match redis::Client::open(url) {
            Ok(client) => Self {
                client: Some(client),
            },
            Err(e) => {
                warn!(url, error = %e, "invalid Redis URL, caching disabled");
                Self { client: None }
            }
        }
    }

    async fn connection(&self) -> Option<redis::aio::MultiplexedConnection> {
        let client = self.client.as_ref()?;
        match client.get_multiplexed_async_connection().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                warn!(error = %e, "Redis unavailable, treating as cache miss");
                None
            }
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let mut conn = self.connection().await?;
        let payload: Option<String> = match conn.get(key).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Redis get failed");
                return None;
            }
        };

        match payload {
            Some(payload) => match serde_json::from_str(&payload) {
                Ok(value) => {
                    debug!(key = &key[..key.len().min(12)], "cache hit");
                    Some(value)
                }
                Err(e) => {
                    warn!(error = %e, "cached payload was not valid JSON");
                    None
                }
            },
            None => None,
        }
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) {
        let Some(mut conn) = self.connection().await else {
            return;
        };
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to serialize cache value");
                return;
            }
        };
        if let Err(e) = conn.set_ex::<_, _, ()>(key, payload, ttl.as_secs()).await {
            warn!(error = %e, "Redis set failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_inputs_produce_identical_keys() {
        let a = cache_key("chat", &["hello", "ctx"]);
        let b = cache_key("chat", &["hello", "ctx"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64); // SHA-256 hex
    }

    #[test]
    fn different_operations_produce_different_keys() {
        let a = cache_key("chat", &["hello"]);
        let b = cache_key("extract", &["hello"]);
        assert_ne!(a, b);
    }

    #[test]
    fn different_inputs_produce_different_keys() {
        let a = cache_key("chat", &["hello"]);
        let b = cache_key("chat", &["goodbye"]);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn memory_cache_roundtrip() {
        let cache = MemoryCache::new();
        let key = cache_key("chat", &["q"]);
        assert!(cache.get(&key).await.is_none());

        cache.set(&key, &json!("answer"), CHAT_TTL).await;
        assert_eq!(cache.get(&key).await, Some(json!("answer")));
    }

    #[tokio::test]
    async fn memory_cache_expires() {
        let cache = MemoryCache::new();
        cache.set("k", &json!(1), Duration::from_millis(10)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn disabled_cache_never_hits() {
        let cache = DisabledCache;
        cache.set("k", &json!(1), CHAT_TTL).await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn unreachable_redis_is_a_miss_not_an_error() {
        // Nothing listens on this port; get/set must degrade silently.
        let cache = RedisCache::connect("redis://127.0.0.1:1/");
        cache.set("k", &json!(1), CHAT_TTL).await;
        assert!(cache.get("k").await.is_none());
    }
}
