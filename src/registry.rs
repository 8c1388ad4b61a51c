//! Static service registry for the API gateway.
//!
//! Maps logical service names (e.g. `"llm"`, `"search"`) to base URLs.
//! The table is built once from configuration at startup and never
//! mutated afterwards, so it is shared across request handlers via
//! `Arc` without locking.

use std::collections::HashMap;

use crate::config::GatewayConfig;

/// Immutable name → base URL table.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    services: HashMap<String, String>,
}

impl ServiceRegistry {
    /// Build the registry from the gateway configuration.
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            services: config.services.clone(),
        }
    }

    /// Resolve a logical service name to its base URL.
    ///
    /// A miss is a normal outcome (the caller maps it to 404), not an
    /// error. Names match exactly — no prefixes, no fallbacks.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.services.get(name).map(String::as_str)
    }

    /// All registered service names, sorted for stable output.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The full name → URL table (for the service-discovery endpoint).
    pub fn entries(&self) -> &HashMap<String, String> {
        &self.services
    }
}
