//! # Knowledge Mesh
//!
//! A personal knowledge-assistant backend: an API gateway, an
//! LLM service, and a GitHub tool service, shipped as one binary
//! (`kmesh`) with a `serve` subcommand per service.
//!
//! ## Architecture
//!
//! ```text
//!               ┌─────────────┐
//!  client ────▶ │   Gateway    │──▶ /api/v1/{service}/... proxied
//!               │  (registry)  │        by name to a backend
//!               └─────────────┘
//!
//!               ┌─────────────┐    ┌────────┐ ┌────────┐
//!  client ────▶ │ LLM Service  │──▶│ Search │ │ Ollama │
//!               │ (chat turn)  │    └────────┘ └────────┘
//!               └──────┬──────┘         ┌───────┐
//!                      └───────────────▶│ Redis │
//!                      │                └───────┘
//!               ┌──────▼──────┐    ┌─────────────┐
//!               │GitHub Facade │──▶│ GitHub REST  │
//!               │ (tools/call) │    └─────────────┘
//!               └─────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration with environment overrides |
//! | [`registry`] | Static service-name → URL registry |
//! | [`proxy`] | Request forwarding and error translation |
//! | [`gateway`] | Gateway HTTP surface |
//! | [`ollama`] | Generation runtime client |
//! | [`search_client`] | Vector search client |
//! | [`mcp_client`] | Tool-invocation client |
//! | [`cache`] | Response cache (Redis / memory / disabled) |
//! | [`prompts`] | Prompt templates |
//! | [`json_scan`] | Permissive JSON extraction from model output |
//! | [`chat`] | Chat orchestration and LLM operations |
//! | [`llm_server`] | LLM service HTTP surface |
//! | [`github`] | GitHub REST client |
//! | [`github_server`] | GitHub facade HTTP surface |

pub mod cache;
pub mod chat;
pub mod config;
pub mod gateway;
pub mod github;
pub mod github_server;
pub mod json_scan;
pub mod llm_server;
pub mod mcp_client;
pub mod models;
pub mod ollama;
pub mod prompts;
pub mod proxy;
pub mod registry;
pub mod search_client;
