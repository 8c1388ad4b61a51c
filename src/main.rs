//! # Knowledge Mesh CLI (`kmesh`)
//!
//! One binary runs all three services of the knowledge-assistant
//! backend; pick one with `kmesh serve <service>`:
//!
//! ```bash
//! kmesh serve gateway     # API gateway on :8000
//! kmesh serve llm         # LLM service on :8002
//! kmesh serve github      # GitHub tool service on :8006
//! kmesh services          # print the gateway's service registry
//! ```
//!
//! All commands accept a `--config` flag pointing to a TOML file; a
//! missing file falls back to built-in defaults, and environment
//! variables (`OLLAMA_URL`, `REDIS_URL`, `GITHUB_TOKEN`, ...) override
//! either. Log verbosity follows `RUST_LOG`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use knowledge_mesh::{config, gateway, github_server, llm_server, registry};

/// Knowledge Mesh — a personal knowledge-assistant backend.
#[derive(Parser)]
#[command(
    name = "kmesh",
    about = "Knowledge Mesh — API gateway, LLM service, and GitHub tool service",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Missing files are fine: defaults apply, environment overrides
    /// still take effect.
    #[arg(long, global = true, default_value = "./config/kmesh.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start one of the backend services.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },

    /// Print the gateway's service registry (name → URL).
    Services,
}

#[derive(Subcommand)]
enum ServeService {
    /// The API gateway: proxies /api/v1/{service}/{path} by name.
    Gateway,
    /// The LLM service: chat orchestration, extraction, embeddings.
    Llm,
    /// The GitHub tool service: resources and tools/call.
    Github,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "knowledge_mesh=info,kmesh=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve { service } => match service {
            ServeService::Gateway => gateway::run_gateway(&cfg).await?,
            ServeService::Llm => llm_server::run_llm_server(&cfg).await?,
            ServeService::Github => github_server::run_github_server(&cfg).await?,
        },
        Commands::Services => {
            let registry = registry::ServiceRegistry::from_config(&cfg.gateway);
            for name in registry.names() {
                // names() is sorted, so output is stable
                if let Some(url) = registry.resolve(name) {
                    println!("{} -> {}", name, url);
                }
            }
        }
    }

    Ok(())
}
