//! feedback-rag server binary
//!
//! Run with: cargo run -p feedback-rag --bin feedback-rag-server -- --config rag.toml

use clap::Parser;
use feedback_rag::{config::RagConfig, server::RagServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Question answering with feedback-aware re-ranking
#[derive(Parser, Debug)]
#[command(name = "feedback-rag-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML); defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Write the bandit state to this JSON file after loading history, then exit
    #[arg(long, value_name = "PATH")]
    export_bandit: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feedback_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Load configuration: file, then environment, then flags
    let mut config = match &args.config {
        Some(path) => RagConfig::load(path)?,
        None => RagConfig::default(),
    }
    .apply_env()?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.llm.embed_model);
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!("  - Vector search: {}", config.vector_search.base_url);
    tracing::info!("  - Ledger: {}", config.ledger.path.display());

    // Create the server; this replays the reward ledger
    let server = RagServer::new(config).await?;

    if let Some(path) = args.export_bandit {
        server.state().bandit().save_to_json(&path)?;
        return Ok(());
    }

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST /ask       - Ask a question");
    println!("  POST /feedback  - Rate an answer");
    println!("  GET  /bandit    - Inspect feedback scores");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
