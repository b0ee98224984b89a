//! Stability AI MCP server binary.
//!
//! Serves over stdio for MCP clients such as Claude Desktop or Cursor.

use anyhow::Context;
use clap::Parser;
use rmcp::ServiceExt;
use stability_contracts::models::DEFAULT_MODEL;
use stability_mcp::{Config, StabilityMcpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging goes to stderr (stdout reserved for MCP in stdio mode)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stability_mcp=info,stability_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::parse();
    let engine = config.engine().inspect_err(|e| {
        tracing::error!("{}", e);
    })?;
    let storage_root = engine
        .storage()
        .resolve_root()
        .context("image storage directory is not usable")?;

    tracing::info!(
        api_base = %config.api_base,
        storage = %storage_root.display(),
        max_files = ?config.max_files,
        default_model = DEFAULT_MODEL.key(),
        transport = %config.transport,
        "Starting Stability AI MCP server"
    );

    let server = StabilityMcpServer::new(engine);

    match config.transport.as_str() {
        "stdio" => {
            let service = server
                .serve(rmcp::transport::stdio())
                .await
                .inspect_err(|e| {
                    tracing::error!("Failed to start MCP server: {}", e);
                })?;
            service.waiting().await?;
        }
        other => {
            anyhow::bail!(
                "Unsupported transport: {}. Only 'stdio' is currently supported.",
                other
            );
        }
    }

    Ok(())
}
