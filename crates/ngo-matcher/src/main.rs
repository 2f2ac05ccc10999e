mod analysis;
mod config;
mod engine;
mod error;
mod http;
mod patterns;
mod ranking;
mod server;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ngo_common::directory::NgoDirectory;
use ngo_common::file_directory::FileDirectory;
use ngo_common::http_directory::{HttpDirectory, HttpDirectoryConfig};

use config::{Config, DirectorySource};
use engine::RecommendationEngine;
use patterns::PatternSet;
use server::NgoMatcherServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is reserved for MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting ngo-matcher");

    let config = Config::from_env()?;
    info!(
        directory = ?config.directory,
        match_mode = ?config.match_mode,
        retrieval_timeout_ms = config.retrieval_timeout.as_millis(),
        retrieval_limit = config.retrieval_limit,
        "configuration loaded"
    );

    // Pattern problems are fatal here, never per request.
    let patterns = match &config.patterns_file {
        Some(path) => PatternSet::from_file(path, config.match_mode)?,
        None => PatternSet::builtin(config.match_mode)?,
    };
    info!(
        categories = patterns.patterns().len(),
        urgency_terms = patterns.urgency_terms().len(),
        "category patterns ready"
    );

    let directory: Arc<dyn NgoDirectory> = match &config.directory {
        DirectorySource::Http { base_url } => {
            let directory_config = HttpDirectoryConfig::from_env(base_url);
            info!(
                base_url = %directory_config.base_url,
                timeout_ms = directory_config.timeout.as_millis(),
                max_retries = directory_config.max_retries,
                "NGO directory client configured"
            );
            let budget = directory_config.worst_case_duration();
            if budget > config.retrieval_timeout {
                warn!(
                    retry_budget_ms = budget.as_millis(),
                    retrieval_timeout_ms = config.retrieval_timeout.as_millis(),
                    "directory retries cannot finish within RETRIEVAL_TIMEOUT_MS"
                );
            }
            Arc::new(HttpDirectory::new(directory_config)?)
        }
        DirectorySource::File { path } => Arc::new(FileDirectory::load(path)?),
    };

    let engine = Arc::new(RecommendationEngine::new(
        Arc::new(patterns),
        directory,
        config.retrieval_timeout,
        config.retrieval_limit,
    ));

    if let Some(addr) = &config.http_listen_addr {
        let listener = TcpListener::bind(addr).await?;
        info!(listen_addr = %addr, "HTTP API ready");
        axum::serve(listener, http::create_router(engine)).await?;
        info!("HTTP API shut down");
        return Ok(());
    }

    let server = NgoMatcherServer::new(engine);
    if let Some(addr) = &config.mcp_tcp_listen_addr {
        let listener = TcpListener::bind(addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    }

    info!("MCP server ready, serving on stdio");
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!(error = %e, "MCP server error");
    })?;
    service.waiting().await?;
    info!("MCP server shut down");
    Ok(())
}
