mod api;
mod config;
mod error;
mod http;
mod prediction;
mod rate_limit;
mod server;
mod state;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dockyard_common::openai::{OpenAiClient, OpenAiClientConfig};

use config::Config;
use prediction::Predictor;
use rate_limit::RateLimiter;
use server::HealthAssistantServer;
use state::AppState;

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

    info!("starting health-assistant");

    let config = Config::from_env()?;
    info!(
        rules_path = ?config.rules_path,
        document_rules_path = ?config.document_rules_path,
        model = %config.prediction_model,
        http = config.http_listen_addr.is_some(),
        rate_limit_rps = ?config.rate_limit_rps,
        "configuration loaded"
    );

    // Invalid rule books stop startup here.
    let chat_rules = Arc::new(config.load_chat_rules()?);
    let document_rules = Arc::new(config.load_document_rules()?);
    info!(
        chat_rules = chat_rules.len(),
        document_rules = document_rules.len(),
        "rule books validated"
    );

    let openai_config = OpenAiClientConfig::from_env();
    info!(
        base_url = %openai_config.base_url,
        api_key = openai_config.api_key.is_some(),
        timeout_ms = openai_config.default_timeout.as_millis(),
        max_retries = openai_config.max_retries,
        "chat completions client configured"
    );
    let openai = Arc::new(OpenAiClient::new(openai_config)?);

    let limiter = config.rate_limit_rps.and_then(RateLimiter::new);
    let predictor = Predictor::new(
        openai,
        config.prediction_model.clone(),
        Arc::clone(&chat_rules),
        limiter,
    );
    let state = AppState::new(chat_rules, document_rules, predictor);

    match (config.http_listen_addr.clone(), config.mcp_tcp_listen_addr.clone()) {
        (Some(http_addr), None) => serve_http(&http_addr, state).await?,
        (http_addr, Some(mcp_addr)) => {
            if let Some(http_addr) = http_addr {
                let http_state = state.clone();
                tokio::spawn(async move {
                    if let Err(e) = serve_http(&http_addr, http_state).await {
                        tracing::error!(error = %e, "HTTP server error");
                    }
                });
            }
            serve_mcp_tcp(&mcp_addr, HealthAssistantServer::new(state)).await?;
        }
        (None, None) => {
            info!("MCP server ready, serving on stdio");
            let service = HealthAssistantServer::new(state)
                .serve(stdio())
                .await
                .inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
            service.waiting().await?;
            info!("MCP server shut down");
        }
    }
    Ok(())
}

async fn serve_http(addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(listen_addr = %addr, "HTTP API ready");
    axum::serve(listener, http::build_router(state)).await?;
    Ok(())
}

async fn serve_mcp_tcp(addr: &str, server: HealthAssistantServer) -> anyhow::Result<()> {
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
