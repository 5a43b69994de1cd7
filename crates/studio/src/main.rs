mod cli;
mod config;
mod decode;
mod error;
mod export;
mod gateway;
mod prompt;
mod render;
mod routes;

use crate::cli::Args;
use crate::config::load_studio_config;
use crate::export::CaptureRasterizer;
use crate::gateway::AnthropicGateway;
use crate::routes::{router, AppState};
use anyhow::Context;
use axum::body::Body;
use axum::http::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.log_to_stderr)?;

    info!(
        listen_addr = %args.listen_addr,
        config = ?args.config.as_ref().map(|path| path.display().to_string()),
        "studio starting"
    );
    let config = load_studio_config(args.config.as_deref())?;
    let api_key = std::env::var(&config.model.credential_env).ok();
    if api_key.as_deref().map_or(true, |key| key.trim().is_empty()) {
        warn!(
            event = "config.credential_missing",
            env = %config.model.credential_env,
            "model credential not set; model-backed routes will fail"
        );
    }
    let gateway = AnthropicGateway::new(&config.model, api_key)
        .context("failed to build model gateway")?;
    let shutdown = CancellationToken::new();
    let app_state = AppState {
        gateway: Arc::new(gateway),
        rasterizer: Arc::new(CaptureRasterizer),
        config: Arc::new(config),
        shutdown: shutdown.clone(),
    };

    let app = router(app_state).layer(middleware::from_fn(log_http_request));
    let listener = TcpListener::bind(&args.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", args.listen_addr))?;
    info!(addr = %args.listen_addr, "studio listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown.clone()))
        .await?;
    info!("studio shutting down");
    Ok(())
}

async fn log_http_request(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let host = req
        .headers()
        .get("host")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let response = next.run(req).await;
    let status = response.status();
    tracing::info!(
        method = %method,
        uri = %uri,
        host = %host,
        status = %status,
        "http request"
    );
    response
}

fn init_tracing(log_to_stderr: bool) -> anyhow::Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
    );
    if log_to_stderr {
        builder.with_writer(std::io::stderr).init();
    } else {
        builder.init();
    }
    Ok(())
}

async fn wait_for_shutdown(shutdown: CancellationToken) {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
    shutdown.cancel();
}
