mod anthropic;
mod sse;

use async_trait::async_trait;
use futures_util::stream::Stream;
use std::pin::Pin;
use thiserror::Error;

use crate::config::ModelSelection;
use crate::prompt::Prompt;

pub(crate) use anthropic::AnthropicGateway;

/// Forward-only sequence of text fragments; concatenated in order they form the reply.
pub(crate) type TextStream = Pin<Box<dyn Stream<Item = Result<String, UpstreamError>> + Send>>;

#[derive(Debug, Error)]
pub(crate) enum UpstreamError {
    #[error("{env} is not set")]
    MissingCredential { env: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("model service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model service error: {0}")]
    Service(String),
    #[error("model response carried no text")]
    EmptyResponse,
}

#[derive(Debug, Clone)]
pub(crate) struct CompletionRequest {
    pub(crate) prompt: Prompt,
    pub(crate) selection: ModelSelection,
}

#[async_trait]
pub(crate) trait ModelGateway: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, UpstreamError>;

    /// Starts a streamed completion. Dropping the returned stream closes the connection.
    async fn stream(&self, request: CompletionRequest) -> Result<TextStream, UpstreamError>;
}

pub(crate) fn join_base_path(base: &str, path: &str) -> Result<String, String> {
    if base.trim().is_empty() {
        return Err("base_url is empty".to_string());
    }
    let normalized_base = base.trim_end_matches('/');
    let normalized_path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    Ok(format!("{normalized_base}{normalized_path}"))
}
