use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::sse::text_deltas;
use super::{join_base_path, CompletionRequest, ModelGateway, TextStream, UpstreamError};
use crate::config::ModelConfig;
use crate::prompt::{Prompt, PromptMessage};
use protocol::ChatRole;

const MESSAGES_PATH: &str = "/v1/messages";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) struct AnthropicGateway {
    http_client: Client,
    messages_url: String,
    api_version: String,
    credential_env: String,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl AnthropicGateway {
    pub(crate) fn new(config: &ModelConfig, api_key: Option<String>) -> anyhow::Result<Self> {
        let messages_url =
            join_base_path(&config.base_url, MESSAGES_PATH).map_err(anyhow::Error::msg)?;
        let http_client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(Duration::from_secs(config.stream_idle_timeout_secs))
            .build()?;
        Ok(Self {
            http_client,
            messages_url,
            api_version: config.api_version.clone(),
            credential_env: config.credential_env.clone(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    fn api_key(&self) -> Result<&str, UpstreamError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| UpstreamError::MissingCredential {
                env: self.credential_env.clone(),
            })
    }

    async fn send(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<Response, UpstreamError> {
        let api_key = self.api_key()?;
        let body = request_body(request, stream);
        let mut builder = self
            .http_client
            .post(&self.messages_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.api_version)
            .header("content-type", "application/json")
            .json(&body);
        if !stream {
            builder = builder.timeout(self.request_timeout);
        }
        let response = builder
            .send()
            .await
            .map_err(|err| UpstreamError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(
                event = "model.status",
                task = request.prompt.task.as_str(),
                status = status.as_u16(),
                "model service rejected request"
            );
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ModelGateway for AnthropicGateway {
    async fn complete(&self, request: CompletionRequest) -> Result<String, UpstreamError> {
        let started_at = Instant::now();
        let response = self.send(&request, false).await?;
        let value: Value = response
            .json()
            .await
            .map_err(|err| UpstreamError::Transport(err.to_string()))?;
        let text = response_text(&value)?;
        debug!(
            event = "model.complete",
            task = request.prompt.task.as_str(),
            model = %request.selection.model,
            chars = text.chars().count(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "model reply received"
        );
        Ok(text)
    }

    async fn stream(&self, request: CompletionRequest) -> Result<TextStream, UpstreamError> {
        let response = self.send(&request, true).await?;
        debug!(
            event = "model.stream_open",
            task = request.prompt.task.as_str(),
            model = %request.selection.model,
            "model stream opened"
        );
        Ok(text_deltas(response.bytes_stream()))
    }
}

fn request_body(request: &CompletionRequest, stream: bool) -> Value {
    let mut body = json!({
        "model": request.selection.model,
        "max_tokens": request.selection.max_tokens,
        "messages": wire_messages(&request.prompt),
    });
    if let Some(system) = request.prompt.system.as_deref() {
        body["system"] = json!(system);
    }
    if stream {
        body["stream"] = json!(true);
    }
    body
}

fn wire_messages(prompt: &Prompt) -> Vec<Value> {
    prompt.messages.iter().map(wire_message).collect()
}

fn wire_message(message: &PromptMessage) -> Value {
    let role = match message.role {
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    };
    if message.images.is_empty() {
        return json!({ "role": role, "content": message.text });
    }
    let mut blocks: Vec<Value> = message
        .images
        .iter()
        .map(|image| {
            json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": image.media_type,
                    "data": image.data,
                }
            })
        })
        .collect();
    blocks.push(json!({ "type": "text", "text": message.text }));
    json!({ "role": role, "content": blocks })
}

fn response_text(value: &Value) -> Result<String, UpstreamError> {
    if let Some(message) = value.pointer("/error/message").and_then(Value::as_str) {
        return Err(UpstreamError::Service(message.to_string()));
    }
    let text: String = value
        .get("content")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        return Err(UpstreamError::EmptyResponse);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelSelection;
    use crate::prompt;
    use protocol::{ChatMessage, ImageInput};

    fn selection() -> ModelSelection {
        ModelSelection {
            model: "claude-test".to_string(),
            max_tokens: 1024,
        }
    }

    #[test]
    fn builds_text_only_body_with_system() {
        let request = CompletionRequest {
            prompt: prompt::chat(Some(&[ChatMessage::user("안녕")][..])).expect("prompt"),
            selection: selection(),
        };
        let body = request_body(&request, true);
        assert_eq!(body["model"], json!("claude-test"));
        assert_eq!(body["max_tokens"], json!(1024));
        assert_eq!(body["stream"], json!(true));
        assert!(body["system"].as_str().expect("system").contains("PRD"));
        assert_eq!(body["messages"][0], json!({"role": "user", "content": "안녕"}));
    }

    #[test]
    fn places_images_before_text() {
        let image = ImageInput {
            media_type: "image/png".to_string(),
            data: "AAAA".to_string(),
        };
        let request = CompletionRequest {
            prompt: prompt::analyze(None, None, &[image]).expect("prompt"),
            selection: selection(),
        };
        let body = request_body(&request, false);
        assert!(body.get("stream").is_none());
        assert!(body.get("system").is_none());
        let content = body["messages"][0]["content"].as_array().expect("blocks");
        assert_eq!(content.len(), 2);
        assert_eq!(content[0]["source"]["media_type"], json!("image/png"));
        assert_eq!(content[0]["source"]["data"], json!("AAAA"));
        assert_eq!(content[1]["type"], json!("text"));
    }

    #[test]
    fn concatenates_text_blocks() {
        let value = json!({
            "content": [
                {"type": "text", "text": "첫 "},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "번째"}
            ]
        });
        assert_eq!(response_text(&value).expect("text"), "첫 번째");
    }

    #[test]
    fn empty_content_is_an_error() {
        assert!(matches!(
            response_text(&json!({"content": []})),
            Err(UpstreamError::EmptyResponse)
        ));
    }

    #[test]
    fn missing_key_fails_before_sending() {
        let gateway = AnthropicGateway::new(&ModelConfig::default(), Some("  ".to_string()))
            .expect("gateway");
        let request = CompletionRequest {
            prompt: prompt::report(Some("x"), protocol::ReportType::Summary).expect("prompt"),
            selection: selection(),
        };
        let rt = tokio::runtime::Runtime::new().expect("runtime");
        let err = rt
            .block_on(gateway.complete(request))
            .expect_err("missing key");
        assert!(matches!(err, UpstreamError::MissingCredential { env } if env == "ANTHROPIC_API_KEY"));
    }
}
