use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::prompt::TaskKind;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_API_VERSION: &str = "2023-06-01";
const DEFAULT_CREDENTIAL_ENV: &str = "ANTHROPIC_API_KEY";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const PROPOSAL_MAX_TOKENS: u32 = 8192;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CAPTURE_SCALE: f32 = 4.0;
const DEFAULT_PAGE_MARGIN_PX: f32 = 20.0;
const DEFAULT_JPEG_QUALITY: u8 = 92;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StudioConfig {
    #[serde(default)]
    pub(crate) model: ModelConfig,
    #[serde(default)]
    pub(crate) export: ExportConfig,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelConfig {
    #[serde(default = "default_base_url")]
    pub(crate) base_url: String,
    #[serde(default = "default_api_version")]
    pub(crate) api_version: String,
    #[serde(default = "default_credential_env")]
    pub(crate) credential_env: String,
    #[serde(default = "default_request_timeout_secs")]
    pub(crate) request_timeout_secs: u64,
    /// Longest silence tolerated between reads of a response body, streaming or not.
    #[serde(default = "default_stream_idle_timeout_secs")]
    pub(crate) stream_idle_timeout_secs: u64,
    #[serde(default = "default_model")]
    pub(crate) default_model: String,
    /// Per-task overrides keyed by task name (`analyze`, `report`, `proposal-deck`, ...).
    #[serde(default)]
    pub(crate) tasks: BTreeMap<String, TaskOverride>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TaskOverride {
    pub(crate) model: Option<String>,
    pub(crate) max_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ModelSelection {
    pub(crate) model: String,
    pub(crate) max_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExportConfig {
    #[serde(default = "default_capture_scale")]
    pub(crate) capture_scale: f32,
    #[serde(default = "default_page_margin_px")]
    pub(crate) page_margin_px: f32,
    #[serde(default = "default_jpeg_quality")]
    pub(crate) jpeg_quality: u8,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: default_api_version(),
            credential_env: default_credential_env(),
            request_timeout_secs: default_request_timeout_secs(),
            stream_idle_timeout_secs: default_stream_idle_timeout_secs(),
            default_model: default_model(),
            tasks: BTreeMap::new(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            capture_scale: default_capture_scale(),
            page_margin_px: default_page_margin_px(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl ModelConfig {
    pub(crate) fn selection_for(&self, task: TaskKind) -> ModelSelection {
        let task_override = self.tasks.get(task.as_str()).cloned().unwrap_or_default();
        ModelSelection {
            model: task_override
                .model
                .filter(|model| !model.trim().is_empty())
                .unwrap_or_else(|| self.default_model.clone()),
            max_tokens: task_override
                .max_tokens
                .unwrap_or_else(|| default_max_tokens_for(task)),
        }
    }
}

fn default_max_tokens_for(task: TaskKind) -> u32 {
    match task {
        TaskKind::ProposalDocument | TaskKind::ProposalDeck => PROPOSAL_MAX_TOKENS,
        _ => DEFAULT_MAX_TOKENS,
    }
}

pub(crate) fn load_studio_config(path: Option<&Path>) -> anyhow::Result<StudioConfig> {
    let config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => StudioConfig::default(),
    };
    validate(&config)?;
    Ok(config)
}

fn validate(config: &StudioConfig) -> anyhow::Result<()> {
    if config.model.base_url.trim().is_empty() {
        anyhow::bail!("model.base_url cannot be empty");
    }
    if config.model.credential_env.trim().is_empty() {
        anyhow::bail!("model.credential_env cannot be empty");
    }
    if config.model.request_timeout_secs == 0 || config.model.stream_idle_timeout_secs == 0 {
        anyhow::bail!("model timeouts must be at least one second");
    }
    for name in config.model.tasks.keys() {
        if TaskKind::parse(name).is_none() {
            anyhow::bail!("unknown task in model.tasks: {name}");
        }
    }
    if !(config.export.capture_scale.is_finite() && config.export.capture_scale > 0.0) {
        anyhow::bail!("export.capture_scale must be positive");
    }
    if !(config.export.page_margin_px.is_finite() && config.export.page_margin_px >= 0.0) {
        anyhow::bail!("export.page_margin_px must not be negative");
    }
    if !(1..=100).contains(&config.export.jpeg_quality) {
        anyhow::bail!("export.jpeg_quality must be within 1..=100");
    }
    Ok(())
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_credential_env() -> String {
    DEFAULT_CREDENTIAL_ENV.to_string()
}

fn default_stream_idle_timeout_secs() -> u64 {
    DEFAULT_STREAM_IDLE_TIMEOUT_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_capture_scale() -> f32 {
    DEFAULT_CAPTURE_SCALE
}

fn default_page_margin_px() -> f32 {
    DEFAULT_PAGE_MARGIN_PX
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: StudioConfig = toml::from_str("").expect("config");
        validate(&config).expect("valid");
        assert_eq!(config.model.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model.credential_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.export.capture_scale, 4.0);
        assert_eq!(config.export.page_margin_px, 20.0);
    }

    #[test]
    fn task_override_replaces_model_and_tokens() {
        let config: StudioConfig = toml::from_str(
            r#"
            [model]
            default_model = "claude-base"

            [model.tasks.chat]
            model = "claude-chat"

            [model.tasks.report]
            max_tokens = 2048
            "#,
        )
        .expect("config");
        validate(&config).expect("valid");

        let chat = config.model.selection_for(TaskKind::Chat);
        assert_eq!(chat.model, "claude-chat");
        assert_eq!(chat.max_tokens, DEFAULT_MAX_TOKENS);

        let report = config.model.selection_for(TaskKind::Report);
        assert_eq!(report.model, "claude-base");
        assert_eq!(report.max_tokens, 2048);

        let deck = config.model.selection_for(TaskKind::ProposalDeck);
        assert_eq!(deck.max_tokens, PROPOSAL_MAX_TOKENS);
    }

    #[test]
    fn rejects_unknown_task_names() {
        let config: StudioConfig = toml::from_str(
            r#"
            [model.tasks.summarize]
            model = "x"
            "#,
        )
        .expect("config");
        let err = validate(&config).expect_err("invalid").to_string();
        assert!(err.contains("summarize"));
    }

    #[test]
    fn rejects_zero_stream_idle_timeout() {
        let config: StudioConfig = toml::from_str(
            r#"
            [model]
            stream_idle_timeout_secs = 0
            "#,
        )
        .expect("config");
        let err = validate(&config).expect_err("invalid").to_string();
        assert!(err.contains("timeouts"));
        assert_eq!(
            StudioConfig::default().model.stream_idle_timeout_secs,
            DEFAULT_STREAM_IDLE_TIMEOUT_SECS
        );
    }

    #[test]
    fn rejects_non_positive_capture_scale() {
        let config: StudioConfig = toml::from_str(
            r#"
            [export]
            capture_scale = 0.0
            "#,
        )
        .expect("config");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn bundled_sample_config_is_valid() {
        let config: StudioConfig =
            toml::from_str(include_str!("../../../config/studio.toml")).expect("config");
        validate(&config).expect("valid");
        assert_eq!(config.model.default_model, DEFAULT_MODEL);
        assert_eq!(config.export.jpeg_quality, DEFAULT_JPEG_QUALITY);
    }
}
