use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{ChartKind, Document, ProposalDocument, ReportMetadata, SlideDeck, SlideEdit};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageInput {
    pub media_type: String,
    /// Base64 payload, optionally as a `data:` URL.
    pub data: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageInput>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    #[default]
    Summary,
    Detailed,
    Presentation,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub report_type: ReportType,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProposalFormat {
    #[default]
    Document,
    Deck,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateProposalRequest {
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
    #[serde(default)]
    pub document_content: Option<String>,
    #[serde(default)]
    pub format: ProposalFormat,
}

/// Response-only: both shapes accept any object, so this is never deserialized.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum GeneratedProposal {
    Deck(SlideDeck),
    Document(ProposalDocument),
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateProposalResponse {
    pub proposal: GeneratedProposal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProposalChatRequest {
    #[serde(default)]
    pub messages: Option<Vec<ChatMessage>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalChatResponse {
    pub response: String,
    pub document_content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSlideRequest {
    #[serde(default)]
    pub slide_content: Value,
    #[serde(default)]
    pub edit_messages: Vec<ChatMessage>,
    #[serde(default)]
    pub slide_type: String,
    /// When present together with `slide_index`, the edit is applied to this
    /// deck and the updated deck is returned.
    #[serde(default)]
    pub deck: Option<SlideDeck>,
    #[serde(default)]
    pub slide_index: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSlideResponse {
    pub updated_slide: SlideEdit,
    pub assistant_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck: Option<SlideDeck>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub document: Document,
    #[serde(default)]
    pub chart_type: Option<ChartKind>,
    #[serde(default)]
    pub slide_index: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlExportRequest {
    pub document: Document,
    #[serde(default)]
    pub metadata: Option<ReportMetadata>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PdfLayout {
    /// A4 portrait with a fixed margin; analysis reports and text proposals.
    #[default]
    Report,
    /// Full-bleed 16:9 landscape pages; slide decks.
    Deck,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfExportRequest {
    #[serde(default)]
    pub layout: PdfLayout,
    /// Base64 PNG or JPEG of the on-screen document rasterized at the capture scale.
    pub capture: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}
