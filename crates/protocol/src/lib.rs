pub mod api;
pub mod document;

pub use api::{
    AnalyzeRequest, ChatMessage, ChatRole, EditSlideRequest, EditSlideResponse, ErrorBody,
    GenerateProposalRequest, GenerateProposalResponse, GeneratedProposal, HtmlExportRequest,
    ImageInput, PdfExportRequest, PdfLayout, ProposalChatRequest, ProposalChatResponse,
    ProposalFormat, RenderRequest, ReportRequest, ReportType,
};
pub use document::{
    AnalysisResult, ChartKind, ChartPoint, ChartSpec, Document, ProposalDocument, ProposalSection,
    ReportMetadata, Slide, SlideContent, SlideDeck, SlideEdit, SlideKind,
};
