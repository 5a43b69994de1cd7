use axum::body::{Body, Bytes};
use axum::extract::{FromRequest, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::StreamExt;
use protocol::{
    AnalysisResult, AnalyzeRequest, EditSlideRequest, EditSlideResponse, GenerateProposalRequest,
    GenerateProposalResponse, GeneratedProposal, HtmlExportRequest, PdfExportRequest, PdfLayout,
    ProposalChatRequest, ProposalChatResponse, ProposalFormat, RenderRequest, ReportRequest,
};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::StudioConfig;
use crate::decode;
use crate::error::ApiError;
use crate::export::{
    compose_pdf, content_disposition, decode_capture, export_filename, export_html, PageGeometry,
    Rasterizer, PROPOSAL_FILE_STEM, REPORT_FILE_STEM,
};
use crate::gateway::{CompletionRequest, ModelGateway};
use crate::prompt::{self, Prompt, ValidationError};
use crate::render::{render_fragment, Stamp};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) gateway: Arc<dyn ModelGateway>,
    pub(crate) rasterizer: Arc<dyn Rasterizer>,
    pub(crate) config: Arc<StudioConfig>,
    /// Cancelled on ctrl-c; open report streams end when it fires.
    pub(crate) shutdown: CancellationToken,
}

impl AppState {
    fn completion(&self, prompt: Prompt) -> CompletionRequest {
        let selection = self.config.model.selection_for(prompt.task);
        CompletionRequest { prompt, selection }
    }

    async fn complete(&self, prompt: Prompt) -> Result<String, ApiError> {
        let task = prompt.task;
        let started_at = Instant::now();
        let text = self.gateway.complete(self.completion(prompt)).await?;
        info!(
            event = "task.completed",
            task = task.as_str(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "model task completed"
        );
        Ok(text)
    }
}

/// JSON body whose rejections render as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub(crate) struct ApiJson<T>(pub(crate) T);

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/report", post(report))
        .route("/generate-proposal", post(generate_proposal))
        .route("/proposal-chat", post(proposal_chat))
        .route("/edit-slide", post(edit_slide))
        .route("/render", post(render))
        .route("/export/html", post(export_html_file))
        .route("/export/pdf", post(export_pdf_file))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn analyze(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AnalyzeRequest>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let prompt = prompt::analyze(
        request.data.as_deref(),
        request.prompt.as_deref(),
        &request.images,
    )?;
    let text = state.complete(prompt).await?;
    Ok(Json(decode::decode_analysis(&text)?))
}

async fn report(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ReportRequest>,
) -> Result<Response, ApiError> {
    let prompt = prompt::report(request.data.as_deref(), request.report_type)?;
    let deltas = state.gateway.stream(state.completion(prompt)).await?;
    let body = deltas
        .take_until(state.shutdown.clone().cancelled_owned())
        .map(|delta| {
            delta.map(Bytes::from).inspect_err(|err| {
                warn!(event = "report.stream_failed", error = %err, "report stream aborted");
            })
        });
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(body),
    )
        .into_response())
}

async fn generate_proposal(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<GenerateProposalRequest>,
) -> Result<Json<GenerateProposalResponse>, ApiError> {
    let document_content = request.document_content.as_deref();
    let proposal = match request.format {
        ProposalFormat::Document => {
            let prompt = prompt::proposal_document(&request.chat_history, document_content)?;
            let text = state.complete(prompt).await?;
            GeneratedProposal::Document(decode::decode_proposal_document(&text))
        }
        ProposalFormat::Deck => {
            let prompt = prompt::proposal_deck(&request.chat_history, document_content)?;
            let text = state.complete(prompt).await?;
            GeneratedProposal::Deck(decode::decode_slide_deck(&text))
        }
    };
    Ok(Json(GenerateProposalResponse { proposal }))
}

async fn proposal_chat(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ProposalChatRequest>,
) -> Result<Json<ProposalChatResponse>, ApiError> {
    let messages = request.messages.unwrap_or_default();
    let prompt = prompt::chat(Some(&messages))?;
    let response = state.complete(prompt).await?;
    let document_content = prompt::document_transcript(&messages, &response);
    Ok(Json(ProposalChatResponse {
        response,
        document_content,
    }))
}

async fn edit_slide(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<EditSlideRequest>,
) -> Result<Json<EditSlideResponse>, ApiError> {
    let prompt = prompt::slide_edit(
        &request.slide_content,
        &request.slide_type,
        &request.edit_messages,
    )?;
    let target = match (request.deck, request.slide_index) {
        (Some(deck), Some(index)) if index < deck.slides.len() => Some((deck, index)),
        (Some(_), Some(index)) => {
            let message = format!("슬라이드 번호가 범위를 벗어났습니다: {index}");
            return Err(ValidationError::new(message).into());
        }
        (None, None) => None,
        _ => {
            let message = "deck과 slideIndex는 함께 제공되어야 합니다.";
            return Err(ValidationError::new(message).into());
        }
    };

    let assistant_response = state.complete(prompt).await?;
    let updated_slide = decode::decode_slide_edit(&assistant_response)?;
    let deck = target.map(|(mut deck, index)| {
        deck.apply_edit(index, updated_slide.clone());
        deck
    });
    Ok(Json(EditSlideResponse {
        updated_slide,
        assistant_response,
        deck,
    }))
}

async fn render(ApiJson(request): ApiJson<RenderRequest>) -> Html<String> {
    Html(render_fragment(
        &request.document,
        request.chart_type,
        request.slide_index,
        Stamp::now(),
    ))
}

fn attachment(content_type: &'static str, filename: &str, body: impl Into<Body>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(filename)),
        ],
        body.into(),
    )
        .into_response()
}

async fn export_html_file(
    ApiJson(request): ApiJson<HtmlExportRequest>,
) -> Result<Response, ApiError> {
    if let Some(field) = request
        .metadata
        .as_ref()
        .and_then(|metadata| metadata.first_missing_field())
    {
        return Err(ValidationError::new(format!("{field} 항목을 입력해주세요.")).into());
    }
    let export = export_html(&request.document, request.metadata.as_ref(), Stamp::now());
    info!(
        event = "export.html",
        filename = %export.filename,
        bytes = export.body.len(),
        "html export ready"
    );
    Ok(attachment(
        "text/html; charset=utf-8",
        &export.filename,
        export.body,
    ))
}

async fn export_pdf_file(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PdfExportRequest>,
) -> Result<Response, ApiError> {
    let encoded = decode_capture(&request.capture)?;
    let (geometry, default_stem) = match request.layout {
        PdfLayout::Report => (
            PageGeometry::a4_portrait(state.config.export.page_margin_px),
            REPORT_FILE_STEM,
        ),
        PdfLayout::Deck => (PageGeometry::deck_landscape(), PROPOSAL_FILE_STEM),
    };
    let capture_scale = state.config.export.capture_scale;
    let jpeg_quality = state.config.export.jpeg_quality;
    let rasterizer = Arc::clone(&state.rasterizer);
    let title = request.title.clone();
    let started_at = Instant::now();

    let export = tokio::task::spawn_blocking(move || {
        let pixels = rasterizer.rasterize(&encoded)?;
        compose_pdf(
            &pixels,
            geometry,
            capture_scale,
            jpeg_quality,
            title.as_deref(),
        )
    })
    .await
    .map_err(|err| ApiError::Internal(err.to_string()))??;

    let filename = export_filename(request.title.as_deref(), default_stem, Stamp::now(), "pdf");
    info!(
        event = "export.pdf",
        filename = %filename,
        pages = export.page_count,
        bytes = export.bytes.len(),
        elapsed_ms = started_at.elapsed().as_millis() as u64,
        "pdf export ready"
    );
    Ok(attachment("application/pdf", &filename, export.bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::CaptureRasterizer;
    use crate::gateway::fake::{ScriptedGateway, UnconfiguredGateway};
    use axum::http::StatusCode;
    use image::{Rgba, RgbaImage};
    use protocol::{ChatMessage, Document, ImageInput, SlideDeck, SlideKind};
    use serde_json::json;

    fn state_with(gateway: Arc<dyn ModelGateway>) -> AppState {
        AppState {
            gateway,
            rasterizer: Arc::new(CaptureRasterizer),
            config: Arc::new(StudioConfig::default()),
            shutdown: CancellationToken::new(),
        }
    }

    fn run<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Runtime::new().expect("runtime").block_on(future)
    }

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    fn body_bytes(response: Response) -> Vec<u8> {
        run(async {
            axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("body")
                .to_vec()
        })
    }

    const FENCED_ANALYSIS: &str = "결과:\n```json\n{\"insights\":[\"a\"],\"summary\":\"s\",\"chartData\":[{\"name\":\"서울\",\"value\":100}],\"recommendations\":[\"r\"]}\n```";

    #[test]
    fn analyze_decodes_fenced_reply() {
        let gateway = Arc::new(ScriptedGateway::replying(FENCED_ANALYSIS));
        let request = AnalyzeRequest {
            data: Some("name,value\n서울,100".to_string()),
            ..AnalyzeRequest::default()
        };
        let Json(result) =
            run(analyze(State(state_with(gateway.clone())), ApiJson(request))).expect("analysis");
        assert_eq!(result.summary, "s");
        assert_eq!(result.chart_data[0].name, "서울");
        assert_eq!(result.chart_data[0].value, 100.0);
        let sent = gateway.last_request().expect("request");
        assert_eq!(sent.selection.model, "claude-3-5-sonnet-20241022");
    }

    #[test]
    fn analyze_with_images_selects_vision_task() {
        let gateway = Arc::new(ScriptedGateway::replying(FENCED_ANALYSIS));
        let request = AnalyzeRequest {
            images: vec![ImageInput {
                media_type: "image/jpg".to_string(),
                data: "AAAA".to_string(),
            }],
            ..AnalyzeRequest::default()
        };
        let Json(_) =
            run(analyze(State(state_with(gateway.clone())), ApiJson(request))).expect("analysis");
        let sent = gateway.last_request().expect("request");
        assert_eq!(sent.prompt.task, prompt::TaskKind::AnalyzeWithImages);
        assert_eq!(sent.prompt.messages[0].images[0].media_type, "image/jpeg");
    }

    #[test]
    fn analyze_without_input_is_rejected_before_gateway() {
        let gateway = Arc::new(ScriptedGateway::replying(FENCED_ANALYSIS));
        let err = run(analyze(
            State(state_with(gateway.clone())),
            ApiJson(AnalyzeRequest::default()),
        ))
        .err()
        .expect("rejected");
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
        assert_eq!(gateway.calls(), 0);
    }

    #[test]
    fn analyze_prose_reply_is_a_server_error() {
        let gateway = Arc::new(ScriptedGateway::replying("분석할 수 없습니다."));
        let request = AnalyzeRequest {
            data: Some("x".to_string()),
            ..AnalyzeRequest::default()
        };
        let err = run(analyze(State(state_with(gateway)), ApiJson(request)))
            .err()
            .expect("decode failure");
        assert!(matches!(err, ApiError::Decode(_)));
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_credential_maps_to_server_error() {
        let request = AnalyzeRequest {
            data: Some("x".to_string()),
            ..AnalyzeRequest::default()
        };
        let err = run(analyze(
            State(state_with(Arc::new(UnconfiguredGateway))),
            ApiJson(request),
        ))
        .err()
        .expect("no credential");
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn report_streams_fragments_in_order() {
        let gateway = Arc::new(ScriptedGateway::streaming(&[
            "## 보고서\n",
            "매출이 ",
            "증가했습니다.",
        ]));
        let request = ReportRequest {
            data: Some("x".to_string()),
            ..ReportRequest::default()
        };
        let response = run(report(State(state_with(gateway)), ApiJson(request))).expect("stream");
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let body = String::from_utf8(body_bytes(response)).expect("utf8");
        assert_eq!(body, "## 보고서\n매출이 증가했습니다.");
    }

    #[test]
    fn report_stream_ends_once_shutdown_begins() {
        let gateway = Arc::new(ScriptedGateway::streaming(&["첫 조각", "둘째 조각"]));
        let state = state_with(gateway.clone());
        state.shutdown.cancel();
        let request = ReportRequest {
            data: Some("x".to_string()),
            ..ReportRequest::default()
        };
        let response = run(report(State(state), ApiJson(request))).expect("stream");
        assert!(body_bytes(response).is_empty());
        assert_eq!(gateway.calls(), 1);
    }

    #[test]
    fn report_requires_data() {
        let gateway = Arc::new(ScriptedGateway::streaming(&["x"]));
        let err = run(report(
            State(state_with(gateway.clone())),
            ApiJson(ReportRequest::default()),
        ))
        .err()
        .expect("rejected");
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
        assert_eq!(gateway.calls(), 0);
    }

    #[test]
    fn proposal_deck_falls_back_on_prose() {
        let gateway = Arc::new(ScriptedGateway::replying("JSON을 만들 수 없었습니다"));
        let request = GenerateProposalRequest {
            chat_history: vec![ChatMessage::user("AI 챗봇")],
            document_content: None,
            format: ProposalFormat::Deck,
        };
        let Json(response) =
            run(generate_proposal(State(state_with(gateway)), ApiJson(request))).expect("proposal");
        let GeneratedProposal::Deck(deck) = response.proposal else {
            panic!("expected deck");
        };
        assert_eq!(deck.slides.len(), 1);
        assert_eq!(deck.slides[0].content.text(), "JSON을 만들 수 없었습니다");
    }

    #[test]
    fn proposal_requires_history() {
        let gateway = Arc::new(ScriptedGateway::replying("{}"));
        let err = run(generate_proposal(
            State(state_with(gateway.clone())),
            ApiJson(GenerateProposalRequest::default()),
        ))
        .err()
        .expect("rejected");
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
        assert_eq!(gateway.calls(), 0);
    }

    #[test]
    fn proposal_chat_returns_transcript() {
        let gateway = Arc::new(ScriptedGateway::replying("목표가 무엇인가요?"));
        let request = ProposalChatRequest {
            messages: Some(vec![ChatMessage::user("쇼핑몰을 만들고 싶어요")]),
        };
        let Json(response) =
            run(proposal_chat(State(state_with(gateway)), ApiJson(request))).expect("chat");
        assert_eq!(response.response, "목표가 무엇인가요?");
        assert_eq!(
            response.document_content,
            "사용자: 쇼핑몰을 만들고 싶어요\n\nAI: 목표가 무엇인가요?"
        );
    }

    #[test]
    fn proposal_chat_rejects_absent_messages() {
        let gateway = Arc::new(ScriptedGateway::replying("x"));
        let err = run(proposal_chat(
            State(state_with(gateway.clone())),
            ApiJson(ProposalChatRequest::default()),
        ))
        .err()
        .expect("rejected");
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
        assert_eq!(gateway.calls(), 0);
    }

    #[test]
    fn proposal_chat_rejects_empty_message_list() {
        let gateway = Arc::new(ScriptedGateway::replying("x"));
        let request = ProposalChatRequest {
            messages: Some(Vec::new()),
        };
        let err = run(proposal_chat(State(state_with(gateway.clone())), ApiJson(request)))
            .err()
            .expect("rejected");
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
        assert_eq!(gateway.calls(), 0);
    }

    #[test]
    fn edit_slide_with_no_messages_never_calls_gateway() {
        let gateway = Arc::new(ScriptedGateway::replying("{\"heading\":\"h\"}"));
        let request = EditSlideRequest {
            slide_content: json!({"heading": "old"}),
            edit_messages: Vec::new(),
            slide_type: "content".to_string(),
            ..EditSlideRequest::default()
        };
        let err = run(edit_slide(State(state_with(gateway.clone())), ApiJson(request)))
            .err()
            .expect("rejected");
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
        assert_eq!(gateway.calls(), 0);
    }

    #[test]
    fn edit_slide_updates_only_the_target_slide() {
        let gateway = Arc::new(ScriptedGateway::replying(
            "```json\n{\"heading\": \"새 제목\", \"content\": \"a\\nb\"}\n```",
        ));
        let deck: SlideDeck = serde_json::from_value(json!({
            "title": "t",
            "subtitle": "s",
            "slides": [
                {"slideNumber": 1, "type": "title", "heading": "표지", "content": ""},
                {"slideNumber": 2, "type": "team", "heading": "팀", "content": "x"}
            ]
        }))
        .expect("deck");
        let request = EditSlideRequest {
            slide_content: json!({"heading": "팀", "content": "x"}),
            edit_messages: vec![ChatMessage::user("제목을 바꿔주세요")],
            slide_type: "team".to_string(),
            deck: Some(deck.clone()),
            slide_index: Some(1),
        };
        let Json(response) =
            run(edit_slide(State(state_with(gateway)), ApiJson(request))).expect("edit");
        assert_eq!(response.updated_slide.heading, "새 제목");
        let updated = response.deck.expect("deck");
        assert_eq!(updated.slides[0], deck.slides[0]);
        assert_eq!(updated.slides[1].slide_number, 2);
        assert_eq!(updated.slides[1].kind, SlideKind::Team);
        assert_eq!(updated.slides[1].content.bullets(), vec!["a", "b"]);
    }

    #[test]
    fn edit_slide_rejects_out_of_range_index() {
        let gateway = Arc::new(ScriptedGateway::replying("{}"));
        let request = EditSlideRequest {
            edit_messages: vec![ChatMessage::user("수정")],
            deck: Some(SlideDeck::default()),
            slide_index: Some(0),
            ..EditSlideRequest::default()
        };
        let err = run(edit_slide(State(state_with(gateway.clone())), ApiJson(request)))
            .err()
            .expect("rejected");
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
        assert_eq!(gateway.calls(), 0);
    }

    #[test]
    fn edit_slide_prose_reply_is_a_server_error() {
        let gateway = Arc::new(ScriptedGateway::replying("네, 바꿨습니다!"));
        let request = EditSlideRequest {
            edit_messages: vec![ChatMessage::user("수정")],
            ..EditSlideRequest::default()
        };
        let err = run(edit_slide(State(state_with(gateway)), ApiJson(request)))
            .err()
            .expect("decode failure");
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn html_export_rejects_incomplete_metadata() {
        let request: HtmlExportRequest = serde_json::from_value(json!({
            "document": {"kind": "analysis", "summary": "s"},
            "metadata": {"companyName": "위즈", "department": ""}
        }))
        .expect("request");
        let err = run(export_html_file(ApiJson(request))).err().expect("rejected");
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn html_export_is_an_attachment() {
        let request = HtmlExportRequest {
            document: Document::Analysis(AnalysisResult::default()),
            metadata: None,
        };
        let response = run(export_html_file(ApiJson(request))).expect("export");
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .expect("ascii")
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"wiz-works-report-"));
        let body = String::from_utf8(body_bytes(response)).expect("utf8");
        assert!(body.contains("<title>Wiz Works - 시각화 보고서</title>"));
    }

    #[test]
    fn pdf_export_paginates_capture() {
        use base64::Engine;
        let capture = RgbaImage::from_pixel(1200, 1500, Rgba([255, 255, 255, 255]));
        let png = crate::export::encode_png(&capture);
        let mut config = StudioConfig::default();
        config.export.capture_scale = 1.0;
        let state = AppState {
            config: Arc::new(config),
            ..state_with(Arc::new(ScriptedGateway::replying("")))
        };
        let request = PdfExportRequest {
            layout: PdfLayout::Deck,
            capture: base64::engine::general_purpose::STANDARD.encode(png),
            title: Some("AI 제안".to_string()),
        };
        let response = run(export_pdf_file(State(state), ApiJson(request))).expect("pdf");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert!(body_bytes(response).starts_with(b"%PDF"));
    }

    #[test]
    fn pdf_export_rejects_garbage_capture() {
        let request = PdfExportRequest {
            layout: PdfLayout::Report,
            capture: "bm90IGFuIGltYWdl".to_string(),
            title: None,
        };
        let err = run(export_pdf_file(
            State(state_with(Arc::new(ScriptedGateway::replying("")))),
            ApiJson(request),
        ))
        .err()
        .expect("rejected");
        assert!(matches!(err, ApiError::Export(_)));
    }
}
