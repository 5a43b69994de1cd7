use protocol::{ChatMessage, ChatRole, ImageInput, ReportType};
use serde_json::Value;
use thiserror::Error;

const DEFAULT_ANALYSIS_FOCUS: &str = "주요 인사이트를 찾아주세요.";
const SUPPORTED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

const ANALYSIS_SCHEMA: &str = r#"반드시 아래 JSON 형식으로만 응답하세요. 네 필드를 모두 포함해야 합니다.
{
  "insights": ["데이터에서 발견한 주요 인사이트"],
  "summary": "전체 데이터에 대한 요약",
  "chartData": [{"name": "항목 이름", "value": 숫자}],
  "recommendations": ["데이터 기반 추천사항"]
}
- insights, recommendations는 문자열 배열입니다.
- chartData의 value는 따옴표 없는 숫자여야 합니다.
- JSON 외의 설명은 쓰지 마세요."#;

const PROPOSAL_DOCUMENT_SYSTEM: &str = r#"당신은 전문적인 제안서 작성 전문가입니다.
사용자와의 대화 내용을 바탕으로 아래 구조의 제안서를 JSON으로 작성하세요.
{
  "title": "제안서 제목",
  "executiveSummary": "프로젝트의 핵심 내용 요약",
  "sections": [
    {"heading": "섹션 제목", "content": "섹션 내용"}
  ],
  "timeline": "프로젝트 일정",
  "budget": "예산 개요"
}
sections에는 다음 여섯 섹션을 순서대로 포함하세요.
1. 프로젝트 개요 및 배경
2. 목표 및 기대효과
3. 제안 내용 (구체적인 실행 방안)
4. 기술 스택 및 방법론
5. 팀 구성 및 역할
6. 리스크 관리
각 섹션은 구체적이고 전문적으로 작성하고, 모든 내용은 한국어로 작성하세요.
반드시 유효한 JSON으로만 응답하세요."#;

const PROPOSAL_DECK_SYSTEM: &str = r#"당신은 프레젠테이션 제안서 디자이너입니다.
사용자와의 대화 내용을 바탕으로 슬라이드 제안서를 아래 JSON 구조로 작성하세요.
{
  "title": "제안서 제목",
  "subtitle": "부제목",
  "slides": [
    {
      "slideNumber": 1,
      "type": "title" | "content" | "image-content" | "chart" | "timeline" | "budget" | "team" | "closing",
      "heading": "슬라이드 제목",
      "content": "슬라이드 본문 (각 줄은 \n로 구분)",
      "chartData": {
        "type": "bar" | "pie" | "line",
        "data": [{"name": "항목", "value": 숫자}],
        "title": "차트 제목"
      }
    }
  ]
}
규칙:
- 슬라이드는 8~12장이며 첫 슬라이드는 "title", 마지막 슬라이드는 "closing"입니다.
- slideNumber는 1부터 순서대로 매깁니다.
- content는 반드시 하나의 문자열이며 각 불릿은 \n으로 구분합니다.
- chartData는 type이 "chart"인 슬라이드에만 포함합니다.
- 모든 내용은 한국어로 작성합니다.
반드시 유효한 JSON으로만 응답하세요."#;

const CHAT_SYSTEM: &str = r#"당신은 전문적인 PRD(Product Requirements Document) 작성을 돕는 어시스턴트입니다.
사용자와 대화하며 다음 정보를 수집하고 정리합니다.
1. 프로젝트 개요: 프로젝트명, 목적 및 배경, 주요 목표
2. 요구사항: 기능 요구사항, 비기능 요구사항, 제약사항
3. 대상 사용자: 타겟 고객, 사용자 니즈
4. 범위: 포함 사항, 제외 사항
5. 일정 및 예산: 프로젝트 일정, 마일스톤, 예산 범위
6. 성공 지표: KPI, 측정 방법
친근하고 전문적인 톤을 유지하고, 필요한 정보는 명확히 질문하며, 답변을 정리해 확인하고,
추가로 고려할 사항을 제안하세요. 한국어로 응답하세요."#;

const SLIDE_EDIT_RULES: &str = r#"수정된 슬라이드는 다음 JSON 형식으로만 응답하세요.
{
  "heading": "슬라이드 제목",
  "content": "슬라이드 본문 (각 줄은 \n로 구분)",
  "chartData": {
    "type": "bar" | "pie" | "line",
    "data": [{"name": "항목", "value": 숫자}],
    "title": "차트 제목"
  }
}
주의사항:
- content는 반드시 문자열이며 각 불릿은 \n으로 구분합니다.
- chartData는 차트 슬라이드(type="chart")일 때만 포함합니다.
- 모든 내용은 한국어로 작성합니다.
- 사용자의 수정 요청을 정확히 반영합니다.
반드시 유효한 JSON으로만 응답하세요."#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskKind {
    Analyze,
    AnalyzeWithImages,
    Report,
    ProposalDocument,
    ProposalDeck,
    Chat,
    SlideEdit,
}

impl TaskKind {
    pub(crate) const ALL: [TaskKind; 7] = [
        TaskKind::Analyze,
        TaskKind::AnalyzeWithImages,
        TaskKind::Report,
        TaskKind::ProposalDocument,
        TaskKind::ProposalDeck,
        TaskKind::Chat,
        TaskKind::SlideEdit,
    ];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            TaskKind::Analyze => "analyze",
            TaskKind::AnalyzeWithImages => "analyze-with-images",
            TaskKind::Report => "report",
            TaskKind::ProposalDocument => "proposal-document",
            TaskKind::ProposalDeck => "proposal-deck",
            TaskKind::Chat => "chat",
            TaskKind::SlideEdit => "slide-edit",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|task| task.as_str() == raw)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub(crate) struct ValidationError {
    pub(crate) message: String,
}

impl ValidationError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InlineImage {
    pub(crate) media_type: String,
    pub(crate) data: String,
}

impl InlineImage {
    pub(crate) fn from_input(input: &ImageInput) -> Result<Self, ValidationError> {
        let media_type = match input.media_type.trim().to_ascii_lowercase().as_str() {
            "image/jpg" => "image/jpeg".to_string(),
            other => other.to_string(),
        };
        if !SUPPORTED_IMAGE_TYPES.contains(&media_type.as_str()) {
            return Err(ValidationError::new(format!(
                "지원하지 않는 이미지 형식입니다: {}",
                input.media_type
            )));
        }
        let data = strip_data_url(&input.data).trim();
        if data.is_empty() {
            return Err(ValidationError::new("이미지 데이터가 비어 있습니다."));
        }
        Ok(Self {
            media_type,
            data: data.to_string(),
        })
    }
}

fn strip_data_url(raw: &str) -> &str {
    match raw.split_once(";base64,") {
        Some((prefix, payload)) if prefix.trim_start().starts_with("data:") => payload,
        _ => raw,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PromptMessage {
    pub(crate) role: ChatRole,
    pub(crate) text: String,
    pub(crate) images: Vec<InlineImage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Prompt {
    pub(crate) task: TaskKind,
    pub(crate) system: Option<String>,
    pub(crate) messages: Vec<PromptMessage>,
}

impl Prompt {
    fn new(task: TaskKind, system: Option<String>) -> Self {
        Self {
            task,
            system,
            messages: Vec::new(),
        }
    }

    /// Appends a turn, merging it into the previous one when both share a role.
    fn push(&mut self, role: ChatRole, text: impl Into<String>) {
        let text = text.into();
        if let Some(last) = self.messages.last_mut() {
            if last.role == role {
                last.text.push_str("\n\n");
                last.text.push_str(&text);
                return;
            }
        }
        self.messages.push(PromptMessage {
            role,
            text,
            images: Vec::new(),
        });
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

pub(crate) fn analyze(
    data: Option<&str>,
    focus: Option<&str>,
    images: &[ImageInput],
) -> Result<Prompt, ValidationError> {
    let data = non_empty(data);
    if data.is_none() && images.is_empty() {
        return Err(ValidationError::new("데이터 또는 이미지가 필요합니다."));
    }
    let images = images
        .iter()
        .map(InlineImage::from_input)
        .collect::<Result<Vec<_>, _>>()?;
    let focus = non_empty(focus).unwrap_or(DEFAULT_ANALYSIS_FOCUS);

    let mut text = if images.is_empty() {
        format!("다음 데이터를 분석하고 {focus}\n")
    } else {
        format!("첨부한 이미지{}를 분석하고 {focus}\n", if data.is_some() { "와 데이터" } else { "" })
    };
    if let Some(data) = data {
        text.push_str(&format!("\n데이터:\n{data}\n"));
    }
    text.push('\n');
    text.push_str(ANALYSIS_SCHEMA);

    let task = if images.is_empty() {
        TaskKind::Analyze
    } else {
        TaskKind::AnalyzeWithImages
    };
    Ok(Prompt {
        task,
        system: None,
        messages: vec![PromptMessage {
            role: ChatRole::User,
            text,
            images,
        }],
    })
}

fn report_instruction(report_type: ReportType) -> &'static str {
    match report_type {
        ReportType::Summary => "간단한 요약 보고서를 작성해주세요.",
        ReportType::Detailed => {
            "상세한 분석 보고서를 작성해주세요. 각 데이터 포인트를 깊이 있게 분석하고 비즈니스 관점에서의 시사점을 포함해주세요."
        }
        ReportType::Presentation => {
            "프레젠테이션용 보고서를 작성해주세요. 핵심 메시지와 시각적 요소를 강조해주세요."
        }
    }
}

pub(crate) fn report(data: Option<&str>, report_type: ReportType) -> Result<Prompt, ValidationError> {
    let data = non_empty(data).ok_or_else(|| ValidationError::new("데이터가 필요합니다."))?;
    let mut prompt = Prompt::new(TaskKind::Report, None);
    prompt.push(
        ChatRole::User,
        format!(
            "다음 데이터를 기반으로 {}\n\n데이터:\n{data}",
            report_instruction(report_type)
        ),
    );
    Ok(prompt)
}

fn conversation_summary(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|message| {
            let role = match message.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            format!("{role}: {}", message.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn proposal(
    task: TaskKind,
    system: &str,
    history: &[ChatMessage],
    document_content: Option<&str>,
) -> Result<Prompt, ValidationError> {
    if history.is_empty() {
        return Err(ValidationError::new("대화 내용이 제공되지 않았습니다."));
    }
    let mut text = format!(
        "다음은 클라이언트와의 대화 내용입니다. 이를 바탕으로 전문적인 제안서를 작성해주세요.\n\n{}",
        conversation_summary(history)
    );
    if let Some(document) = non_empty(document_content) {
        text.push_str(&format!("\n\n정리된 문서 내용:\n{document}"));
    }
    let mut prompt = Prompt::new(task, Some(system.to_string()));
    prompt.push(ChatRole::User, text);
    Ok(prompt)
}

pub(crate) fn proposal_document(
    history: &[ChatMessage],
    document_content: Option<&str>,
) -> Result<Prompt, ValidationError> {
    proposal(
        TaskKind::ProposalDocument,
        PROPOSAL_DOCUMENT_SYSTEM,
        history,
        document_content,
    )
}

pub(crate) fn proposal_deck(
    history: &[ChatMessage],
    document_content: Option<&str>,
) -> Result<Prompt, ValidationError> {
    proposal(
        TaskKind::ProposalDeck,
        PROPOSAL_DECK_SYSTEM,
        history,
        document_content,
    )
}

pub(crate) fn chat(messages: Option<&[ChatMessage]>) -> Result<Prompt, ValidationError> {
    let messages = messages
        .filter(|messages| !messages.is_empty())
        .ok_or_else(|| ValidationError::new("메시지가 제공되지 않았습니다."))?;
    let mut prompt = Prompt::new(TaskKind::Chat, Some(CHAT_SYSTEM.to_string()));
    for message in messages {
        prompt.push(message.role, message.content.clone());
    }
    Ok(prompt)
}

pub(crate) fn slide_edit(
    slide_content: &Value,
    slide_type: &str,
    edit_messages: &[ChatMessage],
) -> Result<Prompt, ValidationError> {
    if edit_messages.is_empty() {
        return Err(ValidationError::new("수정 요청이 제공되지 않았습니다."));
    }
    let slide_type = non_empty(Some(slide_type)).unwrap_or("content");
    let system = format!(
        "당신은 프레젠테이션 슬라이드 수정 전문가입니다.\n사용자의 요청에 따라 슬라이드 내용을 수정하세요.\n\n슬라이드 타입: {slide_type}\n\n{SLIDE_EDIT_RULES}"
    );
    let current = serde_json::to_string_pretty(slide_content).unwrap_or_else(|_| "{}".to_string());

    let mut prompt = Prompt::new(TaskKind::SlideEdit, Some(system));
    prompt.push(
        ChatRole::User,
        format!("현재 슬라이드 내용:\n{current}\n\n다음과 같이 수정해주세요:"),
    );
    for message in edit_messages {
        prompt.push(message.role, message.content.clone());
    }
    Ok(prompt)
}

/// Full conversation with the latest reply appended, as kept by the document editor.
pub(crate) fn document_transcript(messages: &[ChatMessage], latest_reply: &str) -> String {
    let transcript = messages
        .iter()
        .map(|message| {
            let speaker = match message.role {
                ChatRole::User => "사용자",
                ChatRole::Assistant => "AI",
            };
            format!("{speaker}: {}", message.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{transcript}\n\nAI: {latest_reply}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn png(data: &str) -> ImageInput {
        ImageInput {
            media_type: "image/png".to_string(),
            data: data.to_string(),
        }
    }

    #[test]
    fn analyze_requires_data_or_images() {
        let err = analyze(Some("   "), None, &[]).expect_err("empty");
        assert_eq!(err.message, "데이터 또는 이미지가 필요합니다.");
    }

    #[test]
    fn analyze_embeds_data_focus_and_schema() {
        let prompt = analyze(Some("name,value\n서울,100"), Some("주요 트렌드"), &[]).expect("prompt");
        assert_eq!(prompt.task, TaskKind::Analyze);
        assert!(prompt.system.is_none());
        let text = &prompt.messages[0].text;
        assert!(text.starts_with("다음 데이터를 분석하고 주요 트렌드"));
        assert!(text.contains("서울,100"));
        for field in ["\"insights\"", "\"summary\"", "\"chartData\"", "\"recommendations\""] {
            assert!(text.contains(field), "missing {field}");
        }
    }

    #[test]
    fn analyze_defaults_focus() {
        let prompt = analyze(Some("a,b"), Some(""), &[]).expect("prompt");
        assert!(prompt.messages[0].text.contains(DEFAULT_ANALYSIS_FOCUS));
    }

    #[test]
    fn images_switch_task_and_strip_data_url() {
        let prompt = analyze(None, None, &[png("data:image/png;base64,AAAA")]).expect("prompt");
        assert_eq!(prompt.task, TaskKind::AnalyzeWithImages);
        assert_eq!(
            prompt.messages[0].images,
            vec![InlineImage {
                media_type: "image/png".to_string(),
                data: "AAAA".to_string(),
            }]
        );
    }

    #[test]
    fn rejects_unsupported_image_type() {
        let image = ImageInput {
            media_type: "application/pdf".to_string(),
            data: "AAAA".to_string(),
        };
        assert!(analyze(None, None, &[image]).is_err());
    }

    #[test]
    fn report_requires_data() {
        assert!(report(None, ReportType::Summary).is_err());
        let prompt = report(Some("x"), ReportType::Detailed).expect("prompt");
        assert!(prompt.messages[0].text.contains("상세한 분석 보고서"));
    }

    #[test]
    fn proposal_requires_history() {
        assert!(proposal_document(&[], None).is_err());
        assert!(proposal_deck(&[], Some("doc")).is_err());
    }

    #[test]
    fn proposal_deck_lists_slide_types_and_chart_types() {
        let prompt = proposal_deck(&[ChatMessage::user("AI 챗봇 구축")], None).expect("prompt");
        let system = prompt.system.expect("system");
        for kind in ["\"title\"", "\"image-content\"", "\"closing\"", "\"pie\"", "\"line\""] {
            assert!(system.contains(kind), "missing {kind}");
        }
        assert!(prompt.messages[0].text.contains("user: AI 챗봇 구축"));
    }

    #[test]
    fn chat_rejects_absent_and_empty_messages() {
        assert!(chat(None).is_err());
        assert!(chat(Some(&[][..])).is_err());
    }

    #[test]
    fn slide_edit_merges_leading_user_turns() {
        let prompt = slide_edit(
            &json!({"heading": "매출"}),
            "chart",
            &[ChatMessage::user("숫자를 늘려주세요")],
        )
        .expect("prompt");
        assert_eq!(prompt.messages.len(), 1);
        let text = &prompt.messages[0].text;
        assert!(text.contains("\"heading\": \"매출\""));
        assert!(text.ends_with("숫자를 늘려주세요"));
        assert!(prompt.system.expect("system").contains("슬라이드 타입: chart"));
    }

    #[test]
    fn slide_edit_requires_messages() {
        let err = slide_edit(&json!({}), "content", &[]).expect_err("empty");
        assert_eq!(err.message, "수정 요청이 제공되지 않았습니다.");
    }

    #[test]
    fn transcript_appends_latest_reply() {
        let messages = vec![ChatMessage::user("안녕하세요"), ChatMessage::assistant("네")];
        assert_eq!(
            document_transcript(&messages, "무엇을 도와드릴까요?"),
            "사용자: 안녕하세요\n\nAI: 네\n\nAI: 무엇을 도와드릴까요?"
        );
    }

    #[test]
    fn task_names_round_trip() {
        for task in TaskKind::ALL {
            assert_eq!(TaskKind::parse(task.as_str()), Some(task));
        }
    }
}
