use protocol::{
    AnalysisResult, ChartKind, ChartPoint, ChartSpec, ProposalDocument, ProposalSection, Slide,
    SlideContent, SlideDeck, SlideEdit, SlideKind,
};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::warn;

const FALLBACK_TITLE: &str = "프로젝트 제안서";
const FALLBACK_SUMMARY: &str = "대화 내용을 바탕으로 생성된 제안서입니다.";
const FALLBACK_HEADING: &str = "제안 내용";
const FALLBACK_TERMS: &str = "협의 필요";

#[derive(Debug, Error)]
pub(crate) enum DecodeError {
    #[error("reply contains no JSON object")]
    NoObject,
    #[error("reply is not valid JSON: {0}")]
    Syntax(String),
    #[error("reply JSON is not an object")]
    NotObject,
}

/// Where to look for JSON when the reply carries no fenced block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unfenced {
    WholeText,
    ObjectSpan,
}

fn fenced_json() -> Option<&'static Regex> {
    static FENCED: OnceLock<Option<Regex>> = OnceLock::new();
    FENCED
        .get_or_init(|| Regex::new(r"(?i)```json[ \t]*\r?\n?([\s\S]*?)```").ok())
        .as_ref()
}

fn candidate(raw: &str, unfenced: Unfenced) -> Option<&str> {
    if let Some(inner) = fenced_json()
        .and_then(|fenced| fenced.captures(raw))
        .and_then(|caps| caps.get(1))
    {
        return Some(inner.as_str().trim());
    }
    match unfenced {
        Unfenced::WholeText => Some(raw.trim()),
        Unfenced::ObjectSpan => {
            let start = raw.find('{')?;
            let end = raw.rfind('}')?;
            (end > start).then(|| &raw[start..=end])
        }
    }
}

fn parse_object(raw: &str, unfenced: Unfenced) -> Result<Map<String, Value>, DecodeError> {
    let text = candidate(raw, unfenced).ok_or(DecodeError::NoObject)?;
    let value: Value =
        serde_json::from_str(text).map_err(|err| DecodeError::Syntax(err.to_string()))?;
    match value {
        Value::Object(object) => Ok(object),
        _ => Err(DecodeError::NotObject),
    }
}

fn text_field(object: &Map<String, Value>, key: &str) -> String {
    object.get(key).map(scalar_text).unwrap_or_default()
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn text_list(object: &Map<String, Value>, key: &str) -> Vec<String> {
    match object.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(scalar_text)
            .collect(),
        _ => Vec::new(),
    }
}

/// Numbers pass through and numeric strings are coerced; anything else is `None`.
fn chart_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => {
            let cleaned: String = text
                .chars()
                .filter(|ch| !ch.is_whitespace() && *ch != ',' && *ch != '%')
                .collect();
            cleaned.parse::<f64>().ok()?
        }
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn chart_points(value: Option<&Value>) -> Vec<ChartPoint> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let object = item.as_object()?;
            let name = text_field(object, "name");
            match object.get("value").and_then(chart_value) {
                Some(value) => Some(ChartPoint { name, value }),
                None => {
                    warn!(
                        event = "decode.chart_point_dropped",
                        index,
                        name = %name,
                        "chart entry has no numeric value"
                    );
                    None
                }
            }
        })
        .collect()
}

fn chart_spec(value: Option<&Value>) -> Option<ChartSpec> {
    let object = value?.as_object()?;
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .and_then(ChartKind::parse)
        .unwrap_or_default();
    Some(ChartSpec {
        kind,
        data: chart_points(object.get("data")),
        title: text_field(object, "title"),
    })
}

fn slide_content(value: Option<&Value>) -> SlideContent {
    match value {
        Some(Value::String(text)) => SlideContent::from_text(text),
        Some(Value::Array(parts)) => {
            SlideContent::from_parts(parts.iter().filter(|part| !part.is_null()).map(scalar_text))
        }
        Some(Value::Null) | None => SlideContent::default(),
        Some(other) => SlideContent::from_text(&scalar_text(other)),
    }
}

fn slide_number(value: Option<&Value>, position: usize) -> u32 {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_u64(),
        Some(Value::String(text)) => text.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .and_then(|number| u32::try_from(number).ok())
        .unwrap_or_else(|| u32::try_from(position + 1).unwrap_or(u32::MAX))
}

fn slide(object: &Map<String, Value>, position: usize) -> Slide {
    let kind = match text_field(object, "type") {
        raw if raw.trim().is_empty() => SlideKind::Content,
        raw => SlideKind::from(raw),
    };
    let image_keyword = Some(text_field(object, "imageKeyword")).filter(|keyword| !keyword.is_empty());
    Slide {
        slide_number: slide_number(object.get("slideNumber"), position),
        kind,
        heading: text_field(object, "heading"),
        content: slide_content(object.get("content")),
        image_keyword,
        chart: chart_spec(object.get("chartData")),
    }
}

pub(crate) fn decode_analysis(raw: &str) -> Result<AnalysisResult, DecodeError> {
    let object = parse_object(raw, Unfenced::ObjectSpan)?;
    Ok(AnalysisResult {
        insights: text_list(&object, "insights"),
        summary: text_field(&object, "summary"),
        chart_data: chart_points(object.get("chartData")),
        recommendations: text_list(&object, "recommendations"),
    })
}

fn try_proposal_document(raw: &str) -> Result<ProposalDocument, DecodeError> {
    let object = parse_object(raw, Unfenced::WholeText)?;
    let sections = match object.get("sections") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .map(|section| ProposalSection {
                heading: text_field(section, "heading"),
                content: text_field(section, "content"),
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(ProposalDocument {
        title: text_field(&object, "title"),
        executive_summary: text_field(&object, "executiveSummary"),
        sections,
        timeline: text_field(&object, "timeline"),
        budget: text_field(&object, "budget"),
    })
}

/// Decodes a proposal document, substituting a one-section document holding
/// the raw reply when it carries no usable JSON.
pub(crate) fn decode_proposal_document(raw: &str) -> ProposalDocument {
    try_proposal_document(raw).unwrap_or_else(|err| {
        warn!(event = "decode.proposal_fallback", error = %err, "using fallback proposal");
        ProposalDocument {
            title: FALLBACK_TITLE.to_string(),
            executive_summary: FALLBACK_SUMMARY.to_string(),
            sections: vec![ProposalSection {
                heading: FALLBACK_HEADING.to_string(),
                content: raw.to_string(),
            }],
            timeline: FALLBACK_TERMS.to_string(),
            budget: FALLBACK_TERMS.to_string(),
        }
    })
}

fn try_slide_deck(raw: &str) -> Result<SlideDeck, DecodeError> {
    let object = parse_object(raw, Unfenced::WholeText)?;
    let slides = match object.get("slides") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .enumerate()
            .map(|(position, item)| slide(item, position))
            .collect(),
        _ => Vec::new(),
    };
    Ok(SlideDeck {
        title: text_field(&object, "title"),
        subtitle: text_field(&object, "subtitle"),
        slides,
    })
}

/// Decodes a slide deck, substituting a single content slide holding the raw
/// reply when it carries no usable JSON.
pub(crate) fn decode_slide_deck(raw: &str) -> SlideDeck {
    try_slide_deck(raw).unwrap_or_else(|err| {
        warn!(event = "decode.deck_fallback", error = %err, "using fallback deck");
        SlideDeck {
            title: FALLBACK_TITLE.to_string(),
            subtitle: FALLBACK_SUMMARY.to_string(),
            slides: vec![Slide {
                slide_number: 1,
                kind: SlideKind::Content,
                heading: FALLBACK_HEADING.to_string(),
                content: SlideContent::from_text(raw),
                image_keyword: None,
                chart: None,
            }],
        }
    })
}

pub(crate) fn decode_slide_edit(raw: &str) -> Result<SlideEdit, DecodeError> {
    let object = parse_object(raw, Unfenced::WholeText)?;
    Ok(SlideEdit {
        heading: text_field(&object, "heading"),
        content: slide_content(object.get("content")),
        chart: chart_spec(object.get("chartData")),
    })
}
