use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartPoint {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub chart_data: Vec<ChartPoint>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl AnalysisResult {
    pub fn has_insight_content(&self) -> bool {
        !self.summary.trim().is_empty() || !self.insights.is_empty() || !self.recommendations.is_empty()
    }
}

/// Attribution fields printed in the header of an exported analysis report.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub target_company: String,
    #[serde(default)]
    pub report_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_period: Option<String>,
}

impl ReportMetadata {
    /// Returns the wire name of the first required field left blank.
    pub fn first_missing_field(&self) -> Option<&'static str> {
        [
            ("companyName", &self.company_name),
            ("department", &self.department),
            ("authorName", &self.author_name),
            ("targetCompany", &self.target_company),
            ("reportTitle", &self.report_title),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProposalSection {
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProposalDocument {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub executive_summary: String,
    #[serde(default)]
    pub sections: Vec<ProposalSection>,
    #[serde(default)]
    pub timeline: String,
    #[serde(default)]
    pub budget: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Bar,
    Pie,
    Line,
}

impl ChartKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bar" => Some(Self::Bar),
            "pie" => Some(Self::Pie),
            "line" => Some(Self::Line),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Pie => "pie",
            Self::Line => "line",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChartSpec {
    #[serde(rename = "type", default)]
    pub kind: ChartKind,
    #[serde(default)]
    pub data: Vec<ChartPoint>,
    #[serde(default)]
    pub title: String,
}

/// Slide `type` values. Unknown values survive a round trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SlideKind {
    Title,
    Content,
    ImageContent,
    Chart,
    Timeline,
    Budget,
    Team,
    Closing,
    Other(String),
}

impl Default for SlideKind {
    fn default() -> Self {
        Self::Content
    }
}

impl SlideKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Title => "title",
            Self::Content => "content",
            Self::ImageContent => "image-content",
            Self::Chart => "chart",
            Self::Timeline => "timeline",
            Self::Budget => "budget",
            Self::Team => "team",
            Self::Closing => "closing",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for SlideKind {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "title" => Self::Title,
            "content" => Self::Content,
            "image-content" => Self::ImageContent,
            "chart" => Self::Chart,
            "timeline" => Self::Timeline,
            "budget" => Self::Budget,
            "team" => Self::Team,
            "closing" => Self::Closing,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for SlideKind {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<SlideKind> for String {
    fn from(kind: SlideKind) -> Self {
        match kind {
            SlideKind::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// Slide body as an ordered sequence of lines.
///
/// Accepts either a `\n`-delimited string or an array of strings on the wire;
/// arrays are joined with `\n` before splitting so both shapes land in the same
/// representation. Serializes back as a single `\n`-delimited string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlideContent {
    lines: Vec<String>,
}

impl SlideContent {
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(str::to_string).collect(),
        }
    }

    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = parts
            .into_iter()
            .map(|part| part.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Self::from_text(&joined)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Non-blank lines, trimmed, in order.
    pub fn bullets(&self) -> Vec<&str> {
        self.lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect()
    }

    pub fn is_blank(&self) -> bool {
        self.bullets().is_empty()
    }
}

impl Serialize for SlideContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text())
    }
}

impl<'de> Deserialize<'de> for SlideContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Text(String),
            Parts(Vec<String>),
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Text(text) => Self::from_text(&text),
            Wire::Parts(parts) => Self::from_parts(parts),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    /// One-based; `0` on the wire means unnumbered and is replaced by the
    /// slide's position when a deck is read.
    #[serde(default)]
    pub slide_number: u32,
    #[serde(rename = "type", default)]
    pub kind: SlideKind,
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub content: SlideContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_keyword: Option<String>,
    #[serde(rename = "chartData", default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,
}

/// Partial slide produced by a single-slide edit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlideEdit {
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub content: SlideContent,
    #[serde(rename = "chartData", default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "SlideDeckWire")]
pub struct SlideDeck {
    pub title: String,
    pub subtitle: String,
    pub slides: Vec<Slide>,
}

#[derive(Deserialize)]
struct SlideDeckWire {
    #[serde(default)]
    title: String,
    #[serde(default)]
    subtitle: String,
    #[serde(default)]
    slides: Vec<Slide>,
}

impl From<SlideDeckWire> for SlideDeck {
    fn from(wire: SlideDeckWire) -> Self {
        let mut slides = wire.slides;
        for (position, slide) in slides.iter_mut().enumerate() {
            if slide.slide_number == 0 {
                slide.slide_number = u32::try_from(position + 1).unwrap_or(u32::MAX);
            }
        }
        Self {
            title: wire.title,
            subtitle: wire.subtitle,
            slides,
        }
    }
}

impl SlideDeck {
    /// Replaces heading and content of the slide at `index`.
    ///
    /// Slide number, type and every other slide are left untouched; an edit
    /// without chart data keeps the slide's existing chart. Returns false when
    /// `index` is out of range.
    pub fn apply_edit(&mut self, index: usize, edit: SlideEdit) -> bool {
        let Some(slide) = self.slides.get_mut(index) else {
            return false;
        };
        slide.heading = edit.heading;
        slide.content = edit.content;
        if edit.chart.is_some() {
            slide.chart = edit.chart;
        }
        true
    }
}

/// Any document the service can render or export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Document {
    Analysis(AnalysisResult),
    Proposal(ProposalDocument),
    Deck(SlideDeck),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn slide(number: u32, kind: &str, heading: &str, content: &str) -> Slide {
        Slide {
            slide_number: number,
            kind: SlideKind::from(kind),
            heading: heading.to_string(),
            content: SlideContent::from_text(content),
            image_keyword: None,
            chart: None,
        }
    }

    #[test]
    fn deck_slides_without_number_or_type_take_position_and_content() {
        let deck: SlideDeck = serde_json::from_value(json!({
            "title": "t",
            "slides": [
                {"heading": "표지", "type": "title"},
                {"slideNumber": 7, "heading": "본문", "content": "a"},
                {"heading": "마무리"}
            ]
        }))
        .expect("deck");
        let numbers: Vec<u32> = deck.slides.iter().map(|slide| slide.slide_number).collect();
        assert_eq!(numbers, vec![1, 7, 3]);
        assert_eq!(deck.slides[0].kind, SlideKind::Title);
        assert_eq!(deck.slides[1].kind, SlideKind::Content);
        assert_eq!(deck.slides[2].kind, SlideKind::Content);
        assert_eq!(deck.subtitle, "");
    }

    #[test]
    fn content_array_is_joined_then_split() {
        let content: SlideContent =
            serde_json::from_value(json!(["첫째", "둘째\n셋째", ""])).expect("content");
        assert_eq!(content.lines(), &["첫째", "둘째", "셋째", ""]);
        assert_eq!(content.bullets(), vec!["첫째", "둘째", "셋째"]);
    }

    #[test]
    fn content_text_is_preserved_verbatim() {
        let raw = "line one\n\n  line two  \r\n";
        let content = SlideContent::from_text(raw);
        assert_eq!(content.text(), raw);
        assert_eq!(content.bullets(), vec!["line one", "line two"]);
        assert_eq!(serde_json::to_value(&content).expect("json"), json!(raw));
    }

    #[test]
    fn unknown_slide_kind_round_trips() {
        let parsed: Slide = serde_json::from_value(json!({
            "slideNumber": 4,
            "type": "quote",
            "heading": "h",
            "content": "c"
        }))
        .expect("slide");
        assert_eq!(parsed.kind, SlideKind::Other("quote".to_string()));
        let value = serde_json::to_value(&parsed).expect("json");
        assert_eq!(value["type"], json!("quote"));
        assert!(value.get("chartData").is_none());
    }

    #[test]
    fn known_slide_kind_parses_case_insensitively() {
        assert_eq!(SlideKind::from("Image-Content"), SlideKind::ImageContent);
        assert_eq!(String::from(SlideKind::ImageContent), "image-content");
    }

    #[test]
    fn apply_edit_replaces_only_target_slide() {
        let mut deck = SlideDeck {
            title: "t".to_string(),
            subtitle: "s".to_string(),
            slides: vec![
                slide(1, "title", "표지", "부제"),
                slide(2, "chart", "매출", "a\nb"),
                slide(3, "closing", "감사합니다", ""),
            ],
        };
        deck.slides[1].chart = Some(ChartSpec {
            kind: ChartKind::Pie,
            data: vec![ChartPoint {
                name: "x".to_string(),
                value: 1.0,
            }],
            title: "old".to_string(),
        });
        let before = deck.clone();

        let applied = deck.apply_edit(
            1,
            SlideEdit {
                heading: "새 매출".to_string(),
                content: SlideContent::from_text("c\nd"),
                chart: None,
            },
        );

        assert!(applied);
        assert_eq!(deck.slides[0], before.slides[0]);
        assert_eq!(deck.slides[2], before.slides[2]);
        assert_eq!(deck.slides[1].slide_number, 2);
        assert_eq!(deck.slides[1].kind, SlideKind::Chart);
        assert_eq!(deck.slides[1].heading, "새 매출");
        assert_eq!(deck.slides[1].content.bullets(), vec!["c", "d"]);
        assert_eq!(deck.slides[1].chart, before.slides[1].chart);
    }

    #[test]
    fn apply_edit_out_of_range_is_rejected() {
        let mut deck = SlideDeck::default();
        let edit = SlideEdit {
            heading: String::new(),
            content: SlideContent::default(),
            chart: None,
        };
        assert!(!deck.apply_edit(0, edit));
    }

    #[test]
    fn metadata_reports_first_blank_required_field() {
        let metadata = ReportMetadata {
            company_name: "위즈".to_string(),
            department: "전략".to_string(),
            author_name: " ".to_string(),
            target_company: String::new(),
            report_title: "분기 보고".to_string(),
            report_period: None,
        };
        assert_eq!(metadata.first_missing_field(), Some("authorName"));
    }

    #[test]
    fn document_is_tagged_by_kind() {
        let doc: Document = serde_json::from_value(json!({
            "kind": "analysis",
            "summary": "s"
        }))
        .expect("document");
        let Document::Analysis(result) = doc else {
            panic!("expected analysis");
        };
        assert_eq!(result.summary, "s");
        assert!(result.chart_data.is_empty());
    }
}
