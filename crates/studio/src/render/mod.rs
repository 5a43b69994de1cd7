mod analysis;
mod chart;
mod deck;
mod proposal;

use chrono::{NaiveDateTime, Timelike};
use protocol::{ChartKind, Document};
use std::fmt::Write as _;

pub(crate) use analysis::{analysis_view, insights_panel};
pub(crate) use chart::{chart_svg, format_value};
pub(crate) use deck::{deck_document_body, slide_view, DeckNavigator};
pub(crate) use proposal::proposal_view;

/// Wall-clock instant a render or export is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Stamp(NaiveDateTime);

impl Stamp {
    pub(crate) fn new(at: NaiveDateTime) -> Self {
        Self(at)
    }

    pub(crate) fn now() -> Self {
        Self::new(chrono::Local::now().naive_local())
    }

    /// `2024. 1. 5.`
    pub(crate) fn korean_date(&self) -> String {
        self.0.format("%Y. %-m. %-d.").to_string()
    }

    /// `2024. 1. 5. 오후 3:04:05`
    pub(crate) fn korean_datetime(&self) -> String {
        let (is_pm, hour) = self.0.hour12();
        format!(
            "{} {} {}:{:02}:{:02}",
            self.korean_date(),
            if is_pm { "오후" } else { "오전" },
            hour,
            self.0.minute(),
            self.0.second()
        )
    }

    /// `2024-01-05-15-04-05`
    pub(crate) fn file_suffix(&self) -> String {
        self.0.format("%Y-%m-%d-%H-%M-%S").to_string()
    }
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Escapes `raw` and turns line breaks into `<br>`.
pub(crate) fn escape_multiline(raw: &str) -> String {
    raw.split('\n')
        .map(|line| escape_html(line.trim_end_matches('\r')))
        .collect::<Vec<_>>()
        .join("<br>")
}

pub(crate) fn generated_at(out: &mut String, class: &str, text: &str) {
    let _ = write!(
        out,
        r#"<p class="{class}" data-generated-at>{}</p>"#,
        escape_html(text)
    );
}

/// Screen fragment for the preview pane.
pub(crate) fn render_fragment(
    document: &Document,
    chart_kind: Option<ChartKind>,
    slide_index: Option<usize>,
    stamp: Stamp,
) -> String {
    match document {
        Document::Analysis(result) => analysis_view(result, chart_kind.unwrap_or_default()),
        Document::Proposal(proposal) => proposal_view(proposal, stamp),
        Document::Deck(deck) => {
            let navigator = DeckNavigator::at(slide_index.unwrap_or(0), deck.slides.len());
            slide_view(deck, &navigator, stamp)
        }
    }
}

#[cfg(test)]
pub(crate) fn stamp(hour: u32, minute: u32, second: u32) -> Stamp {
    Stamp::new(
        chrono::NaiveDate::from_ymd_opt(2024, 1, 5)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .expect("datetime"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_korean_datetime() {
        assert_eq!(stamp(15, 4, 5).korean_datetime(), "2024. 1. 5. 오후 3:04:05");
        assert_eq!(stamp(0, 30, 0).korean_datetime(), "2024. 1. 5. 오전 12:30:00");
        assert_eq!(stamp(12, 0, 9).korean_datetime(), "2024. 1. 5. 오후 12:00:09");
        assert_eq!(stamp(9, 0, 0).korean_date(), "2024. 1. 5.");
    }

    #[test]
    fn file_suffix_is_zero_padded() {
        assert_eq!(stamp(9, 7, 3).file_suffix(), "2024-01-05-09-07-03");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<b>"A" & 'B'</b>"#),
            "&lt;b&gt;&quot;A&quot; &amp; &#39;B&#39;&lt;/b&gt;"
        );
        assert_eq!(escape_multiline("a<\r\nb"), "a&lt;<br>b");
    }

    #[test]
    fn deck_fragment_clamps_index() {
        let deck = protocol::SlideDeck {
            title: "t".to_string(),
            subtitle: String::new(),
            slides: vec![protocol::Slide {
                slide_number: 1,
                kind: protocol::SlideKind::Content,
                heading: "only".to_string(),
                content: protocol::SlideContent::from_text("x"),
                image_keyword: None,
                chart: None,
            }],
        };
        let html = render_fragment(&Document::Deck(deck), None, Some(9), stamp(9, 0, 0));
        assert!(html.contains("1 / 1"));
        assert!(html.contains("only"));
    }
}
