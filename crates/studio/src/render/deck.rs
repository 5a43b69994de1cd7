use protocol::{Slide, SlideDeck, SlideKind};
use std::fmt::Write as _;

use super::{chart_svg, escape_html, escape_multiline, generated_at, Stamp};

const BRAND: &str = "Wiz Works";
const TAGLINE: &str = "AI로 업무를 혁신하세요";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlideLayout {
    Title,
    Bullets,
    Highlight,
    Chart,
    Closing,
}

impl SlideLayout {
    fn class(self) -> &'static str {
        match self {
            SlideLayout::Title => "title-slide",
            SlideLayout::Bullets => "content-slide",
            SlideLayout::Highlight => "highlight-slide",
            SlideLayout::Chart => "chart-slide",
            SlideLayout::Closing => "closing-slide",
        }
    }
}

pub(crate) fn slide_layout(kind: &SlideKind) -> SlideLayout {
    match kind {
        SlideKind::Title => SlideLayout::Title,
        SlideKind::ImageContent => SlideLayout::Highlight,
        SlideKind::Chart => SlideLayout::Chart,
        SlideKind::Closing => SlideLayout::Closing,
        SlideKind::Content
        | SlideKind::Timeline
        | SlideKind::Budget
        | SlideKind::Team
        | SlideKind::Other(_) => SlideLayout::Bullets,
    }
}

pub(crate) fn slide_icon(kind: &SlideKind) -> &'static str {
    match kind {
        SlideKind::Title => "🎯",
        SlideKind::Content => "📋",
        SlideKind::ImageContent => "💡",
        SlideKind::Chart => "📊",
        SlideKind::Timeline => "📅",
        SlideKind::Budget => "💰",
        SlideKind::Team => "👥",
        SlideKind::Closing => "✨",
        SlideKind::Other(_) => "▶️",
    }
}

/// Current slide of a deck, kept within `[0, count - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeckNavigator {
    index: usize,
    count: usize,
}

impl DeckNavigator {
    pub(crate) fn at(index: usize, count: usize) -> Self {
        Self {
            index: index.min(count.saturating_sub(1)),
            count,
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn has_prev(&self) -> bool {
        self.index > 0
    }

    pub(crate) fn has_next(&self) -> bool {
        self.index + 1 < self.count
    }

    /// Moves forward one slide; a no-op on the last slide.
    pub(crate) fn next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Moves back one slide; a no-op on the first slide.
    pub(crate) fn prev(&mut self) -> bool {
        if !self.has_prev() {
            return false;
        }
        self.index -= 1;
        true
    }

    /// `n / total`, one-based.
    pub(crate) fn position_label(&self) -> String {
        if self.count == 0 {
            return "0 / 0".to_string();
        }
        format!("{} / {}", self.index + 1, self.count)
    }
}

fn slide_header(out: &mut String, slide: &Slide) {
    let _ = write!(
        out,
        r#"<div class="slide-header"><span class="icon">{}</span><h2>{}</h2></div>"#,
        slide_icon(&slide.kind),
        escape_html(&slide.heading)
    );
}

fn numbered_bullets(out: &mut String, slide: &Slide) {
    let bullets = slide.content.bullets();
    if bullets.is_empty() {
        let _ = write!(
            out,
            r#"<div class="bullet-text">{}</div>"#,
            escape_multiline(&slide.content.text())
        );
        return;
    }
    for (index, line) in bullets.iter().enumerate() {
        let _ = write!(
            out,
            r#"<div class="bullet-item"><span class="bullet-number">{}</span><span class="bullet-text">{}</span></div>"#,
            index + 1,
            escape_html(line)
        );
    }
}

fn slide_body(out: &mut String, deck: &SlideDeck, slide: &Slide, stamp: Stamp) {
    match slide_layout(&slide.kind) {
        SlideLayout::Title => {
            let subtitle = if slide.content.is_blank() {
                escape_html(&deck.subtitle)
            } else {
                escape_multiline(&slide.content.text())
            };
            let _ = write!(
                out,
                r#"<span class="icon">{}</span><h1>{}</h1><p class="subtitle">{subtitle}</p><div class="divider"></div>"#,
                slide_icon(&slide.kind),
                escape_html(&slide.heading)
            );
            generated_at(out, "slide-date", &stamp.korean_date());
        }
        SlideLayout::Highlight => {
            slide_header(out, slide);
            if let Some(keyword) = slide
                .image_keyword
                .as_deref()
                .map(str::trim)
                .filter(|keyword| !keyword.is_empty())
            {
                let _ = write!(
                    out,
                    r#"<p class="image-keyword">🔍 {}</p>"#,
                    escape_html(keyword)
                );
            }
            for line in slide.content.bullets() {
                let _ = write!(
                    out,
                    r#"<div class="highlight-item"><span class="highlight-icon">✓</span><span class="highlight-text">{}</span></div>"#,
                    escape_html(line)
                );
            }
        }
        SlideLayout::Chart => {
            slide_header(out, slide);
            match &slide.chart {
                Some(chart) => {
                    let _ = write!(
                        out,
                        r#"<figure class="slide-chart"><figcaption>{}</figcaption>{}</figure>"#,
                        escape_html(&chart.title),
                        chart_svg(&chart.data, chart.kind)
                    );
                }
                None => out.push_str(&chart_svg(&[], Default::default())),
            }
            if !slide.content.is_blank() {
                numbered_bullets(out, slide);
            }
        }
        SlideLayout::Closing => {
            let _ = write!(
                out,
                r#"<span class="icon">{}</span><h2>{}</h2><p class="closing-text">{}</p><div class="divider"></div><div class="brand-block"><div class="brand">{BRAND}</div><div class="tagline">{TAGLINE}</div></div>"#,
                slide_icon(&slide.kind),
                escape_html(&slide.heading),
                escape_multiline(&slide.content.text())
            );
        }
        SlideLayout::Bullets => {
            slide_header(out, slide);
            numbered_bullets(out, slide);
        }
    }
}

fn slide_markup(out: &mut String, deck: &SlideDeck, slide: &Slide, position: &str, stamp: Stamp) {
    let layout = slide_layout(&slide.kind);
    let _ = write!(
        out,
        r#"<section class="slide {}" data-slide-number="{}" data-slide-type="{}"><div class="slide-inner">"#,
        layout.class(),
        slide.slide_number,
        escape_html(slide.kind.as_str())
    );
    slide_body(out, deck, slide, stamp);
    let _ = write!(
        out,
        r#"</div><div class="slide-number">{position}</div></section>"#
    );
}

/// One slide for the preview pane with its navigation controls.
pub(crate) fn slide_view(deck: &SlideDeck, navigator: &DeckNavigator, stamp: Stamp) -> String {
    let Some(slide) = deck.slides.get(navigator.index()) else {
        return r#"<div class="deck-empty"><p>슬라이드가 없습니다</p></div>"#.to_string();
    };
    let position = navigator.position_label();
    let mut out = String::from(r#"<div class="deck-view">"#);
    slide_markup(&mut out, deck, slide, &position, stamp);

    let button = |direction: &str, label: &str, target: Option<usize>| match target {
        Some(target) => format!(
            r#"<button type="button" class="deck-{direction}" data-target-index="{target}">{label}</button>"#
        ),
        None => format!(r#"<button type="button" class="deck-{direction}" disabled>{label}</button>"#),
    };
    let mut prev = *navigator;
    let mut next = *navigator;
    let prev_target = prev.prev().then(|| prev.index());
    let next_target = next.next().then(|| next.index());
    let _ = write!(
        out,
        r#"<nav class="deck-nav">{}<span class="deck-position">{position}</span>{}</nav></div>"#,
        button("prev", "◀ 이전", prev_target),
        button("next", "다음 ▶", next_target),
    );
    out
}

/// Every slide of the deck in order, for export.
pub(crate) fn deck_document_body(deck: &SlideDeck, stamp: Stamp) -> String {
    let total = deck.slides.len();
    let mut out = String::new();
    for (index, slide) in deck.slides.iter().enumerate() {
        let position = format!("{} / {total}", index + 1);
        slide_markup(&mut out, deck, slide, &position, stamp);
    }
    out
}
