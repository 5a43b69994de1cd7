use protocol::ProposalDocument;
use std::fmt::Write as _;

use super::{escape_multiline, generated_at, escape_html, Stamp};

fn block(out: &mut String, class: &str, icon: &str, heading: &str, body: &str) {
    if body.trim().is_empty() {
        return;
    }
    let _ = write!(
        out,
        r#"<section class="section {class}"><h2><span class="icon">{icon}</span> {heading}</h2><p>{}</p></section>"#,
        escape_multiline(body)
    );
}

/// Title, executive summary, sections, timeline and budget of a text proposal.
pub(crate) fn proposal_view(proposal: &ProposalDocument, stamp: Stamp) -> String {
    let mut out = String::from(r#"<article class="proposal">"#);
    let _ = write!(
        out,
        r#"<header class="proposal-header"><h1>{}</h1>"#,
        escape_html(&proposal.title)
    );
    generated_at(
        &mut out,
        "proposal-date",
        &format!("생성 날짜: {}", stamp.korean_date()),
    );
    out.push_str("</header>");

    block(&mut out, "summary", "📋", "요약", &proposal.executive_summary);
    for section in &proposal.sections {
        let _ = write!(
            out,
            r#"<section class="section proposal-section"><h2><span class="icon">▶</span> {}</h2><div class="section-body">{}</div></section>"#,
            escape_html(&section.heading),
            escape_multiline(&section.content)
        );
    }
    block(&mut out, "timeline", "📅", "일정", &proposal.timeline);
    block(&mut out, "budget", "💰", "예산", &proposal.budget);

    out.push_str(
        r#"<footer class="proposal-footer"><p>본 제안서는 <strong>Wiz Works</strong> AI 시스템으로 자동 생성되었습니다</p></footer></article>"#,
    );
    out
}
