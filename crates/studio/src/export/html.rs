use protocol::{AnalysisResult, ChartKind, Document, ProposalDocument, ReportMetadata, SlideDeck};
use std::fmt::Write as _;

use super::{export_filename, PROPOSAL_FILE_STEM, REPORT_FILE_STEM};
use crate::render::{
    chart_svg, deck_document_body, escape_html, format_value, generated_at, insights_panel,
    proposal_view, Stamp,
};

const REPORT_TITLE: &str = "Wiz Works - 시각화 보고서";

const REPORT_CSS: &str = r#"
* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: 'Segoe UI', 'Apple SD Gothic Neo', 'Malgun Gothic', sans-serif; background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); padding: 40px; color: #333; }
.container { max-width: 1200px; margin: 0 auto; background: #fff; border-radius: 20px; padding: 40px; box-shadow: 0 20px 60px rgba(0,0,0,0.3); }
.header { text-align: center; margin-bottom: 40px; padding-bottom: 20px; border-bottom: 3px solid #667eea; }
.header h1 { font-size: 48px; color: #667eea; margin-bottom: 10px; }
.header p { color: #666; font-size: 18px; }
.metadata { width: 100%; border-collapse: collapse; margin: 20px 0; }
.metadata th { width: 160px; text-align: left; color: #667eea; padding: 8px 12px; border-bottom: 1px solid #e5e7eb; }
.metadata td { padding: 8px 12px; border-bottom: 1px solid #e5e7eb; }
.section { margin: 30px 0; padding: 25px; border-radius: 15px; background: #f8f9fa; }
.section h2 { font-size: 28px; margin-bottom: 20px; color: #667eea; }
.summary { background: #e0f2fe; border-left: 5px solid #3b82f6; }
.insights { background: #fef3c7; border-left: 5px solid #f59e0b; }
.recommendations { background: #d1fae5; border-left: 5px solid #10b981; }
.chart-data { background: #f3e8ff; border-left: 5px solid #a855f7; }
.timeline { background: #dcfce7; border-left: 5px solid #22c55e; }
.budget { background: #fef9c3; border-left: 5px solid #eab308; }
ol, ul { list-style: none; }
.insight-item, .recommendation-item { display: flex; gap: 15px; align-items: flex-start; padding: 15px; margin: 10px 0; background: #fff; border-radius: 10px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); line-height: 1.6; }
.insight-number { background: #667eea; color: #fff; width: 35px; height: 35px; border-radius: 10px; display: flex; align-items: center; justify-content: center; font-weight: bold; flex-shrink: 0; }
.check { color: #10b981; font-weight: bold; font-size: 20px; }
.chart { width: 100%; height: auto; }
.chart-empty { display: flex; align-items: center; justify-content: center; height: 200px; border: 2px dashed #c4b5fd; border-radius: 16px; color: #6b7280; }
table.values { width: 100%; border-collapse: collapse; margin-top: 20px; }
table.values th, table.values td { padding: 15px; text-align: left; border-bottom: 1px solid #ddd; }
table.values th { background: #667eea; color: #fff; }
.proposal-header { text-align: center; margin-bottom: 32px; padding-bottom: 24px; border-bottom: 2px solid #667eea; }
.proposal-header h1 { font-size: 40px; color: #667eea; margin-bottom: 8px; }
.proposal-section h2 .icon { color: #a855f7; }
.section-body { padding-left: 24px; line-height: 1.8; }
.proposal-footer, .footer { text-align: center; margin-top: 40px; padding-top: 20px; border-top: 2px solid #e5e7eb; color: #666; font-size: 14px; }
.timestamp { color: #999; font-size: 12px; margin-top: 10px; }
@media print { body { background: #fff; padding: 0; } .container { box-shadow: none; } }
"#;

const DECK_CSS: &str = r#"
* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: 'Segoe UI', 'Apple SD Gothic Neo', 'Malgun Gothic', sans-serif; background: #f3f4f6; padding: 40px; }
.slide { width: 1200px; height: 675px; margin: 0 auto 40px; background: #fff; border-radius: 20px; box-shadow: 0 20px 60px rgba(0,0,0,0.15); position: relative; overflow: hidden; page-break-after: always; }
.slide-inner { padding: 80px; height: 100%; }
.title-slide, .closing-slide { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: #fff; }
.title-slide .slide-inner, .closing-slide .slide-inner { display: flex; flex-direction: column; align-items: center; justify-content: center; text-align: center; }
.closing-slide { background: linear-gradient(135deg, #f093fb 0%, #f5576c 100%); }
.icon { font-size: 64px; }
.title-slide h1 { font-size: 72px; font-weight: 900; margin: 24px 0; }
.subtitle, .closing-text { font-size: 32px; line-height: 1.6; opacity: 0.9; }
.divider { width: 120px; height: 4px; background: rgba(255,255,255,0.5); margin: 30px auto; }
.slide-date { font-size: 24px; opacity: 0.7; }
.closing-slide h2 { font-size: 64px; font-weight: 900; margin-bottom: 24px; }
.brand { font-size: 28px; font-weight: 900; }
.tagline { font-size: 20px; margin-top: 10px; }
.slide-header { display: flex; align-items: center; gap: 20px; margin-bottom: 48px; }
.slide-header h2 { font-size: 52px; font-weight: 900; color: #667eea; }
.bullet-item, .highlight-item { display: flex; align-items: center; gap: 20px; margin-bottom: 20px; font-size: 28px; }
.bullet-number, .highlight-icon { width: 48px; height: 48px; border-radius: 12px; background: #667eea; color: #fff; display: flex; align-items: center; justify-content: center; font-weight: bold; flex-shrink: 0; }
.highlight-icon { background: #10b981; }
.image-keyword { margin: -16px 0 28px; font-size: 22px; color: #6b7280; }
.bullet-text { font-size: 28px; line-height: 1.5; color: #374151; }
.slide-chart { width: 720px; margin: 0 auto; }
.slide-chart figcaption { text-align: center; font-size: 24px; font-weight: 700; color: #4b5563; }
.chart { width: 100%; height: auto; }
.chart-empty { display: flex; align-items: center; justify-content: center; height: 300px; border: 2px dashed #c4b5fd; border-radius: 16px; color: #6b7280; font-size: 24px; }
.slide-number { position: absolute; right: 40px; bottom: 30px; font-size: 18px; color: #9ca3af; }
@media print { body { background: #fff; padding: 0; } .slide { margin: 0; box-shadow: none; border-radius: 0; } }
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HtmlExport {
    pub(crate) filename: String,
    pub(crate) body: String,
}

fn page(title: &str, css: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"ko\">\n<head>\n<meta charset=\"UTF-8\">\n<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n<title>{}</title>\n<style>{css}</style>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        escape_html(title)
    )
}

fn metadata_rows(out: &mut String, metadata: &ReportMetadata) {
    let mut rows = vec![
        ("회사명", metadata.company_name.as_str()),
        ("부서", metadata.department.as_str()),
        ("작성자", metadata.author_name.as_str()),
        ("대상 회사", metadata.target_company.as_str()),
        ("보고서 제목", metadata.report_title.as_str()),
    ];
    if let Some(period) = metadata.report_period.as_deref().filter(|period| !period.trim().is_empty()) {
        rows.push(("보고 기간", period));
    }
    out.push_str(r#"<table class="metadata"><tbody>"#);
    for (label, value) in rows {
        let _ = write!(out, "<tr><th>{label}</th><td>{}</td></tr>", escape_html(value));
    }
    out.push_str("</tbody></table>");
}

fn value_table(out: &mut String, result: &AnalysisResult) {
    if result.chart_data.is_empty() {
        return;
    }
    out.push_str(r#"<section class="section chart-data"><h2>📊 데이터 테이블</h2>"#);
    out.push_str(&chart_svg(&result.chart_data, ChartKind::Bar));
    out.push_str(r#"<table class="values"><thead><tr><th>항목</th><th>값</th></tr></thead><tbody>"#);
    for point in &result.chart_data {
        let _ = write!(
            out,
            "<tr><td><strong>{}</strong></td><td>{}</td></tr>",
            escape_html(&point.name),
            format_value(point.value)
        );
    }
    out.push_str("</tbody></table></section>");
}

fn analysis_page(result: &AnalysisResult, metadata: Option<&ReportMetadata>, stamp: Stamp) -> String {
    let mut body = String::from(
        r#"<div class="container"><div class="header"><h1>🎯 Wiz Works</h1><p>AI 기반 데이터 분석 보고서</p></div>"#,
    );
    if let Some(metadata) = metadata {
        metadata_rows(&mut body, metadata);
    }
    body.push_str(&insights_panel(result));
    value_table(&mut body, result);
    body.push_str(r#"<div class="footer"><p><strong>Wiz Works</strong> - AI로 업무를 자동화하고 시각화 보고서를 생성하세요</p>"#);
    generated_at(
        &mut body,
        "timestamp",
        &format!("생성 시간: {}", stamp.korean_datetime()),
    );
    body.push_str("</div></div>");

    let title = metadata
        .map(|metadata| metadata.report_title.trim())
        .filter(|title| !title.is_empty())
        .unwrap_or(REPORT_TITLE);
    page(title, REPORT_CSS, &body)
}

fn proposal_page(proposal: &ProposalDocument, stamp: Stamp) -> String {
    let body = format!(
        r#"<div class="container">{}</div>"#,
        proposal_view(proposal, stamp)
    );
    page(&proposal.title, REPORT_CSS, &body)
}

fn deck_page(deck: &SlideDeck, stamp: Stamp) -> String {
    page(&deck.title, DECK_CSS, &deck_document_body(deck, stamp))
}

/// Standalone HTML file for `document`.
///
/// Everything but the filename and the `data-generated-at` elements depends
/// only on the document, so a fixed `stamp` yields identical bytes.
pub(crate) fn export_html(
    document: &Document,
    metadata: Option<&ReportMetadata>,
    stamp: Stamp,
) -> HtmlExport {
    let (body, title, default_stem) = match document {
        Document::Analysis(result) => (
            analysis_page(result, metadata, stamp),
            metadata.map(|metadata| metadata.report_title.as_str()),
            REPORT_FILE_STEM,
        ),
        Document::Proposal(proposal) => (
            proposal_page(proposal, stamp),
            Some(proposal.title.as_str()),
            PROPOSAL_FILE_STEM,
        ),
        Document::Deck(deck) => (
            deck_page(deck, stamp),
            Some(deck.title.as_str()),
            PROPOSAL_FILE_STEM,
        ),
    };
    HtmlExport {
        filename: export_filename(title, default_stem, stamp, "html"),
        body,
    }
}
