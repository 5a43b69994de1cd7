use protocol::{AnalysisResult, ChartKind};
use std::fmt::Write as _;

use super::{chart_svg, escape_html};

const CHART_SWITCHES: [(ChartKind, &str); 3] = [
    (ChartKind::Bar, "막대"),
    (ChartKind::Line, "선"),
    (ChartKind::Pie, "원형"),
];

/// Summary, numbered insights and check-marked recommendations.
///
/// Returns an empty string when the result has none of the three.
pub(crate) fn insights_panel(result: &AnalysisResult) -> String {
    if !result.has_insight_content() {
        return String::new();
    }
    let mut out = String::from(r#"<div class="insights-panel">"#);
    if !result.summary.trim().is_empty() {
        let _ = write!(
            out,
            r#"<section class="section summary"><h2>📈 핵심 요약</h2><p>{}</p></section>"#,
            escape_html(&result.summary)
        );
    }
    if !result.insights.is_empty() {
        out.push_str(r#"<section class="section insights"><h2>💡 주요 인사이트</h2><ol>"#);
        for (index, insight) in result.insights.iter().enumerate() {
            let _ = write!(
                out,
                r#"<li class="insight-item"><span class="insight-number">{}</span><p>{}</p></li>"#,
                index + 1,
                escape_html(insight)
            );
        }
        out.push_str("</ol></section>");
    }
    if !result.recommendations.is_empty() {
        out.push_str(r#"<section class="section recommendations"><h2>🎯 액션 아이템</h2><ul>"#);
        for recommendation in &result.recommendations {
            let _ = write!(
                out,
                r#"<li class="recommendation-item"><span class="check">✓</span><p>{}</p></li>"#,
                escape_html(recommendation)
            );
        }
        out.push_str("</ul></section>");
    }
    out.push_str("</div>");
    out
}

fn chart_switcher(selected: ChartKind) -> String {
    let mut out = String::from(r#"<div class="chart-switcher">"#);
    for (kind, label) in CHART_SWITCHES {
        let _ = write!(
            out,
            r#"<button type="button" data-chart-type="{}"{}>{label}</button>"#,
            kind.as_str(),
            if kind == selected { r#" class="active""# } else { "" }
        );
    }
    out.push_str("</div>");
    out
}

/// Screen view of an analysis: the chart in the viewer's chosen type above the insight panel.
pub(crate) fn analysis_view(result: &AnalysisResult, chart_kind: ChartKind) -> String {
    let mut out = String::from(r#"<div class="analysis-view">"#);
    let _ = write!(
        out,
        r#"<section class="chart-card"><header><h3>📊 데이터 시각화</h3>{}</header>{}</section>"#,
        chart_switcher(chart_kind),
        chart_svg(&result.chart_data, chart_kind)
    );
    out.push_str(&insights_panel(result));
    out.push_str("</div>");
    out
}
