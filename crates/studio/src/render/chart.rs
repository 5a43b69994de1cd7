use protocol::{ChartKind, ChartPoint};
use std::f64::consts::PI;
use std::fmt::Write as _;

use super::escape_html;

const COLORS: [&str; 6] = ["#667eea", "#764ba2", "#f093fb", "#f5576c", "#4facfe", "#00f2fe"];
const EMPTY_CHART: &str = "데이터를 분석하면 차트가 표시됩니다";

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 360.0;
const PAD_LEFT: f64 = 56.0;
const PAD_RIGHT: f64 = 24.0;
const PAD_TOP: f64 = 24.0;
const PAD_BOTTOM: f64 = 48.0;
const PIE_RADIUS: f64 = 130.0;

/// Renders `points` as an inline SVG, or the empty-state placeholder.
pub(crate) fn chart_svg(points: &[ChartPoint], kind: ChartKind) -> String {
    if points.is_empty() {
        return empty_chart();
    }
    match kind {
        ChartKind::Bar => bar_chart(points),
        ChartKind::Line => line_chart(points),
        ChartKind::Pie => pie_chart(points),
    }
}

fn empty_chart() -> String {
    format!(r#"<div class="chart-empty"><p>{EMPTY_CHART}</p></div>"#)
}

/// Integers print without decimals and carry thousands separators.
pub(crate) fn format_value(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let negative = rounded < 0.0;
    let magnitude = rounded.abs();
    let whole = magnitude.trunc();
    let fraction = magnitude - whole;
    let digits = format!("{whole:.0}");
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if fraction > 0.0 {
        let decimals = format!("{fraction:.2}");
        out.push_str(decimals.trim_start_matches('0').trim_end_matches('0'));
    }
    out
}

struct Scale {
    min: f64,
    max: f64,
}

impl Scale {
    fn of(points: &[ChartPoint]) -> Self {
        let min = points.iter().map(|point| point.value).fold(0.0, f64::min);
        let max = points.iter().map(|point| point.value).fold(0.0, f64::max);
        if (max - min).abs() < f64::EPSILON {
            Self { min, max: min + 1.0 }
        } else {
            Self { min, max }
        }
    }

    fn y(&self, value: f64) -> f64 {
        let plot_height = HEIGHT - PAD_TOP - PAD_BOTTOM;
        PAD_TOP + (self.max - value) / (self.max - self.min) * plot_height
    }
}

fn open_svg(out: &mut String, class: &str) {
    let _ = write!(
        out,
        r#"<svg class="chart {class}" viewBox="0 0 {WIDTH} {HEIGHT}" xmlns="http://www.w3.org/2000/svg" role="img">"#
    );
}

fn axes(out: &mut String, scale: &Scale) {
    let baseline = scale.y(0.0);
    let _ = write!(
        out,
        r##"<line x1="{PAD_LEFT}" y1="{PAD_TOP}" x2="{PAD_LEFT}" y2="{bottom}" stroke="#6b7280"/><line x1="{PAD_LEFT}" y1="{baseline:.1}" x2="{right}" y2="{baseline:.1}" stroke="#6b7280"/>"##,
        bottom = HEIGHT - PAD_BOTTOM,
        right = WIDTH - PAD_RIGHT,
    );
    for value in [scale.max, scale.min] {
        let _ = write!(
            out,
            r##"<text x="{x}" y="{y:.1}" text-anchor="end" font-size="12" fill="#6b7280">{label}</text>"##,
            x = PAD_LEFT - 6.0,
            y = scale.y(value) + 4.0,
            label = format_value(value),
        );
    }
}

fn category_label(out: &mut String, x: f64, name: &str) {
    let _ = write!(
        out,
        r##"<text x="{x:.1}" y="{y}" text-anchor="middle" font-size="12" font-weight="600" fill="#6b7280">{name}</text>"##,
        y = HEIGHT - PAD_BOTTOM + 20.0,
        name = escape_html(name),
    );
}

fn slot_center(index: usize, count: usize) -> f64 {
    let slot = (WIDTH - PAD_LEFT - PAD_RIGHT) / count as f64;
    PAD_LEFT + slot * (index as f64 + 0.5)
}

fn bar_chart(points: &[ChartPoint]) -> String {
    let scale = Scale::of(points);
    let slot = (WIDTH - PAD_LEFT - PAD_RIGHT) / points.len() as f64;
    let bar_width = slot * 0.6;
    let baseline = scale.y(0.0);

    let mut out = String::new();
    open_svg(&mut out, "chart-bar");
    out.push_str(r##"<defs><linearGradient id="barGradient" x1="0" y1="0" x2="0" y2="1"><stop offset="0%" stop-color="#667eea"/><stop offset="100%" stop-color="#764ba2"/></linearGradient></defs>"##);
    axes(&mut out, &scale);
    for (index, point) in points.iter().enumerate() {
        let center = slot_center(index, points.len());
        let top = scale.y(point.value);
        let (y, height) = if top < baseline {
            (top, baseline - top)
        } else {
            (baseline, top - baseline)
        };
        let _ = write!(
            out,
            r#"<rect x="{x:.1}" y="{y:.1}" width="{bar_width:.1}" height="{height:.1}" rx="6" fill="url(#barGradient)"><title>{name}: {value}</title></rect>"#,
            x = center - bar_width / 2.0,
            name = escape_html(&point.name),
            value = format_value(point.value),
        );
        category_label(&mut out, center, &point.name);
    }
    out.push_str("</svg>");
    out
}

fn line_chart(points: &[ChartPoint]) -> String {
    let scale = Scale::of(points);
    let coords: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(index, point)| (slot_center(index, points.len()), scale.y(point.value)))
        .collect();

    let mut out = String::new();
    open_svg(&mut out, "chart-line");
    axes(&mut out, &scale);
    let path = coords
        .iter()
        .map(|(x, y)| format!("{x:.1},{y:.1}"))
        .collect::<Vec<_>>()
        .join(" ");
    let _ = write!(
        out,
        r##"<polyline points="{path}" fill="none" stroke="#667eea" stroke-width="3"/>"##
    );
    for (point, (x, y)) in points.iter().zip(&coords) {
        let _ = write!(
            out,
            r##"<circle cx="{x:.1}" cy="{y:.1}" r="6" fill="#764ba2"><title>{name}: {value}</title></circle>"##,
            name = escape_html(&point.name),
            value = format_value(point.value),
        );
        category_label(&mut out, *x, &point.name);
    }
    out.push_str("</svg>");
    out
}

fn pie_chart(points: &[ChartPoint]) -> String {
    let slices: Vec<&ChartPoint> = points.iter().filter(|point| point.value > 0.0).collect();
    let total: f64 = slices.iter().map(|point| point.value).sum();
    if slices.is_empty() || total <= 0.0 {
        return empty_chart();
    }
    let (cx, cy) = (WIDTH / 2.0, HEIGHT / 2.0);

    let mut out = String::new();
    open_svg(&mut out, "chart-pie");
    let mut start = -PI / 2.0;
    for (index, point) in slices.iter().enumerate() {
        let share = point.value / total;
        let color = COLORS[index % COLORS.len()];
        let title = format!(
            "{}: {:.0}%",
            escape_html(&point.name),
            share * 100.0
        );
        if slices.len() == 1 {
            let _ = write!(
                out,
                r#"<circle cx="{cx}" cy="{cy}" r="{PIE_RADIUS}" fill="{color}"><title>{title}</title></circle>"#
            );
        } else {
            let end = start + share * 2.0 * PI;
            let large_arc = u8::from(share > 0.5);
            let _ = write!(
                out,
                r#"<path d="M {cx} {cy} L {x1:.2} {y1:.2} A {PIE_RADIUS} {PIE_RADIUS} 0 {large_arc} 1 {x2:.2} {y2:.2} Z" fill="{color}"><title>{title}</title></path>"#,
                x1 = cx + PIE_RADIUS * start.cos(),
                y1 = cy + PIE_RADIUS * start.sin(),
                x2 = cx + PIE_RADIUS * end.cos(),
                y2 = cy + PIE_RADIUS * end.sin(),
            );
            start = end;
        }
    }
    // Labels go on top of every slice.
    let mut start = -PI / 2.0;
    for point in &slices {
        let share = point.value / total;
        let middle = start + share * PI;
        let _ = write!(
            out,
            r##"<text x="{x:.1}" y="{y:.1}" text-anchor="middle" font-size="12" font-weight="600" fill="#374151">{name}: {percent:.0}%</text>"##,
            x = cx + (PIE_RADIUS + 22.0) * middle.cos(),
            y = cy + (PIE_RADIUS + 22.0) * middle.sin(),
            name = escape_html(&point.name),
            percent = share * 100.0,
        );
        start += share * 2.0 * PI;
    }
    out.push_str("</svg>");
    out
}
