//! Bar charts: incident totals for one dimension, and the monthly trend.

use ratatui::{
    layout::{Direction, Rect},
    text::Line,
    widgets::{Bar, BarChart, BarGroup, Block, Borders},
    Frame,
};

use incident_core::formatting;

use crate::table_view::BreakdownRow;
use crate::themes::Theme;

/// Horizontal bar chart, one bar per row.  Horizontal bars keep long labels
/// such as `"AMERICAN INDIAN/ALASKAN NATIVE"` readable.
pub fn render_breakdown_chart(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    rows: &[BreakdownRow],
    theme: &Theme,
) {
    let bars: Vec<Bar> = rows
        .iter()
        .map(|row| {
            Bar::default()
                .value(row.incident_count)
                .label(Line::from(row.label.clone()))
                .text_value(formatting::format_count(row.incident_count))
        })
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(format!(" {} ", title)),
        )
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .bar_style(theme.bar)
        .value_style(theme.bar_value)
        .label_style(theme.bar_label)
        .data(BarGroup::default().bars(&bars));

    frame.render_widget(chart, area);
}

/// Vertical one-column-per-month chart.  Only the most recent months that
/// fit inside `area` are drawn.
pub fn render_trend_chart(frame: &mut Frame, area: Rect, rows: &[BreakdownRow], theme: &Theme) {
    let capacity = area.width.saturating_sub(2) as usize;
    let visible = &rows[rows.len().saturating_sub(capacity)..];

    let bars: Vec<Bar> = visible
        .iter()
        .map(|row| Bar::default().value(row.incident_count).text_value(String::new()))
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(trend_title(visible)),
        )
        .bar_width(1)
        .bar_gap(0)
        .bar_style(theme.bar)
        .data(BarGroup::default().bars(&bars));

    frame.render_widget(chart, area);
}

/// `" Monthly incidents 2006-01 .. 2023-12, peak 2020-07 (332) "`.
fn trend_title(rows: &[BreakdownRow]) -> String {
    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return " Monthly incidents ".to_string();
    };
    let peak = rows
        .iter()
        .max_by_key(|r| r.incident_count)
        .unwrap_or(first);
    format!(
        " Monthly incidents {} .. {}, peak {} ({}) ",
        first.label,
        last.label,
        peak.label,
        formatting::format_count(peak.incident_count)
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
