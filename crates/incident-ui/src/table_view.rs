//! Breakdown tables for the shooting report TUI.
//!
//! Renders a bordered [`ratatui::widgets::Table`] with one row per level of a
//! dimension (or per month) plus a highlighted totals row at the bottom.

use ratatui::{
    layout::{Constraint, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use incident_core::formatting;
use incident_data::aggregator::{DimensionTotal, MonthlyCount};

use crate::themes::Theme;

/// Data for a single row in a breakdown table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakdownRow {
    /// Level label, e.g. `"BROOKLYN"` or `"2020-07"`.
    pub label: String,
    pub incident_count: u64,
}

impl From<&DimensionTotal> for BreakdownRow {
    fn from(total: &DimensionTotal) -> Self {
        Self {
            label: total.label.clone(),
            incident_count: total.incident_count,
        }
    }
}

impl From<&MonthlyCount> for BreakdownRow {
    fn from(month: &MonthlyCount) -> Self {
        Self {
            label: formatting::format_year_month(month.year_month),
            incident_count: month.incident_count,
        }
    }
}

/// Sum of `incident_count` across `rows`.
pub fn total_of(rows: &[BreakdownRow]) -> u64 {
    rows.iter().map(|r| r.incident_count).sum()
}

/// Render a breakdown table into `area`.
///
/// `level_header` names the first column (e.g. `"Borough"`).
pub fn render_breakdown_table(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    level_header: &str,
    rows: &[BreakdownRow],
    theme: &Theme,
) {
    let total = total_of(rows);

    let header = Row::new(
        [level_header, "Incidents", "Share"]
            .into_iter()
            .map(|h| Cell::from(h.to_string()).style(theme.table_header)),
    )
    .height(1);

    let mut all_rows: Vec<Row> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let style = if i % 2 == 0 {
                theme.table_row
            } else {
                theme.table_row_alt
            };
            Row::new(vec![
                Cell::from(row.label.clone()),
                Cell::from(formatting::format_count(row.incident_count)),
                Cell::from(formatting::format_share(row.incident_count, total)),
            ])
            .style(style)
        })
        .collect();

    all_rows.push(
        Row::new(vec![
            Cell::from("TOTAL"),
            Cell::from(formatting::format_count(total)),
            Cell::from(format!("{} levels", rows.len())),
        ])
        .style(theme.table_total),
    );

    let widths = [
        Constraint::Length(24),
        Constraint::Length(12),
        Constraint::Length(10),
    ];

    let table = Table::new(all_rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(format!(" {} ", title)),
        )
        .style(theme.text);

    frame.render_widget(table, area);
}

/// Render a placeholder when no records survived filtering.
pub fn render_no_data(frame: &mut Frame, area: Rect, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("No incidents left after filtering", theme.warning)),
        Line::from(""),
        Line::from(Span::styled(
            "Check the source file and its date format.",
            theme.dim,
        )),
        Line::from(Span::styled("Press 'q' or Ctrl+C to exit", theme.dim)),
    ];
    frame.render_widget(
        Paragraph::new(ratatui::text::Text::from(text)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Shooting Report "),
        ),
        area,
    );
}

// ── Tests ──────────────────────────────────────────────────────────────────────
