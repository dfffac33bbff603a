//! Regression summary view: coefficient table plus fit statistics.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use incident_core::formatting::{format_p_value, significance_stars};
use incident_core::PipelineError;
use incident_model::FittedModel;

use crate::themes::Theme;

/// Render the fitted model, or the reason it is missing.
pub fn render_model_view(
    frame: &mut Frame,
    area: Rect,
    model: Result<&FittedModel, &PipelineError>,
    theme: &Theme,
) {
    match model {
        Ok(model) => render_fitted(frame, area, model, theme),
        Err(e) => render_unavailable(frame, area, e, theme),
    }
}

fn render_fitted(frame: &mut Frame, area: Rect, model: &FittedModel, theme: &Theme) {
    let [stats_area, table_area] =
        Layout::vertical([Constraint::Length(6), Constraint::Min(3)]).areas(area);

    frame.render_widget(
        Paragraph::new(fit_lines(model, theme)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(" Linear model "),
        ),
        stats_area,
    );

    let header = Row::new(
        ["Term", "Estimate", "Std. Error", "t value", "Pr(>|t|)", ""]
            .into_iter()
            .map(|h| Cell::from(h).style(theme.table_header)),
    );

    let rows: Vec<Row> = model
        .coefficients
        .iter()
        .map(|c| {
            let Some(p_value) = c.p_value else {
                return Row::new(vec![
                    Cell::from(c.term.clone()),
                    Cell::from("NA"),
                    Cell::from("NA"),
                    Cell::from("NA"),
                    Cell::from("NA"),
                    Cell::from(""),
                ])
                .style(theme.dim);
            };
            Row::new(vec![
                Cell::from(c.term.clone()),
                Cell::from(stat(c.estimate, 4)),
                Cell::from(stat(c.std_error, 4)),
                Cell::from(stat(c.t_value, 3)),
                Cell::from(format_p_value(p_value)),
                Cell::from(significance_stars(p_value)),
            ])
            .style(theme.significance_style(p_value))
        })
        .collect();

    let widths = [
        Constraint::Length(22),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(4),
    ];

    frame.render_widget(
        Table::new(rows, widths).header(header).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(" Coefficients "),
        ),
        table_area,
    );
}

fn stat(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "NA".to_string(), |v| format!("{:.*}", precision, v))
}

fn fit_lines<'a>(model: &'a FittedModel, theme: &Theme) -> Vec<Line<'a>> {
    let optional = |v: Option<f64>| v.map_or_else(|| "NA".to_string(), |v| format!("{:.4}", v));
    let reference = format!(
        "{} / {}",
        model.reference_weekday.as_deref().unwrap_or("-"),
        model.reference_borough.as_deref().unwrap_or("-")
    );
    let f_stat = match &model.f_statistic {
        Some(f) => format!(
            "{:.2} on {} and {} DF, p {}",
            f.value,
            f.df_model,
            f.df_residual,
            format_p_value(f.p_value)
        ),
        None => "NA".to_string(),
    };

    let pair = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(label, theme.label),
            Span::styled(value, theme.value),
        ])
    };

    vec![
        pair("Formula:   ", model.formula.clone()),
        pair("Reference: ", reference),
        pair(
            "Residual SE: ",
            format!(
                "{:.4} on {} DF ({} obs, rank {})",
                model.residual_std_error, model.df_residual, model.n_obs, model.rank
            ),
        ),
        pair(
            "R²: ",
            format!(
                "{}  adj. {}  F {}",
                optional(model.r_squared),
                optional(model.adj_r_squared),
                f_stat
            ),
        ),
    ]
}

fn render_unavailable(frame: &mut Frame, area: Rect, error: &PipelineError, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("Model not fitted", theme.warning)),
        Line::from(""),
        Line::from(Span::styled(error.to_string(), theme.error)),
    ];
    frame.render_widget(
        Paragraph::new(text).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Linear model "),
        ),
        area,
    );
}

// ── Tests ─────────────────────────────────────────────────────────────────────
