//! Application state and TUI event loop for the shooting report.
//!
//! [`App`] owns the theme, the current view mode and the selected page.  The
//! pipeline output is computed once up front; the loop only redraws it.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
    Frame, Terminal,
};

use incident_core::formatting::format_count;
use incident_data::aggregator::{Dimension, IncidentAggregator};
use incident_data::pipeline::PipelineOutput;

use crate::chart_view;
use crate::model_view;
use crate::table_view::{self, BreakdownRow};
use crate::themes::Theme;

// ── ViewMode ──────────────────────────────────────────────────────────────────

/// Which view the TUI is currently rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Bar chart of the selected page.
    Chart,
    /// Breakdown table of the selected page.
    Table,
    /// Weekday + borough regression summary.
    Model,
}

impl ViewMode {
    /// Parse a `--view` value.  Unknown names fall back to `Chart`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "table" => ViewMode::Table,
            "model" => ViewMode::Model,
            _ => ViewMode::Chart,
        }
    }

    fn next(self) -> Self {
        match self {
            ViewMode::Chart => ViewMode::Table,
            ViewMode::Table => ViewMode::Model,
            ViewMode::Model => ViewMode::Chart,
        }
    }
}

/// One page per [`Dimension`], then the monthly trend.
const PAGE_COUNT: usize = Dimension::ALL.len() + 1;

// ── App ───────────────────────────────────────────────────────────────────────

/// Root application state for the report TUI.
pub struct App {
    pub theme: Theme,
    pub view_mode: ViewMode,
    /// Index into the breakdown pages; `Dimension::ALL.len()` is the monthly page.
    pub page: usize,
    /// Set to `true` to break out of the event loop on the next iteration.
    pub should_quit: bool,
}

impl App {
    pub fn new(theme_name: &str, view_mode: ViewMode) -> Self {
        Self {
            theme: Theme::from_name(theme_name),
            view_mode,
            page: 0,
            should_quit: false,
        }
    }

    /// Draw `output` until the user presses `q` or `Ctrl+C`.
    ///
    /// `Tab`/`→` and `Shift+Tab`/`←` move between pages, `v` cycles the view
    /// mode, and `c`, `t`, `m` jump straight to chart, table or model.
    pub fn run_report(mut self, output: &PipelineOutput) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(250);

        let result = loop {
            if let Err(e) = terminal.draw(|frame| self.render(frame, output)) {
                break Err(e);
            }

            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => self.handle_key(key),
                    Ok(_) => {}
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }

            if self.should_quit {
                break Ok(());
            }
        };

        // Restore terminal state unconditionally.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    /// Apply a single key press to the application state.
    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::Right => self.page = (self.page + 1) % PAGE_COUNT,
            KeyCode::BackTab | KeyCode::Left => {
                self.page = (self.page + PAGE_COUNT - 1) % PAGE_COUNT;
            }
            KeyCode::Char('v') => self.view_mode = self.view_mode.next(),
            KeyCode::Char('c') => self.view_mode = ViewMode::Chart,
            KeyCode::Char('t') => self.view_mode = ViewMode::Table,
            KeyCode::Char('m') => self.view_mode = ViewMode::Model,
            _ => {}
        }
    }

    /// The dimension behind the current page, `None` on the monthly page.
    pub fn dimension(&self) -> Option<Dimension> {
        Dimension::ALL.get(self.page).copied()
    }

    /// Render the current application state into `frame`.
    pub fn render(&self, frame: &mut Frame, output: &PipelineOutput) {
        let [header_area, body_area, footer_area] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        self.render_header(frame, header_area, output);
        self.render_footer(frame, footer_area);

        if self.view_mode == ViewMode::Model {
            model_view::render_model_view(frame, body_area, output.model.as_ref(), &self.theme);
            return;
        }
        if output.records.is_empty() {
            table_view::render_no_data(frame, body_area, &self.theme);
            return;
        }

        let (title, level_header, rows) = self.page_rows(output);
        match (self.view_mode, self.dimension()) {
            (ViewMode::Chart, None) => {
                chart_view::render_trend_chart(frame, body_area, &rows, &self.theme);
            }
            (ViewMode::Chart, Some(_)) => {
                chart_view::render_breakdown_chart(frame, body_area, &title, &rows, &self.theme);
            }
            _ => table_view::render_breakdown_table(
                frame,
                body_area,
                &title,
                level_header,
                &rows,
                &self.theme,
            ),
        }
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    fn page_rows(&self, output: &PipelineOutput) -> (String, &'static str, Vec<BreakdownRow>) {
        match self.dimension() {
            Some(dimension) => {
                let rows = IncidentAggregator::totals_by(&output.groups, dimension)
                    .iter()
                    .map(BreakdownRow::from)
                    .collect();
                (
                    format!("Incidents by {}", dimension.title().to_lowercase()),
                    dimension.title(),
                    rows,
                )
            }
            None => (
                "Incidents by month".to_string(),
                "Month",
                output.monthly.iter().map(BreakdownRow::from).collect(),
            ),
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, output: &PipelineOutput) {
        let meta = &output.metadata;
        let t = &self.theme;
        let removed: usize = meta.removed_by_rule.iter().map(|(_, n)| n).sum();
        let mut counts = vec![
            Span::styled("[ ", t.label),
            Span::styled(format_count(meta.records_kept as u64), t.value),
            Span::styled(" kept of ", t.label),
            Span::styled(format_count(meta.rows_loaded as u64), t.value),
            Span::styled(" | ", t.label),
            Span::styled(format_count(removed as u64), t.value),
            Span::styled(" filtered | ", t.label),
            Span::styled(format_count(meta.groups as u64), t.value),
            Span::styled(" groups", t.label),
        ];
        if meta.records_quarantined > 0 {
            counts.push(Span::styled(" | ", t.label));
            counts.push(Span::styled(
                format!("{} quarantined", format_count(meta.records_quarantined as u64)),
                t.info,
            ));
        }
        counts.push(Span::styled(" ]", t.label));
        let lines = vec![
            Line::from(Span::styled("NYPD SHOOTING INCIDENTS", t.header)),
            Line::from(counts),
            Line::from(Span::styled("=".repeat(60), t.separator)),
        ];
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let page = match self.dimension() {
            Some(d) => d.title(),
            None => "Month",
        };
        let text = format!(
            "{}/{} {}  ·  ←/→ page  v view  c/t/m chart/table/model  q quit",
            self.page + 1,
            PAGE_COUNT,
            page
        );
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(text, self.theme.dim))),
            area,
        );
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
