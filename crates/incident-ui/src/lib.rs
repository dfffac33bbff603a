//! Terminal UI layer for the shooting report.
//!
//! Provides themes, breakdown tables, bar charts, the regression summary view
//! and the application event loop built on top of [`ratatui`].

pub mod app;
pub mod chart_view;
pub mod model_view;
pub mod table_view;
pub mod themes;

pub use app::{App, ViewMode};
