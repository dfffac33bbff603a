//! Shared types for the shooting-incident analysis pipeline.
//!
//! Holds the error taxonomy, the incident / group domain models, calendar
//! parsing helpers, pipeline configuration and number formatting used by the
//! data, model and UI crates.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{PipelineError, Result};
