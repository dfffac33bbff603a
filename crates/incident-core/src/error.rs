use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the incident pipeline.
///
/// Every stage fails fast: the first error aborts the run and is surfaced to
/// the caller with the stage and the offending record / column.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The source could not be reached or answered with a non-success status.
    #[error("Fetch failed for {source_name}: {reason}")]
    Fetch { source_name: String, reason: String },

    /// The source body is not well-formed delimited text.
    #[error("Malformed source data{}: {message}", line_suffix(.line))]
    Format { line: Option<u64>, message: String },

    /// The source header does not match the expected schema.
    #[error("Schema mismatch: {0}")]
    Schema(String),

    /// A date / time / categorical field could not be parsed.
    #[error("Parse error in record {row}, column `{column}`: {reason} (value: {value:?})")]
    Parse {
        row: usize,
        column: String,
        value: String,
        reason: String,
    },

    /// Too few groups to estimate the requested model.
    #[error(
        "Underdetermined model: {groups} groups for {coefficients} coefficients \
         (residual degrees of freedom must be positive)"
    )]
    UnderdeterminedModel { groups: usize, coefficients: usize },

    /// An output artifact could not be written.
    #[error("Failed to export {path}: {message}")]
    Export { path: PathBuf, message: String },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be produced.
    #[error("Failed to serialise JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn line_suffix(line: &Option<u64>) -> String {
    match line {
        Some(l) => format!(" at line {}", l),
        None => String::new(),
    }
}

/// Convenience alias used throughout the incident crates.
pub type Result<T> = std::result::Result<T, PipelineError>;
