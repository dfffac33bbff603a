use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{PipelineError, Result};
use crate::time_utils::{DEFAULT_DATE_FORMAT, DEFAULT_TIME_FORMAT};

/// Published location of the NYPD Shooting Incident Data (Historic) export.
pub const DEFAULT_SOURCE_URL: &str =
    "https://data.cityofnewyork.us/api/views/833y-fsy8/rows.csv?accessType=DOWNLOAD";

// ── DataSource ─────────────────────────────────────────────────────────────────

/// Where the loader reads the delimited source from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    /// Fetched with a single blocking HTTP GET.
    Url(String),
    /// Read from a local fixture file.
    Path(PathBuf),
}

impl DataSource {
    /// Classify `s` as a URL (`http://` / `https://`) or a local path.
    pub fn parse(s: &str) -> Self {
        let lower = s.trim().to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            DataSource::Url(s.trim().to_string())
        } else {
            DataSource::Path(PathBuf::from(s))
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Url(u) => f.write_str(u),
            DataSource::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

// ── ParsePolicy ────────────────────────────────────────────────────────────────

/// What the field parser does with a record it cannot parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsePolicy {
    /// Abort the whole run on the first unparseable record.
    #[default]
    Abort,
    /// Set the record aside, keep going and report the drop count.
    Quarantine,
}

impl std::str::FromStr for ParsePolicy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(ParsePolicy::Abort),
            "quarantine" => Ok(ParsePolicy::Quarantine),
            other => Err(PipelineError::Config(format!(
                "unknown parse policy {:?}",
                other
            ))),
        }
    }
}

// ── PipelineConfig ─────────────────────────────────────────────────────────────

/// Explicit configuration handed to each pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub source: DataSource,
    /// Field delimiter byte of the source text.
    pub delimiter: u8,
    pub date_format: String,
    pub time_format: String,
    pub parse_policy: ParsePolicy,
}

impl PipelineConfig {
    /// Default configuration reading from `source`.
    pub fn for_source(source: DataSource) -> Self {
        Self {
            source,
            delimiter: b',',
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            parse_policy: ParsePolicy::Abort,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::for_source(DataSource::Url(DEFAULT_SOURCE_URL.to_string()))
    }
}

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Exploratory analysis of NYPD shooting incidents
#[derive(Parser, Debug, Clone)]
#[command(
    name = "shooting-report",
    about = "Exploratory analysis of NYPD shooting incidents",
    version
)]
pub struct Settings {
    /// CSV source: an http(s) URL or a local file path
    #[arg(long, env = "SHOOTING_REPORT_SOURCE", default_value = DEFAULT_SOURCE_URL)]
    pub source: String,

    /// Field delimiter of the source
    #[arg(long, default_value = ",")]
    pub delimiter: char,

    /// strftime pattern of the occurrence date
    #[arg(long, default_value = DEFAULT_DATE_FORMAT)]
    pub date_format: String,

    /// strftime pattern of the occurrence time
    #[arg(long, default_value = DEFAULT_TIME_FORMAT)]
    pub time_format: String,

    /// What to do with unparseable records
    #[arg(long, default_value = "abort", value_parser = ["abort", "quarantine"])]
    pub parse_policy: String,

    /// Write the full aggregate-group table to this CSV file
    #[arg(long)]
    pub export_groups: Option<PathBuf>,

    /// Write the fitted model summary to this JSON file
    #[arg(long)]
    pub export_model: Option<PathBuf>,

    /// Initial report view
    #[arg(long, default_value = "chart", value_parser = ["table", "chart", "model"])]
    pub view: String,

    /// Display theme
    #[arg(long, default_value = "dark", value_parser = ["light", "dark", "classic"])]
    pub theme: String,

    /// Print a plain-text summary instead of the interactive report
    #[arg(long)]
    pub no_tui: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Effective log level; `--debug` wins over `--log-level`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }

    /// Convert CLI settings into the explicit [`PipelineConfig`].
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        if !self.delimiter.is_ascii() {
            return Err(PipelineError::Config(format!(
                "delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            )));
        }
        Ok(PipelineConfig {
            source: DataSource::parse(&self.source),
            delimiter: self.delimiter as u8,
            date_format: self.date_format.clone(),
            time_format: self.time_format.clone(),
            parse_policy: self.parse_policy.parse()?,
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
