//! Schema normalisation: keep the columns the study needs, renamed to
//! canonical identifiers, and drop everything else.
//!
//! Columns are matched by source name, never by position, and a missing
//! column aborts the run with [`PipelineError::Schema`].

use incident_core::{PipelineError, Result};
use tracing::debug;

use crate::loader::RawTable;

// ── Canonical columns ─────────────────────────────────────────────────────────

pub const COL_DATE: &str = "date";
pub const COL_TIME: &str = "time";
pub const COL_BOROUGH: &str = "borough";
pub const COL_MURDER_FLAG: &str = "murder_flag";
pub const COL_VICTIM_AGE_BAND: &str = "victim_age_band";
pub const COL_VICTIM_SEX: &str = "victim_sex";
pub const COL_VICTIM_RACE: &str = "victim_race";

// ── SourceSchema ──────────────────────────────────────────────────────────────

/// Declares the published source columns and which of them are kept.
#[derive(Debug, Clone)]
pub struct SourceSchema {
    /// Every column the published source carries, in published order.
    pub source_columns: &'static [&'static str],
    /// `(source name, canonical name)` pairs, in canonical output order.
    pub keep: &'static [(&'static str, &'static str)],
    /// When set, the source must have exactly this many columns.
    pub expected_column_count: Option<usize>,
}

/// The 21 columns of the NYPD Shooting Incident Data (Historic) export.
const NYPD_SOURCE_COLUMNS: &[&str] = &[
    "INCIDENT_KEY",
    "OCCUR_DATE",
    "OCCUR_TIME",
    "BORO",
    "LOC_OF_OCCUR_DESC",
    "PRECINCT",
    "JURISDICTION_CODE",
    "LOC_CLASSFCTN_DESC",
    "LOCATION_DESC",
    "STATISTICAL_MURDER_FLAG",
    "PERP_AGE_GROUP",
    "PERP_SEX",
    "PERP_RACE",
    "VIC_AGE_GROUP",
    "VIC_SEX",
    "VIC_RACE",
    "X_COORD_CD",
    "Y_COORD_CD",
    "Latitude",
    "Longitude",
    "Lon_Lat",
];

const NYPD_KEEP: &[(&str, &str)] = &[
    ("OCCUR_DATE", COL_DATE),
    ("OCCUR_TIME", COL_TIME),
    ("BORO", COL_BOROUGH),
    ("STATISTICAL_MURDER_FLAG", COL_MURDER_FLAG),
    ("VIC_AGE_GROUP", COL_VICTIM_AGE_BAND),
    ("VIC_SEX", COL_VICTIM_SEX),
    ("VIC_RACE", COL_VICTIM_RACE),
];

impl SourceSchema {
    /// Schema of the published NYPD shooting-incident export.
    pub fn nypd_shootings() -> Self {
        Self {
            source_columns: NYPD_SOURCE_COLUMNS,
            keep: NYPD_KEEP,
            expected_column_count: Some(NYPD_SOURCE_COLUMNS.len()),
        }
    }

    /// Same keep-map, but tolerate extra or reordered source columns.
    pub fn nypd_shootings_lenient() -> Self {
        Self {
            expected_column_count: None,
            ..Self::nypd_shootings()
        }
    }

    /// Canonical output column names, in order.
    pub fn canonical_columns(&self) -> Vec<&'static str> {
        self.keep.iter().map(|(_, canonical)| *canonical).collect()
    }
}

// ── NormalizedTable ───────────────────────────────────────────────────────────

/// The kept columns under their canonical names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl NormalizedTable {
    /// Index of canonical column `name`, or a schema error naming it.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PipelineError::Schema(format!("missing canonical column `{}`", name)))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ── normalize ─────────────────────────────────────────────────────────────────

/// Select and rename the kept columns of `raw` according to `schema`.
pub fn normalize(raw: &RawTable, schema: &SourceSchema) -> Result<NormalizedTable> {
    if let Some(expected) = schema.expected_column_count {
        if raw.headers.len() != expected {
            return Err(PipelineError::Schema(format!(
                "expected {} source columns, found {}",
                expected,
                raw.headers.len()
            )));
        }
    }

    let mut missing = Vec::new();
    let mut indices = Vec::with_capacity(schema.keep.len());
    for (source_name, _) in schema.keep {
        match raw.headers.iter().position(|h| h == *source_name) {
            Some(i) => indices.push(i),
            None => missing.push(*source_name),
        }
    }
    if !missing.is_empty() {
        return Err(PipelineError::Schema(format!(
            "missing source column(s): {}",
            missing.join(", ")
        )));
    }

    let rows: Vec<Vec<String>> = raw
        .rows
        .iter()
        .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
        .collect();

    debug!(
        "Normalised {} rows: kept {} of {} columns",
        rows.len(),
        indices.len(),
        raw.headers.len()
    );

    Ok(NormalizedTable {
        columns: schema
            .canonical_columns()
            .into_iter()
            .map(str::to_string)
            .collect(),
        rows,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
