//! End-to-end pipeline.
//!
//! Chains Loader → Normalizer → Parser → Filter → Aggregator → Model Fitter
//! and returns a [`PipelineOutput`] ready for reporting and export.

use std::time::Instant;

use incident_core::models::{AggregateGroup, IncidentRecord, WeekdayBoroughCount};
use incident_core::settings::PipelineConfig;
use incident_core::time_utils::TemporalParser;
use incident_core::Result;
use incident_model::FittedModel;
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregator::{check_grouping_keys, grouping_columns, IncidentAggregator, MonthlyCount};
use crate::filter::RowFilter;
use crate::loader::{load_table, RawTable};
use crate::normalizer::{normalize, SourceSchema};
use crate::parser::{FieldParser, QuarantinedRow};

// ── Public types ──────────────────────────────────────────────────────────────

/// Row counts and timings collected during a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineMetadata {
    /// Data rows in the source.
    pub rows_loaded: usize,
    /// Records that parsed successfully.
    pub records_parsed: usize,
    /// Records set aside by the parser (quarantine policy only).
    pub records_quarantined: usize,
    /// `(rule label, records removed)` in rule order.
    pub removed_by_rule: Vec<(String, usize)>,
    /// Records surviving the row filter.
    pub records_kept: usize,
    /// Distinct full-key aggregate groups.
    pub groups: usize,
    /// Wall-clock seconds spent loading the source.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent in every later stage.
    pub transform_time_seconds: f64,
}

/// Everything the pipeline produces.
#[derive(Debug)]
pub struct PipelineOutput {
    /// Records surviving the row filter.
    pub records: Vec<IncidentRecord>,
    /// Full 7-key aggregate groups.
    pub groups: Vec<AggregateGroup>,
    /// The model input: counts by (weekday, borough).
    pub weekday_borough: Vec<WeekdayBoroughCount>,
    pub monthly: Vec<MonthlyCount>,
    /// The fit, or the reason it could not be computed. Kept separate so an
    /// underdetermined model does not discard the aggregates.
    pub model: Result<FittedModel>,
    pub quarantined: Vec<QuarantinedRow>,
    pub metadata: PipelineMetadata,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Load the configured source and run every stage.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineOutput> {
    let load_start = Instant::now();
    let raw = load_table(&config.source, config.delimiter)?;
    let load_time = load_start.elapsed().as_secs_f64();

    let mut output = run_on_table(&raw, config, &SourceSchema::nypd_shootings())?;
    output.metadata.load_time_seconds = load_time;
    Ok(output)
}

/// Run every stage after loading on an already loaded `raw` table.
pub fn run_on_table(
    raw: &RawTable,
    config: &PipelineConfig,
    schema: &SourceSchema,
) -> Result<PipelineOutput> {
    let transform_start = Instant::now();

    // ── Step 1: Normalise ─────────────────────────────────────────────────────
    let normalized = normalize(raw, schema)?;
    check_grouping_keys(&grouping_columns(&normalized.columns))?;

    // ── Step 2: Parse ─────────────────────────────────────────────────────────
    let parser = FieldParser::new(
        TemporalParser::new(&config.date_format, &config.time_format),
        config.parse_policy,
    );
    let parsed = parser.parse_table(&normalized)?;
    let records_parsed = parsed.records.len();

    // ── Step 3: Filter ────────────────────────────────────────────────────────
    let filtered = RowFilter::default().apply(&parsed.records);

    // ── Step 4: Aggregate ─────────────────────────────────────────────────────
    let groups = IncidentAggregator::aggregate_full(&filtered.kept);
    let weekday_borough = IncidentAggregator::regroup_weekday_borough(&groups);
    let monthly = IncidentAggregator::monthly_counts(&filtered.kept);

    // ── Step 5: Model ─────────────────────────────────────────────────────────
    let model = incident_model::fit_weekday_borough(&weekday_borough);
    if let Err(e) = &model {
        warn!("Model not fitted: {}", e);
    }

    let metadata = PipelineMetadata {
        rows_loaded: raw.rows.len(),
        records_parsed,
        records_quarantined: parsed.quarantined.len(),
        removed_by_rule: filtered.removed_by_rule,
        records_kept: filtered.kept.len(),
        groups: groups.len(),
        load_time_seconds: 0.0,
        transform_time_seconds: transform_start.elapsed().as_secs_f64(),
    };

    info!(
        "Pipeline: {} loaded, {} parsed, {} kept, {} groups",
        metadata.rows_loaded, metadata.records_parsed, metadata.records_kept, metadata.groups
    );

    Ok(PipelineOutput {
        records: filtered.kept,
        groups,
        weekday_borough,
        monthly,
        model,
        quarantined: parsed.quarantined,
        metadata,
    })
}
