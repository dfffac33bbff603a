//! Plain-text report for `--no-tui` runs.

use std::fmt::Write;

use incident_core::formatting::{format_count, format_share, format_year_month};
use incident_data::aggregator::{Dimension, IncidentAggregator};
use incident_data::pipeline::PipelineOutput;

/// Render the run summary, the per-dimension breakdowns, the monthly peak and
/// the model summary as plain text.
pub fn render_text(output: &PipelineOutput) -> String {
    let mut out = String::new();
    let meta = &output.metadata;

    let _ = writeln!(out, "NYPD SHOOTING INCIDENTS");
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out, "Rows loaded:        {:>10}", format_count(meta.rows_loaded as u64));
    let _ = writeln!(out, "Records parsed:     {:>10}", format_count(meta.records_parsed as u64));
    if meta.records_quarantined > 0 {
        let _ = writeln!(
            out,
            "Records quarantined:{:>10}",
            format_count(meta.records_quarantined as u64)
        );
    }
    for (label, removed) in &meta.removed_by_rule {
        let _ = writeln!(out, "  dropped {:<24}{:>8}", label, format_count(*removed as u64));
    }
    let _ = writeln!(out, "Records kept:       {:>10}", format_count(meta.records_kept as u64));
    let _ = writeln!(out, "Aggregate groups:   {:>10}", format_count(meta.groups as u64));

    let total = IncidentAggregator::calculate_total(&output.groups);
    for dimension in Dimension::ALL {
        let totals = IncidentAggregator::totals_by(&output.groups, dimension);
        if totals.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{}", dimension.title());
        for t in &totals {
            let _ = writeln!(
                out,
                "  {:<32}{:>10}{:>8}",
                t.label,
                format_count(t.incident_count),
                format_share(t.incident_count, total)
            );
        }
    }

    if let Some(peak) = output.monthly.iter().max_by_key(|m| m.incident_count) {
        let _ = writeln!(
            out,
            "\nPeak month: {} ({} incidents)",
            format_year_month(peak.year_month),
            format_count(peak.incident_count)
        );
    }

    out.push('\n');
    match &output.model {
        Ok(model) => out.push_str(&model.summary()),
        Err(e) => {
            let _ = writeln!(out, "Model not fitted: {}", e);
        }
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use incident_core::settings::{DataSource, PipelineConfig};
    use incident_data::loader::parse_delimited;
    use incident_data::normalizer::SourceSchema;
    use incident_data::pipeline::run_on_table;

    const HEADER: &str = "INCIDENT_KEY,OCCUR_DATE,OCCUR_TIME,BORO,LOC_OF_OCCUR_DESC,PRECINCT,\
JURISDICTION_CODE,LOC_CLASSFCTN_DESC,LOCATION_DESC,STATISTICAL_MURDER_FLAG,PERP_AGE_GROUP,\
PERP_SEX,PERP_RACE,VIC_AGE_GROUP,VIC_SEX,VIC_RACE,X_COORD_CD,Y_COORD_CD,Latitude,Longitude,Lon_Lat";

    fn output_from(rows: &[(&str, &str, &str)]) -> PipelineOutput {
        let mut csv = format!("{HEADER}\n");
        for (i, (date, boro, age)) in rows.iter().enumerate() {
            csv.push_str(&format!(
                "{i},{date},23:10:00,{boro},,44,0,,,true,,,,{age},F,WHITE HISPANIC,0,0,40.8,-73.9,POINT (-73.9 40.8)\n"
            ));
        }
        let raw = parse_delimited(csv.as_bytes(), b',').unwrap();
        let config = PipelineConfig::for_source(DataSource::Path("fixture.csv".into()));
        run_on_table(&raw, &config, &SourceSchema::nypd_shootings()).unwrap()
    }

    #[test]
    fn test_render_text_lists_breakdowns() {
        let output = output_from(&[
            ("01/03/2021", "BRONX", "25-44"),
            ("01/04/2021", "BRONX", "18-24"),
            ("02/10/2021", "STATEN ISLAND", "25-44"),
            ("02/11/2021", "BRONX", "UNKNOWN"),
        ]);
        let text = render_text(&output);
        assert!(text.contains("Records kept:"));
        assert!(text.contains("dropped victim_age_band UNKNOWN"));
        assert!(text.contains("STATEN ISLAND"));
        assert!(text.contains("66.7%"));
        assert!(text.contains("Peak month: 2021-01 (2 incidents)"));
    }

    #[test]
    fn test_render_text_reports_missing_model() {
        let output = output_from(&[("01/03/2021", "BRONX", "25-44")]);
        let text = render_text(&output);
        assert!(text.contains("Model not fitted"));
    }
}
