//! Tabular artifacts: the aggregate-group CSV and the model summary JSON.

use std::io::Write;
use std::path::Path;

use incident_core::models::AggregateGroup;
use incident_core::{PipelineError, Result};
use incident_model::FittedModel;
use serde::Serialize;
use tracing::info;

/// Column names of the group CSV, in [`GroupRow`] field order.
const GROUP_HEADER: [&str; 8] = [
    "year",
    "borough",
    "murder_flag",
    "victim_age_band",
    "victim_sex",
    "victim_race",
    "weekday",
    "incident_count",
];

/// Flat CSV row of an [`AggregateGroup`].
#[derive(Debug, Serialize)]
struct GroupRow<'a> {
    year: i32,
    borough: &'static str,
    murder_flag: bool,
    victim_age_band: &'a str,
    victim_sex: &'a str,
    victim_race: &'a str,
    weekday: &'static str,
    incident_count: u64,
}

impl<'a> From<&'a AggregateGroup> for GroupRow<'a> {
    fn from(g: &'a AggregateGroup) -> Self {
        Self {
            year: g.key.year,
            borough: g.key.borough.as_str(),
            murder_flag: g.key.murder_flag,
            victim_age_band: &g.key.victim_age_band,
            victim_sex: &g.key.victim_sex,
            victim_race: &g.key.victim_race,
            weekday: g.key.weekday.name(),
            incident_count: g.incident_count,
        }
    }
}

/// Write `groups` as CSV to `writer`. The header row is written even when
/// `groups` is empty.
pub fn write_groups<W: Write>(writer: W, groups: &[AggregateGroup]) -> std::result::Result<(), csv::Error> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(GROUP_HEADER)?;
    for group in groups {
        csv_writer.serialize(GroupRow::from(group))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write `groups` to a CSV file at `path`.
pub fn write_groups_csv(path: &Path, groups: &[AggregateGroup]) -> Result<()> {
    let export_error = |message: String| PipelineError::Export {
        path: path.to_path_buf(),
        message,
    };
    let file = std::fs::File::create(path).map_err(|e| export_error(e.to_string()))?;
    write_groups(file, groups).map_err(|e| export_error(e.to_string()))?;
    info!("Wrote {} groups to {}", groups.len(), path.display());
    Ok(())
}

/// Write the fitted model as pretty-printed JSON to `path`.
pub fn write_model_json(path: &Path, model: &FittedModel) -> Result<()> {
    let json = serde_json::to_string_pretty(model)?;
    std::fs::write(path, json).map_err(|e| PipelineError::Export {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    info!("Wrote model summary to {}", path.display());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use incident_core::models::{Borough, DayOfWeek, GroupKey, WeekdayBoroughCount};
    use tempfile::TempDir;

    fn group(borough: Borough, weekday: DayOfWeek, count: u64) -> AggregateGroup {
        AggregateGroup {
            key: GroupKey {
                year: 2020,
                borough,
                murder_flag: false,
                victim_age_band: "25-44".to_string(),
                victim_sex: "M".to_string(),
                victim_race: "BLACK HISPANIC".to_string(),
                weekday,
            },
            incident_count: count,
        }
    }

    #[test]
    fn test_write_groups_header_and_rows() {
        let mut buf = Vec::new();
        write_groups(
            &mut buf,
            &[
                group(Borough::StatenIsland, DayOfWeek::Sunday, 3),
                group(Borough::Bronx, DayOfWeek::Monday, 1),
            ],
        )
        .unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "year,borough,murder_flag,victim_age_band,victim_sex,victim_race,weekday,incident_count"
        );
        assert_eq!(lines[1], "2020,STATEN ISLAND,false,25-44,M,BLACK HISPANIC,Sunday,3");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_write_groups_empty_writes_header_only() {
        let mut buf = Vec::new();
        write_groups(&mut buf, &[]).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "year,borough,murder_flag,victim_age_band,victim_sex,victim_race,weekday,incident_count\n"
        );
    }

    #[test]
    fn test_write_groups_csv_empty_file_has_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("groups.csv");
        write_groups_csv(&path, &[]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with("year,borough,"));
    }

    #[test]
    fn test_write_groups_csv_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("groups.csv");
        write_groups_csv(&path, &[group(Borough::Queens, DayOfWeek::Friday, 2)]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("QUEENS"));
    }

    #[test]
    fn test_write_groups_csv_bad_path_is_export_error() {
        let err = write_groups_csv(Path::new("/nonexistent/dir/groups.csv"), &[]).unwrap_err();
        assert!(matches!(err, PipelineError::Export { .. }));
    }

    #[test]
    fn test_write_model_json() {
        let mut counts = Vec::new();
        for (i, &d) in [DayOfWeek::Monday, DayOfWeek::Tuesday, DayOfWeek::Sunday]
            .iter()
            .enumerate()
        {
            for (j, &b) in [Borough::Bronx, Borough::Brooklyn].iter().enumerate() {
                counts.push(WeekdayBoroughCount {
                    weekday: d,
                    borough: b,
                    incident_count: (3 + i * 2 + j * 5 + (i * j) % 2) as u64,
                });
            }
        }
        let model = incident_model::fit_weekday_borough(&counts).unwrap();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        write_model_json(&path, &model).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["n_obs"], 6);
        assert_eq!(value["formula"], "incident_count ~ weekday + borough");
    }
}
