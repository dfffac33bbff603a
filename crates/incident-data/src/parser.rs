//! Field parsing: turns normalised string rows into typed
//! [`IncidentRecord`]s with derived calendar attributes.

use incident_core::models::{Borough, IncidentRecord};
use incident_core::settings::ParsePolicy;
use incident_core::time_utils::{CalendarFields, TemporalParser};
use incident_core::{PipelineError, Result};
use tracing::{debug, warn};

use crate::normalizer::{
    NormalizedTable, COL_BOROUGH, COL_DATE, COL_MURDER_FLAG, COL_TIME, COL_VICTIM_AGE_BAND,
    COL_VICTIM_RACE, COL_VICTIM_SEX,
};

/// A row the parser set aside under [`ParsePolicy::Quarantine`].
#[derive(Debug)]
pub struct QuarantinedRow {
    /// 1-based data record number in the source.
    pub row: usize,
    pub error: PipelineError,
}

/// Result of [`FieldParser::parse_table`].
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub records: Vec<IncidentRecord>,
    /// Always empty under [`ParsePolicy::Abort`].
    pub quarantined: Vec<QuarantinedRow>,
}

/// Column positions resolved once per table.
struct ColumnMap {
    date: usize,
    time: usize,
    borough: usize,
    murder_flag: usize,
    age_band: usize,
    sex: usize,
    race: usize,
}

impl ColumnMap {
    fn resolve(table: &NormalizedTable) -> Result<Self> {
        Ok(Self {
            date: table.column_index(COL_DATE)?,
            time: table.column_index(COL_TIME)?,
            borough: table.column_index(COL_BOROUGH)?,
            murder_flag: table.column_index(COL_MURDER_FLAG)?,
            age_band: table.column_index(COL_VICTIM_AGE_BAND)?,
            sex: table.column_index(COL_VICTIM_SEX)?,
            race: table.column_index(COL_VICTIM_RACE)?,
        })
    }
}

/// Parses normalised rows with an explicit temporal format and failure policy.
#[derive(Debug, Clone, Default)]
pub struct FieldParser {
    temporal: TemporalParser,
    policy: ParsePolicy,
}

impl FieldParser {
    pub fn new(temporal: TemporalParser, policy: ParsePolicy) -> Self {
        Self { temporal, policy }
    }

    /// Parse every row of `table`.
    ///
    /// Under [`ParsePolicy::Abort`] the first bad row is returned as the error;
    /// under [`ParsePolicy::Quarantine`] bad rows are collected in input order.
    pub fn parse_table(&self, table: &NormalizedTable) -> Result<ParseOutcome> {
        let columns = ColumnMap::resolve(table)?;
        let mut outcome = ParseOutcome {
            records: Vec::with_capacity(table.rows.len()),
            quarantined: Vec::new(),
        };

        for (i, row) in table.rows.iter().enumerate() {
            let row_number = i + 1;
            match self.parse_row(row_number, row, &columns) {
                Ok(record) => outcome.records.push(record),
                Err(error) => match self.policy {
                    ParsePolicy::Abort => return Err(error),
                    ParsePolicy::Quarantine => {
                        debug!("Quarantined record {}: {}", row_number, error);
                        outcome.quarantined.push(QuarantinedRow {
                            row: row_number,
                            error,
                        });
                    }
                },
            }
        }

        if !outcome.quarantined.is_empty() {
            warn!(
                "Quarantined {} of {} records with unparseable fields",
                outcome.quarantined.len(),
                table.rows.len()
            );
        }
        debug!("Parsed {} records", outcome.records.len());
        Ok(outcome)
    }

    fn parse_row(&self, row_number: usize, row: &[String], c: &ColumnMap) -> Result<IncidentRecord> {
        let field_error = |column: &str, value: &str, reason: String| PipelineError::Parse {
            row: row_number,
            column: column.to_string(),
            value: value.to_string(),
            reason,
        };

        let raw_date = row[c.date].as_str();
        let date = self
            .temporal
            .parse_date(raw_date)
            .map_err(|reason| field_error(COL_DATE, raw_date, reason))?;

        let raw_time = row[c.time].as_str();
        let time = self
            .temporal
            .parse_time(raw_time)
            .map_err(|reason| field_error(COL_TIME, raw_time, reason))?;

        let raw_borough = row[c.borough].as_str();
        let borough: Borough = raw_borough
            .parse()
            .map_err(|reason| field_error(COL_BOROUGH, raw_borough, reason))?;

        let raw_flag = row[c.murder_flag].as_str();
        let murder_flag = parse_flag(raw_flag)
            .ok_or_else(|| field_error(COL_MURDER_FLAG, raw_flag, "expected true/false".into()))?;

        let calendar = CalendarFields::derive(date);

        Ok(IncidentRecord {
            date,
            time,
            borough,
            murder_flag,
            victim_age_band: row[c.age_band].trim().to_string(),
            victim_sex: row[c.sex].trim().to_string(),
            victim_race: row[c.race].trim().to_string(),
            year: calendar.year,
            year_month: calendar.year_month,
            month: calendar.month,
            weekday: calendar.weekday,
        })
    }
}

/// Accepts `true/false`, `t/f`, `y/n`, `yes/no` and `1/0`, case-insensitively.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "y" | "yes" | "1" => Some(true),
        "false" | "f" | "n" | "no" | "0" => Some(false),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use incident_core::models::DayOfWeek;

    fn table(rows: Vec<[&str; 7]>) -> NormalizedTable {
        NormalizedTable {
            columns: [
                COL_DATE,
                COL_TIME,
                COL_BOROUGH,
                COL_MURDER_FLAG,
                COL_VICTIM_AGE_BAND,
                COL_VICTIM_SEX,
                COL_VICTIM_RACE,
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            rows: rows
                .into_iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_parse_row_derives_calendar_fields() {
        let t = table(vec![[
            "07/05/2020",
            "23:41:00",
            "BROOKLYN",
            "true",
            "25-44",
            "M",
            "BLACK",
        ]]);
        let outcome = FieldParser::default().parse_table(&t).unwrap();
        let r = &outcome.records[0];
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2020, 7, 5).unwrap());
        assert_eq!(r.borough, Borough::Brooklyn);
        assert!(r.murder_flag);
        assert_eq!(r.year, 2020);
        assert_eq!(r.year_month, 202007);
        assert_eq!(r.month, 7);
        assert_eq!(r.weekday, DayOfWeek::Sunday);
        assert!(outcome.quarantined.is_empty());
    }

    #[test]
    fn test_parse_flag_variants() {
        assert_eq!(parse_flag("FALSE"), Some(false));
        assert_eq!(parse_flag(" Y "), Some(true));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_abort_policy_reports_row_and_column() {
        let t = table(vec![
            ["07/05/2020", "23:41:00", "BROOKLYN", "false", "25-44", "M", "BLACK"],
            ["2020-07-05", "23:41:00", "BROOKLYN", "false", "25-44", "M", "BLACK"],
        ]);
        let err = FieldParser::default().parse_table(&t).unwrap_err();
        match err {
            PipelineError::Parse { row, column, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "date");
                assert_eq!(value, "2020-07-05");
            }
            other => panic!("expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_abort_policy_rejects_bad_time() {
        let t = table(vec![[
            "07/05/2020",
            "late",
            "BROOKLYN",
            "false",
            "25-44",
            "M",
            "BLACK",
        ]]);
        let err = FieldParser::default().parse_table(&t).unwrap_err();
        assert!(matches!(err, PipelineError::Parse { ref column, .. } if column == "time"));
    }

    #[test]
    fn test_quarantine_policy_continues() {
        let t = table(vec![
            ["07/05/2020", "23:41:00", "BROOKLYN", "false", "25-44", "M", "BLACK"],
            ["07/05/2020", "23:41:00", "HOBOKEN", "false", "25-44", "M", "BLACK"],
            ["07/06/2020", "01:00:00", "QUEENS", "false", "18-24", "F", "WHITE"],
        ]);
        let parser = FieldParser::new(TemporalParser::default(), ParsePolicy::Quarantine);
        let outcome = parser.parse_table(&t).unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.quarantined.len(), 1);
        assert_eq!(outcome.quarantined[0].row, 2);
        assert!(matches!(
            outcome.quarantined[0].error,
            PipelineError::Parse { ref column, .. } if column == "borough"
        ));
    }

    #[test]
    fn test_parse_empty_table() {
        let outcome = FieldParser::default().parse_table(&table(vec![])).unwrap();
        assert!(outcome.records.is_empty());
    }

    #[test]
    fn test_missing_canonical_column_is_schema_error() {
        let mut t = table(vec![]);
        t.columns.pop();
        let err = FieldParser::default().parse_table(&t).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }
}
