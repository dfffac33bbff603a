use chrono::{Datelike, NaiveDate, NaiveTime};

use crate::models::DayOfWeek;

/// Default `strftime` pattern of the source's occurrence date.
pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%Y";

/// Default `strftime` pattern of the source's occurrence time.
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M:%S";

// ── CalendarFields ────────────────────────────────────────────────────────────

/// Calendar attributes derived from an occurrence date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFields {
    pub year: i32,
    /// `year * 100 + month`.
    pub year_month: u32,
    pub month: u32,
    pub weekday: DayOfWeek,
}

impl CalendarFields {
    /// Derive year, year-month, month and weekday from `date`.
    ///
    /// Uses chrono's proleptic Gregorian arithmetic only, so the result is
    /// identical on every machine regardless of locale.
    pub fn derive(date: NaiveDate) -> Self {
        let year = date.year();
        let month = date.month();
        Self {
            year,
            year_month: year as u32 * 100 + month,
            month,
            weekday: DayOfWeek::from_chrono(date.weekday()),
        }
    }
}

// ── TemporalParser ────────────────────────────────────────────────────────────

/// Parses the raw date / time strings with explicit formats.
#[derive(Debug, Clone)]
pub struct TemporalParser {
    date_format: String,
    time_format: String,
}

impl Default for TemporalParser {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMAT, DEFAULT_TIME_FORMAT)
    }
}

impl TemporalParser {
    pub fn new(date_format: &str, time_format: &str) -> Self {
        Self {
            date_format: date_format.to_string(),
            time_format: time_format.to_string(),
        }
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    pub fn time_format(&self) -> &str {
        &self.time_format
    }

    /// Parse a calendar date.
    ///
    /// Years outside `1000..=9999` are rejected: `%Y` would otherwise accept
    /// `"1/5/20"` as the year 20.
    pub fn parse_date(&self, raw: &str) -> Result<NaiveDate, String> {
        let trimmed = raw.trim();
        let date = NaiveDate::parse_from_str(trimmed, &self.date_format)
            .map_err(|e| format!("expected date in format {}: {}", self.date_format, e))?;
        if !(1000..=9999).contains(&date.year()) {
            return Err(format!(
                "expected a four-digit year in format {}",
                self.date_format
            ));
        }
        Ok(date)
    }

    /// Parse a time of day.
    pub fn parse_time(&self, raw: &str) -> Result<NaiveTime, String> {
        NaiveTime::parse_from_str(raw.trim(), &self.time_format)
            .map_err(|e| format!("expected time in format {}: {}", self.time_format, e))
    }
}
