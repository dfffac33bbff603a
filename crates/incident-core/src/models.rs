use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the five New York City boroughs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Borough {
    Bronx,
    Brooklyn,
    Manhattan,
    Queens,
    StatenIsland,
}

impl Borough {
    /// All boroughs in canonical (enum) order.
    pub const ALL: [Borough; 5] = [
        Borough::Bronx,
        Borough::Brooklyn,
        Borough::Manhattan,
        Borough::Queens,
        Borough::StatenIsland,
    ];

    /// The label used by the source dataset, e.g. `"STATEN ISLAND"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Borough::Bronx => "BRONX",
            Borough::Brooklyn => "BROOKLYN",
            Borough::Manhattan => "MANHATTAN",
            Borough::Queens => "QUEENS",
            Borough::StatenIsland => "STATEN ISLAND",
        }
    }
}

impl fmt::Display for Borough {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Borough {
    type Err = String;

    /// Case-insensitive; surrounding whitespace is ignored and `_` is
    /// accepted in place of a space.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_uppercase().replace('_', " ");
        Borough::ALL
            .into_iter()
            .find(|b| b.as_str() == normalised)
            .ok_or_else(|| format!("unknown borough {:?}", s))
    }
}

/// Day of the week, Monday first.
///
/// Names are fixed English strings so aggregation keys never depend on the
/// process locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    /// All seven days, Monday first.
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    /// Map chrono's calendar weekday onto the fixed enum.
    pub fn from_chrono(day: chrono::Weekday) -> Self {
        Self::ALL[day.num_days_from_monday() as usize]
    }

    /// English weekday name, e.g. `"Sunday"`.
    pub fn name(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single cleaned shooting incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentRecord {
    /// Calendar date of occurrence.
    pub date: NaiveDate,
    /// Time of day of occurrence.
    pub time: NaiveTime,
    pub borough: Borough,
    /// Whether the shooting resulted in a murder.
    pub murder_flag: bool,
    /// Victim age band as published, e.g. `"25-44"`.
    pub victim_age_band: String,
    /// Victim sex as published (`"M"`, `"F"`, `"U"`).
    pub victim_sex: String,
    /// Victim race as published.
    pub victim_race: String,
    pub year: i32,
    /// `year * 100 + month`, e.g. `202007`.
    pub year_month: u32,
    /// Month of year, 1–12.
    pub month: u32,
    pub weekday: DayOfWeek,
}

/// The seven grouping dimensions of an [`AggregateGroup`].
///
/// Field order is the sort order of aggregated output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub year: i32,
    pub borough: Borough,
    pub murder_flag: bool,
    pub victim_age_band: String,
    pub victim_sex: String,
    pub victim_race: String,
    pub weekday: DayOfWeek,
}

impl GroupKey {
    /// Project a record onto its grouping key.
    pub fn of(record: &IncidentRecord) -> Self {
        Self {
            year: record.year,
            borough: record.borough,
            murder_flag: record.murder_flag,
            victim_age_band: record.victim_age_band.clone(),
            victim_sex: record.victim_sex.clone(),
            victim_race: record.victim_race.clone(),
            weekday: record.weekday,
        }
    }
}

/// Number of incidents sharing one [`GroupKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateGroup {
    pub key: GroupKey,
    pub incident_count: u64,
}

/// Incident count for one (weekday, borough) cell; the model's input row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayBoroughCount {
    pub weekday: DayOfWeek,
    pub borough: Borough,
    pub incident_count: u64,
}
