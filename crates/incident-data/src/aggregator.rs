//! Incident counts over categorical dimensions.
//!
//! All grouping is backed by `BTreeMap`, so output order is the key order and
//! identical input always yields byte-identical output.

use std::collections::BTreeMap;
use std::fmt;

use incident_core::models::{
    AggregateGroup, Borough, DayOfWeek, GroupKey, IncidentRecord, WeekdayBoroughCount,
};
use incident_core::{PipelineError, Result};
use tracing::debug;

use crate::normalizer::{
    COL_BOROUGH, COL_DATE, COL_MURDER_FLAG, COL_VICTIM_AGE_BAND, COL_VICTIM_RACE, COL_VICTIM_SEX,
};

/// Name of the derived weekday column.
pub const COL_WEEKDAY: &str = "weekday";
/// Name of the derived year column.
pub const COL_YEAR: &str = "year";

/// Columns of the full grouping key, in key order.
pub const GROUPING_KEYS: [&str; 7] = [
    COL_YEAR,
    COL_BOROUGH,
    COL_MURDER_FLAG,
    COL_VICTIM_AGE_BAND,
    COL_VICTIM_SEX,
    COL_VICTIM_RACE,
    COL_WEEKDAY,
];

/// Fail with [`PipelineError::Schema`] unless every grouping key is present
/// in `columns`.
pub fn check_grouping_keys<S: AsRef<str>>(columns: &[S]) -> Result<()> {
    let missing: Vec<&str> = GROUPING_KEYS
        .iter()
        .copied()
        .filter(|key| !columns.iter().any(|c| c.as_ref() == *key))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::Schema(format!(
            "grouping key(s) not in schema: {}",
            missing.join(", ")
        )))
    }
}

/// Columns available to grouping for a table with `columns`: the columns
/// themselves plus the calendar columns derived from the date, when the
/// table has one.
pub fn grouping_columns<S: AsRef<str>>(columns: &[S]) -> Vec<&str> {
    let mut available: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    if available.contains(&COL_DATE) {
        available.extend([COL_YEAR, "year_month", "month", COL_WEEKDAY]);
    }
    available
}

// ── Dimension ─────────────────────────────────────────────────────────────────

/// A single dimension of [`GroupKey`] used for report breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Year,
    Borough,
    MurderFlag,
    VictimAgeBand,
    VictimSex,
    VictimRace,
    Weekday,
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Dimension::Year,
        Dimension::Borough,
        Dimension::MurderFlag,
        Dimension::VictimAgeBand,
        Dimension::VictimSex,
        Dimension::VictimRace,
        Dimension::Weekday,
    ];

    /// Human-readable title, e.g. `"Victim race"`.
    pub fn title(&self) -> &'static str {
        match self {
            Dimension::Year => "Year",
            Dimension::Borough => "Borough",
            Dimension::MurderFlag => "Murder",
            Dimension::VictimAgeBand => "Victim age band",
            Dimension::VictimSex => "Victim sex",
            Dimension::VictimRace => "Victim race",
            Dimension::Weekday => "Weekday",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Sort key for one level of a [`Dimension`]; keeps weekdays Monday-first and
/// years numeric rather than lexicographic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum LevelKey {
    Year(i32),
    Borough(Borough),
    Flag(bool),
    Text(String),
    Weekday(DayOfWeek),
}

impl LevelKey {
    fn of(key: &GroupKey, dimension: Dimension) -> Self {
        match dimension {
            Dimension::Year => LevelKey::Year(key.year),
            Dimension::Borough => LevelKey::Borough(key.borough),
            Dimension::MurderFlag => LevelKey::Flag(key.murder_flag),
            Dimension::VictimAgeBand => LevelKey::Text(key.victim_age_band.clone()),
            Dimension::VictimSex => LevelKey::Text(key.victim_sex.clone()),
            Dimension::VictimRace => LevelKey::Text(key.victim_race.clone()),
            Dimension::Weekday => LevelKey::Weekday(key.weekday),
        }
    }

    fn label(&self) -> String {
        match self {
            LevelKey::Year(y) => y.to_string(),
            LevelKey::Borough(b) => b.to_string(),
            LevelKey::Flag(true) => "Murder".to_string(),
            LevelKey::Flag(false) => "Non-fatal".to_string(),
            LevelKey::Text(s) => s.clone(),
            LevelKey::Weekday(d) => d.to_string(),
        }
    }
}

/// Incident total for one level of a [`Dimension`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionTotal {
    pub label: String,
    pub incident_count: u64,
}

/// Incident total for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlyCount {
    /// `YYYYMM`.
    pub year_month: u32,
    pub incident_count: u64,
}

// ── IncidentAggregator ────────────────────────────────────────────────────────

/// Stateless helper that groups incidents and sums counts.
pub struct IncidentAggregator;

impl IncidentAggregator {
    /// Group by the full 7-field [`GroupKey`].
    pub fn aggregate_full(records: &[IncidentRecord]) -> Vec<AggregateGroup> {
        let mut map: BTreeMap<GroupKey, u64> = BTreeMap::new();
        for record in records {
            *map.entry(GroupKey::of(record)).or_insert(0) += 1;
        }
        debug!("Aggregated {} records into {} groups", records.len(), map.len());
        map.into_iter()
            .map(|(key, incident_count)| AggregateGroup {
                key,
                incident_count,
            })
            .collect()
    }

    /// Group records directly by (weekday, borough).
    pub fn aggregate_weekday_borough(records: &[IncidentRecord]) -> Vec<WeekdayBoroughCount> {
        Self::weekday_borough_from(records.iter().map(|r| ((r.weekday, r.borough), 1)))
    }

    /// Collapse full groups onto (weekday, borough), summing the dropped
    /// dimensions. Equal to [`Self::aggregate_weekday_borough`] on the same
    /// records.
    pub fn regroup_weekday_borough(groups: &[AggregateGroup]) -> Vec<WeekdayBoroughCount> {
        Self::weekday_borough_from(
            groups
                .iter()
                .map(|g| ((g.key.weekday, g.key.borough), g.incident_count)),
        )
    }

    /// Totals per level of `dimension`, in the dimension's natural order.
    pub fn totals_by(groups: &[AggregateGroup], dimension: Dimension) -> Vec<DimensionTotal> {
        let mut map: BTreeMap<LevelKey, u64> = BTreeMap::new();
        for group in groups {
            *map.entry(LevelKey::of(&group.key, dimension)).or_insert(0) += group.incident_count;
        }
        map.into_iter()
            .map(|(level, incident_count)| DimensionTotal {
                label: level.label(),
                incident_count,
            })
            .collect()
    }

    /// Incidents per calendar month, ascending.
    pub fn monthly_counts(records: &[IncidentRecord]) -> Vec<MonthlyCount> {
        let mut map: BTreeMap<u32, u64> = BTreeMap::new();
        for record in records {
            *map.entry(record.year_month).or_insert(0) += 1;
        }
        map.into_iter()
            .map(|(year_month, incident_count)| MonthlyCount {
                year_month,
                incident_count,
            })
            .collect()
    }

    /// Sum of `incident_count` over all groups.
    pub fn calculate_total(groups: &[AggregateGroup]) -> u64 {
        groups.iter().map(|g| g.incident_count).sum()
    }

    // ── Private ───────────────────────────────────────────────────────────────

    fn weekday_borough_from(
        cells: impl Iterator<Item = ((DayOfWeek, Borough), u64)>,
    ) -> Vec<WeekdayBoroughCount> {
        let mut map: BTreeMap<(DayOfWeek, Borough), u64> = BTreeMap::new();
        for (cell, count) in cells {
            *map.entry(cell).or_insert(0) += count;
        }
        map.into_iter()
            .map(|((weekday, borough), incident_count)| WeekdayBoroughCount {
                weekday,
                borough,
                incident_count,
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
