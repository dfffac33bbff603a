//! Row filter removing records with sentinel values in the victim fields.
//!
//! Matching is containment (a regex search), not equality: `"UNKNOWN"` also
//! removes any longer value that contains it.

use incident_core::models::IncidentRecord;
use regex::Regex;
use tracing::{debug, info};

/// Victim field a [`FilterRule`] inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterColumn {
    VictimAgeBand,
    VictimSex,
    VictimRace,
}

impl FilterColumn {
    fn value<'a>(&self, record: &'a IncidentRecord) -> &'a str {
        match self {
            FilterColumn::VictimAgeBand => &record.victim_age_band,
            FilterColumn::VictimSex => &record.victim_sex,
            FilterColumn::VictimRace => &record.victim_race,
        }
    }
}

/// Removes a record when `pattern` matches anywhere in `column`.
#[derive(Debug, Clone)]
pub struct FilterRule {
    pub label: String,
    pub column: FilterColumn,
    pub pattern: Regex,
}

impl FilterRule {
    /// A rule matching the literal substring `needle` (case-sensitive).
    pub fn contains(label: &str, column: FilterColumn, needle: &str) -> Self {
        Self {
            label: label.to_string(),
            column,
            pattern: Regex::new(&regex::escape(needle)).expect("escaped literal is a valid regex"),
        }
    }

    pub fn matches(&self, record: &IncidentRecord) -> bool {
        self.pattern.is_match(self.column.value(record))
    }
}

/// Result of [`RowFilter::apply`].
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub kept: Vec<IncidentRecord>,
    /// `(rule label, records removed)` in rule order.
    pub removed_by_rule: Vec<(String, usize)>,
}

impl FilterOutcome {
    pub fn removed_total(&self) -> usize {
        self.removed_by_rule.iter().map(|(_, n)| n).sum()
    }
}

/// Ordered set of sentinel rules.
#[derive(Debug, Clone)]
pub struct RowFilter {
    rules: Vec<FilterRule>,
}

impl Default for RowFilter {
    fn default() -> Self {
        Self::new(vec![
            FilterRule::contains("victim_age_band UNKNOWN", FilterColumn::VictimAgeBand, "UNKNOWN"),
            FilterRule::contains("victim_age_band 1022", FilterColumn::VictimAgeBand, "1022"),
            FilterRule::contains("victim_race UNKNOWN", FilterColumn::VictimRace, "UNKNOWN"),
            FilterRule::contains("victim_sex U", FilterColumn::VictimSex, "U"),
        ])
    }
}

impl RowFilter {
    pub fn new(rules: Vec<FilterRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[FilterRule] {
        &self.rules
    }

    /// Keep the records no rule matches.
    ///
    /// Builds one keep-mask over `records`; a removed record is counted
    /// against the first rule that matches it, which is the tally a sequence
    /// of independent passes in rule order would produce.
    pub fn apply(&self, records: &[IncidentRecord]) -> FilterOutcome {
        let mut removed = vec![0usize; self.rules.len()];
        let mut kept = Vec::with_capacity(records.len());

        for record in records {
            match self.rules.iter().position(|rule| rule.matches(record)) {
                Some(i) => removed[i] += 1,
                None => kept.push(record.clone()),
            }
        }

        let removed_by_rule: Vec<(String, usize)> = self
            .rules
            .iter()
            .zip(removed)
            .map(|(rule, n)| (rule.label.clone(), n))
            .collect();

        for (label, n) in &removed_by_rule {
            debug!("Filter `{}` removed {} records", label, n);
        }

        let outcome = FilterOutcome {
            kept,
            removed_by_rule,
        };
        info!(
            "Row filter kept {} of {} records ({} removed)",
            outcome.kept.len(),
            records.len(),
            outcome.removed_total()
        );
        outcome
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
