//! Reference-level (treatment) encoding of the weekday and borough factors.

use nalgebra::{DMatrix, DVector};

use incident_core::models::{Borough, DayOfWeek, WeekdayBoroughCount};

/// Name of the intercept term.
pub const INTERCEPT: &str = "(Intercept)";

/// Design matrix `X` (intercept first), response `y` and term names for
/// `incident_count ~ weekday + borough`.
///
/// Levels are the ones observed in the input, in canonical order (weekdays
/// Monday-first, boroughs in enum order). The first observed level of each
/// factor is the reference and gets no column.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    pub terms: Vec<String>,
    pub x: DMatrix<f64>,
    pub y: DVector<f64>,
    pub weekday_levels: Vec<DayOfWeek>,
    pub borough_levels: Vec<Borough>,
}

impl DesignMatrix {
    pub fn from_counts(counts: &[WeekdayBoroughCount]) -> Self {
        let mut weekday_levels: Vec<DayOfWeek> = counts.iter().map(|c| c.weekday).collect();
        weekday_levels.sort();
        weekday_levels.dedup();
        let mut borough_levels: Vec<Borough> = counts.iter().map(|c| c.borough).collect();
        borough_levels.sort();
        borough_levels.dedup();

        let mut terms = vec![INTERCEPT.to_string()];
        terms.extend(
            weekday_levels
                .iter()
                .skip(1)
                .map(|d| format!("weekday{}", d.name())),
        );
        terms.extend(
            borough_levels
                .iter()
                .skip(1)
                .map(|b| format!("borough{}", b.as_str())),
        );

        let weekday_cols = weekday_levels.len().saturating_sub(1);
        let x = DMatrix::from_fn(counts.len(), terms.len(), |i, j| {
            let cell = &counts[i];
            if j == 0 {
                return 1.0;
            }
            let indicator = if j <= weekday_cols {
                weekday_levels[j] == cell.weekday
            } else {
                borough_levels[j - weekday_cols] == cell.borough
            };
            if indicator {
                1.0
            } else {
                0.0
            }
        });
        let y = DVector::from_iterator(counts.len(), counts.iter().map(|c| c.incident_count as f64));

        Self {
            terms,
            x,
            y,
            weekday_levels,
            borough_levels,
        }
    }

    /// Number of observations (groups).
    pub fn n_obs(&self) -> usize {
        self.x.nrows()
    }

    /// Number of coefficients, intercept included.
    pub fn n_coefficients(&self) -> usize {
        self.terms.len()
    }

    pub fn reference_weekday(&self) -> Option<DayOfWeek> {
        self.weekday_levels.first().copied()
    }

    pub fn reference_borough(&self) -> Option<Borough> {
        self.borough_levels.first().copied()
    }
}
