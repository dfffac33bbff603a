//! Ordinary least squares for `incident_count ~ weekday + borough`.
//!
//! Columns that are linear combinations of earlier columns are aliased: they
//! get no estimate and the remaining columns are solved through the SVD
//! pseudo-inverse of the reduced design.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};
use tracing::{debug, info, warn};

use incident_core::formatting::{format_number, format_p_value, significance_stars};
use incident_core::models::WeekdayBoroughCount;
use incident_core::{PipelineError, Result};

use crate::design::DesignMatrix;

/// Model formula fitted by [`fit_weekday_borough`].
pub const FORMULA: &str = "incident_count ~ weekday + borough";

/// Relative residual norm below which a column counts as a linear
/// combination of the columns before it.
const ALIAS_TOLERANCE: f64 = 1e-7;

/// One estimated term. All statistics are `None` for an aliased term.
#[derive(Debug, Clone, Serialize)]
pub struct Coefficient {
    pub term: String,
    pub estimate: Option<f64>,
    pub std_error: Option<f64>,
    pub t_value: Option<f64>,
    /// Two-sided p value from Student's t with the residual degrees of freedom.
    pub p_value: Option<f64>,
}

impl Coefficient {
    fn aliased(term: &str) -> Self {
        Self {
            term: term.to_string(),
            estimate: None,
            std_error: None,
            t_value: None,
            p_value: None,
        }
    }

    /// True when the term is not identifiable from the observed groups.
    pub fn is_aliased(&self) -> bool {
        self.estimate.is_none()
    }
}

/// Overall F test against the intercept-only model.
#[derive(Debug, Clone, Serialize)]
pub struct FStatistic {
    pub value: f64,
    pub df_model: usize,
    pub df_residual: usize,
    pub p_value: f64,
}

/// Result of an OLS fit.
#[derive(Debug, Clone, Serialize)]
pub struct FittedModel {
    pub formula: String,
    /// Reference levels absorbed into the intercept.
    pub reference_weekday: Option<String>,
    pub reference_borough: Option<String>,
    pub coefficients: Vec<Coefficient>,
    /// Number of groups the model was fitted on.
    pub n_obs: usize,
    /// Numerical rank of the design matrix.
    pub rank: usize,
    pub df_residual: usize,
    pub residual_std_error: f64,
    /// `None` when the response has no variation.
    pub r_squared: Option<f64>,
    pub adj_r_squared: Option<f64>,
    pub f_statistic: Option<FStatistic>,
}

impl FittedModel {
    /// Look up a coefficient by term name.
    pub fn coefficient(&self, term: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.term == term)
    }

    /// Terms dropped because they are linear combinations of earlier terms.
    pub fn aliased_terms(&self) -> impl Iterator<Item = &str> {
        self.coefficients
            .iter()
            .filter(|c| c.is_aliased())
            .map(|c| c.term.as_str())
    }

    /// Plain-text regression summary.
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Linear model: {}\n", self.formula));
        if let (Some(w), Some(b)) = (&self.reference_weekday, &self.reference_borough) {
            s.push_str(&format!("Reference levels: weekday {}, borough {}\n", w, b));
        }
        let aliased = self.aliased_terms().count();
        if aliased > 0 {
            s.push_str(&format!(
                "\nCoefficients: ({} not defined because of singularities)\n",
                aliased
            ));
        } else {
            s.push_str("\nCoefficients:\n");
        }
        s.push_str(&format!(
            "{:<24} {:>12} {:>12} {:>9} {:>10}\n",
            "", "Estimate", "Std. Error", "t value", "Pr(>|t|)"
        ));
        let na = |v: Option<f64>, precision: usize| {
            v.map_or_else(|| "NA".to_string(), |v| format!("{:.*}", precision, v))
        };
        for c in &self.coefficients {
            s.push_str(&format!(
                "{:<24} {:>12} {:>12} {:>9} {:>10} {}\n",
                c.term,
                na(c.estimate, 4),
                na(c.std_error, 4),
                na(c.t_value, 3),
                format_p_value(c.p_value.unwrap_or(f64::NAN)),
                c.p_value.map(significance_stars).unwrap_or("")
            ));
        }
        s.push_str(&format!(
            "\nResidual standard error: {} on {} degrees of freedom\n",
            format_number(self.residual_std_error, 3),
            self.df_residual
        ));
        match (self.r_squared, self.adj_r_squared) {
            (Some(r2), Some(adj)) => s.push_str(&format!(
                "Multiple R-squared: {:.4}, Adjusted R-squared: {:.4}\n",
                r2, adj
            )),
            _ => s.push_str("R-squared: undefined (response has no variation)\n"),
        }
        if let Some(f) = &self.f_statistic {
            s.push_str(&format!(
                "F-statistic: {:.3} on {} and {} DF, p-value: {}\n",
                f.value,
                f.df_model,
                f.df_residual,
                format_p_value(f.p_value)
            ));
        }
        s
    }
}

/// Fit `incident_count ~ weekday + borough` to the grouped counts.
///
/// Fails with [`PipelineError::UnderdeterminedModel`] when there are no more
/// groups than coefficients, including the empty input.
pub fn fit_weekday_borough(counts: &[WeekdayBoroughCount]) -> Result<FittedModel> {
    let design = DesignMatrix::from_counts(counts);
    fit_design(&design)
}

/// Fit OLS on an already encoded design.
pub fn fit_design(design: &DesignMatrix) -> Result<FittedModel> {
    let n = design.n_obs();
    let p = design.n_coefficients();
    if n <= p {
        return Err(PipelineError::UnderdeterminedModel {
            groups: n,
            coefficients: p,
        });
    }

    let kept = estimable_columns(&design.x);
    let rank = kept.len();
    if rank < p {
        let aliased: Vec<&str> = (0..p)
            .filter(|j| !kept.contains(j))
            .map(|j| design.terms[j].as_str())
            .collect();
        warn!(
            "Design matrix is rank deficient ({} of {} columns); aliased: {}",
            rank,
            p,
            aliased.join(", ")
        );
    }

    let x = design.x.select_columns(kept.iter());
    let svd = x.clone().svd(true, true);
    let max_sv = svd.singular_values.iter().cloned().fold(0.0_f64, f64::max);
    let tolerance = max_sv * (n.max(rank) as f64) * f64::EPSILON;
    let pinv = svd
        .pseudo_inverse(tolerance)
        .map_err(|e| PipelineError::Other(anyhow::anyhow!("pseudo-inverse failed: {}", e)))?;

    let beta: DVector<f64> = &pinv * &design.y;
    let fitted = &x * &beta;
    let residuals = &design.y - &fitted;

    let rss: f64 = residuals.iter().map(|r| r * r).sum();
    let mean_y = design.y.mean();
    let tss: f64 = design.y.iter().map(|y| (y - mean_y).powi(2)).sum();

    let df_residual = n - rank;
    let sigma2 = rss / df_residual as f64;
    // (XᵀX)⁻¹ = X⁺ (X⁺)ᵀ for a full column rank X
    let cov_unscaled = &pinv * pinv.transpose();

    let t_dist = StudentsT::new(0.0, 1.0, df_residual as f64)
        .map_err(|e| PipelineError::Other(anyhow::anyhow!("t distribution: {}", e)))?;

    let coefficients: Vec<Coefficient> = design
        .terms
        .iter()
        .enumerate()
        .map(|(j, term)| {
            let Some(k) = kept.iter().position(|&c| c == j) else {
                return Coefficient::aliased(term);
            };
            let estimate = beta[k];
            let std_error = (sigma2 * cov_unscaled[(k, k)]).max(0.0).sqrt();
            let t_value = estimate / std_error;
            let p_value = if t_value.is_nan() {
                f64::NAN
            } else {
                2.0 * t_dist.sf(t_value.abs())
            };
            Coefficient {
                term: term.clone(),
                estimate: Some(estimate),
                std_error: Some(std_error),
                t_value: Some(t_value),
                p_value: Some(p_value),
            }
        })
        .collect();

    let predictors = rank - 1;
    let (r_squared, adj_r_squared) = if tss > 0.0 {
        let r2 = 1.0 - rss / tss;
        let adj = 1.0 - (1.0 - r2) * (n as f64 - 1.0) / (n as f64 - predictors as f64 - 1.0);
        (Some(r2), Some(adj))
    } else {
        (None, None)
    };

    let f_statistic = if predictors > 0 && tss > 0.0 {
        let value = ((tss - rss) / predictors as f64) / sigma2;
        let p_value = FisherSnedecor::new(predictors as f64, df_residual as f64)
            .map(|f| f.sf(value))
            .unwrap_or(f64::NAN);
        Some(FStatistic {
            value,
            df_model: predictors,
            df_residual,
            p_value,
        })
    } else {
        None
    };

    debug!("OLS: n={}, p={}, rank={}, rss={:.4}", n, p, rank, rss);
    info!(
        "Fitted {} on {} groups (df={}, adj R²={})",
        FORMULA,
        n,
        df_residual,
        adj_r_squared
            .map(|v| format!("{:.4}", v))
            .unwrap_or_else(|| "n/a".to_string())
    );

    Ok(FittedModel {
        formula: FORMULA.to_string(),
        reference_weekday: design.reference_weekday().map(|d| d.to_string()),
        reference_borough: design.reference_borough().map(|b| b.to_string()),
        coefficients,
        n_obs: n,
        rank,
        df_residual,
        residual_std_error: sigma2.sqrt(),
        r_squared,
        adj_r_squared,
        f_statistic,
    })
}

/// Indices of the columns that are not linear combinations of the columns
/// before them, found by Gram-Schmidt in column order.
fn estimable_columns(x: &DMatrix<f64>) -> Vec<usize> {
    let mut basis: Vec<DVector<f64>> = Vec::new();
    let mut kept = Vec::new();
    for j in 0..x.ncols() {
        let column: DVector<f64> = x.column(j).into_owned();
        let norm = column.norm();
        if norm == 0.0 {
            continue;
        }
        let mut residual = column;
        for q in &basis {
            let projection = q.dot(&residual);
            residual.axpy(-projection, q, 1.0);
        }
        let remaining = residual.norm();
        if remaining > ALIAS_TOLERANCE * norm {
            basis.push(residual / remaining);
            kept.push(j);
        }
    }
    kept
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use incident_core::models::{Borough, DayOfWeek};

    fn cell(weekday: DayOfWeek, borough: Borough, incident_count: u64) -> WeekdayBoroughCount {
        WeekdayBoroughCount {
            weekday,
            borough,
            incident_count,
        }
    }

    /// Counts generated exactly by `10 + 2·[Sunday] + 5·[Brooklyn] + 1·[Queens]`
    /// plus a symmetric perturbation on two cells.
    fn grid() -> Vec<WeekdayBoroughCount> {
        let mut counts = Vec::new();
        for (wi, &d) in [DayOfWeek::Monday, DayOfWeek::Sunday].iter().enumerate() {
            for (bi, &b) in [Borough::Bronx, Borough::Brooklyn, Borough::Queens]
                .iter()
                .enumerate()
            {
                let base = 10 + 2 * wi as u64 + [0, 5, 1][bi];
                counts.push(cell(d, b, base));
            }
        }
        counts
    }

    // ── Degenerate inputs ─────────────────────────────────────────────────────

    #[test]
    fn test_empty_input_is_underdetermined() {
        let err = fit_weekday_borough(&[]).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnderdeterminedModel {
                groups: 0,
                coefficients: 1
            }
        ));
    }

    #[test]
    fn test_groups_equal_to_coefficients_is_underdetermined() {
        // w = 2, b = 2 → 3 coefficients, 3 groups.
        let counts = vec![
            cell(DayOfWeek::Monday, Borough::Bronx, 5),
            cell(DayOfWeek::Tuesday, Borough::Bronx, 6),
            cell(DayOfWeek::Monday, Borough::Queens, 7),
        ];
        let err = fit_weekday_borough(&counts).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnderdeterminedModel {
                groups: 3,
                coefficients: 3
            }
        ));
    }

    // ── Exact fit ─────────────────────────────────────────────────────────────

    #[test]
    fn test_recovers_additive_effects() {
        let model = fit_weekday_borough(&grid()).unwrap();
        let est = |t: &str| model.coefficient(t).unwrap().estimate.unwrap();
        assert!((est("(Intercept)") - 10.0).abs() < 1e-9);
        assert!((est("weekdaySunday") - 2.0).abs() < 1e-9);
        assert!((est("boroughBROOKLYN") - 5.0).abs() < 1e-9);
        assert!((est("boroughQUEENS") - 1.0).abs() < 1e-9);
        assert_eq!(model.reference_weekday.as_deref(), Some("Monday"));
        assert_eq!(model.reference_borough.as_deref(), Some("BRONX"));
    }

    #[test]
    fn test_degrees_of_freedom_formula() {
        // 6 groups, w = 2, b = 3 → df = 6 − 1 − 2 − 1 = 2.
        let model = fit_weekday_borough(&grid()).unwrap();
        assert_eq!(model.n_obs, 6);
        assert_eq!(model.rank, 4);
        assert_eq!(model.df_residual, 6 - (2 - 1) - (3 - 1) - 1);
    }

    #[test]
    fn test_perfect_fit_r_squared_is_one() {
        let model = fit_weekday_borough(&grid()).unwrap();
        assert!((model.r_squared.unwrap() - 1.0).abs() < 1e-9);
        assert!((model.adj_r_squared.unwrap() - 1.0).abs() < 1e-9);
    }

    // ── Noisy fit ─────────────────────────────────────────────────────────────

    #[test]
    fn test_adjusted_r_squared_matches_definition() {
        let mut counts = grid();
        counts[0].incident_count += 3;
        counts[4].incident_count += 1;
        let model = fit_weekday_borough(&counts).unwrap();

        let r2 = model.r_squared.unwrap();
        let n = model.n_obs as f64;
        let p = (model.rank - 1) as f64;
        let expected = 1.0 - (1.0 - r2) * (n - 1.0) / (n - p - 1.0);
        assert!((model.adj_r_squared.unwrap() - expected).abs() < 1e-12);
        assert!(r2 < 1.0 && r2 > 0.0);
        assert!(model.adj_r_squared.unwrap() < r2);
    }

    #[test]
    fn test_standard_errors_positive_with_noise() {
        let mut counts = grid();
        counts[1].incident_count += 2;
        let model = fit_weekday_borough(&counts).unwrap();
        for c in &model.coefficients {
            let se = c.std_error.unwrap();
            assert!(se > 0.0, "{} has se {}", c.term, se);
            assert!((0.0..=1.0).contains(&c.p_value.unwrap()));
        }
        let f = model.f_statistic.as_ref().unwrap();
        assert_eq!(f.df_model, 3);
        assert_eq!(f.df_residual, 2);
    }

    #[test]
    fn test_intercept_only_model() {
        // A single weekday and borough: only the intercept is estimated.
        let counts = vec![
            cell(DayOfWeek::Friday, Borough::Manhattan, 4),
        ];
        assert!(fit_weekday_borough(&counts).is_err());

        let design = DesignMatrix::from_counts(&counts);
        assert_eq!(design.n_coefficients(), 1);
    }

    #[test]
    fn test_constant_response_has_undefined_r_squared() {
        let counts: Vec<WeekdayBoroughCount> = grid()
            .into_iter()
            .map(|c| cell(c.weekday, c.borough, 7))
            .collect();
        let model = fit_weekday_borough(&counts).unwrap();
        assert!(model.r_squared.is_none());
        assert!(model.adj_r_squared.is_none());
        assert!(model.f_statistic.is_none());
    }

    // ── Rank deficiency ───────────────────────────────────────────────────────

    /// Two blocks sharing no weekday or borough: {Mon, Tue} × {Bronx, Brooklyn}
    /// and {Wed, Thu} × {Manhattan, Queens}. Within the second block
    /// `Wed + Thu = Manhattan + Queens`, so one borough term is aliased.
    fn disconnected() -> Vec<WeekdayBoroughCount> {
        let mut counts = Vec::new();
        let blocks = [
            ([DayOfWeek::Monday, DayOfWeek::Tuesday], [Borough::Bronx, Borough::Brooklyn]),
            ([DayOfWeek::Wednesday, DayOfWeek::Thursday], [Borough::Manhattan, Borough::Queens]),
        ];
        let mut n = 5;
        for (days, boroughs) in blocks {
            for d in days {
                for b in boroughs {
                    n += 3;
                    counts.push(cell(d, b, n + (n % 4)));
                }
            }
        }
        counts
    }

    #[test]
    fn test_disconnected_design_marks_aliased_term() {
        let model = fit_weekday_borough(&disconnected()).unwrap();
        assert_eq!(model.n_obs, 8);
        assert_eq!(model.coefficients.len(), 7);
        assert_eq!(model.rank, 6);
        assert_eq!(model.df_residual, 2);

        let aliased: Vec<&str> = model.aliased_terms().collect();
        assert_eq!(aliased, vec!["boroughQUEENS"]);
        let queens = model.coefficient("boroughQUEENS").unwrap();
        assert!(queens.std_error.is_none());
        assert!(queens.p_value.is_none());
        for c in model.coefficients.iter().filter(|c| !c.is_aliased()) {
            assert!(c.estimate.unwrap().is_finite(), "{}", c.term);
        }
        assert_eq!(model.f_statistic.as_ref().unwrap().df_model, 5);
    }

    #[test]
    fn test_summary_prints_na_for_aliased_term() {
        let model = fit_weekday_borough(&disconnected()).unwrap();
        let summary = model.summary();
        assert!(summary.contains("(1 not defined because of singularities)"));
        let queens = summary
            .lines()
            .find(|l| l.starts_with("boroughQUEENS"))
            .unwrap();
        assert!(queens.contains("NA"));
        assert!(summary.contains("on 2 degrees of freedom"));
    }

    #[test]
    fn test_aliased_term_serialises_as_null() {
        let model = fit_weekday_borough(&disconnected()).unwrap();
        let json = serde_json::to_value(&model).unwrap();
        let queens = json["coefficients"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["term"] == "boroughQUEENS")
            .unwrap();
        assert!(queens["estimate"].is_null());
    }

    #[test]
    fn test_full_rank_design_has_no_aliased_terms() {
        let model = fit_weekday_borough(&grid()).unwrap();
        assert_eq!(model.aliased_terms().count(), 0);
        assert!(!model.summary().contains("singularities"));
    }

    // ── Summary / serialisation ───────────────────────────────────────────────

    #[test]
    fn test_summary_mentions_terms_and_fit() {
        let mut counts = grid();
        counts[2].incident_count += 1;
        let model = fit_weekday_borough(&counts).unwrap();
        let summary = model.summary();
        assert!(summary.contains(FORMULA));
        assert!(summary.contains("weekdaySunday"));
        assert!(summary.contains("Adjusted R-squared"));
        assert!(summary.contains("on 2 degrees of freedom"));
    }

    #[test]
    fn test_model_serialises_to_json() {
        let mut counts = grid();
        counts[2].incident_count += 1;
        let model = fit_weekday_borough(&counts).unwrap();
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["df_residual"], 2);
        assert_eq!(json["coefficients"].as_array().unwrap().len(), 4);
    }
}
