//! Explanatory model for the shooting-incident pipeline.
//!
//! Encodes the (weekday, borough) incident counts with reference-level
//! indicators and fits them by ordinary least squares.

pub mod design;
pub mod ols;

pub use design::DesignMatrix;
pub use ols::{fit_weekday_borough, Coefficient, FittedModel};
