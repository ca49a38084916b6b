//! Descriptive statistics shared by the analyzers
//!
//! Thin wrappers over `statrs` that define the empty and single-value cases
//! instead of returning NaN.

use statrs::statistics::Statistics;

/// Arithmetic mean, 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.mean()
}

/// Population standard deviation, 0.0 when fewer than two values
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.population_std_dev()
}

/// Ratio of standard deviation to mean, 0.0 when the mean is zero
pub fn coefficient_of_variation(mean: f64, std_dev: f64) -> f64 {
    if mean.abs() > f64::EPSILON {
        std_dev / mean
    } else {
        0.0
    }
}
