//! Statistical hypothesis testing
//!
//! Thin wrappers over `anofox_tests` used by the assumption checks and the
//! final comparison. Each wrapper drops NaN, checks sample sizes and
//! degenerate inputs, then maps the library result onto [`TestResult`].


pub use distributional::shapiro_wilk;
pub use nonparametric::mann_whitney_u;
pub use parametric::{levene, t_test};

use serde::Serialize;

use crate::StatsError;

/// Generic test result structure for all statistical tests
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    /// Test statistic (W, t, U, Levene W)
    pub statistic: f64,
    /// p-value
    pub p_value: f64,
    /// Degrees of freedom (f64::NAN if not applicable)
    pub df: f64,
    /// Group 1 sample size (the only sample for one-sample tests)
    pub n1: usize,
    /// Group 2 sample size (0 for one-sample tests)
    pub n2: usize,
    /// Test method/name
    pub method: String,
}

/// Filter NaN values from a slice
pub(crate) fn filter_nan(data: &[f64]) -> Vec<f64> {
    data.iter().copied().filter(|x| !x.is_nan()).collect()
}

/// Convert anofox_tests errors to StatsError
fn convert_error(e: anofox_tests::StatError) -> StatsError {
    match e {
        anofox_tests::StatError::EmptyData | anofox_tests::StatError::InsufficientData { .. } => {
            StatsError::InsufficientDataMsg(e.to_string())
        }
        other => StatsError::InvalidInput(other.to_string()),
    }
}
