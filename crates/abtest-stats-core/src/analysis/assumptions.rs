//! Assumption checks that drive test selection
//!
//! - Normality: Shapiro-Wilk on each arm, combined through a fixed decision table
//! - Homogeneity of variances: Levene's test

use log::info;
use serde::Serialize;

use crate::errors::StatsResult;
use crate::tests::{levene, shapiro_wilk, TestResult};
use crate::types::{validate_alpha, Arm, LeveneCenter};

/// Outcome of the normality stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalityVerdict {
    pub control: TestResult,
    pub treatment: TestResult,
    pub is_normal: bool,
    /// Arm that looks non-normal while the other does not; advisory only
    pub possible_outliers: Option<Arm>,
}

impl NormalityVerdict {
    pub fn p_control(&self) -> f64 {
        self.control.p_value
    }

    pub fn p_treatment(&self) -> f64 {
        self.treatment.p_value
    }
}

/// Outcome of the homogeneity stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomogeneityVerdict {
    pub test: TestResult,
    pub equal_variance: bool,
}

/// Apply the normality decision table to two p-values.
///
/// Normal only when both p-values are strictly greater than `alpha`. When
/// exactly one arm fails, that arm is returned as the one to check for
/// outliers.
pub fn classify_normality(p_control: f64, p_treatment: f64, alpha: f64) -> (bool, Option<Arm>) {
    match (p_control > alpha, p_treatment > alpha) {
        (true, true) => (true, None),
        (false, false) => (false, None),
        (true, false) => (false, Some(Arm::Treatment)),
        (false, true) => (false, Some(Arm::Control)),
    }
}

/// Run Shapiro-Wilk on both arms and classify
pub fn normality_verdict(
    control: &[f64],
    treatment: &[f64],
    alpha: f64,
) -> StatsResult<NormalityVerdict> {
    validate_alpha(alpha)?;
    let control = shapiro_wilk(control)?;
    let treatment = shapiro_wilk(treatment)?;
    let (is_normal, possible_outliers) =
        classify_normality(control.p_value, treatment.p_value, alpha);

    info!(
        "Shapiro-Wilk: control p={:.3}, treatment p={:.3}; normal={}",
        control.p_value, treatment.p_value, is_normal
    );
    if let Some(arm) = possible_outliers {
        info!(
            "only the {} arm departs from normality; check it for outliers",
            arm
        );
    }

    Ok(NormalityVerdict {
        control,
        treatment,
        is_normal,
        possible_outliers,
    })
}

/// Run Levene's test; variances are equal when p > `alpha`
pub fn homogeneity_verdict(
    control: &[f64],
    treatment: &[f64],
    alpha: f64,
    center: LeveneCenter,
) -> StatsResult<HomogeneityVerdict> {
    validate_alpha(alpha)?;
    let test = levene(control, treatment, center)?;
    let equal_variance = test.p_value > alpha;

    info!(
        "Levene: W={:.3}, p={:.3}; equal variance={}",
        test.statistic, test.p_value, equal_variance
    );

    Ok(HomogeneityVerdict {
        test,
        equal_variance,
    })
}
