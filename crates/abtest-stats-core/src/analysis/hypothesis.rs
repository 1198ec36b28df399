//! Final two-sample comparison and its directional conclusion

use log::info;
use serde::Serialize;

use crate::descriptive;
use crate::errors::StatsResult;
use crate::tests::{self as stat, filter_nan, TestResult};
use crate::types::{validate_alpha, Direction, MannWhitneyOptions, TestKind};

/// Result of the selected hypothesis test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HypothesisOutcome {
    pub kind: TestKind,
    pub test: TestResult,
    /// Control mean (t-tests) or median (rank-sum test)
    pub control_center: f64,
    /// Treatment mean (t-tests) or median (rank-sum test)
    pub treatment_center: f64,
    pub direction: Direction,
}

/// Select the final test from the assumption verdicts.
///
/// Homogeneity only matters on the normal path.
pub fn select_test(is_normal: bool, equal_variance: bool) -> TestKind {
    match (is_normal, equal_variance) {
        (true, true) => TestKind::StudentT,
        (true, false) => TestKind::WelchT,
        (false, _) => TestKind::MannWhitneyU,
    }
}

/// Direction implied by a p-value and the arms' central values
pub fn direction_for(
    p_value: f64,
    alpha: f64,
    control_center: f64,
    treatment_center: f64,
) -> Direction {
    if p_value > alpha {
        Direction::NoSignificantDifference
    } else {
        Direction::from_centers(control_center, treatment_center)
    }
}

/// Independent two-sample t-test; direction by sample mean
pub fn t_test(
    control: &[f64],
    treatment: &[f64],
    equal_variance: bool,
    alpha: f64,
) -> StatsResult<HypothesisOutcome> {
    validate_alpha(alpha)?;
    let test = stat::t_test(control, treatment, equal_variance)?;
    let control_center = descriptive::mean(&filter_nan(control));
    let treatment_center = descriptive::mean(&filter_nan(treatment));
    let direction = direction_for(test.p_value, alpha, control_center, treatment_center);
    let kind = if equal_variance {
        TestKind::StudentT
    } else {
        TestKind::WelchT
    };

    info!(
        "{}: t={:.3}, p={:.3}; {}",
        kind, test.statistic, test.p_value, direction
    );

    Ok(HypothesisOutcome {
        kind,
        test,
        control_center,
        treatment_center,
        direction,
    })
}

/// Two-sided Mann-Whitney U test; direction by sample median
pub fn rank_sum_test(
    control: &[f64],
    treatment: &[f64],
    alpha: f64,
    options: &MannWhitneyOptions,
) -> StatsResult<HypothesisOutcome> {
    validate_alpha(alpha)?;
    let test = stat::mann_whitney_u(control, treatment, options)?;
    let control_center = descriptive::median(&filter_nan(control));
    let treatment_center = descriptive::median(&filter_nan(treatment));
    let direction = direction_for(test.p_value, alpha, control_center, treatment_center);

    info!(
        "{}: U={:.3}, p={:.3}; {}",
        TestKind::MannWhitneyU,
        test.statistic,
        test.p_value,
        direction
    );

    Ok(HypothesisOutcome {
        kind: TestKind::MannWhitneyU,
        test,
        control_center,
        treatment_center,
        direction,
    })
}
