//! Outlier filtering
//!
//! - IQR fence: keep values inside [Q1 - 1.5 IQR, Q3 + 1.5 IQR]
//! - Z-score: keep values with |z| <= threshold
//!
//! Both filters look at a single partition and return a new one.

use log::{debug, warn};
use serde::Serialize;

use crate::data::Partition;
use crate::descriptive;
use crate::errors::{StatsError, StatsResult};
use crate::types::{Arm, OutlierMethod};

/// Multiplier applied to the IQR to place the fences
pub const IQR_FENCE: f64 = 1.5;

/// Condition reported by a filter that could not apply its rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCondition {
    /// Standard deviation is zero, so z-scores are undefined; all rows kept
    ZeroVariance,
}

/// What a filter pass did to one arm
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterReport {
    pub arm: Arm,
    pub field: String,
    pub method: OutlierMethod,
    /// Lowest value kept
    pub lower_bound: f64,
    /// Highest value kept
    pub upper_bound: f64,
    pub kept: usize,
    pub removed: usize,
    pub condition: Option<FilterCondition>,
}

/// Filtered partition plus its report
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub partition: Partition,
    pub report: FilterReport,
}

/// Filter `partition` on `field` with the given method
pub fn filter_outliers(
    partition: &Partition,
    field: &str,
    method: OutlierMethod,
) -> StatsResult<FilterOutcome> {
    match method {
        OutlierMethod::Iqr => filter_iqr(partition, field),
        OutlierMethod::ZScore { threshold } => filter_zscore(partition, field, threshold),
    }
}

/// Remove rows whose `field` lies outside the IQR fences
pub fn filter_iqr(partition: &Partition, field: &str) -> StatsResult<FilterOutcome> {
    let values = non_empty_values(partition, field)?;
    let sorted = descriptive::sorted(&values);

    let q1 = descriptive::quantile_sorted(&sorted, 0.25);
    let q3 = descriptive::quantile_sorted(&sorted, 0.75);
    let iqr = q3 - q1;
    let lower = q1 - IQR_FENCE * iqr;
    let upper = q3 + IQR_FENCE * iqr;

    debug!(
        "IQR filter on {} arm, field '{}': Q1={}, Q3={}, bounds=[{}, {}]",
        partition.arm(),
        field,
        q1,
        q3,
        lower,
        upper
    );

    let filtered = partition.retain(field, |v| v >= lower && v <= upper);
    outcome(
        partition,
        values.len(),
        filtered,
        field,
        OutlierMethod::Iqr,
        (lower, upper),
        None,
    )
}

/// Remove rows whose |z| for `field` exceeds `threshold`.
///
/// Uses the population standard deviation. When it is zero every z-score is
/// undefined, so the partition is kept whole and the report carries
/// [`FilterCondition::ZeroVariance`].
pub fn filter_zscore(
    partition: &Partition,
    field: &str,
    threshold: f64,
) -> StatsResult<FilterOutcome> {
    let method = OutlierMethod::ZScore { threshold };
    method.validate()?;

    let values = non_empty_values(partition, field)?;
    let mean = descriptive::mean(&values);
    let std = descriptive::std_dev(&values, 0);

    if std == 0.0 || std <= f64::EPSILON * mean.abs() {
        warn!(
            "z-score filter on {} arm, field '{}': zero standard deviation, keeping all rows",
            partition.arm(),
            field
        );
        return outcome(
            partition,
            values.len(),
            partition.clone(),
            field,
            method,
            (mean, mean),
            Some(FilterCondition::ZeroVariance),
        );
    }

    let lower = mean - threshold * std;
    let upper = mean + threshold * std;
    debug!(
        "z-score filter on {} arm, field '{}': mean={}, std={}, bounds=[{}, {}]",
        partition.arm(),
        field,
        mean,
        std,
        lower,
        upper
    );

    let filtered = partition.retain(field, |v| ((v - mean) / std).abs() <= threshold);
    outcome(
        partition,
        values.len(),
        filtered,
        field,
        method,
        (lower, upper),
        None,
    )
}

fn non_empty_values(partition: &Partition, field: &str) -> StatsResult<Vec<f64>> {
    let values = partition.values(field)?;
    if values.is_empty() {
        return Err(StatsError::EmptyPartition {
            arm: partition.arm(),
            n: 0,
            required: 1,
        });
    }
    Ok(values)
}

/// `usable` is the number of non-NaN values the filter saw; NaN rows are
/// neither kept nor removed.
fn outcome(
    original: &Partition,
    usable: usize,
    filtered: Partition,
    field: &str,
    method: OutlierMethod,
    (lower_bound, upper_bound): (f64, f64),
    condition: Option<FilterCondition>,
) -> StatsResult<FilterOutcome> {
    let kept = filtered.values(field)?.len();
    let report = FilterReport {
        arm: original.arm(),
        field: field.to_string(),
        method,
        lower_bound,
        upper_bound,
        kept,
        removed: usable - kept,
        condition,
    };
    Ok(FilterOutcome {
        partition: filtered,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn partition(values: &[f64]) -> Partition {
        Partition::from_values(Arm::Treatment, "treatment", "x", values)
    }

    #[test]
    fn test_iqr_drops_extreme_value() {
        let p = partition(&[1.0, 2.0, 3.0, 4.0, 100.0]);
        let out = filter_iqr(&p, "x").unwrap();

        assert_relative_eq!(out.report.lower_bound, -1.0);
        assert_relative_eq!(out.report.upper_bound, 7.0);
        assert_eq!(out.partition.values("x").unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(out.report.removed, 1);
        assert_eq!(out.report.kept, 4);
        assert_eq!(out.partition.arm(), Arm::Treatment);
    }

    #[test]
    fn test_nan_rows_are_not_counted_as_removed() {
        let p = partition(&[1.0, f64::NAN, 2.0, 3.0, 4.0, f64::NAN, 100.0]);
        let out = filter_iqr(&p, "x").unwrap();
        assert_eq!(out.report.kept, 4);
        assert_eq!(out.report.removed, 1);

        let out = filter_zscore(&partition(&[5.0, f64::NAN, 5.0, 5.0]), "x", 3.0).unwrap();
        assert_eq!(out.report.condition, Some(FilterCondition::ZeroVariance));
        assert_eq!(out.report.kept, 3);
        assert_eq!(out.report.removed, 0);
    }

    #[test]
    fn test_iqr_is_idempotent() {
        let p = partition(&[1.0, 2.0, 3.0, 4.0, 100.0]);
        let once = filter_iqr(&p, "x").unwrap().partition;
        let twice = filter_iqr(&once, "x").unwrap();

        assert_eq!(twice.report.removed, 0);
        assert_eq!(twice.partition, once);
    }

    #[test]
    fn test_iqr_bounds_are_inclusive() {
        // Q1 = 2, Q3 = 4, fences at -1 and 7
        let p = partition(&[-1.0, 2.0, 3.0, 4.0, 2.0, 4.0, 7.0]);
        let out = filter_iqr(&p, "x").unwrap();
        assert_eq!(out.report.removed, 0);
    }

    #[test]
    fn test_iqr_does_not_touch_input() {
        let p = partition(&[1.0, 2.0, 3.0, 4.0, 100.0]);
        let _ = filter_iqr(&p, "x").unwrap();
        assert_eq!(p.len(), 5);
    }

    #[test]
    fn test_zscore_removes_outlier() {
        let mut values = vec![10.0; 20];
        values.push(1000.0);
        let p = partition(&values);
        let out = filter_zscore(&p, "x", 3.0).unwrap();

        assert_eq!(out.partition.values("x").unwrap(), vec![10.0; 20]);
        assert_eq!(out.report.removed, 1);
        assert!(out.report.condition.is_none());
    }

    #[test]
    fn test_zscore_small_sample_bound() {
        // With n = 6 the largest attainable population z-score is sqrt(5)
        let p = partition(&[10.0, 10.0, 10.0, 10.0, 10.0, 1000.0]);

        let out = filter_zscore(&p, "x", 3.0).unwrap();
        assert_eq!(out.report.removed, 0);
        assert_relative_eq!(out.report.upper_bound, 175.0 + 3.0 * 136125f64.sqrt());

        let out = filter_zscore(&p, "x", 2.0).unwrap();
        assert_eq!(out.partition.values("x").unwrap(), vec![10.0; 5]);
    }

    #[test]
    fn test_zscore_zero_variance_is_noop() {
        let p = partition(&[5.0, 5.0, 5.0, 5.0]);
        let out = filter_zscore(&p, "x", 3.0).unwrap();

        assert_eq!(out.partition, p);
        assert_eq!(out.report.condition, Some(FilterCondition::ZeroVariance));
        assert_eq!(out.report.removed, 0);
    }

    #[test]
    fn test_zscore_rejects_bad_threshold() {
        let p = partition(&[1.0, 2.0, 3.0]);
        assert_eq!(
            filter_zscore(&p, "x", -1.0).unwrap_err(),
            StatsError::InvalidThreshold(-1.0)
        );
    }

    #[test]
    fn test_empty_partition() {
        let p = partition(&[]);
        assert!(matches!(
            filter_iqr(&p, "x"),
            Err(StatsError::EmptyPartition { n: 0, .. })
        ));
    }

    #[test]
    fn test_missing_field() {
        let p = partition(&[1.0, 2.0]);
        assert_eq!(
            filter_outliers(&p, "y", OutlierMethod::Iqr).unwrap_err(),
            StatsError::MissingVariable("y".into())
        );
    }

    #[test]
    fn test_dispatch_default_zscore() {
        let mut values = vec![1.0, 2.0, 3.0, 2.0, 1.0, 3.0, 2.0, 2.0, 1.0, 3.0, 2.0, 2.0];
        values.push(500.0);
        let p = partition(&values);
        let out = filter_outliers(&p, "x", OutlierMethod::zscore()).unwrap();
        assert_eq!(out.report.removed, 1);
        assert_eq!(out.report.method, OutlierMethod::ZScore { threshold: 3.0 });
    }
}
