use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{StatsError, StatsResult};

/// Default significance level used for every verdict
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Default |z| cut-off for z-score outlier filtering
pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 3.0;

/// One of the two experiment arms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arm {
    Control,
    Treatment,
}

impl Arm {
    pub const BOTH: [Arm; 2] = [Arm::Control, Arm::Treatment];
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arm::Control => f.write_str("control"),
            Arm::Treatment => f.write_str("treatment"),
        }
    }
}

/// Directional conclusion of the final hypothesis test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    ControlGreater,
    TreatmentGreater,
    NoSignificantDifference,
}

impl Direction {
    /// Direction for a significant result, given the two arms' central values.
    ///
    /// Equal centres resolve to treatment.
    pub fn from_centers(control: f64, treatment: f64) -> Direction {
        if control > treatment {
            Direction::ControlGreater
        } else {
            Direction::TreatmentGreater
        }
    }

    pub fn is_significant(self) -> bool {
        self != Direction::NoSignificantDifference
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ControlGreater => f.write_str("control greater"),
            Direction::TreatmentGreater => f.write_str("treatment greater"),
            Direction::NoSignificantDifference => f.write_str("no significant difference"),
        }
    }
}

/// The hypothesis test selected for the final comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    /// Independent two-sample t-test with pooled variance
    StudentT,
    /// Independent two-sample t-test with Welch's correction
    WelchT,
    /// Two-sided Mann-Whitney U (Wilcoxon rank-sum) test
    MannWhitneyU,
}

impl TestKind {
    pub fn is_parametric(self) -> bool {
        matches!(self, TestKind::StudentT | TestKind::WelchT)
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestKind::StudentT => f.write_str("Student t-test"),
            TestKind::WelchT => f.write_str("Welch t-test"),
            TestKind::MannWhitneyU => f.write_str("Mann-Whitney U test"),
        }
    }
}

/// Centre used by Levene's test when computing absolute deviations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeveneCenter {
    /// Original Levene (1960) statistic
    Mean,
    /// Brown-Forsythe variant, robust to skew
    #[default]
    Median,
}

/// How the Mann-Whitney p-value is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MannWhitneyMethod {
    /// Exact for small tie-free samples, asymptotic otherwise
    #[default]
    Auto,
    Exact,
    Asymptotic,
}

/// Options for the Mann-Whitney U test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MannWhitneyOptions {
    pub method: MannWhitneyMethod,
    /// Apply continuity correction to the normal approximation
    pub continuity_correction: bool,
}

impl Default for MannWhitneyOptions {
    fn default() -> Self {
        Self {
            method: MannWhitneyMethod::Auto,
            continuity_correction: true,
        }
    }
}

/// Outlier removal policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum OutlierMethod {
    /// Keep values inside [Q1 - 1.5 IQR, Q3 + 1.5 IQR]
    Iqr,
    /// Keep values with |z| <= threshold (population standard deviation)
    ZScore { threshold: f64 },
}

impl OutlierMethod {
    /// Z-score filtering with the default threshold of 3
    pub fn zscore() -> Self {
        OutlierMethod::ZScore {
            threshold: DEFAULT_ZSCORE_THRESHOLD,
        }
    }

    pub fn validate(&self) -> StatsResult<()> {
        match *self {
            OutlierMethod::Iqr => Ok(()),
            OutlierMethod::ZScore { threshold } => {
                if threshold.is_finite() && threshold > 0.0 {
                    Ok(())
                } else {
                    Err(StatsError::InvalidThreshold(threshold))
                }
            }
        }
    }
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierMethod::Iqr => f.write_str("IQR fence"),
            OutlierMethod::ZScore { threshold } => write!(f, "z-score (|z| <= {})", threshold),
        }
    }
}

/// Outlier filtering applied by the orchestrator before the normality stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierPolicy {
    pub method: OutlierMethod,
    /// Arms to filter, in order
    pub arms: Vec<Arm>,
}

impl OutlierPolicy {
    /// Filter both arms with the given method
    pub fn both(method: OutlierMethod) -> Self {
        Self {
            method,
            arms: Arm::BOTH.to_vec(),
        }
    }
}

/// Group label values that identify the two arms in a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupLabels {
    pub control: String,
    pub treatment: String,
}

impl GroupLabels {
    pub fn new(control: impl Into<String>, treatment: impl Into<String>) -> Self {
        Self {
            control: control.into(),
            treatment: treatment.into(),
        }
    }

    /// Arm whose label equals `label`, if any
    pub fn arm_for(&self, label: &str) -> Option<Arm> {
        if label == self.control {
            Some(Arm::Control)
        } else if label == self.treatment {
            Some(Arm::Treatment)
        } else {
            None
        }
    }

    pub fn label(&self, arm: Arm) -> &str {
        match arm {
            Arm::Control => &self.control,
            Arm::Treatment => &self.treatment,
        }
    }

    pub fn validate(&self) -> StatsResult<()> {
        if self.control.is_empty() || self.treatment.is_empty() {
            return Err(StatsError::InvalidLabels(
                "group labels cannot be empty".into(),
            ));
        }
        if self.control == self.treatment {
            return Err(StatsError::InvalidLabels(format!(
                "control and treatment share the label '{}'",
                self.control
            )));
        }
        Ok(())
    }
}

impl Default for GroupLabels {
    fn default() -> Self {
        Self::new("control", "treatment")
    }
}

/// Options for one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Significance level for all verdicts (default: 0.05)
    pub alpha: f64,
    /// Labels identifying the two arms
    pub labels: GroupLabels,
    /// Centre for Levene's test (default: median)
    pub levene_center: LeveneCenter,
    /// Mann-Whitney settings
    pub mann_whitney: MannWhitneyOptions,
    /// Outlier filtering applied inside each run (default: none)
    pub outlier_policy: Option<OutlierPolicy>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            labels: GroupLabels::default(),
            levene_center: LeveneCenter::Median,
            mann_whitney: MannWhitneyOptions::default(),
            outlier_policy: None,
        }
    }
}

impl AnalysisOptions {
    pub fn validate(&self) -> StatsResult<()> {
        validate_alpha(self.alpha)?;
        self.labels.validate()?;
        if let Some(policy) = &self.outlier_policy {
            policy.method.validate()?;
        }
        Ok(())
    }
}

pub(crate) fn validate_alpha(alpha: f64) -> StatsResult<()> {
    if alpha.is_finite() && alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(StatsError::InvalidAlpha(alpha))
    }
}
