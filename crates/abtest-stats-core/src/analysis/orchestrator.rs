//! Test-selection workflow for one variable at a time
//!
//! ```text
//! Start -> [Filtered] -> NormalityChecked -+-> HomogeneityChecked -> ParametricTested -+-> Done
//!                                          +-> NonParametricTested -------------------+
//! ```

use log::debug;
use serde::Serialize;

use super::assumptions::{homogeneity_verdict, normality_verdict, HomogeneityVerdict, NormalityVerdict};
use super::hypothesis::{rank_sum_test, t_test, HypothesisOutcome};
use crate::data::{ArmPair, Dataset, GroupSummary};
use crate::errors::{StatsError, StatsResult};
use crate::outliers::{filter_outliers, FilterReport};
use crate::types::{AnalysisOptions, Arm, Direction, OutlierMethod, TestKind};

/// Minimum observations per arm for any analysis
pub const MIN_ARM_SIZE: usize = 2;

/// Stages of one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    Start,
    Filtered,
    NormalityChecked,
    HomogeneityChecked,
    ParametricTested,
    NonParametricTested,
    Done,
}

impl AnalysisStage {
    /// Stages reachable in one step
    pub fn successors(self) -> &'static [AnalysisStage] {
        use AnalysisStage::*;
        match self {
            Start => &[Filtered, NormalityChecked],
            Filtered => &[NormalityChecked],
            NormalityChecked => &[HomogeneityChecked, NonParametricTested],
            HomogeneityChecked => &[ParametricTested],
            ParametricTested | NonParametricTested => &[Done],
            Done => &[],
        }
    }
}

/// Visited stages of a run, in order
#[derive(Debug)]
struct StageTrace {
    variable: String,
    stages: Vec<AnalysisStage>,
}

impl StageTrace {
    fn start(variable: &str) -> Self {
        debug!("[{}] {:?}", variable, AnalysisStage::Start);
        Self {
            variable: variable.to_string(),
            stages: vec![AnalysisStage::Start],
        }
    }

    fn current(&self) -> AnalysisStage {
        self.stages[self.stages.len() - 1]
    }

    fn advance(&mut self, next: AnalysisStage) {
        debug_assert!(
            self.current().successors().contains(&next),
            "illegal transition {:?} -> {:?}",
            self.current(),
            next
        );
        debug!("[{}] {:?} -> {:?}", self.variable, self.current(), next);
        self.stages.push(next);
    }
}

/// Everything one run decided about one variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub variable: String,
    /// Working-dataset summaries, control first
    pub summaries: [GroupSummary; 2],
    /// Filters applied inside this run
    pub filters: Vec<FilterReport>,
    pub normality: NormalityVerdict,
    /// Absent on the non-normal path
    pub homogeneity: Option<HomogeneityVerdict>,
    pub outcome: HypothesisOutcome,
    pub stages: Vec<AnalysisStage>,
}

impl AnalysisResult {
    pub fn test_kind(&self) -> TestKind {
        self.outcome.kind
    }

    pub fn direction(&self) -> Direction {
        self.outcome.direction
    }

    pub fn statistic(&self) -> f64 {
        self.outcome.test.statistic
    }

    pub fn p_value(&self) -> f64 {
        self.outcome.test.p_value
    }

    pub fn summary(&self, arm: Arm) -> &GroupSummary {
        match arm {
            Arm::Control => &self.summaries[0],
            Arm::Treatment => &self.summaries[1],
        }
    }
}

/// Drives the test-selection workflow over a pair of arms
#[derive(Debug, Clone)]
pub struct Analyzer {
    options: AnalysisOptions,
    arms: ArmPair,
}

impl Analyzer {
    /// Split `dataset` by the configured labels
    pub fn new(dataset: &Dataset, options: AnalysisOptions) -> StatsResult<Self> {
        options.validate()?;
        let arms = dataset.split(&options.labels)?;
        Ok(Self { options, arms })
    }

    /// Analyzer over already-split arms
    pub fn from_arms(arms: ArmPair, options: AnalysisOptions) -> StatsResult<Self> {
        options.validate()?;
        Ok(Self { options, arms })
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub fn arms(&self) -> &ArmPair {
        &self.arms
    }

    /// Union of the current arms
    pub fn working_dataset(&self) -> Dataset {
        self.arms.combine()
    }

    /// Analyzer with `arm` replaced by its filtered partition; the other arm is untouched
    pub fn filter_outliers(
        &self,
        arm: Arm,
        field: &str,
        method: OutlierMethod,
    ) -> StatsResult<(Analyzer, FilterReport)> {
        let outcome = filter_outliers(self.arms.get(arm), field, method)?;
        let analyzer = Analyzer {
            options: self.options.clone(),
            arms: self.arms.clone().with_partition(outcome.partition),
        };
        Ok((analyzer, outcome.report))
    }

    /// Run the workflow once per variable, independently
    pub fn analyze_variables<S: AsRef<str>>(
        &self,
        variables: &[S],
    ) -> StatsResult<Vec<AnalysisResult>> {
        variables
            .iter()
            .map(|v| self.analyze_variable(v.as_ref()))
            .collect()
    }

    /// Run the workflow for one variable
    pub fn analyze_variable(&self, variable: &str) -> StatsResult<AnalysisResult> {
        let opts = &self.options;
        let mut trace = StageTrace::start(variable);
        self.working_dataset().require_variable(variable)?;

        let mut arms = self.arms.clone();
        let mut filters = Vec::new();
        if let Some(policy) = &opts.outlier_policy {
            for &arm in &policy.arms {
                let outcome = filter_outliers(arms.get(arm), variable, policy.method)?;
                arms = arms.with_partition(outcome.partition);
                filters.push(outcome.report);
            }
            trace.advance(AnalysisStage::Filtered);
        }

        let control = arms.control().values(variable)?;
        let treatment = arms.treatment().values(variable)?;
        for (arm, values) in [(Arm::Control, &control), (Arm::Treatment, &treatment)] {
            if values.len() < MIN_ARM_SIZE {
                return Err(StatsError::EmptyPartition {
                    arm,
                    n: values.len(),
                    required: MIN_ARM_SIZE,
                });
            }
        }

        let summaries = arms.combine().summarize(variable, &arms.labels())?;

        let normality = normality_verdict(&control, &treatment, opts.alpha)?;
        trace.advance(AnalysisStage::NormalityChecked);

        let (homogeneity, outcome) = if normality.is_normal {
            let homogeneity =
                homogeneity_verdict(&control, &treatment, opts.alpha, opts.levene_center)?;
            trace.advance(AnalysisStage::HomogeneityChecked);

            let outcome = t_test(&control, &treatment, homogeneity.equal_variance, opts.alpha)?;
            trace.advance(AnalysisStage::ParametricTested);
            (Some(homogeneity), outcome)
        } else {
            let outcome = rank_sum_test(&control, &treatment, opts.alpha, &opts.mann_whitney)?;
            trace.advance(AnalysisStage::NonParametricTested);
            (None, outcome)
        };

        trace.advance(AnalysisStage::Done);

        Ok(AnalysisResult {
            variable: variable.to_string(),
            summaries,
            filters,
            normality,
            homogeneity,
            outcome,
            stages: trace.stages,
        })
    }
}

/// Split `dataset` and analyze one variable
pub fn analyze(
    dataset: &Dataset,
    variable: &str,
    options: AnalysisOptions,
) -> StatsResult<AnalysisResult> {
    Analyzer::new(dataset, options)?.analyze_variable(variable)
}
