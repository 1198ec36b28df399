//! Assumption-driven A/B analysis
//!
//! Checks normality and homogeneity of variances on the working dataset, then
//! runs the two-sample test those verdicts call for.

pub mod assumptions;
pub mod hypothesis;
pub mod orchestrator;

pub use assumptions::{
    classify_normality, homogeneity_verdict, normality_verdict, HomogeneityVerdict,
    NormalityVerdict,
};
pub use hypothesis::{direction_for, rank_sum_test, select_test, HypothesisOutcome};
pub use orchestrator::{analyze, AnalysisResult, AnalysisStage, Analyzer, MIN_ARM_SIZE};
