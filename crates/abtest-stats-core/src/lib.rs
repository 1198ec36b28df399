//! abtest-stats-core: two-sample A/B test selection
//!
//! Splits a dataset into control and treatment arms, optionally filters
//! outliers, checks the parametric assumptions and runs the matching test:
//! Student's t, Welch's t or Mann-Whitney U.

pub mod analysis;
pub mod data;
pub mod descriptive;
pub mod errors;
pub mod outliers;
pub mod tests;
pub mod types;

pub use analysis::{analyze, AnalysisResult, AnalysisStage, Analyzer};
pub use data::{ArmPair, Dataset, GroupSummary, Observation, Partition};
pub use errors::{StatsError, StatsResult};
pub use outliers::{filter_outliers, FilterCondition, FilterOutcome, FilterReport};
pub use tests::TestResult;
pub use types::*;
