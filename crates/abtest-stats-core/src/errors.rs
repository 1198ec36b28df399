use thiserror::Error;

use crate::types::Arm;

/// Errors that can occur while splitting, filtering or testing experiment data
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    // Dataset errors
    #[error("Missing variable: column '{0}' is not present in the dataset")]
    MissingVariable(String),

    #[error("Empty partition: {arm} arm has {n} observations (need at least {required})")]
    EmptyPartition { arm: Arm, n: usize, required: usize },

    #[error("Unknown group label '{label}' at row {row}")]
    UnknownGroupLabel { label: String, row: usize },

    // Input validation errors
    #[error("Invalid alpha parameter: {0} (must be in (0, 1))")]
    InvalidAlpha(f64),

    #[error("Invalid outlier threshold: {0} (must be finite and > 0)")]
    InvalidThreshold(f64),

    #[error("Invalid group labels: {0}")]
    InvalidLabels(String),

    #[error("Insufficient data: {0}")]
    InsufficientDataMsg(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Numerical errors
    #[error("Degenerate variance: {0}")]
    DegenerateVariance(String),
}

/// Result type for statistical operations
pub type StatsResult<T> = Result<T, StatsError>;
