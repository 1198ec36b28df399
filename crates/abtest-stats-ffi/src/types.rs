//! C-compatible types for FFI boundary

use abtest_stats_core::{
    AnalysisOptions, AnalysisResult, Arm, Direction, LeveneCenter, MannWhitneyMethod,
    MannWhitneyOptions, OutlierMethod, OutlierPolicy, TestKind, DEFAULT_ALPHA,
    DEFAULT_ZSCORE_THRESHOLD,
};
use libc::c_char;

/// Error codes for FFI boundary
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    InvalidInput = 1,
    MissingVariable = 2,
    EmptyPartition = 3,
    UnknownGroupLabel = 4,
    InvalidAlpha = 5,
    InvalidThreshold = 6,
    InvalidLabels = 7,
    InsufficientData = 8,
    DegenerateVariance = 9,
    AllocationFailure = 11,
    InternalError = 99,
}

/// Error information for FFI
#[repr(C)]
pub struct AbtestError {
    pub code: ErrorCode,
    pub message: [c_char; 256],
}

impl AbtestError {
    pub fn success() -> Self {
        Self {
            code: ErrorCode::Success,
            message: [0; 256],
        }
    }

    /// Store `code` and a NUL-terminated copy of `msg`, truncated to 255 bytes
    pub fn set(&mut self, code: ErrorCode, msg: &str) {
        self.code = code;
        let bytes = msg.as_bytes();
        let len = bytes.len().min(self.message.len() - 1);
        for (dst, &b) in self.message.iter_mut().zip(&bytes[..len]) {
            *dst = b as c_char;
        }
        self.message[len] = 0;
    }

    /// Message as a Rust string (lossy)
    pub fn message(&self) -> String {
        let bytes: Vec<u8> = self
            .message
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Array of f64 values with validity mask for NULL handling
#[repr(C)]
pub struct DataArray {
    /// Pointer to data values
    pub data: *const f64,
    /// Validity bitmask: bit i is 1 if data[i] is valid, 0 if NULL
    /// Can be NULL if all values are valid
    pub validity: *const u8,
    /// Number of elements
    pub len: usize,
}

impl DataArray {
    /// Array over a Rust slice with every value valid
    pub fn from_slice(values: &[f64]) -> Self {
        Self {
            data: values.as_ptr(),
            validity: std::ptr::null(),
            len: values.len(),
        }
    }

    /// Check if index i is valid (not NULL)
    ///
    /// # Safety
    /// Caller must ensure index is within bounds
    pub unsafe fn is_valid(&self, i: usize) -> bool {
        if self.validity.is_null() {
            return true;
        }
        ((*self.validity.add(i / 8)) >> (i % 8)) & 1 == 1
    }

    /// Convert to Vec<f64>, replacing NULL with NaN
    ///
    /// # Safety
    /// Caller must ensure pointers are valid and len is correct
    pub unsafe fn to_vec(&self) -> Vec<f64> {
        if self.data.is_null() || self.len == 0 {
            return Vec::new();
        }
        (0..self.len)
            .map(|i| {
                if self.is_valid(i) {
                    *self.data.add(i)
                } else {
                    f64::NAN
                }
            })
            .collect()
    }
}

/// Outlier filter applied before the normality stage
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlierMethodFFI {
    None = 0,
    Iqr = 1,
    ZScore = 2,
}

impl OutlierMethodFFI {
    /// Core method, or `None` when no filtering is requested
    pub fn to_method(self, zscore_threshold: f64) -> Option<OutlierMethod> {
        match self {
            OutlierMethodFFI::None => None,
            OutlierMethodFFI::Iqr => Some(OutlierMethod::Iqr),
            OutlierMethodFFI::ZScore => Some(OutlierMethod::ZScore {
                threshold: zscore_threshold,
            }),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeveneCenterFFI {
    Mean = 0,
    Median = 1,
}

impl From<LeveneCenterFFI> for LeveneCenter {
    fn from(c: LeveneCenterFFI) -> Self {
        match c {
            LeveneCenterFFI::Mean => LeveneCenter::Mean,
            LeveneCenterFFI::Median => LeveneCenter::Median,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MannWhitneyMethodFFI {
    Auto = 0,
    Exact = 1,
    Asymptotic = 2,
}

impl From<MannWhitneyMethodFFI> for MannWhitneyMethod {
    fn from(m: MannWhitneyMethodFFI) -> Self {
        match m {
            MannWhitneyMethodFFI::Auto => MannWhitneyMethod::Auto,
            MannWhitneyMethodFFI::Exact => MannWhitneyMethod::Exact,
            MannWhitneyMethodFFI::Asymptotic => MannWhitneyMethod::Asymptotic,
        }
    }
}

/// Options for `abtest_analyze`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptionsFFI {
    /// Significance level for every stage
    pub alpha: f64,
    /// Filter applied to both arms before testing
    pub outlier_method: OutlierMethodFFI,
    /// |z| cutoff, used when `outlier_method` is ZScore
    pub zscore_threshold: f64,
    pub levene_center: LeveneCenterFFI,
    pub mann_whitney_method: MannWhitneyMethodFFI,
    pub continuity_correction: bool,
}

impl Default for AnalysisOptionsFFI {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            outlier_method: OutlierMethodFFI::None,
            zscore_threshold: DEFAULT_ZSCORE_THRESHOLD,
            levene_center: LeveneCenterFFI::Median,
            mann_whitney_method: MannWhitneyMethodFFI::Auto,
            continuity_correction: true,
        }
    }
}

impl From<AnalysisOptionsFFI> for AnalysisOptions {
    fn from(o: AnalysisOptionsFFI) -> Self {
        AnalysisOptions {
            alpha: o.alpha,
            levene_center: o.levene_center.into(),
            mann_whitney: MannWhitneyOptions {
                method: o.mann_whitney_method.into(),
                continuity_correction: o.continuity_correction,
            },
            outlier_policy: o
                .outlier_method
                .to_method(o.zscore_threshold)
                .map(OutlierPolicy::both),
            ..AnalysisOptions::default()
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKindFFI {
    StudentT = 0,
    WelchT = 1,
    MannWhitneyU = 2,
}

impl From<TestKind> for TestKindFFI {
    fn from(k: TestKind) -> Self {
        match k {
            TestKind::StudentT => TestKindFFI::StudentT,
            TestKind::WelchT => TestKindFFI::WelchT,
            TestKind::MannWhitneyU => TestKindFFI::MannWhitneyU,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionFFI {
    NoSignificantDifference = 0,
    ControlGreater = 1,
    TreatmentGreater = 2,
}

impl From<Direction> for DirectionFFI {
    fn from(d: Direction) -> Self {
        match d {
            Direction::NoSignificantDifference => DirectionFFI::NoSignificantDifference,
            Direction::ControlGreater => DirectionFFI::ControlGreater,
            Direction::TreatmentGreater => DirectionFFI::TreatmentGreater,
        }
    }
}

/// Arm flagged by the normality stage, if any
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlierFlagFFI {
    None = 0,
    Control = 1,
    Treatment = 2,
}

impl From<Option<Arm>> for OutlierFlagFFI {
    fn from(arm: Option<Arm>) -> Self {
        match arm {
            None => OutlierFlagFFI::None,
            Some(Arm::Control) => OutlierFlagFFI::Control,
            Some(Arm::Treatment) => OutlierFlagFFI::Treatment,
        }
    }
}

/// Flattened analysis result
#[repr(C)]
pub struct AnalysisResultFFI {
    pub test_kind: TestKindFFI,
    pub direction: DirectionFFI,
    /// p <= alpha for the final test
    pub significant: bool,
    /// t for the t-tests, U of the control arm for Mann-Whitney
    pub statistic: f64,
    pub p_value: f64,
    /// Degrees of freedom (NaN for Mann-Whitney)
    pub df: f64,
    /// Mean (t-tests) or median (Mann-Whitney) per arm
    pub control_center: f64,
    pub treatment_center: f64,
    /// Working-dataset sizes
    pub control_n: usize,
    pub treatment_n: usize,
    pub control_mean: f64,
    pub treatment_mean: f64,
    pub control_median: f64,
    pub treatment_median: f64,
    pub control_std: f64,
    pub treatment_std: f64,
    /// Rows removed by the configured filter
    pub control_removed: usize,
    pub treatment_removed: usize,
    pub shapiro_w_control: f64,
    pub shapiro_p_control: f64,
    pub shapiro_w_treatment: f64,
    pub shapiro_p_treatment: f64,
    pub is_normal: bool,
    pub possible_outliers: OutlierFlagFFI,
    /// Whether Levene's test ran
    pub homogeneity_checked: bool,
    /// NaN when Levene's test was skipped
    pub levene_statistic: f64,
    /// NaN when Levene's test was skipped
    pub levene_p_value: f64,
    pub equal_variance: bool,
    /// Name of the final test (must be freed)
    pub method: *mut c_char,
}

impl Default for AnalysisResultFFI {
    fn default() -> Self {
        Self {
            test_kind: TestKindFFI::StudentT,
            direction: DirectionFFI::NoSignificantDifference,
            significant: false,
            statistic: f64::NAN,
            p_value: f64::NAN,
            df: f64::NAN,
            control_center: f64::NAN,
            treatment_center: f64::NAN,
            control_n: 0,
            treatment_n: 0,
            control_mean: f64::NAN,
            treatment_mean: f64::NAN,
            control_median: f64::NAN,
            treatment_median: f64::NAN,
            control_std: f64::NAN,
            treatment_std: f64::NAN,
            control_removed: 0,
            treatment_removed: 0,
            shapiro_w_control: f64::NAN,
            shapiro_p_control: f64::NAN,
            shapiro_w_treatment: f64::NAN,
            shapiro_p_treatment: f64::NAN,
            is_normal: false,
            possible_outliers: OutlierFlagFFI::None,
            homogeneity_checked: false,
            levene_statistic: f64::NAN,
            levene_p_value: f64::NAN,
            equal_variance: false,
            method: std::ptr::null_mut(),
        }
    }
}

impl AnalysisResultFFI {
    /// Copy every scalar out of `result`; `method` is left for the caller to allocate
    pub fn from_result(result: &AnalysisResult) -> Self {
        let control = result.summary(Arm::Control);
        let treatment = result.summary(Arm::Treatment);
        let removed = |arm: Arm| -> usize {
            result
                .filters
                .iter()
                .filter(|f| f.arm == arm)
                .map(|f| f.removed)
                .sum()
        };
        let normality = &result.normality;

        Self {
            test_kind: result.test_kind().into(),
            direction: result.direction().into(),
            significant: result.direction().is_significant(),
            statistic: result.statistic(),
            p_value: result.p_value(),
            df: result.outcome.test.df,
            control_center: result.outcome.control_center,
            treatment_center: result.outcome.treatment_center,
            control_n: control.count,
            treatment_n: treatment.count,
            control_mean: control.mean,
            treatment_mean: treatment.mean,
            control_median: control.median,
            treatment_median: treatment.median,
            control_std: control.std,
            treatment_std: treatment.std,
            control_removed: removed(Arm::Control),
            treatment_removed: removed(Arm::Treatment),
            shapiro_w_control: normality.control.statistic,
            shapiro_p_control: normality.p_control(),
            shapiro_w_treatment: normality.treatment.statistic,
            shapiro_p_treatment: normality.p_treatment(),
            is_normal: normality.is_normal,
            possible_outliers: normality.possible_outliers.into(),
            homogeneity_checked: result.homogeneity.is_some(),
            levene_statistic: result
                .homogeneity
                .as_ref()
                .map_or(f64::NAN, |h| h.test.statistic),
            levene_p_value: result
                .homogeneity
                .as_ref()
                .map_or(f64::NAN, |h| h.test.p_value),
            equal_variance: result.homogeneity.as_ref().is_some_and(|h| h.equal_variance),
            method: std::ptr::null_mut(),
        }
    }
}

/// Values kept by `abtest_filter_outliers`
#[repr(C)]
pub struct FilteredArrayFFI {
    /// Kept values in input order (must be freed)
    pub data: *mut f64,
    pub len: usize,
    /// Values outside the bounds; NULL/NaN inputs are counted in `null_count`
    pub removed: usize,
    pub null_count: usize,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// True when the z-score filter saw zero spread and kept everything
    pub zero_variance: bool,
}

impl Default for FilteredArrayFFI {
    fn default() -> Self {
        Self {
            data: std::ptr::null_mut(),
            len: 0,
            removed: 0,
            null_count: 0,
            lower_bound: f64::NAN,
            upper_bound: f64::NAN,
            zero_variance: false,
        }
    }
}
