//! C FFI boundary for abtest-stats
//!
//! This crate provides C-compatible functions over the two-arm analysis
//! pipeline. Every entry point returns `true` on success and fills
//! `out_error` otherwise.

mod types;

pub use types::*;

use abtest_stats_core::{
    filter_outliers, AnalysisOptions, Analyzer, Arm, ArmPair, FilterCondition, Partition,
    StatsError, DEFAULT_ZSCORE_THRESHOLD,
};
use libc::c_char;

/// Field name the C entry points store values under
const VALUE_FIELD: &str = "value";

/// Convert StatsError to ErrorCode
fn error_to_code(err: &StatsError) -> ErrorCode {
    match err {
        StatsError::MissingVariable(_) => ErrorCode::MissingVariable,
        StatsError::EmptyPartition { .. } => ErrorCode::EmptyPartition,
        StatsError::UnknownGroupLabel { .. } => ErrorCode::UnknownGroupLabel,
        StatsError::InvalidAlpha(_) => ErrorCode::InvalidAlpha,
        StatsError::InvalidThreshold(_) => ErrorCode::InvalidThreshold,
        StatsError::InvalidLabels(_) => ErrorCode::InvalidLabels,
        StatsError::InsufficientDataMsg(_) => ErrorCode::InsufficientData,
        StatsError::InvalidInput(_) => ErrorCode::InvalidInput,
        StatsError::DegenerateVariance(_) => ErrorCode::DegenerateVariance,
    }
}

/// Helper to allocate and copy a string
unsafe fn alloc_string(s: &str) -> *mut c_char {
    let len = s.len() + 1;
    let ptr = libc::malloc(len) as *mut c_char;
    if !ptr.is_null() {
        std::ptr::copy_nonoverlapping(s.as_ptr(), ptr as *mut u8, s.len());
        *ptr.add(s.len()) = 0;
    }
    ptr
}

unsafe fn set_error(out_error: *mut AbtestError, code: ErrorCode, msg: &str) {
    if !out_error.is_null() {
        (*out_error).set(code, msg);
    }
}

fn arm_pair(
    control: &[f64],
    treatment: &[f64],
    options: &AnalysisOptions,
) -> Result<ArmPair, StatsError> {
    ArmPair::new(
        Partition::from_values(
            Arm::Control,
            options.labels.control.clone(),
            VALUE_FIELD,
            control,
        ),
        Partition::from_values(
            Arm::Treatment,
            options.labels.treatment.clone(),
            VALUE_FIELD,
            treatment,
        ),
    )
}

/// Run the full test-selection pipeline on two arms
///
/// NULL entries (per the validity mask) and NaN values are ignored.
///
/// # Safety
/// - `control` and `treatment` must be valid DataArrays
/// - `out_result` must be a valid pointer
/// - `out_error` must be a valid pointer
///
/// # Returns
/// `true` on success, `false` on error (check `out_error` for details)
#[no_mangle]
pub unsafe extern "C" fn abtest_analyze(
    control: DataArray,
    treatment: DataArray,
    options: AnalysisOptionsFFI,
    out_result: *mut AnalysisResultFFI,
    out_error: *mut AbtestError,
) -> bool {
    if !out_error.is_null() {
        *out_error = AbtestError::success();
    }

    if out_result.is_null() {
        set_error(out_error, ErrorCode::InvalidInput, "out_result is NULL");
        return false;
    }

    let control_vec = control.to_vec();
    let treatment_vec = treatment.to_vec();
    let opts: AnalysisOptions = options.into();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let arms = arm_pair(&control_vec, &treatment_vec, &opts)?;
        Analyzer::from_arms(arms, opts)?.analyze_variable(VALUE_FIELD)
    }));

    let result = match result {
        Ok(r) => r,
        Err(_) => {
            set_error(out_error, ErrorCode::InternalError, "Internal panic in analysis");
            return false;
        }
    };

    match result {
        Ok(r) => {
            let method = alloc_string(&r.outcome.test.method);
            if method.is_null() {
                set_error(
                    out_error,
                    ErrorCode::AllocationFailure,
                    "Failed to allocate method name",
                );
                return false;
            }
            (*out_result) = AnalysisResultFFI {
                method,
                ..AnalysisResultFFI::from_result(&r)
            };
            true
        }
        Err(e) => {
            set_error(out_error, error_to_code(&e), &e.to_string());
            false
        }
    }
}

/// Filter outliers from a single sample
///
/// `threshold` is only read for the z-score method; a value <= 0 selects
/// the default cutoff of 3.
///
/// # Safety
/// - `values` must be a valid DataArray
/// - `out` must be a valid pointer
/// - `out_error` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn abtest_filter_outliers(
    values: DataArray,
    method: OutlierMethodFFI,
    threshold: f64,
    out: *mut FilteredArrayFFI,
    out_error: *mut AbtestError,
) -> bool {
    if !out_error.is_null() {
        *out_error = AbtestError::success();
    }

    if out.is_null() {
        set_error(out_error, ErrorCode::InvalidInput, "out is NULL");
        return false;
    }

    let threshold = if threshold > 0.0 {
        threshold
    } else {
        DEFAULT_ZSCORE_THRESHOLD
    };
    let Some(method) = method.to_method(threshold) else {
        set_error(out_error, ErrorCode::InvalidInput, "no outlier method selected");
        return false;
    };

    let values_vec = values.to_vec();
    let partition = Partition::from_values(Arm::Control, "sample", VALUE_FIELD, &values_vec);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let outcome = filter_outliers(&partition, VALUE_FIELD, method)?;
        let kept = outcome.partition.values(VALUE_FIELD)?;
        Ok::<_, StatsError>((kept, outcome.report))
    }));

    let (kept, report) = match result {
        Ok(Ok(r)) => r,
        Ok(Err(e)) => {
            set_error(out_error, error_to_code(&e), &e.to_string());
            return false;
        }
        Err(_) => {
            set_error(
                out_error,
                ErrorCode::InternalError,
                "Internal panic in outlier filter",
            );
            return false;
        }
    };

    let data = if kept.is_empty() {
        std::ptr::null_mut()
    } else {
        let ptr = libc::malloc(kept.len() * std::mem::size_of::<f64>()) as *mut f64;
        if ptr.is_null() {
            set_error(
                out_error,
                ErrorCode::AllocationFailure,
                "Failed to allocate filtered values",
            );
            return false;
        }
        std::ptr::copy_nonoverlapping(kept.as_ptr(), ptr, kept.len());
        ptr
    };

    (*out) = FilteredArrayFFI {
        data,
        len: kept.len(),
        removed: report.removed,
        null_count: values_vec.iter().filter(|v| v.is_nan()).count(),
        lower_bound: report.lower_bound,
        upper_bound: report.upper_bound,
        zero_variance: report.condition == Some(FilterCondition::ZeroVariance),
    };
    true
}

/// Free memory allocated by `abtest_analyze`
///
/// # Safety
/// - `result` must be NULL or a valid pointer to an AnalysisResultFFI
#[no_mangle]
pub unsafe extern "C" fn abtest_free_analysis_result(result: *mut AnalysisResultFFI) {
    if result.is_null() {
        return;
    }
    if !(*result).method.is_null() {
        libc::free((*result).method as *mut libc::c_void);
        (*result).method = std::ptr::null_mut();
    }
}

/// Free memory allocated by `abtest_filter_outliers`
///
/// # Safety
/// - `result` must be NULL or a valid pointer to a FilteredArrayFFI
#[no_mangle]
pub unsafe extern "C" fn abtest_free_filtered(result: *mut FilteredArrayFFI) {
    if result.is_null() {
        return;
    }
    if !(*result).data.is_null() {
        libc::free((*result).data as *mut libc::c_void);
        (*result).data = std::ptr::null_mut();
        (*result).len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::ffi::CStr;

    #[test]
    fn test_analyze_separated_arms() {
        let control = [9.8, 10.1, 10.0, 9.9, 10.2, 10.0, 9.7, 10.3, 10.1, 9.9];
        let treatment = [12.1, 11.8, 12.0, 12.2, 11.9, 12.0, 12.3, 11.7, 12.1, 11.9];
        let mut out = AnalysisResultFFI::default();
        let mut err = AbtestError::success();

        let ok = unsafe {
            abtest_analyze(
                DataArray::from_slice(&control),
                DataArray::from_slice(&treatment),
                AnalysisOptionsFFI::default(),
                &mut out,
                &mut err,
            )
        };

        assert!(ok, "{}", err.message());
        assert_eq!(err.code, ErrorCode::Success);
        assert_eq!(out.direction, DirectionFFI::TreatmentGreater);
        assert!(out.significant);
        assert!(out.p_value < 0.001);
        assert_eq!(out.control_n, 10);
        assert_relative_eq!(out.control_mean, 10.0, epsilon = 1e-9);
        assert!(!out.method.is_null());
        let method = unsafe { CStr::from_ptr(out.method) }.to_str().unwrap();
        assert!(method.contains("t-test") || method.contains("Mann-Whitney"));

        unsafe { abtest_free_analysis_result(&mut out) };
        assert!(out.method.is_null());
    }

    #[test]
    fn test_analyze_validity_mask_drops_nulls() {
        // Bit 3 cleared: the 1000.0 is NULL
        let control = [1.0, 2.0, 3.0, 1000.0, 4.0, 5.0];
        let mask = [0b0011_0111u8];
        let treatment = [1.5, 2.5, 3.5, 4.5, 5.5];
        let mut out = AnalysisResultFFI::default();
        let mut err = AbtestError::success();

        let ok = unsafe {
            abtest_analyze(
                DataArray {
                    data: control.as_ptr(),
                    validity: mask.as_ptr(),
                    len: control.len(),
                },
                DataArray::from_slice(&treatment),
                AnalysisOptionsFFI::default(),
                &mut out,
                &mut err,
            )
        };

        assert!(ok, "{}", err.message());
        assert_eq!(out.control_n, 5);
        assert_relative_eq!(out.control_mean, 3.0, epsilon = 1e-12);
        assert_eq!(out.direction, DirectionFFI::NoSignificantDifference);
        assert!(!out.significant);
        unsafe { abtest_free_analysis_result(&mut out) };
    }

    #[test]
    fn test_analyze_reports_empty_partition() {
        let control = [1.0];
        let treatment = [1.0, 2.0, 3.0];
        let mut out = AnalysisResultFFI::default();
        let mut err = AbtestError::success();

        let ok = unsafe {
            abtest_analyze(
                DataArray::from_slice(&control),
                DataArray::from_slice(&treatment),
                AnalysisOptionsFFI::default(),
                &mut out,
                &mut err,
            )
        };

        assert!(!ok);
        assert_eq!(err.code, ErrorCode::EmptyPartition);
        assert!(err.message().contains("control arm"));
        assert!(out.method.is_null());
    }

    #[test]
    fn test_analyze_rejects_bad_alpha() {
        let data = [1.0, 2.0, 3.0];
        let mut out = AnalysisResultFFI::default();
        let mut err = AbtestError::success();
        let options = AnalysisOptionsFFI {
            alpha: 0.0,
            ..Default::default()
        };

        let ok = unsafe {
            abtest_analyze(
                DataArray::from_slice(&data),
                DataArray::from_slice(&data),
                options,
                &mut out,
                &mut err,
            )
        };
        assert!(!ok);
        assert_eq!(err.code, ErrorCode::InvalidAlpha);
    }

    #[test]
    fn test_analyze_null_out_result() {
        let data = [1.0, 2.0, 3.0];
        let mut err = AbtestError::success();
        let ok = unsafe {
            abtest_analyze(
                DataArray::from_slice(&data),
                DataArray::from_slice(&data),
                AnalysisOptionsFFI::default(),
                std::ptr::null_mut(),
                &mut err,
            )
        };
        assert!(!ok);
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn test_filter_iqr() {
        let values = [1.0, 2.0, 3.0, 4.0, 100.0];
        let mut out = FilteredArrayFFI::default();
        let mut err = AbtestError::success();

        let ok = unsafe {
            abtest_filter_outliers(
                DataArray::from_slice(&values),
                OutlierMethodFFI::Iqr,
                0.0,
                &mut out,
                &mut err,
            )
        };

        assert!(ok, "{}", err.message());
        assert_eq!(out.len, 4);
        assert_eq!(out.removed, 1);
        assert_relative_eq!(out.lower_bound, -1.0);
        assert_relative_eq!(out.upper_bound, 7.0);
        let kept = unsafe { std::slice::from_raw_parts(out.data, out.len) };
        assert_eq!(kept, &[1.0, 2.0, 3.0, 4.0]);

        unsafe { abtest_free_filtered(&mut out) };
        assert!(out.data.is_null());
    }

    #[test]
    fn test_filter_counts_nulls_separately() {
        // Bits 1 and 4 cleared: 7.0 and 8.0 are NULL
        let values = [1.0, 7.0, 2.0, 3.0, 8.0, 4.0, 100.0];
        let mask = [0b0110_1101u8];
        let mut out = FilteredArrayFFI::default();
        let mut err = AbtestError::success();

        let ok = unsafe {
            abtest_filter_outliers(
                DataArray {
                    data: values.as_ptr(),
                    validity: mask.as_ptr(),
                    len: values.len(),
                },
                OutlierMethodFFI::Iqr,
                0.0,
                &mut out,
                &mut err,
            )
        };

        assert!(ok, "{}", err.message());
        assert_eq!(out.len, 4);
        assert_eq!(out.removed, 1);
        assert_eq!(out.null_count, 2);
        unsafe { abtest_free_filtered(&mut out) };
    }

    #[test]
    fn test_filter_zscore_zero_variance() {
        let values = [5.0; 6];
        let mut out = FilteredArrayFFI::default();
        let mut err = AbtestError::success();

        let ok = unsafe {
            abtest_filter_outliers(
                DataArray::from_slice(&values),
                OutlierMethodFFI::ZScore,
                3.0,
                &mut out,
                &mut err,
            )
        };

        assert!(ok);
        assert!(out.zero_variance);
        assert_eq!(out.len, 6);
        unsafe { abtest_free_filtered(&mut out) };
    }

    #[test]
    fn test_filter_requires_method() {
        let values = [1.0, 2.0];
        let mut out = FilteredArrayFFI::default();
        let mut err = AbtestError::success();
        let ok = unsafe {
            abtest_filter_outliers(
                DataArray::from_slice(&values),
                OutlierMethodFFI::None,
                3.0,
                &mut out,
                &mut err,
            )
        };
        assert!(!ok);
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn test_error_message_truncated() {
        let mut err = AbtestError::success();
        err.set(ErrorCode::InvalidInput, &"x".repeat(1000));
        assert_eq!(err.message().len(), 255);
    }
}
