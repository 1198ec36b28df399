//! Descriptive statistics shared by the filters, tests and summaries

use std::cmp::Ordering;

/// Arithmetic mean (NaN for empty input)
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Variance with `ddof` delta degrees of freedom (0 = population, 1 = sample)
pub fn variance(data: &[f64], ddof: usize) -> f64 {
    let n = data.len();
    if n <= ddof {
        return f64::NAN;
    }
    let m = mean(data);
    data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - ddof) as f64
}

/// Standard deviation with `ddof` delta degrees of freedom
pub fn std_dev(data: &[f64], ddof: usize) -> f64 {
    variance(data, ddof).sqrt()
}

/// Sorted copy of the data
pub fn sorted(data: &[f64]) -> Vec<f64> {
    let mut v = data.to_vec();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    v
}

/// Median (NaN for empty input)
pub fn median(data: &[f64]) -> f64 {
    quantile(data, 0.5)
}

/// Quantile with linear interpolation between order statistics.
///
/// The position of quantile `q` is `q * (n - 1)` in the sorted data.
pub fn quantile(data: &[f64], q: f64) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    quantile_sorted(&sorted(data), q)
}

/// [`quantile`] over data that is already sorted ascending
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
