//! Rolling statistics over close prices.
//!
//! All functions are pure f64 arithmetic over their inputs, so identical
//! inputs always yield bit-identical outputs.

use statrs::statistics::{Data, Distribution};

/// One-bar log returns, ln(c_t / c_{t-1}). Output is one shorter than the
/// input; `returns[i]` belongs to bar `i + 1`.
pub fn log_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 && w[1] > 0.0 {
                (w[1] / w[0]).ln()
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// One-bar percentage returns, aligned like `log_returns`.
pub fn pct_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { f64::NAN })
        .collect()
}

/// Sample mean and standard deviation of a window (f64 boundary for the
/// statistical library).
pub fn mean_std(window: &[f64]) -> Option<(f64, f64)> {
    if window.len() < 2 {
        return None;
    }
    let data = Data::new(window.to_vec());
    let mean = data.mean()?;
    let std_dev = data.std_dev()?;
    Some((mean, std_dev))
}

/// Sample standard deviation of the trailing `window` values ending at
/// `end` (inclusive).
pub fn trailing_std(values: &[f64], window: usize, end: usize) -> Option<f64> {
    if window < 2 || end + 1 < window || end >= values.len() {
        return None;
    }
    let slice = &values[end + 1 - window..=end];
    mean_std(slice).map(|(_, std)| std)
}

/// Z-score of `values[end]` within the trailing `window` ending at `end`.
/// A flat window (zero std) yields 0.0 rather than poisoning the vector.
pub fn trailing_zscore(values: &[f64], window: usize, end: usize) -> Option<f64> {
    if window < 2 || end + 1 < window || end >= values.len() {
        return None;
    }
    let slice = &values[end + 1 - window..=end];
    let (mean, std) = mean_std(slice)?;
    if std == 0.0 {
        return Some(0.0);
    }
    Some((values[end] - mean) / std)
}
