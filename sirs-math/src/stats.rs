//! Robust statistics

use crate::error::MathError;

/// Mean of `values` after discarding the `discard` lowest and highest samples.
///
/// The trim is clamped so that at least one sample always survives; a
/// discard count of zero gives the plain mean. NaN values are rejected rather
/// than silently sorted to one end.
///
/// # Arguments
/// * `values` - Samples to average
/// * `discard` - Number of samples to drop from each end of the sorted data
///
/// # Returns
/// * `Ok(f64)` - The trimmed mean
/// * `Err(MathError::Value)` - If `values` is empty or contains NaN
pub fn trimmed_mean(values: &[f64], discard: usize) -> Result<f64, MathError> {
    if values.is_empty() {
        return Err(MathError::Value(
            "cannot compute a trimmed mean of no samples".to_string(),
        ));
    }
    if values.iter().any(|v| v.is_nan()) {
        return Err(MathError::Value(format!(
            "trimmed mean input of {} samples contains NaN",
            values.len()
        )));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let discard = discard.min((sorted.len() - 1) / 2);
    let kept = &sorted[discard..sorted.len() - discard];
    Ok(kept.iter().sum::<f64>() / kept.len() as f64)
}
