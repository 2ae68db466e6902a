//! One-dimensional linear interpolation.

use crate::error::MathError;

fn validate(xs: &[f64], ys: &[f64]) -> Result<(), MathError> {
    if xs.len() != ys.len() {
        return Err(MathError::Shape(format!(
            "interpolation abscissas ({}) and ordinates ({}) differ in length",
            xs.len(),
            ys.len()
        )));
    }
    if xs.len() < 2 {
        return Err(MathError::Value(
            "interpolation needs at least 2 points".to_string(),
        ));
    }
    if xs.windows(2).any(|w| w[1] < w[0]) {
        return Err(MathError::Value(
            "interpolation abscissas must be sorted in ascending order".to_string(),
        ));
    }
    Ok(())
}

/// Interpolate on already validated data.
fn interp_unchecked(x: f64, xs: &[f64], ys: &[f64]) -> Result<f64, MathError> {
    let n = xs.len();
    if x < xs[0] || x > xs[n - 1] {
        return Err(MathError::Value(format!(
            "value {x} is out of bounds for interpolation range [{}, {}]",
            xs[0],
            xs[n - 1]
        )));
    }

    // Index of the first element > x
    let idx = xs.partition_point(|&val| val <= x);
    if idx == 0 {
        return Ok(ys[0]);
    }
    if idx == n {
        return Ok(ys[n - 1]);
    }

    let (x1, x2) = (xs[idx - 1], xs[idx]);
    let (y1, y2) = (ys[idx - 1], ys[idx]);
    let t = (x - x1) / (x2 - x1);
    Ok(y1 + t * (y2 - y1))
}

/// Linearly interpolate `ys(xs)` at `x`.
///
/// `xs` must be sorted ascending and `x` must lie inside `[xs[0], xs[n-1]]`;
/// extrapolation is an error.
///
/// # Examples
///
/// ```rust
/// use sirs_math::interp;
///
/// let xs = vec![0.0, 1.0, 2.0, 3.0];
/// let ys = vec![0.0, 2.0, 4.0, 6.0];
/// assert_eq!(interp(1.5, &xs, &ys).unwrap(), 3.0);
/// assert_eq!(interp(2.0, &xs, &ys).unwrap(), 4.0);
/// ```
pub fn interp(x: f64, xs: &[f64], ys: &[f64]) -> Result<f64, MathError> {
    validate(xs, ys)?;
    interp_unchecked(x, xs, ys)
}

/// Interpolate at many points, validating the table once.
pub fn interp_slice(points: &[f64], xs: &[f64], ys: &[f64]) -> Result<Vec<f64>, MathError> {
    validate(xs, ys)?;
    points
        .iter()
        .map(|&x| interp_unchecked(x, xs, ys))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interp_midpoints_and_knots() {
        let xs = vec![0.0, 1.0, 4.0];
        let ys = vec![0.0, 10.0, 40.0];
        assert_eq!(interp(0.5, &xs, &ys).unwrap(), 5.0);
        assert_eq!(interp(2.5, &xs, &ys).unwrap(), 25.0);
        assert_eq!(interp(0.0, &xs, &ys).unwrap(), 0.0);
        assert_eq!(interp(4.0, &xs, &ys).unwrap(), 40.0);
    }

    #[test]
    fn test_interp_slice_across_gap() {
        // Rows 3..=5 are missing from the table
        let xs = vec![0.0, 1.0, 2.0, 6.0, 7.0];
        let ys = vec![0.0, 1.0, 2.0, 6.0, 7.0];
        let filled = interp_slice(&[3.0, 4.0, 5.0], &xs, &ys).unwrap();
        assert_eq!(filled, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_interp_errors() {
        let xs = vec![0.0, 1.0];
        let ys = vec![0.0, 1.0];
        assert!(matches!(interp(2.0, &xs, &ys), Err(MathError::Value(_))));
        assert!(matches!(interp(0.5, &xs, &[0.0]), Err(MathError::Shape(_))));
        assert!(matches!(interp(0.5, &[0.0], &[0.0]), Err(MathError::Value(_))));
        assert!(matches!(
            interp(0.5, &[1.0, 0.0], &[0.0, 1.0]),
            Err(MathError::Value(_))
        ));
    }
}
