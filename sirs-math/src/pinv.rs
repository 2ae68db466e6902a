//! Moore-Penrose pseudo-inverse via singular value decomposition
//!
//! Works for any `nalgebra` scalar whose real field is `f64`, so the same
//! routine serves the real Legendre basis and the complex Fourier basis.

use nalgebra::{ComplexField, DMatrix, SVD};

use crate::error::MathError;

/// Implicit-shift iterations allowed per matrix dimension before the SVD is
/// declared non-convergent.
const SVD_ITERATIONS_PER_DIMENSION: usize = 100;

/// Compute the Moore-Penrose pseudo-inverse of `matrix`.
///
/// Singular values at or below `eps * max(m, n) * sigma_max` are treated as
/// zero, which yields the minimum-norm least-squares operator for
/// rank-deficient or underdetermined systems.
///
/// # Arguments
/// * `matrix` - An `m x n` matrix
///
/// # Returns
/// * `Ok(DMatrix<T>)` - The `n x m` pseudo-inverse
/// * `Err(MathError::Value)` - Empty or non-finite input
/// * `Err(MathError::Numerical)` - SVD did not converge, the matrix is
///   numerically zero, or the result contains non-finite values
pub fn pseudo_inverse<T>(matrix: &DMatrix<T>) -> Result<DMatrix<T>, MathError>
where
    T: ComplexField<RealField = f64> + Copy,
{
    let (nrows, ncols) = matrix.shape();
    if nrows == 0 || ncols == 0 {
        return Err(MathError::Value(format!(
            "cannot invert an empty {nrows}x{ncols} matrix"
        )));
    }
    if !matrix.iter().all(|v| v.is_finite()) {
        return Err(MathError::Value(
            "matrix contains NaN or infinite entries".to_string(),
        ));
    }

    let max_dim = nrows.max(ncols);
    let svd = SVD::try_new(
        matrix.clone(),
        true,
        true,
        f64::EPSILON,
        SVD_ITERATIONS_PER_DIMENSION * max_dim,
    )
    .ok_or_else(|| {
        MathError::Numerical(format!("SVD of {nrows}x{ncols} matrix did not converge"))
    })?;

    let sigma_max = svd.singular_values.iter().copied().fold(0.0, f64::max);
    if sigma_max <= 0.0 || !sigma_max.is_finite() {
        return Err(MathError::Numerical(format!(
            "{nrows}x{ncols} matrix has no usable singular values (max = {sigma_max:e})"
        )));
    }

    let cutoff = f64::EPSILON * max_dim as f64 * sigma_max;
    let rank = svd.rank(cutoff);
    log::debug!(
        "pseudo-inverse: {nrows}x{ncols} matrix, rank {rank}, sigma_max {sigma_max:.3e}, cutoff {cutoff:.3e}"
    );

    let pinv = svd
        .pseudo_inverse(cutoff)
        .map_err(|e| MathError::Numerical(e.to_string()))?;

    if !pinv.iter().all(|v| v.is_finite()) {
        return Err(MathError::Numerical(
            "pseudo-inverse contains non-finite values".to_string(),
        ));
    }

    Ok(pinv)
}
