//! Up-the-ramp Legendre fitting
//!
//! Non-destructive reads sample each pixel's accumulated charge `nsamp` times
//! during an exposure. The ramp is fitted with Legendre polynomials of the
//! sample time mapped onto `[-1, 1]`; because the basis is orthogonal, the
//! degree-1 coefficient carries the accumulated signal directly.
//!
//! # Usage
//!
//! ```rust
//! use ndarray::Array3;
//! use sirs::ramp::{RampFitter, RampModel};
//!
//! let model = RampModel::build(10, 2).unwrap();
//! let fitter = RampFitter::new(model);
//! let ramps = Array3::from_shape_fn((10, 2, 2), |(i, _, _)| 100.0 + 5.0 * i as f64);
//! let coefficients = fitter.fit(&ramps).unwrap();
//! assert_eq!(coefficients.dim(), (3, 2, 2));
//! ```

use nalgebra::DMatrix;
use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};
use sirs_math::{legendre_basis, pseudo_inverse};

use crate::error::{Result, SirsError};

/// Mapping of sample index to Legendre abscissa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RampAbscissa {
    /// `x_i = 2i/nsamp - 1` for `i = 1..=nsamp`. The reset read sits at `x = -1`
    /// and is not part of the data.
    #[default]
    VirtualReset,
    /// `x_i = 2i/(nsamp - 1) - 1` for `i = 0..nsamp`, first and last sample at the interval ends.
    Endpoints,
}

impl RampAbscissa {
    pub fn abscissas(&self, nsamp: usize) -> Vec<f64> {
        let n = self.intervals(nsamp) as f64;
        let first = match self {
            RampAbscissa::VirtualReset => 1,
            RampAbscissa::Endpoints => 0,
        };
        (first..first + nsamp)
            .map(|i| 2.0 * i as f64 / n - 1.0)
            .collect()
    }

    /// Sample intervals spanned by `[-1, 1]`.
    pub fn intervals(&self, nsamp: usize) -> usize {
        match self {
            RampAbscissa::VirtualReset => nsamp,
            RampAbscissa::Endpoints => nsamp.saturating_sub(1),
        }
    }
}

/// Legendre basis, its pseudo-inverse and the resulting modeling matrix.
#[derive(Debug, Clone)]
pub struct RampModel {
    nsamp: usize,
    degree: usize,
    abscissa: RampAbscissa,
    basis: Array2<f64>,
    pinv: Array2<f64>,
    modeling: Array2<f64>,
}

fn to_ndarray(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn(m.shape(), |(i, j)| m[(i, j)])
}

impl RampModel {
    /// Build a model over the default virtual-reset abscissa.
    pub fn build(nsamp: usize, degree: usize) -> Result<Self> {
        Self::build_with_abscissa(nsamp, degree, RampAbscissa::default())
    }

    /// Build a model of `degree` for ramps of `nsamp` samples.
    ///
    /// # Returns
    /// * `Err(SirsError::Value)` if `nsamp == 0`, `degree == 0` or `degree + 1 > nsamp`
    pub fn build_with_abscissa(nsamp: usize, degree: usize, abscissa: RampAbscissa) -> Result<Self> {
        if nsamp == 0 {
            return Err(SirsError::Value("ramp needs at least one sample".to_string()));
        }
        if degree == 0 {
            return Err(SirsError::Value(
                "ramp model degree must be at least 1 to carry a slope".to_string(),
            ));
        }
        if degree + 1 > nsamp {
            return Err(SirsError::Value(format!(
                "degree {degree} needs at least {} samples, got {nsamp}",
                degree + 1
            )));
        }

        let xs = abscissa.abscissas(nsamp);
        let basis = legendre_basis(&xs, degree);
        let pinv = pseudo_inverse(&basis)?;
        let modeling = &basis * &pinv;

        log::debug!("ramp model: {nsamp} samples, degree {degree}, {abscissa:?} abscissa");

        Ok(Self {
            nsamp,
            degree,
            abscissa,
            basis: to_ndarray(&basis),
            pinv: to_ndarray(&pinv),
            modeling: to_ndarray(&modeling),
        })
    }

    pub fn nsamp(&self) -> usize {
        self.nsamp
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn abscissa(&self) -> RampAbscissa {
        self.abscissa
    }

    /// `[nsamp, degree + 1]`
    pub fn basis(&self) -> &Array2<f64> {
        &self.basis
    }

    /// `[degree + 1, nsamp]`
    pub fn pinv(&self) -> &Array2<f64> {
        &self.pinv
    }

    /// `basis · pinv`, `[nsamp, nsamp]`
    pub fn modeling_matrix(&self) -> &Array2<f64> {
        &self.modeling
    }

    /// Ramps described by a coefficient cube `[degree + 1, row, column]`.
    pub fn evaluate(&self, coefficients: &Array3<f64>) -> Result<Array3<f64>> {
        apply_along_samples(&self.basis, coefficients, "coefficient")
    }
}

/// Contract `matrix` with the leading axis of `cube`.
fn apply_along_samples(matrix: &Array2<f64>, cube: &Array3<f64>, what: &str) -> Result<Array3<f64>> {
    let (n, nrows, ncols) = cube.dim();
    if n != matrix.ncols() {
        return Err(SirsError::Shape(format!(
            "{what} cube has {n} planes, model expects {}",
            matrix.ncols()
        )));
    }
    let flat = Array2::from_shape_vec((n, nrows * ncols), cube.iter().copied().collect())
        .map_err(|e| SirsError::Shape(e.to_string()))?;
    let product = matrix.dot(&flat);
    Array3::from_shape_vec(
        (matrix.nrows(), nrows, ncols),
        product.iter().copied().collect(),
    )
    .map_err(|e| SirsError::Shape(e.to_string()))
}

/// Fits ramp cubes `[sample, row, column]` with a prebuilt [`RampModel`].
#[derive(Debug, Clone)]
pub struct RampFitter {
    model: RampModel,
}

impl RampFitter {
    pub fn new(model: RampModel) -> Self {
        Self { model }
    }

    pub fn ramp_model(&self) -> &RampModel {
        &self.model
    }

    /// Legendre coefficients `[degree + 1, row, column]` of every pixel ramp.
    pub fn fit(&self, ramps: &Array3<f64>) -> Result<Array3<f64>> {
        apply_along_samples(&self.model.pinv, ramps, "ramp")
    }

    /// Best-fit ramps, same shape as `ramps`.
    pub fn model(&self, ramps: &Array3<f64>) -> Result<Array3<f64>> {
        apply_along_samples(&self.model.modeling, ramps, "ramp")
    }

    /// Counts accumulated across the ramp, `2 · c1`.
    pub fn integrated_counts(&self, coefficients: &Array3<f64>) -> Result<Array2<f64>> {
        let expected = self.model.degree + 1;
        if coefficients.len_of(Axis(0)) != expected {
            return Err(SirsError::Shape(format!(
                "coefficient cube has {} planes, model has {expected}",
                coefficients.len_of(Axis(0))
            )));
        }
        Ok(coefficients.index_axis(Axis(0), 1).mapv(|c| 2.0 * c))
    }

    /// Signal rate `2 · c1 / (nsamp - 1)`.
    pub fn signal_rate(&self, coefficients: &Array3<f64>) -> Result<Array2<f64>> {
        let reads = self.model.nsamp.saturating_sub(1).max(1) as f64;
        Ok(self.integrated_counts(coefficients)? / reads)
    }

    /// Counts per sample interval of the model's abscissa: `2 · c1 / nsamp`
    /// for [`RampAbscissa::VirtualReset`], `2 · c1 / (nsamp - 1)` for
    /// [`RampAbscissa::Endpoints`].
    pub fn rate_per_interval(&self, coefficients: &Array3<f64>) -> Result<Array2<f64>> {
        let intervals = self.model.abscissa.intervals(self.model.nsamp) as f64;
        Ok(self.integrated_counts(coefficients)? / intervals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn linear_ramps(nsamp: usize) -> Array3<f64> {
        Array3::from_shape_fn((nsamp, 3, 2), |(i, r, c)| {
            100.0 + (r * 2 + c) as f64 + 5.0 * i as f64
        })
    }

    #[test]
    fn test_abscissas() {
        assert_eq!(
            RampAbscissa::VirtualReset.abscissas(4),
            vec![-0.5, 0.0, 0.5, 1.0]
        );
        let x = RampAbscissa::Endpoints.abscissas(5);
        assert_eq!(x, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_invalid_models() {
        assert!(matches!(RampModel::build(0, 1), Err(SirsError::Value(_))));
        assert!(matches!(RampModel::build(5, 0), Err(SirsError::Value(_))));
        assert!(matches!(RampModel::build(3, 3), Err(SirsError::Value(_))));
        assert!(RampModel::build(3, 2).is_ok());
    }

    #[test]
    fn test_shapes() {
        let model = RampModel::build(10, 2).unwrap();
        assert_eq!(model.basis().dim(), (10, 3));
        assert_eq!(model.pinv().dim(), (3, 10));
        assert_eq!(model.modeling_matrix().dim(), (10, 10));
    }

    #[test]
    fn test_pinv_is_left_inverse() {
        let model = RampModel::build(8, 3).unwrap();
        let identity = model.pinv().dot(model.basis());
        for ((i, j), &v) in identity.indexed_iter() {
            assert_abs_diff_eq!(v, if i == j { 1.0 } else { 0.0 }, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_linear_ramp_virtual_reset() {
        let fitter = RampFitter::new(RampModel::build(10, 2).unwrap());
        let coeffs = fitter.fit(&linear_ramps(10)).unwrap();
        assert_eq!(coeffs.dim(), (3, 3, 2));
        // y = 120 + 25 x on x_i = (i + 1)/5 - 1
        assert_abs_diff_eq!(coeffs[[0, 0, 0]], 120.0, epsilon = 1e-9);
        assert_abs_diff_eq!(coeffs[[1, 0, 0]], 25.0, epsilon = 1e-9);
        assert_abs_diff_eq!(coeffs[[2, 0, 0]], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(coeffs[[0, 2, 1]], 125.0, epsilon = 1e-9);

        // 2 * 25 / 9
        let rate = fitter.signal_rate(&coeffs).unwrap();
        assert_abs_diff_eq!(rate[[1, 1]], 50.0 / 9.0, epsilon = 1e-9);
        let per_interval = fitter.rate_per_interval(&coeffs).unwrap();
        assert_abs_diff_eq!(per_interval[[1, 1]], 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_linear_ramp_endpoints() {
        let model = RampModel::build_with_abscissa(10, 2, RampAbscissa::Endpoints).unwrap();
        let fitter = RampFitter::new(model);
        let coeffs = fitter.fit(&linear_ramps(10)).unwrap();
        assert_abs_diff_eq!(coeffs[[1, 0, 0]], 22.5, epsilon = 1e-9);
        assert_abs_diff_eq!(coeffs[[0, 0, 0]], 122.5, epsilon = 1e-9);

        let counts = fitter.integrated_counts(&coeffs).unwrap();
        assert_abs_diff_eq!(counts[[2, 0]], 45.0, epsilon = 1e-9);
        let rate = fitter.signal_rate(&coeffs).unwrap();
        assert_abs_diff_eq!(rate[[2, 0]], 5.0, epsilon = 1e-9);
        let per_interval = fitter.rate_per_interval(&coeffs).unwrap();
        assert_abs_diff_eq!(per_interval[[2, 0]], 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_model_reproduces_polynomial_ramps() {
        let fitter = RampFitter::new(RampModel::build(6, 2).unwrap());
        let ramps = Array3::from_shape_fn((6, 2, 2), |(i, r, _)| {
            let t = i as f64;
            3.0 + t * r as f64 + 0.5 * t * t
        });
        let modeled = fitter.model(&ramps).unwrap();
        for (a, b) in ramps.iter().zip(modeled.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }

        let evaluated = fitter.ramp_model().evaluate(&fitter.fit(&ramps).unwrap()).unwrap();
        for (a, b) in ramps.iter().zip(evaluated.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_sample_axis_mismatch() {
        let fitter = RampFitter::new(RampModel::build(10, 2).unwrap());
        assert!(matches!(
            fitter.fit(&linear_ramps(9)),
            Err(SirsError::Shape(_))
        ));
        assert!(matches!(
            fitter.integrated_counts(&Array3::zeros((2, 1, 1))),
            Err(SirsError::Shape(_))
        ));
    }
}
