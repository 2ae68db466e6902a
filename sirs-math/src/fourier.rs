//! Incomplete Fourier basis for irregularly sampled reference columns
//!
//! Reference columns are only read at a sparse subset of the time steps that
//! make up one frame. Fitting Fourier coefficients to such a sample set is a
//! least-squares problem: with `B` holding the Fourier basis vectors evaluated
//! at the sampled time steps, the spectrum of a sampled vector `d` is
//! `pinv(B) · d`.
//!
//! Column layout follows the half-spectrum FFT convention: column 0 is DC,
//! columns `1..nvec` are the low frequencies `k`, and when high frequencies are
//! included column `ncols - k` holds the Hermitian mirror of frequency `k`
//! (frequency index `kmax - k + 1` with `kmax = nstep - 1`). Every entry carries
//! the `1/nstep` normalisation used by the inverse transform.

use nalgebra::{DMatrix, DVector};
use rustfft::num_complex::Complex64;
use std::f64::consts::PI;

use crate::error::MathError;
use crate::pinv::pseudo_inverse;

/// Fourier basis matrix and its least-squares analysis operator.
#[derive(Debug, Clone)]
pub struct FourierBasis {
    nstep: usize,
    nvec: usize,
    include_high_frequency: bool,
    basis: DMatrix<Complex64>,
    pinv: DMatrix<Complex64>,
}

/// Normalised basis element `(1/nstep) exp(i 2π j f / nstep)`.
///
/// The product `j * f` is reduced modulo `nstep` before the phase is formed so
/// that large frame timelines do not lose precision.
fn basis_element(j: usize, frequency: usize, nstep: usize) -> Complex64 {
    let turns = ((j as u128 * frequency as u128) % nstep as u128) as f64 / nstep as f64;
    Complex64::from_polar(1.0 / nstep as f64, 2.0 * PI * turns)
}

impl FourierBasis {
    /// Number of basis columns for `nvec` low-frequency vectors.
    pub fn column_count(nvec: usize, include_high_frequency: bool) -> usize {
        if include_high_frequency {
            2 * (nvec - 1) + 1
        } else {
            nvec
        }
    }

    /// Build the basis for the given reference sample positions.
    ///
    /// # Arguments
    /// * `sample_indices` - Zero-based time steps of the reference samples, strictly ascending
    /// * `nvec` - Number of low-frequency vectors including DC
    /// * `nstep` - Time steps in one frame, including row overhead
    /// * `include_high_frequency` - Append the mirrored high-frequency columns
    ///
    /// # Returns
    /// * `Ok(FourierBasis)` - Basis `[len(sample_indices), ncols]` and pseudo-inverse
    /// * `Err(MathError::Value)` - Invalid indices, `nvec == 0`, or frequencies at/above Nyquist
    /// * `Err(MathError::Numerical)` - Pseudo-inverse failed
    pub fn build(
        sample_indices: &[usize],
        nvec: usize,
        nstep: usize,
        include_high_frequency: bool,
    ) -> Result<Self, MathError> {
        if sample_indices.is_empty() {
            return Err(MathError::Value(
                "sample index list is empty".to_string(),
            ));
        }
        if nvec == 0 {
            return Err(MathError::Value(
                "need at least one Fourier vector (DC)".to_string(),
            ));
        }
        if let Some(w) = sample_indices.windows(2).find(|w| w[1] <= w[0]) {
            return Err(MathError::Value(format!(
                "sample indices must be strictly ascending, found {} followed by {}",
                w[0], w[1]
            )));
        }
        let last = sample_indices[sample_indices.len() - 1];
        if last >= nstep {
            return Err(MathError::Value(format!(
                "sample index {last} lies outside the {nstep}-step frame timeline"
            )));
        }
        if 2 * (nvec - 1) >= nstep {
            return Err(MathError::Value(format!(
                "{nvec} Fourier vectors exceed the Nyquist limit of a {nstep}-step timeline"
            )));
        }

        let ncols = Self::column_count(nvec, include_high_frequency);
        let mut basis = DMatrix::<Complex64>::zeros(sample_indices.len(), ncols);

        for (row, &j) in sample_indices.iter().enumerate() {
            for k in 0..nvec {
                basis[(row, k)] = basis_element(j, k, nstep);

                if include_high_frequency && k > 0 {
                    let kmax = nstep - 1;
                    basis[(row, ncols - k)] = basis_element(j, kmax - k + 1, nstep);
                }
            }
        }

        let pinv = pseudo_inverse(&basis)?;

        log::debug!(
            "built incomplete Fourier basis: {} samples x {} columns (nstep = {nstep})",
            sample_indices.len(),
            ncols
        );

        Ok(Self {
            nstep,
            nvec,
            include_high_frequency,
            basis,
            pinv,
        })
    }

    /// Project a real sampled vector onto the basis (`pinv(B) · data`).
    pub fn project(&self, data: &[f64]) -> Result<DVector<Complex64>, MathError> {
        if data.len() != self.sample_count() {
            return Err(MathError::Shape(format!(
                "expected {} reference samples, got {}",
                self.sample_count(),
                data.len()
            )));
        }
        let v = DVector::from_iterator(data.len(), data.iter().map(|&x| Complex64::new(x, 0.0)));
        Ok(&self.pinv * v)
    }

    /// Basis matrix `B`, shape `[samples, ncols]`.
    pub fn basis(&self) -> &DMatrix<Complex64> {
        &self.basis
    }

    /// Pseudo-inverse `pinv(B)`, shape `[ncols, samples]`.
    pub fn pinv(&self) -> &DMatrix<Complex64> {
        &self.pinv
    }

    pub fn nstep(&self) -> usize {
        self.nstep
    }

    pub fn nvec(&self) -> usize {
        self.nvec
    }

    pub fn includes_high_frequency(&self) -> bool {
        self.include_high_frequency
    }

    pub fn sample_count(&self) -> usize {
        self.basis.nrows()
    }

    pub fn column_total(&self) -> usize {
        self.basis.ncols()
    }
}
