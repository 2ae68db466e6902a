//! Planned inverse real FFT
//!
//! Wraps a `realfft` complex-to-real plan so that it behaves like numpy's
//! `irfft`: the output is scaled by `1/len` and the imaginary parts of the DC
//! and (for even lengths) Nyquist bins are ignored.

use std::sync::Arc;

use realfft::{ComplexToReal, RealFftPlanner};
use rustfft::num_complex::Complex64;

use crate::error::MathError;

/// Inverse real FFT of a fixed length, shareable across threads.
#[derive(Clone)]
pub struct InverseRealFft {
    len: usize,
    plan: Arc<dyn ComplexToReal<f64>>,
}

impl std::fmt::Debug for InverseRealFft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InverseRealFft")
            .field("len", &self.len)
            .finish()
    }
}

impl InverseRealFft {
    /// Plan an inverse transform producing `len` real samples.
    pub fn new(len: usize) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        let plan = planner.plan_fft_inverse(len);
        Self { len, plan }
    }

    /// Number of real output samples.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Length of the one-sided input spectrum (`len/2 + 1`).
    pub fn spectrum_len(&self) -> usize {
        self.len / 2 + 1
    }

    /// Allocate a zeroed one-sided spectrum buffer.
    pub fn make_spectrum(&self) -> Vec<Complex64> {
        self.plan.make_input_vec()
    }

    /// Allocate a zeroed real output buffer.
    pub fn make_output(&self) -> Vec<f64> {
        self.plan.make_output_vec()
    }

    /// Transform `spectrum` into `output`.
    ///
    /// The spectrum buffer is used as scratch space and is left in an
    /// unspecified state.
    pub fn process(&self, spectrum: &mut [Complex64], output: &mut [f64]) -> Result<(), MathError> {
        if spectrum.len() != self.spectrum_len() {
            return Err(MathError::Shape(format!(
                "inverse FFT of length {} needs {} spectrum bins, got {}",
                self.len,
                self.spectrum_len(),
                spectrum.len()
            )));
        }
        if output.len() != self.len {
            return Err(MathError::Shape(format!(
                "inverse FFT output buffer must hold {} samples, got {}",
                self.len,
                output.len()
            )));
        }

        // A real signal has purely real DC and Nyquist bins
        spectrum[0].im = 0.0;
        if self.len % 2 == 0 {
            if let Some(nyquist) = spectrum.last_mut() {
                nyquist.im = 0.0;
            }
        }

        self.plan
            .process(spectrum, output)
            .map_err(|e| MathError::Numerical(format!("inverse real FFT failed: {e}")))?;

        let scale = 1.0 / self.len as f64;
        for value in output.iter_mut() {
            *value *= scale;
        }
        Ok(())
    }
}
