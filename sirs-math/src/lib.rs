//! sirs-math - Numerical primitives for reference-pixel correction
//!
//! This crate provides the linear-algebra and signal-processing building
//! blocks used by the `sirs` correction engine and ramp fitter:
//!
//! - **Pseudo-inverse** - SVD based Moore-Penrose inverse for real and complex matrices
//! - **Fourier** - Incomplete Fourier basis for irregularly sampled reference columns
//! - **Legendre** - Legendre polynomial basis on arbitrary abscissas
//! - **Inverse real FFT** - Planned, normalised half-spectrum to real transform
//! - **Statistics** - Trimmed (robust) means
//! - **Interpolation** - 1-D linear interpolation
//!
//! # Example
//!
//! ```text
//! use sirs_math::FourierBasis;
//!
//! let basis = FourierBasis::build(&[0, 1, 2, 3], 3, 8, true)?;
//! let spectrum = basis.project(&[1.0, 2.0, 3.0, 4.0])?;
//! ```

pub mod error;
pub mod fourier;
pub mod interp;
pub mod irfft;
pub mod legendre;
pub mod pinv;
pub mod stats;

// Re-export commonly used types
pub use error::MathError;
pub use fourier::FourierBasis;
pub use interp::{interp, interp_slice};
pub use irfft::InverseRealFft;
pub use legendre::{legendre_basis, legendre_values};
pub use pinv::pseudo_inverse;
pub use rustfft::num_complex::Complex64;
pub use stats::trimmed_mean;
