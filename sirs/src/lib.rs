//! Reference-pixel noise correction and up-the-ramp fitting for multi-output
//! infrared sensors.
//!
//! Correlated readout noise is removed with the incomplete Fourier transform
//! method: the reference columns at both edges of the array are sampled at
//! known, irregular time steps, their spectra are fitted by least squares,
//! weighted per output with calibrated complex coefficients and subtracted
//! from the science pixels. Pixel ramps read non-destructively are then
//! fitted with Legendre polynomials.
//!
//! ```no_run
//! use sirs::{CalibrationModel, CorrectionOptions, ReferenceCorrector};
//! # fn main() -> sirs::Result<()> {
//! let model = CalibrationModel::load_from_file(std::path::Path::new("sirs_cal.json"))?;
//! let corrector = ReferenceCorrector::new(model);
//! let mut cube = ndarray::Array3::<f64>::zeros((3, 4096, 4096));
//! corrector.correct(&mut cube, &CorrectionOptions::default())?;
//! # Ok(())
//! # }
//! ```

pub mod calibration;
pub mod config;
pub mod corrector;
pub mod error;
pub mod geometry;
pub mod parallel;
pub mod ramp;
pub mod synthetic;

pub use calibration::{CalibrationModel, CalibrationTable, WeightSample};
pub use config::{BadReferenceBand, CorrectionOptions};
pub use corrector::{ReferenceCorrector, ReferenceSpectra};
pub use error::{Result, SirsError};
pub use geometry::{Geometry, REFERENCE_BORDER};
pub use ramp::{RampAbscissa, RampFitter, RampModel};
