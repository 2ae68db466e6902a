//! Reference-pixel noise correction
//!
//! Correlated readout noise is common to all outputs of the detector and is
//! sampled by the left and right reference columns. For every frame the
//! reference columns are projected onto the incomplete Fourier basis, the two
//! resulting spectra are weighted per output with the calibrated α and β,
//! transformed back to the time domain and subtracted from each channel.
//! A trimmed-mean DC estimate from the reference rows finishes the job.

pub mod bad_reference;
pub mod dc;

use nalgebra::DVector;
use ndarray::{s, Array2, Array3, ArrayView2, ArrayViewMut2, Axis};
use rayon::prelude::*;
use sirs_math::{Complex64, InverseRealFft};
use std::sync::Arc;
use std::time::Instant;

use crate::calibration::CalibrationModel;
use crate::config::CorrectionOptions;
use crate::error::{Result, SirsError};
use crate::geometry::REFERENCE_BORDER;
use crate::parallel::try_for_each_frame;

pub use bad_reference::patch_right_reference;
pub use dc::{DcParameters, ReferenceLevel};

/// Incomplete Fourier spectra of one frame's reference columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSpectra {
    pub left: DVector<Complex64>,
    pub right: DVector<Complex64>,
}

/// Spectrum bins filled from the low and the mirrored high frequencies for a
/// `ysize`-row channel: `ysize/2 + 1` low bins and `ceil(ysize/2)` high bins.
pub fn band_widths(ysize: usize) -> (usize, usize) {
    (ysize / 2 + 1, ysize.div_ceil(2))
}

/// Applies a calibration model to exposure cubes.
#[derive(Debug, Clone)]
pub struct ReferenceCorrector {
    model: Arc<CalibrationModel>,
    fft: InverseRealFft,
    dc: DcParameters,
}

impl ReferenceCorrector {
    pub fn new(model: impl Into<Arc<CalibrationModel>>) -> Self {
        let model = model.into();
        let fft = InverseRealFft::new(model.geometry().nstep());
        let dc = DcParameters::for_geometry(model.geometry());
        Self { model, fft, dc }
    }

    pub fn model(&self) -> &CalibrationModel {
        &self.model
    }

    pub fn dc_parameters(&self) -> &DcParameters {
        &self.dc
    }

    /// Correct every frame of `cube` (`[frame, row, column]`) in place.
    ///
    /// All shape and option checks happen before the first write, so a
    /// rejected cube is left untouched.
    pub fn correct(&self, cube: &mut Array3<f64>, options: &CorrectionOptions) -> Result<()> {
        let (nframes, nrows, ncols) = cube.dim();
        let geometry = self.model.geometry();
        geometry.check_frame_shape(nrows, ncols)?;
        if options.bad_pixel_interpolation {
            options.bad_reference_rows.validate(nrows)?;
        }
        if nframes == 0 {
            return Ok(());
        }

        let start = Instant::now();
        try_for_each_frame(cube, options.parallel, |index, mut frame| {
            let frame_start = Instant::now();
            self.correct_frame(&mut frame, options)?;
            log::debug!(
                "frame {index} corrected in {:.3} ms",
                frame_start.elapsed().as_secs_f64() * 1e3
            );
            Ok(())
        })?;

        log::info!(
            "reference correction of {nframes} frames ({geometry}) took {:.3} s{}",
            start.elapsed().as_secs_f64(),
            if options.rows_only { ", rows only" } else { "" }
        );
        Ok(())
    }

    /// Correct a single `[row, column]` frame in place.
    pub fn correct_frame(
        &self,
        frame: &mut ArrayViewMut2<f64>,
        options: &CorrectionOptions,
    ) -> Result<()> {
        let geometry = self.model.geometry();
        let (nrows, ncols) = frame.dim();
        geometry.check_frame_shape(nrows, ncols)?;

        if options.bad_pixel_interpolation {
            patch_right_reference(frame, &options.bad_reference_rows)?;
        }

        let spectra = if options.rows_only {
            None
        } else {
            Some(self.reference_spectra(&frame.view())?)
        };

        let nout = geometry.nout();
        let process_channel = |(op, mut channel): (usize, ArrayViewMut2<f64>)| -> Result<()> {
            if let Some(spectra) = &spectra {
                let predicted = self.predict_channel(spectra, op)?;
                channel -= &predicted;
            }
            dc::remove_dc(&mut channel, op, nout, &self.dc)?;
            Ok(())
        };

        let channels = frame.axis_chunks_iter_mut(Axis(1), geometry.xsize());
        if options.parallel {
            channels
                .into_par_iter()
                .enumerate()
                .try_for_each(process_channel)
        } else {
            channels.enumerate().try_for_each(process_channel)
        }
    }

    /// Project the left and right reference columns of `frame` onto the Fourier basis.
    pub fn reference_spectra(&self, frame: &ArrayView2<f64>) -> Result<ReferenceSpectra> {
        let (nrows, ncols) = frame.dim();
        self.model.geometry().check_frame_shape(nrows, ncols)?;
        let (left, right) = (
            frame.slice(s![.., ..REFERENCE_BORDER]),
            frame.slice(s![.., ncols - REFERENCE_BORDER..]),
        );
        let basis = self.model.basis();
        Ok(ReferenceSpectra {
            left: basis.project(&left.iter().copied().collect::<Vec<f64>>())?,
            right: basis.project(&right.iter().copied().collect::<Vec<f64>>())?,
        })
    }

    /// Reference noise predicted for output `op`, shaped `[ysize, xsize]` in
    /// column order of the detector (odd outputs are read out mirrored).
    pub fn predict_channel(&self, spectra: &ReferenceSpectra, op: usize) -> Result<Array2<f64>> {
        let geometry = self.model.geometry();
        if op >= geometry.nout() {
            return Err(SirsError::Value(format!(
                "output {op} does not exist, detector has {} outputs",
                geometry.nout()
            )));
        }

        let alpha = self.model.alpha().row(op);
        let beta = self.model.beta().row(op);
        let (left, right) = (&spectra.left, &spectra.right);
        let nfreq = alpha.len();
        let ncoef = left.len();
        let (low, high) = band_widths(geometry.ysize());

        let mut spectrum = self.fft.make_spectrum();
        let nbins = spectrum.len();
        for (k, bin) in spectrum.iter_mut().enumerate().take(low) {
            *bin = alpha[k] * left[k] + beta[k] * right[k];
        }
        if self.model.basis().includes_high_frequency() {
            for i in 0..high {
                let (f, c) = (nfreq - high + i, ncoef - high + i);
                spectrum[nbins - high + i] = alpha[f] * left[c] + beta[f] * right[c];
            }
        }

        let mut timeline = self.fft.make_output();
        self.fft.process(&mut spectrum, &mut timeline)?;

        let period = geometry.row_period();
        let timeline = Array2::from_shape_vec((geometry.ysize(), period), timeline)
            .map_err(|e| SirsError::Shape(format!("reference timeline: {e}")))?;
        let mut predicted = timeline.slice(s![.., ..geometry.xsize()]);
        if op % 2 == 1 {
            predicted.invert_axis(Axis(1));
        }
        Ok(predicted.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use crate::synthetic::synthetic_table;
    use approx::assert_abs_diff_eq;

    fn corrector() -> ReferenceCorrector {
        let geometry = Geometry::from_outputs(4, 16, 16, 4).unwrap();
        let model = CalibrationModel::load(&synthetic_table(&geometry, 21)).unwrap();
        ReferenceCorrector::new(model)
    }

    #[test]
    fn test_dc_parameters_follow_geometry() {
        let c = corrector();
        assert_eq!(c.dc_parameters().rows, 13..=14);
    }

    #[test]
    fn test_zero_references_predict_nothing() {
        let c = corrector();
        let frame = Array2::<f64>::zeros((16, 64));
        let spectra = c.reference_spectra(&frame.view()).unwrap();
        for op in 0..4 {
            let p = c.predict_channel(&spectra, op).unwrap();
            assert_eq!(p.dim(), (16, 16));
            assert!(p.iter().all(|&v| v.abs() < 1e-12));
        }
    }

    #[test]
    fn test_constant_reference_is_dc_only() {
        // A constant lands in the 0 Hz bin, whose weights are zero
        let c = corrector();
        let frame = Array2::<f64>::from_elem((16, 64), 7.0);
        let spectra = c.reference_spectra(&frame.view()).unwrap();
        let p = c.predict_channel(&spectra, 2).unwrap();
        for &v in p.iter() {
            assert_abs_diff_eq!(v, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_band_widths() {
        assert_eq!(band_widths(16), (9, 8));
        assert_eq!(band_widths(15), (8, 8));
        assert_eq!(band_widths(4096), (2049, 2048));
    }

    #[test]
    fn test_reference_spectra_checks_shape() {
        let c = corrector();
        let narrow = Array2::<f64>::zeros((16, 3));
        assert!(matches!(
            c.reference_spectra(&narrow.view()),
            Err(SirsError::Shape(_))
        ));
        let short = Array2::<f64>::zeros((15, 64));
        assert!(matches!(
            c.reference_spectra(&short.view()),
            Err(SirsError::Shape(_))
        ));
    }

    #[test]
    fn test_predict_channel_rejects_missing_output() {
        let c = corrector();
        let frame = Array2::<f64>::zeros((16, 64));
        let spectra = c.reference_spectra(&frame.view()).unwrap();
        assert!(matches!(c.predict_channel(&spectra, 4), Err(SirsError::Value(_))));
    }

    #[test]
    fn test_correct_frame_checks_shape() {
        let c = corrector();
        let mut frame = Array2::<f64>::zeros((16, 60));
        assert!(matches!(
            c.correct_frame(&mut frame.view_mut(), &CorrectionOptions::default()),
            Err(SirsError::Shape(_))
        ));
    }

    #[test]
    fn test_empty_cube_is_noop() {
        let c = corrector();
        let mut cube = Array3::<f64>::zeros((0, 16, 64));
        c.correct(&mut cube, &CorrectionOptions::default()).unwrap();
    }
}
