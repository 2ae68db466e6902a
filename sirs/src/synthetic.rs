//! Seeded synthetic calibrations and exposures
//!
//! Used by the benchmark binary and the tests to produce data with a known
//! answer: a random but reproducible calibration table, frames whose pixels
//! carry exactly the noise their reference columns predict, and noisy
//! linear ramps.

use ndarray::{Array3, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::calibration::CalibrationTable;
use crate::corrector::ReferenceCorrector;
use crate::error::{Result, SirsError};
use crate::geometry::{Geometry, REFERENCE_BORDER};
use crate::parallel::try_for_each_frame_seeded;

/// Pixel clock used to label the synthetic frequency grid.
const PIXEL_TIME_S: f64 = 1e-5;

fn normal(sigma: f64) -> Result<Normal<f64>> {
    Normal::new(0.0, sigma).map_err(|e| SirsError::Value(format!("noise sigma {sigma}: {e}")))
}

/// Random calibration table for `geometry` with the smallest frequency grid
/// the geometry accepts, in FFT order (DC, positive, then negative frequencies).
pub fn synthetic_table(geometry: &Geometry, seed: u64) -> CalibrationTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let half = geometry.ysize() / 2;
    let nfreq = 2 * half + 1;
    let f0 = 1.0 / (geometry.nstep() as f64 * PIXEL_TIME_S);

    let freq: Vec<f64> = (0..=half)
        .map(|k| k as f64 * f0)
        .chain((1..=half).rev().map(|k| -(k as f64) * f0))
        .collect();

    let mut weights = || -> Vec<Vec<[f64; 2]>> {
        (0..geometry.nout())
            .map(|_| {
                (0..nfreq)
                    .map(|_| [rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)])
                    .collect()
            })
            .collect()
    };
    let alpha = weights();
    let beta = weights();

    CalibrationTable {
        naxis1: geometry.naxis1(),
        naxis2: geometry.naxis2(),
        nout: geometry.nout(),
        nroh: geometry.nroh(),
        xsize: geometry.xsize(),
        ysize: geometry.ysize(),
        freq,
        alpha,
        beta,
        sft_j: geometry
            .reference_sample_indices()
            .into_iter()
            .map(|j| j + 1)
            .collect(),
        include_high_frequency: true,
    }
}

/// Cube whose reference columns hold white noise of `sigma` and whose other
/// pixels hold exactly the noise `corrector` predicts from those columns.
pub fn correlated_noise_cube(
    corrector: &ReferenceCorrector,
    nframes: usize,
    sigma: f64,
    seed: u64,
) -> Result<Array3<f64>> {
    let geometry = *corrector.model().geometry();
    let noise = normal(sigma)?;
    let (nrows, ncols) = (geometry.naxis2(), geometry.naxis1());
    let is_reference = |col: usize| col < REFERENCE_BORDER || col >= ncols - REFERENCE_BORDER;

    let mut cube = Array3::zeros((nframes, nrows, ncols));
    try_for_each_frame_seeded(&mut cube, seed, |_, mut frame, rng| {
        for (col, mut column) in frame.axis_iter_mut(Axis(1)).enumerate() {
            if is_reference(col) {
                column.mapv_inplace(|_| noise.sample(rng));
            }
        }

        let spectra = corrector.reference_spectra(&frame.view())?;
        for op in 0..geometry.nout() {
            let predicted = corrector.predict_channel(&spectra, op)?;
            for (offset, col) in geometry.channel_columns(op).enumerate() {
                if !is_reference(col) {
                    frame
                        .index_axis_mut(Axis(1), col)
                        .assign(&predicted.index_axis(Axis(1), offset));
                }
            }
        }
        Ok(())
    })?;
    Ok(cube)
}

/// Linear ramps of `rate` counts per sample plus white read noise, `[nsamp, nrows, ncols]`.
pub fn ramp_cube(
    nsamp: usize,
    nrows: usize,
    ncols: usize,
    rate: f64,
    read_noise: f64,
    seed: u64,
) -> Result<Array3<f64>> {
    let noise = normal(read_noise)?;
    let mut rng = StdRng::seed_from_u64(seed);
    Ok(Array3::from_shape_fn((nsamp, nrows, ncols), |(i, _, _)| {
        rate * i as f64 + noise.sample(&mut rng)
    }))
}
