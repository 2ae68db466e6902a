//! Reference-row DC removal.
//!
//! After the frequency-domain correction each channel still carries a constant
//! offset. It is estimated from two reference rows near the top of the frame
//! with a trimmed mean. Interior channels alternate their column parity
//! offsets, so their even and odd columns get separate estimates.

use ndarray::{ArrayView2, ArrayViewMut2, Axis};
use sirs_math::trimmed_mean;
use std::ops::RangeInclusive;

use crate::error::Result;
use crate::geometry::Geometry;

/// Fraction of the reference-row samples dropped from each end before averaging.
const TRIM_FRACTION: f64 = 0.005;

/// Rows and trim counts for the DC estimate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DcParameters {
    pub rows: RangeInclusive<usize>,
    /// Samples dropped from each end of a whole-channel estimate
    pub discard: usize,
    /// Samples dropped from each end of a single-parity estimate
    pub parity_discard: usize,
}

impl DcParameters {
    pub fn for_geometry(geometry: &Geometry) -> Self {
        let rows = geometry.dc_rows();
        let span = rows.end() - rows.start() + 1;
        // Halves round to even
        let discard = (TRIM_FRACTION * (span * geometry.xsize()) as f64).round_ties_even() as usize;
        let parity_discard = (discard as f64 / 2.0).round_ties_even() as usize;
        Self {
            rows,
            discard,
            parity_discard,
        }
    }
}

/// DC level of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReferenceLevel {
    Uniform(f64),
    Parity { even: f64, odd: f64 },
}

impl ReferenceLevel {
    /// Level to subtract from column `col` of the channel.
    pub fn at_column(&self, col: usize) -> f64 {
        match *self {
            ReferenceLevel::Uniform(level) => level,
            ReferenceLevel::Parity { even, odd } => {
                if col % 2 == 0 {
                    even
                } else {
                    odd
                }
            }
        }
    }
}

/// Estimate the DC level of `channel`, a `[rows, xsize]` block read by output `op`.
pub fn reference_level(
    channel: &ArrayView2<f64>,
    op: usize,
    nout: usize,
    params: &DcParameters,
) -> Result<ReferenceLevel> {
    let rows = channel.slice(ndarray::s![params.rows.clone(), ..]);

    if op == 0 || op + 1 == nout {
        let values: Vec<f64> = rows.iter().copied().collect();
        return Ok(ReferenceLevel::Uniform(trimmed_mean(
            &values,
            params.discard,
        )?));
    }

    let mut even = Vec::with_capacity(rows.len() / 2 + 1);
    let mut odd = Vec::with_capacity(rows.len() / 2 + 1);
    for row in rows.axis_iter(Axis(0)) {
        for (col, &value) in row.iter().enumerate() {
            if col % 2 == 0 {
                even.push(value);
            } else {
                odd.push(value);
            }
        }
    }

    // A one-column channel has no odd columns
    let even_level = trimmed_mean(&even, params.parity_discard)?;
    let odd_level = if odd.is_empty() {
        even_level
    } else {
        trimmed_mean(&odd, params.parity_discard)?
    };

    Ok(ReferenceLevel::Parity {
        even: even_level,
        odd: odd_level,
    })
}

/// Estimate and subtract the DC level of one channel in place.
pub fn remove_dc(
    channel: &mut ArrayViewMut2<f64>,
    op: usize,
    nout: usize,
    params: &DcParameters,
) -> Result<ReferenceLevel> {
    let level = reference_level(&channel.view(), op, nout, params)?;
    for (col, mut column) in channel.axis_iter_mut(Axis(1)).enumerate() {
        let offset = level.at_column(col);
        column.mapv_inplace(|v| v - offset);
    }
    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    fn params(rows: RangeInclusive<usize>, discard: usize, parity_discard: usize) -> DcParameters {
        DcParameters {
            rows,
            discard,
            parity_discard,
        }
    }

    #[test]
    fn test_parameters_h4rg() {
        let g = Geometry::new(4096, 4096, 32, 12, 128, 4096).unwrap();
        let p = DcParameters::for_geometry(&g);
        assert_eq!(p.rows, 4093..=4094);
        // 0.005 * 256 = 1.28, and 1 / 2 = 0.5 rounds down to 0
        assert_eq!(p.discard, 1);
        assert_eq!(p.parity_discard, 0);
    }

    #[test]
    fn test_parameters_odd_discard_rounds_to_even() {
        let g = Geometry::new(2048, 2048, 4, 12, 512, 2048).unwrap();
        let p = DcParameters::for_geometry(&g);
        // 0.005 * 1024 = 5.12, and 5 / 2 = 2.5 rounds down to 2
        assert_eq!(p.discard, 5);
        assert_eq!(p.parity_discard, 2);
    }

    #[test]
    fn test_parameters_small_channel() {
        let g = Geometry::from_outputs(4, 16, 16, 4).unwrap();
        let p = DcParameters::for_geometry(&g);
        assert_eq!(p.rows, 13..=14);
        assert_eq!(p.discard, 0);
        assert_eq!(p.parity_discard, 0);
    }

    #[test]
    fn test_edge_channel_uniform_level() {
        let mut channel = Array2::from_elem((6, 4), 3.0);
        channel[[3, 1]] = 100.0;
        let level = reference_level(&channel.view(), 0, 4, &params(3..=4, 1, 1)).unwrap();
        // One outlier trimmed from the top, one 3.0 from the bottom
        assert_eq!(level, ReferenceLevel::Uniform(3.0));
    }

    #[test]
    fn test_interior_channel_parity_split() {
        let channel = Array2::from_shape_fn((6, 4), |(_, c)| if c % 2 == 0 { 1.0 } else { 5.0 });
        let mut channel = channel;
        let level = remove_dc(&mut channel.view_mut(), 1, 4, &params(3..=4, 0, 0)).unwrap();
        assert_eq!(level, ReferenceLevel::Parity { even: 1.0, odd: 5.0 });
        assert!(channel.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_last_channel_is_edge() {
        let channel = Array2::from_shape_fn((6, 4), |(_, c)| c as f64);
        let level = reference_level(&channel.view(), 3, 4, &params(3..=4, 0, 0)).unwrap();
        assert_eq!(level, ReferenceLevel::Uniform(1.5));
    }

    #[test]
    fn test_remove_dc_is_idempotent() {
        let mut channel = Array2::from_shape_fn((8, 6), |(r, c)| (r * 7 + c * 3) as f64 * 0.25);
        let p = params(5..=6, 1, 1);
        remove_dc(&mut channel.view_mut(), 2, 4, &p).unwrap();
        let once = channel.clone();
        let second = remove_dc(&mut channel.view_mut(), 2, 4, &p).unwrap();
        match second {
            ReferenceLevel::Parity { even, odd } => {
                assert_abs_diff_eq!(even, 0.0, epsilon = 1e-12);
                assert_abs_diff_eq!(odd, 0.0, epsilon = 1e-12);
            }
            other => panic!("expected a parity level, got {other:?}"),
        }
        for (a, b) in once.iter().zip(channel.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_nan_in_reference_rows_is_rejected() {
        let mut channel = Array2::zeros((6, 4));
        channel[[4, 0]] = f64::NAN;
        assert!(reference_level(&channel.view(), 0, 4, &params(3..=4, 0, 0)).is_err());
    }
}
