//! Repair of defective right-hand reference pixels.

use ndarray::{ArrayViewMut2, Axis};
use sirs_math::interp_slice;

use crate::config::BadReferenceBand;
use crate::error::Result;
use crate::geometry::REFERENCE_BORDER;

/// Replace the rows of `band` in the rightmost reference columns of `frame`
/// with a linear interpolation over the remaining rows of the same column.
///
/// The band must already have been validated against the frame height.
pub fn patch_right_reference(frame: &mut ArrayViewMut2<f64>, band: &BadReferenceBand) -> Result<()> {
    let (nrows, ncols) = frame.dim();
    let (good_rows, bad_rows): (Vec<usize>, Vec<usize>) =
        (0..nrows).partition(|&row| !band.contains(row));

    let xs: Vec<f64> = good_rows.iter().map(|&r| r as f64).collect();
    let points: Vec<f64> = bad_rows.iter().map(|&r| r as f64).collect();

    for col in ncols - REFERENCE_BORDER..ncols {
        let mut column = frame.index_axis_mut(Axis(1), col);
        let ys: Vec<f64> = good_rows.iter().map(|&r| column[r]).collect();
        let filled = interp_slice(&points, &xs, &ys)?;
        for (&row, value) in bad_rows.iter().zip(filled) {
            column[row] = value;
        }
    }
    Ok(())
}
