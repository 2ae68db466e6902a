//! Detector readout geometry
//!
//! A multi-output sensor reads its columns in `nout` parallel channels, each
//! `xsize` columns wide. Every row of a channel takes `xsize + nroh` pixel
//! clocks, the `nroh` extra clocks being the new-row overhead, so one frame
//! spans `nstep = (xsize + nroh) * ysize` time steps. The leftmost and
//! rightmost [`REFERENCE_BORDER`] columns of the array are reference pixels.

use serde::Serialize;
use std::fmt;
use std::ops::{Range, RangeInclusive};

use crate::error::{Result, SirsError};

/// Width of the reference pixel border in columns, identical for all HxRG parts.
pub const REFERENCE_BORDER: usize = 4;

/// Immutable readout geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Geometry {
    naxis1: usize,
    naxis2: usize,
    nout: usize,
    nroh: usize,
    xsize: usize,
    ysize: usize,
}

impl Geometry {
    /// Create a geometry, checking its invariants.
    ///
    /// # Arguments
    /// * `naxis1` - Total number of columns
    /// * `naxis2` - Total number of rows
    /// * `nout` - Number of output channels
    /// * `nroh` - New-row overhead in pixel clocks
    /// * `xsize` - Columns per channel
    /// * `ysize` - Rows per channel
    ///
    /// # Returns
    /// * `Err(SirsError::Shape)` unless `naxis1 == nout * xsize`, `ysize == naxis2`,
    ///   every channel can hold a reference border, and at least three rows exist
    pub fn new(
        naxis1: usize,
        naxis2: usize,
        nout: usize,
        nroh: usize,
        xsize: usize,
        ysize: usize,
    ) -> Result<Self> {
        if nout == 0 || xsize == 0 || ysize == 0 {
            return Err(SirsError::Shape(format!(
                "geometry counts must be positive (nout = {nout}, xsize = {xsize}, ysize = {ysize})"
            )));
        }
        if naxis1 != nout * xsize {
            return Err(SirsError::Shape(format!(
                "{naxis1} columns cannot be split into {nout} outputs of {xsize} columns"
            )));
        }
        if ysize != naxis2 {
            return Err(SirsError::Shape(format!(
                "channel height {ysize} differs from frame height {naxis2}"
            )));
        }
        if xsize < REFERENCE_BORDER || naxis1 < 2 * REFERENCE_BORDER {
            return Err(SirsError::Shape(format!(
                "{naxis1} columns in {xsize}-column channels leave no room for {REFERENCE_BORDER}-column reference borders"
            )));
        }
        if naxis2 < 3 {
            return Err(SirsError::Shape(format!(
                "frame needs at least 3 rows for the reference-row DC estimate, got {naxis2}"
            )));
        }

        Ok(Self {
            naxis1,
            naxis2,
            nout,
            nroh,
            xsize,
            ysize,
        })
    }

    /// Geometry derived from the channel layout alone.
    pub fn from_outputs(nout: usize, xsize: usize, ysize: usize, nroh: usize) -> Result<Self> {
        Self::new(nout * xsize, ysize, nout, nroh, xsize, ysize)
    }

    pub fn naxis1(&self) -> usize {
        self.naxis1
    }

    pub fn naxis2(&self) -> usize {
        self.naxis2
    }

    pub fn nout(&self) -> usize {
        self.nout
    }

    pub fn nroh(&self) -> usize {
        self.nroh
    }

    pub fn xsize(&self) -> usize {
        self.xsize
    }

    pub fn ysize(&self) -> usize {
        self.ysize
    }

    /// Pixel clocks per channel row, including overhead.
    pub fn row_period(&self) -> usize {
        self.xsize + self.nroh
    }

    /// Total time steps in one frame.
    pub fn nstep(&self) -> usize {
        self.row_period() * self.ysize
    }

    /// Column range read by channel `op`.
    pub fn channel_columns(&self, op: usize) -> Range<usize> {
        let x0 = op * self.xsize;
        x0..x0 + self.xsize
    }

    /// Reference rows used for the DC estimate: the second and third rows from the top.
    pub fn dc_rows(&self) -> RangeInclusive<usize> {
        self.naxis2 - 3..=self.naxis2 - 2
    }

    /// Zero-based time steps at which one side's reference columns are sampled,
    /// in row-major order of the `[rows, REFERENCE_BORDER]` block.
    pub fn reference_sample_indices(&self) -> Vec<usize> {
        (0..self.ysize)
            .flat_map(|row| (0..REFERENCE_BORDER).map(move |c| row * self.row_period() + c))
            .collect()
    }

    /// Check a frame's `(rows, columns)` against this geometry.
    pub fn check_frame_shape(&self, rows: usize, columns: usize) -> Result<()> {
        if columns != self.naxis1 {
            return Err(SirsError::Shape(format!(
                "frame has {columns} columns, geometry expects {} ({} outputs x {})",
                self.naxis1, self.nout, self.xsize
            )));
        }
        if rows != self.naxis2 {
            return Err(SirsError::Shape(format!(
                "frame has {rows} rows, geometry expects {}",
                self.naxis2
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}x{} ({} outputs of {} columns, {} overhead clocks)",
            self.naxis1, self.naxis2, self.nout, self.xsize, self.nroh
        )
    }
}
