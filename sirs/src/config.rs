//! Correction options.
//!
//! The historical correction variants (rows-only, with and without the bad
//! reference-pixel patch) are selected here rather than through separate
//! entry points. Options serialise to JSON so a pipeline can keep them next
//! to its calibration tables.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SirsError};

/// Inclusive band of rows whose right-hand reference pixels are defective.
///
/// The default covers the damaged reference rows of the JPL PPL H4RG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadReferenceBand {
    pub first_row: usize,
    pub last_row: usize,
}

impl Default for BadReferenceBand {
    fn default() -> Self {
        Self {
            first_row: 1870,
            last_row: 2224,
        }
    }
}

impl BadReferenceBand {
    pub fn new(first_row: usize, last_row: usize) -> Self {
        Self {
            first_row,
            last_row,
        }
    }

    pub fn contains(&self, row: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row)
    }

    /// Number of rows in the band.
    pub fn len(&self) -> usize {
        (self.last_row + 1).saturating_sub(self.first_row)
    }

    pub fn is_empty(&self) -> bool {
        self.last_row < self.first_row
    }

    /// Check that the band can be interpolated across in a frame of `nrows` rows.
    ///
    /// Interpolation never extrapolates, so at least one valid row must remain
    /// on each side of the band.
    pub fn validate(&self, nrows: usize) -> Result<()> {
        if self.is_empty() {
            return Err(SirsError::Value(format!(
                "bad reference band {}..={} is empty",
                self.first_row, self.last_row
            )));
        }
        if self.first_row == 0 || self.last_row + 1 >= nrows {
            return Err(SirsError::Value(format!(
                "bad reference band {}..={} leaves no valid rows on both sides of a {nrows}-row frame",
                self.first_row, self.last_row
            )));
        }
        Ok(())
    }
}

/// Options for [`crate::ReferenceCorrector::correct`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionOptions {
    /// Interpolate over [`BadReferenceBand`] in the right reference columns
    pub bad_pixel_interpolation: bool,
    /// Skip the frequency-domain step and only remove DC levels
    pub rows_only: bool,
    /// Spread frames and channels over the rayon thread pool
    pub parallel: bool,
    pub bad_reference_rows: BadReferenceBand,
}

impl Default for CorrectionOptions {
    fn default() -> Self {
        Self {
            bad_pixel_interpolation: false,
            rows_only: false,
            parallel: true,
            bad_reference_rows: BadReferenceBand::default(),
        }
    }
}

impl CorrectionOptions {
    pub fn with_bad_pixel_interpolation(mut self, enabled: bool) -> Self {
        self.bad_pixel_interpolation = enabled;
        self
    }

    pub fn with_rows_only(mut self, enabled: bool) -> Self {
        self.rows_only = enabled;
        self
    }

    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn with_bad_reference_rows(mut self, band: BadReferenceBand) -> Self {
        self.bad_reference_rows = band;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_band() {
        let band = BadReferenceBand::default();
        assert!(!band.contains(1869));
        assert!(band.contains(1870));
        assert!(band.contains(2224));
        assert!(!band.contains(2225));
        assert_eq!(band.len(), 355);
        assert!(band.validate(4096).is_ok());
    }

    #[test]
    fn test_band_must_be_interior() {
        assert!(BadReferenceBand::default().validate(2048).is_err());
        assert!(BadReferenceBand::new(0, 3).validate(16).is_err());
        assert!(BadReferenceBand::new(10, 15).validate(16).is_err());
        assert!(BadReferenceBand::new(5, 4).validate(16).is_err());
        assert!(BadReferenceBand::new(1, 14).validate(16).is_ok());
    }

    #[test]
    fn test_options_json_defaults() {
        let opts: CorrectionOptions = serde_json::from_str(r#"{"rows_only": true}"#).unwrap();
        assert!(opts.rows_only);
        assert!(!opts.bad_pixel_interpolation);
        assert!(opts.parallel);
        assert_eq!(opts.bad_reference_rows, BadReferenceBand::default());
    }

    #[test]
    fn test_builder() {
        let opts = CorrectionOptions::default()
            .with_rows_only(true)
            .with_parallel(false)
            .with_bad_pixel_interpolation(true)
            .with_bad_reference_rows(BadReferenceBand::new(3, 5));
        assert!(opts.rows_only && !opts.parallel && opts.bad_pixel_interpolation);
        assert_eq!(opts.bad_reference_rows.len(), 3);
    }
}
