//! Calibration tables and the immutable correction model built from them.
//!
//! A [`CalibrationTable`] is the structured, serialisable form of a
//! reference-correction calibration: readout geometry, the frequency grid,
//! the per-channel complex weights α and β, and the 1-based time steps of the
//! reference samples. Complex weights arrive as `[re, im]` pairs, which is how
//! the upstream weight files encode them.
//!
//! [`CalibrationModel::load`] validates a table, converts it into native
//! types and builds the incomplete Fourier basis. Building the basis needs an
//! SVD of a `[4 * ysize, ysize + 1]` complex matrix, so a model is meant to be
//! built once and shared (it is `Send + Sync`) across every correction.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use sirs_math::{Complex64, FourierBasis};
use std::path::Path;

use crate::corrector::band_widths;
use crate::error::{Result, SirsError};
use crate::geometry::{Geometry, REFERENCE_BORDER};

fn default_true() -> bool {
    true
}

/// Serialisable calibration table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTable {
    /// Number of columns
    pub naxis1: usize,
    /// Number of rows
    pub naxis2: usize,
    /// Number of outputs
    pub nout: usize,
    /// New-row overhead in pixel clocks
    pub nroh: usize,
    /// Columns per output
    pub xsize: usize,
    /// Rows per output
    pub ysize: usize,

    /// Incomplete Fourier transform frequencies in Hz
    #[serde(alias = "𝒇")]
    pub freq: Vec<f64>,

    /// Left reference weights, `[nout][len(freq)]` of `[re, im]`
    #[serde(alias = "α")]
    pub alpha: Vec<Vec<[f64; 2]>>,

    /// Right reference weights, `[nout][len(freq)]` of `[re, im]`
    #[serde(alias = "β")]
    pub beta: Vec<Vec<[f64; 2]>>,

    /// 1-based time steps of the reference samples
    #[serde(alias = "SFT_j")]
    pub sft_j: Vec<usize>,

    /// Fit the mirrored high-frequency Fourier vectors as well as the low ones
    #[serde(default = "default_true")]
    pub include_high_frequency: bool,
}

impl CalibrationTable {
    /// Parse a table from JSON. Any missing or mistyped field is a format error.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SirsError::Format(format!("malformed calibration table: {e}")))
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SirsError::Format(format!("cannot encode calibration table: {e}")))
    }

    /// Load from JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

/// Convert rows of `[re, im]` pairs into a complex matrix.
///
/// # Returns
/// * `Err(SirsError::Format)` if the rows are ragged, empty, or hold non-finite values
pub fn tuples_to_complex(rows: &[Vec<[f64; 2]>]) -> Result<Array2<Complex64>> {
    let nrows = rows.len();
    let ncols = rows.first().map(Vec::len).unwrap_or(0);
    if nrows == 0 || ncols == 0 {
        return Err(SirsError::Format("complex weight table is empty".to_string()));
    }
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
        return Err(SirsError::Format(format!(
            "complex weight row {i} has {} entries, expected {ncols}",
            row.len()
        )));
    }

    let values: Vec<Complex64> = rows
        .iter()
        .flatten()
        .map(|&[re, im]| Complex64::new(re, im))
        .collect();
    if values.iter().any(|c| !c.re.is_finite() || !c.im.is_finite()) {
        return Err(SirsError::Format(
            "complex weight table contains NaN or infinite values".to_string(),
        ));
    }

    Array2::from_shape_vec((nrows, ncols), values)
        .map_err(|e| SirsError::Format(format!("complex weight table: {e}")))
}

/// Inverse of [`tuples_to_complex`].
pub fn complex_to_tuples(values: &Array2<Complex64>) -> Vec<Vec<[f64; 2]>> {
    values
        .outer_iter()
        .map(|row| row.iter().map(|c| [c.re, c.im]).collect())
        .collect()
}

/// Weight amplitude and phase at one frequency, for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightSample {
    pub frequency: f64,
    pub alpha_amplitude: f64,
    pub alpha_phase: f64,
    pub beta_amplitude: f64,
    pub beta_phase: f64,
}

/// Immutable reference-correction model.
#[derive(Debug, Clone)]
pub struct CalibrationModel {
    geometry: Geometry,
    freq: Vec<f64>,
    alpha: Array2<Complex64>,
    beta: Array2<Complex64>,
    sample_indices: Vec<usize>,
    basis: FourierBasis,
}

impl CalibrationModel {
    /// Validate a calibration table and build its Fourier basis.
    ///
    /// Sample indices are converted from 1-based to 0-based and the 0 Hz
    /// weights are zeroed, since DC is removed by the reference-row step.
    pub fn load(table: &CalibrationTable) -> Result<Self> {
        let geometry = Geometry::new(
            table.naxis1,
            table.naxis2,
            table.nout,
            table.nroh,
            table.xsize,
            table.ysize,
        )
        .map_err(|e| SirsError::Format(format!("inconsistent geometry: {e}")))?;

        let alpha = tuples_to_complex(&table.alpha)?;
        let beta = tuples_to_complex(&table.beta)?;

        let sample_indices = table
            .sft_j
            .iter()
            .map(|&j| {
                j.checked_sub(1).ok_or_else(|| {
                    SirsError::Format("reference sample indices are 1-based, found 0".to_string())
                })
            })
            .collect::<Result<Vec<usize>>>()?;

        Self::from_parts(
            geometry,
            table.freq.clone(),
            alpha,
            beta,
            sample_indices,
            table.include_high_frequency,
        )
    }

    /// Read a JSON calibration table and build the model.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let table = CalibrationTable::load_from_file(path)?;
        log::info!("loaded calibration table from {}", path.display());
        Self::load(&table)
    }

    /// Build a model from already converted parts.
    ///
    /// # Arguments
    /// * `geometry` - Readout geometry
    /// * `freq` - Frequency grid, odd length
    /// * `alpha`, `beta` - Complex weights, `[nout, len(freq)]`
    /// * `sample_indices` - 0-based reference sample time steps, one per reference pixel on a side
    /// * `include_high_frequency` - Fit mirrored high frequencies too
    pub fn from_parts(
        geometry: Geometry,
        freq: Vec<f64>,
        mut alpha: Array2<Complex64>,
        mut beta: Array2<Complex64>,
        sample_indices: Vec<usize>,
        include_high_frequency: bool,
    ) -> Result<Self> {
        let nfreq = freq.len();
        if nfreq == 0 || nfreq % 2 == 0 {
            return Err(SirsError::Format(format!(
                "frequency grid must have odd length, got {nfreq}"
            )));
        }
        if freq.iter().any(|f| !f.is_finite()) {
            return Err(SirsError::Format(
                "frequency grid contains NaN or infinite values".to_string(),
            ));
        }

        let expected = (geometry.nout(), nfreq);
        for (name, weights) in [("alpha", &alpha), ("beta", &beta)] {
            if weights.dim() != expected {
                return Err(SirsError::Format(format!(
                    "{name} has shape {:?}, expected {expected:?} (outputs x frequencies)",
                    weights.dim()
                )));
            }
        }

        let expected_samples = REFERENCE_BORDER * geometry.ysize();
        if sample_indices.len() != expected_samples {
            return Err(SirsError::Format(format!(
                "{} reference sample indices given, {expected_samples} reference pixels per side",
                sample_indices.len()
            )));
        }

        let nvec = (nfreq - 1) / 2 + 1;
        let (low, high) = band_widths(geometry.ysize());
        if nvec < low {
            return Err(SirsError::Format(format!(
                "{nfreq} frequencies cannot cover the {low} low-frequency bins of a {}-row frame",
                geometry.ysize()
            )));
        }
        if include_high_frequency && nfreq < high {
            return Err(SirsError::Format(format!(
                "{nfreq} frequencies cannot cover the {high} high-frequency bins of a {}-row frame",
                geometry.ysize()
            )));
        }
        let spectrum_len = geometry.nstep() / 2 + 1;
        if include_high_frequency && low + high > spectrum_len {
            return Err(SirsError::Format(format!(
                "low and high frequency bands overlap in a {spectrum_len}-bin spectrum"
            )));
        }

        // f = 0 Hz is corrected from the reference rows only
        alpha.column_mut(0).fill(Complex64::new(0.0, 0.0));
        beta.column_mut(0).fill(Complex64::new(0.0, 0.0));

        let basis = FourierBasis::build(
            &sample_indices,
            nvec,
            geometry.nstep(),
            include_high_frequency,
        )?;

        log::info!(
            "calibration model ready: {geometry}, {nfreq} frequencies, basis {}x{}",
            basis.sample_count(),
            basis.column_total()
        );

        Ok(Self {
            geometry,
            freq,
            alpha,
            beta,
            sample_indices,
            basis,
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.freq
    }

    /// Number of low-frequency Fourier vectors, DC included.
    pub fn nvec(&self) -> usize {
        self.basis.nvec()
    }

    pub fn alpha(&self) -> &Array2<Complex64> {
        &self.alpha
    }

    pub fn beta(&self) -> &Array2<Complex64> {
        &self.beta
    }

    /// 0-based reference sample time steps.
    pub fn sample_indices(&self) -> &[usize] {
        &self.sample_indices
    }

    pub fn basis(&self) -> &FourierBasis {
        &self.basis
    }

    /// Incomplete Fourier transform of a flattened reference block.
    pub fn incomplete_ft(&self, data: &[f64]) -> Result<Vec<Complex64>> {
        Ok(self.basis.project(data)?.iter().copied().collect())
    }

    /// Amplitude and phase of α and β for output `op` across the frequency grid.
    pub fn weight_spectrum(&self, op: usize) -> Result<Vec<WeightSample>> {
        if op >= self.geometry.nout() {
            return Err(SirsError::Value(format!(
                "output {op} does not exist, detector has {} outputs",
                self.geometry.nout()
            )));
        }
        Ok(self
            .freq
            .iter()
            .enumerate()
            .map(|(k, &frequency)| {
                let a = self.alpha[[op, k]];
                let b = self.beta[[op, k]];
                WeightSample {
                    frequency,
                    alpha_amplitude: a.norm(),
                    alpha_phase: a.arg(),
                    beta_amplitude: b.norm(),
                    beta_phase: b.arg(),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::synthetic_table;
    use approx::assert_abs_diff_eq;

    fn small_geometry() -> Geometry {
        Geometry::from_outputs(4, 16, 16, 4).unwrap()
    }

    #[test]
    fn test_tuples_to_complex() {
        let rows = vec![vec![[1.0, 2.0], [3.0, -4.0]], vec![[0.0, 0.5], [-1.0, 0.0]]];
        let c = tuples_to_complex(&rows).unwrap();
        assert_eq!(c.dim(), (2, 2));
        assert_eq!(c[[0, 1]], Complex64::new(3.0, -4.0));
        assert_eq!(c[[1, 0]], Complex64::new(0.0, 0.5));
        assert_eq!(complex_to_tuples(&c), rows);
    }

    #[test]
    fn test_tuples_to_complex_rejects_ragged() {
        let rows = vec![vec![[1.0, 2.0], [3.0, -4.0]], vec![[0.0, 0.5]]];
        assert!(matches!(tuples_to_complex(&rows), Err(SirsError::Format(_))));
        assert!(matches!(tuples_to_complex(&[]), Err(SirsError::Format(_))));
    }

    #[test]
    fn test_load_converts_indices_and_zeroes_dc() {
        let table = synthetic_table(&small_geometry(), 7);
        let model = CalibrationModel::load(&table).unwrap();

        assert_eq!(model.sample_indices()[0], table.sft_j[0] - 1);
        assert_eq!(model.sample_indices(), &small_geometry().reference_sample_indices()[..]);
        assert_eq!(model.nvec(), 9);
        assert_eq!(model.basis().column_total(), 17);
        for op in 0..4 {
            assert_eq!(model.alpha()[[op, 0]], Complex64::new(0.0, 0.0));
            assert_eq!(model.beta()[[op, 0]], Complex64::new(0.0, 0.0));
        }
        let [re, im] = table.alpha[2][3];
        assert_eq!(model.alpha()[[2, 3]], Complex64::new(re, im));
    }

    #[test]
    fn test_load_without_high_frequencies() {
        let mut table = synthetic_table(&small_geometry(), 7);
        table.include_high_frequency = false;
        let model = CalibrationModel::load(&table).unwrap();
        assert_eq!(model.basis().column_total(), 9);
    }

    #[test]
    fn test_format_errors() {
        let good = synthetic_table(&small_geometry(), 3);

        let mut even = good.clone();
        even.freq.pop();
        assert!(matches!(CalibrationModel::load(&even), Err(SirsError::Format(_))));

        let mut bad_geometry = good.clone();
        bad_geometry.naxis1 = 60;
        assert!(matches!(
            CalibrationModel::load(&bad_geometry),
            Err(SirsError::Format(_))
        ));

        let mut short_alpha = good.clone();
        short_alpha.alpha.pop();
        assert!(matches!(
            CalibrationModel::load(&short_alpha),
            Err(SirsError::Format(_))
        ));

        let mut zero_based = good.clone();
        zero_based.sft_j[0] = 0;
        assert!(matches!(
            CalibrationModel::load(&zero_based),
            Err(SirsError::Format(_))
        ));

        let mut missing_samples = good.clone();
        missing_samples.sft_j.truncate(10);
        assert!(matches!(
            CalibrationModel::load(&missing_samples),
            Err(SirsError::Format(_))
        ));

        let mut too_few_freqs = good;
        too_few_freqs.freq.truncate(5);
        for row in too_few_freqs.alpha.iter_mut().chain(too_few_freqs.beta.iter_mut()) {
            row.truncate(5);
        }
        assert!(matches!(
            CalibrationModel::load(&too_few_freqs),
            Err(SirsError::Format(_))
        ));
    }

    #[test]
    fn test_json_missing_field_is_format_error() {
        let err = CalibrationTable::from_json_str(r#"{"naxis1": 64, "naxis2": 16}"#).unwrap_err();
        assert!(matches!(err, SirsError::Format(_)));
    }

    #[test]
    fn test_json_accepts_greek_field_names() {
        let table = synthetic_table(&small_geometry(), 11);
        let json = table
            .to_json_string()
            .unwrap()
            .replace("\"alpha\"", "\"α\"")
            .replace("\"beta\"", "\"β\"")
            .replace("\"sft_j\"", "\"SFT_j\"");
        let parsed = CalibrationTable::from_json_str(&json).unwrap();
        assert_eq!(parsed, table);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sirs_cal.json");
        let table = synthetic_table(&small_geometry(), 5);
        table.save_to_file(&path).unwrap();

        let model = CalibrationModel::load_from_file(&path).unwrap();
        assert_eq!(model.geometry(), &small_geometry());
    }

    #[test]
    fn test_weight_spectrum() {
        let model = CalibrationModel::load(&synthetic_table(&small_geometry(), 5)).unwrap();
        let spectrum = model.weight_spectrum(1).unwrap();
        assert_eq!(spectrum.len(), model.frequencies().len());
        assert_abs_diff_eq!(spectrum[0].alpha_amplitude, 0.0);

        let a = model.alpha()[[1, 4]];
        assert_abs_diff_eq!(spectrum[4].alpha_amplitude, a.norm());
        assert_abs_diff_eq!(spectrum[4].alpha_phase, a.arg());
        assert!(model.weight_spectrum(4).is_err());
    }

    #[test]
    fn test_incomplete_ft_length() {
        let model = CalibrationModel::load(&synthetic_table(&small_geometry(), 5)).unwrap();
        let data = vec![1.0; model.sample_indices().len()];
        let spectrum = model.incomplete_ft(&data).unwrap();
        assert_eq!(spectrum.len(), 17);
        assert!(matches!(model.incomplete_ft(&data[1..]), Err(SirsError::Shape(_))));
    }
}
