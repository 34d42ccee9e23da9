use composite_density::DensitySource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// One measured patch.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct MeasurementRow {
    /// Input level in percent (0-100)
    pub input: f64,
    /// Density the calibration aims for
    pub target: f64,
    /// Density actually printed
    pub measured: f64,
}

/// Measurement section of a session file: inline rows or a rows file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MeasurementSpec {
    #[serde(default)]
    pub rows: Vec<MeasurementRow>,

    /// YAML or JSON list of rows, relative to the session file
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Rescale densities so the largest target equals this value
    #[serde(default)]
    pub normalize_to: Option<f64>,
}

impl MeasurementSpec {
    /// Load the table. Inline rows win over a file.
    pub fn load(&self, base_dir: &Path) -> Result<MeasurementTable, ConfigError> {
        let rows = if !self.rows.is_empty() {
            self.rows.clone()
        } else if let Some(ref file) = self.file {
            let path = base_dir.join(file);
            let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?
        } else {
            return Err(ConfigError::MissingMeasurement);
        };

        let mut table = MeasurementTable::new(rows)?;
        if let Some(peak) = self.normalize_to {
            table.normalize_to(peak);
        }
        Ok(table)
    }
}

/// Measured densities interpolated over the input range.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementTable {
    rows: Vec<MeasurementRow>,
}

impl MeasurementTable {
    /// Sort rows by input; for duplicate inputs the later row wins.
    pub fn new(rows: Vec<MeasurementRow>) -> Result<Self, ConfigError> {
        if let Some(row) = rows
            .iter()
            .position(|r| !(r.input.is_finite() && r.target.is_finite() && r.measured.is_finite()))
        {
            return Err(ConfigError::NonFiniteRow { row });
        }

        let mut sorted: Vec<MeasurementRow> = Vec::with_capacity(rows.len());
        let mut indexed: Vec<(usize, MeasurementRow)> = rows.into_iter().enumerate().collect();
        indexed.sort_by(|a, b| a.1.input.total_cmp(&b.1.input).then(a.0.cmp(&b.0)));
        for (_, row) in indexed {
            match sorted.last_mut() {
                Some(last) if last.input == row.input => *last = row,
                _ => sorted.push(row),
            }
        }

        if sorted.len() < 2 {
            return Err(ConfigError::MeasurementTooShort(sorted.len()));
        }
        Ok(Self { rows: sorted })
    }

    pub fn rows(&self) -> &[MeasurementRow] {
        &self.rows
    }

    /// Scale target and measured densities so the largest target is `peak`.
    pub fn normalize_to(&mut self, peak: f64) {
        let max_target = self.rows.iter().map(|r| r.target).fold(0.0_f64, f64::max);
        if !peak.is_finite() || peak <= 0.0 || max_target <= 0.0 {
            tracing::warn!(peak, max_target, "Skipping measurement normalization");
            return;
        }
        let scale = peak / max_target;
        for row in &mut self.rows {
            row.target *= scale;
            row.measured *= scale;
        }
    }

    /// Interpolate `(target, measured)` at an input percentage, clamped at the ends.
    pub fn lookup(&self, input_percent: f64) -> (f64, f64) {
        let first = self.rows[0];
        let last = self.rows[self.rows.len() - 1];
        if input_percent <= first.input {
            return (first.target, first.measured);
        }
        if input_percent >= last.input {
            return (last.target, last.measured);
        }

        let upper = self.rows.partition_point(|r| r.input <= input_percent);
        let (a, b) = (self.rows[upper - 1], self.rows[upper]);
        let t = (input_percent - a.input) / (b.input - a.input);
        (
            a.target + (b.target - a.target) * t,
            a.measured + (b.measured - a.measured) * t,
        )
    }
}

impl DensitySource for MeasurementTable {
    fn densities(&self, input_percent: f64) -> (f64, f64) {
        self.lookup(input_percent)
    }
}
