//! Ink curves in device units.
//!
//! Every channel curve has exactly [`CURVE_RESOLUTION`] samples holding ink
//! amounts between `0` and [`TOTAL_INK`]. The solver works in normalized
//! units (`value / TOTAL_INK`), so the helpers here are the only place
//! where device units are converted.

use serde::{Deserialize, Serialize};

use crate::error::CurveLengthError;

/// Number of tonal samples in every curve.
pub const CURVE_RESOLUTION: usize = 256;

/// Full-scale device value.
pub const TOTAL_INK: u16 = 65535;

/// Convert a device value to normalized units.
#[inline]
pub fn to_normalized(value: u16) -> f64 {
    f64::from(value) / f64::from(TOTAL_INK)
}

/// Convert a normalized value back to device units, clamping to full scale.
#[inline]
pub fn to_device(normalized: f64) -> u16 {
    if !normalized.is_finite() || normalized <= 0.0 {
        return 0;
    }
    (normalized.min(1.0) * f64::from(TOTAL_INK)).round() as u16
}

/// Input percentage of a sample index (0 at index 0, 100 at index 255).
#[inline]
pub fn input_percent(index: usize) -> f64 {
    index as f64 / (CURVE_RESOLUTION - 1) as f64 * 100.0
}

/// A 256-sample ink curve in device units.
///
/// The length is checked on construction, so indexing with any sample
/// index below [`CURVE_RESOLUTION`] never fails. Serializes as a plain list
/// of integers.
///
/// # Example
///
/// ```
/// use composite_density::{InkCurve, TOTAL_INK};
///
/// let ramp = InkCurve::linear(0, TOTAL_INK);
/// assert_eq!(ramp.get(0), 0);
/// assert_eq!(ramp.get(255), TOTAL_INK);
/// assert_eq!(ramp.end_value(), TOTAL_INK);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u16>", into = "Vec<u16>")]
pub struct InkCurve(Vec<u16>);

impl InkCurve {
    /// A curve with no ink at any step.
    pub fn zeros() -> Self {
        Self(vec![0; CURVE_RESOLUTION])
    }

    /// A curve holding the same value at every step.
    pub fn flat(value: u16) -> Self {
        Self(vec![value; CURVE_RESOLUTION])
    }

    /// A straight ramp from `start` at index 0 to `end` at index 255.
    pub fn linear(start: u16, end: u16) -> Self {
        Self::from_fn(|i| {
            let t = i as f64 / (CURVE_RESOLUTION - 1) as f64;
            let value = f64::from(start) + (f64::from(end) - f64::from(start)) * t;
            value.round() as u16
        })
    }

    /// Build a curve from a function of the sample index.
    pub fn from_fn(f: impl FnMut(usize) -> u16) -> Self {
        Self((0..CURVE_RESOLUTION).map(f).collect())
    }

    /// Build a curve from normalized values, clamped to `[0, 1]`.
    pub fn from_normalized(values: impl IntoIterator<Item = f64>) -> Result<Self, CurveLengthError> {
        let samples: Vec<u16> = values.into_iter().map(to_device).collect();
        Self::try_from(samples)
    }

    /// Device value at a sample index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= CURVE_RESOLUTION`.
    #[inline]
    pub fn get(&self, index: usize) -> u16 {
        self.0[index]
    }

    /// Normalized value at a sample index.
    #[inline]
    pub fn normalized(&self, index: usize) -> f64 {
        to_normalized(self.0[index])
    }

    /// Largest value on the curve.
    pub fn end_value(&self) -> u16 {
        self.0.iter().copied().max().unwrap_or(0)
    }

    /// Sum of all samples in normalized units.
    pub fn total_normalized(&self) -> f64 {
        self.0.iter().map(|&v| to_normalized(v)).sum()
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied()
    }

    pub(crate) fn set(&mut self, index: usize, value: u16) {
        self.0[index] = value;
    }
}

impl Default for InkCurve {
    fn default() -> Self {
        Self::zeros()
    }
}

impl TryFrom<Vec<u16>> for InkCurve {
    type Error = CurveLengthError;

    fn try_from(samples: Vec<u16>) -> Result<Self, Self::Error> {
        if samples.len() != CURVE_RESOLUTION {
            return Err(CurveLengthError {
                actual: samples.len(),
            });
        }
        Ok(Self(samples))
    }
}

impl TryFrom<&[u16]> for InkCurve {
    type Error = CurveLengthError;

    fn try_from(samples: &[u16]) -> Result<Self, Self::Error> {
        Self::try_from(samples.to_vec())
    }
}

impl From<InkCurve> for Vec<u16> {
    fn from(curve: InkCurve) -> Self {
        curve.0
    }
}
