//! Measured and target densities.
//!
//! The solver never computes targets itself. A [`DensitySource`] answers
//! "what should the density be, and what was measured" at an input
//! percentage, and the session samples it once per tonal step when it
//! begins.

use serde::{Deserialize, Serialize};

use crate::curve::{input_percent, CURVE_RESOLUTION};

/// Supplier of `(target_density, measurement_density)` pairs.
///
/// Implemented for any `Fn(f64) -> (f64, f64)`, which is convenient for
/// synthetic measurements:
///
/// ```
/// use composite_density::DensitySource;
///
/// let source = |percent: f64| (percent / 100.0, percent / 120.0);
/// let (target, measured) = source.densities(60.0);
/// assert!(target > measured);
/// ```
pub trait DensitySource {
    fn densities(&self, input_percent: f64) -> (f64, f64);
}

impl<F> DensitySource for F
where
    F: Fn(f64) -> (f64, f64),
{
    fn densities(&self, input_percent: f64) -> (f64, f64) {
        self(input_percent)
    }
}

/// One tonal step of the measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub index: usize,
    pub input_percent: f64,
    pub target_density: f64,
    pub measurement_density: f64,
}

impl Sample {
    /// Density the correction must add (positive) or remove (negative).
    #[inline]
    pub fn delta_density(&self) -> f64 {
        self.target_density - self.measurement_density
    }
}

/// Sample a source at every tonal step.
pub fn sample_source<S>(source: &S) -> Vec<Sample>
where
    S: DensitySource + ?Sized,
{
    (0..CURVE_RESOLUTION)
        .map(|index| {
            let percent = input_percent(index);
            let (target_density, measurement_density) = source.densities(percent);
            Sample {
                index,
                input_percent: percent,
                target_density,
                measurement_density,
            }
        })
        .collect()
}
