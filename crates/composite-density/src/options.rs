//! Solver options and configuration.
//!
//! This module provides [`SolverOptions`] and the smaller option groups it
//! is made of. All groups deserialize with per-field defaults so that
//! configuration files only need to name what they change.

use serde::{Deserialize, Serialize};

use crate::curve::CURVE_RESOLUTION;
use crate::diagnostics::DEFAULT_FLAG_THRESHOLD;

/// Blend/smoothing window.
///
/// The window spans `target_span` of the tonal range, clamped to
/// `min_samples..=max_samples` samples. A channel may change by at most
/// `ceiling / window^alpha` (normalized) between adjacent samples.
///
/// # Defaults
///
/// - `target_span`: 0.07 (7% of the tonal range)
/// - `min_samples`: 3
/// - `max_samples`: 9
/// - `alpha`: 1.5
///
/// With the defaults the window is 9 samples and a full-scale channel may
/// move by 1/27 per sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingWindow {
    pub target_span: f64,
    pub min_samples: usize,
    pub max_samples: usize,
    pub alpha: f64,
}

impl Default for SmoothingWindow {
    fn default() -> Self {
        Self {
            target_span: 0.07,
            min_samples: 3,
            max_samples: 9,
            alpha: 1.5,
        }
    }
}

impl SmoothingWindow {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn target_span(mut self, span: f64) -> Self {
        self.target_span = span;
        self
    }

    #[inline]
    pub fn samples(mut self, min: usize, max: usize) -> Self {
        self.min_samples = min;
        self.max_samples = max;
        self
    }

    #[inline]
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Window size in samples.
    pub fn sample_count(&self) -> usize {
        let min = self.min_samples.max(1);
        let max = self.max_samples.max(min);
        let span = if self.target_span.is_finite() && self.target_span > 0.0 {
            self.target_span
        } else {
            Self::default().target_span
        };
        let raw = (span * (CURVE_RESOLUTION - 1) as f64).round() as usize;
        raw.clamp(min, max)
    }

    /// Largest per-sample change for a channel with the given ceiling.
    pub fn max_step(&self, ceiling_normalized: f64) -> f64 {
        let alpha = if self.alpha.is_finite() && self.alpha >= 0.0 {
            self.alpha
        } else {
            Self::default().alpha
        };
        ceiling_normalized / (self.sample_count() as f64).powf(alpha)
    }
}

/// Reserve band near the ink ceiling.
///
/// A channel enters its reserve band once its usage passes
/// `start_fraction` of the ceiling. Inside the band the allowed growth per
/// sample is scaled by `(headroom / band)^taper_exponent`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReserveOptions {
    pub start_fraction: f64,
    pub taper_exponent: f64,
}

impl Default for ReserveOptions {
    fn default() -> Self {
        Self {
            start_fraction: 0.8,
            taper_exponent: 0.5,
        }
    }
}

impl ReserveOptions {
    /// Band width for a channel with the given ceiling.
    pub fn band(&self, ceiling_normalized: f64) -> f64 {
        let start = if self.start_fraction.is_finite() {
            self.start_fraction.clamp(0.0, 1.0)
        } else {
            Self::default().start_fraction
        };
        ceiling_normalized * (1.0 - start)
    }

    /// Continuous taper over `x = headroom / band`, clamped to `[0, 1]`.
    pub fn taper(&self, x: f64) -> f64 {
        if !x.is_finite() || x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        let exponent = if self.taper_exponent.is_finite() && self.taper_exponent > 0.0 {
            self.taper_exponent
        } else {
            Self::default().taper_exponent
        };
        x.powf(exponent)
    }
}

/// Gaussian momentum window used by the momentum weighting mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumOptions {
    pub window_radius: usize,
    pub sigma: f64,
    /// How strongly local headroom pulls a channel forward in the ladder.
    pub bias: f64,
}

impl Default for MomentumOptions {
    fn default() -> Self {
        Self {
            window_radius: 2,
            sigma: 1.0,
            bias: 2.0,
        }
    }
}

impl MomentumOptions {
    /// Sigma actually used; invalid values fall back to `radius / 1.5`.
    pub fn effective_sigma(&self) -> f64 {
        if self.sigma.is_finite() && self.sigma > 0.0 {
            self.sigma
        } else {
            (self.window_radius.max(1) as f64) / 1.5
        }
    }
}

/// Slope limiting after the scan.
///
/// When enabled, every corrected curve is reshaped so that adjacent
/// samples differ by less than `threshold_percent` of full scale. Steep
/// runs are first spread over nearby samples with a Gaussian kernel (if
/// `kernel` is set); whatever is still too steep goes through a hard
/// two-sided limiter.
///
/// # Defaults
///
/// - `enabled`: false
/// - `threshold_percent`: 7
/// - `kernel`: true
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlopeOptions {
    pub enabled: bool,
    pub threshold_percent: f64,
    pub kernel: bool,
}

impl Default for SlopeOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_percent: DEFAULT_FLAG_THRESHOLD,
            kernel: true,
        }
    }
}

impl SlopeOptions {
    /// Enabled limiter with default settings.
    #[inline]
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    #[inline]
    pub fn threshold_percent(mut self, percent: f64) -> Self {
        self.threshold_percent = percent;
        self
    }

    #[inline]
    pub fn kernel(mut self, kernel: bool) -> Self {
        self.kernel = kernel;
        self
    }

    /// Threshold as a fraction of full scale.
    pub fn threshold(&self) -> f64 {
        let percent = if self.threshold_percent.is_finite() && self.threshold_percent > 0.0 {
            self.threshold_percent
        } else {
            DEFAULT_FLAG_THRESHOLD
        };
        percent / 100.0
    }
}

/// Configuration for [`CompositeSolver`](crate::CompositeSolver).
///
/// # Example
///
/// ```
/// use composite_density::{SmoothingWindow, SolverOptions};
///
/// let options = SolverOptions::new()
///     .smoothing(SmoothingWindow::new().samples(3, 12))
///     .coverage_reporting(false);
/// assert!(!options.coverage_reporting);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub smoothing: SmoothingWindow,
    pub reserve: ReserveOptions,
    pub momentum: MomentumOptions,
    pub slope: SlopeOptions,

    /// Include per-channel coverage reports in the summary.
    ///
    /// The clamp itself always runs; this only controls reporting.
    ///
    /// Default: `true`
    pub coverage_reporting: bool,

    /// Coverage buffer for channels that do not set their own.
    ///
    /// Default: `0.005`
    pub coverage_buffer: f64,

    /// Headroom (normalized) below which a channel counts as out of room.
    ///
    /// Default: `1e-4`
    pub capacity_threshold: f64,

    /// Density remainder below which a sample counts as fully corrected.
    ///
    /// Default: `1e-6`
    pub unmet_tolerance: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            smoothing: SmoothingWindow::default(),
            reserve: ReserveOptions::default(),
            momentum: MomentumOptions::default(),
            slope: SlopeOptions::default(),
            coverage_reporting: true,
            coverage_buffer: 0.005,
            capacity_threshold: 1e-4,
            unmet_tolerance: 1e-6,
        }
    }
}

impl SolverOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn smoothing(mut self, smoothing: SmoothingWindow) -> Self {
        self.smoothing = smoothing;
        self
    }

    #[inline]
    pub fn reserve(mut self, reserve: ReserveOptions) -> Self {
        self.reserve = reserve;
        self
    }

    #[inline]
    pub fn momentum(mut self, momentum: MomentumOptions) -> Self {
        self.momentum = momentum;
        self
    }

    #[inline]
    pub fn slope(mut self, slope: SlopeOptions) -> Self {
        self.slope = slope;
        self
    }

    #[inline]
    pub fn coverage_reporting(mut self, enabled: bool) -> Self {
        self.coverage_reporting = enabled;
        self
    }

    #[inline]
    pub fn coverage_buffer(mut self, buffer: f64) -> Self {
        self.coverage_buffer = buffer;
        self
    }

    pub(crate) fn sanitized_buffer(&self, requested: Option<f64>) -> f64 {
        match requested {
            Some(buffer) if buffer.is_finite() && buffer >= 0.0 => buffer,
            _ if self.coverage_buffer.is_finite() && self.coverage_buffer >= 0.0 => {
                self.coverage_buffer
            }
            _ => Self::default().coverage_buffer,
        }
    }
}
