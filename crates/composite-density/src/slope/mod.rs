//! Slope limiting after the scan.
//!
//! The engine bounds every step by the blend window, but a channel can
//! still climb faster than the print can show smoothly where its base curve
//! is steep. When [`SlopeOptions::enabled`](crate::SlopeOptions) is set, the
//! finished curves go through this pass:
//!
//! 1. Steep runs are spread over nearby samples with a Gaussian kernel.
//!    Samples where the engine was pinned (blend-limited, exhausted, out of
//!    headroom or clamped) are locked and never reshaped.
//! 2. Whatever is still over the threshold goes through a hard limiter.
//!
//! Both steps only move values toward their neighbours, so a curve never
//! leaves the range it already had and coverage limits still hold.

mod kernel;
mod limiter;

use serde::{Deserialize, Serialize};

pub use kernel::{smooth_with_kernel, KernelOutcome};
pub use limiter::{enforce_slope_limit, LIMIT_MARGIN};

use crate::options::SlopeOptions;

#[inline]
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Largest absolute step between adjacent values.
pub fn max_step(series: &[f64]) -> f64 {
    series
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .fold(0.0, f64::max)
}

/// What the slope pass did to one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlopeChannelReport {
    pub channel: String,
    /// Windows reshaped by the kernel.
    pub kernel_windows: usize,
    /// The hard limiter ran.
    pub limited: bool,
    /// At least one device value changed.
    pub adjusted: bool,
    /// Largest step in percent of full scale, before and after.
    pub max_step_before_percent: f64,
    pub max_step_after_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlopeReport {
    pub threshold_percent: f64,
    pub channels: Vec<SlopeChannelReport>,
}

impl SlopeReport {
    pub fn channel(&self, name: &str) -> Option<&SlopeChannelReport> {
        self.channels.iter().find(|c| c.channel == name)
    }

    /// Any channel changed.
    pub fn adjusted(&self) -> bool {
        self.channels.iter().any(|c| c.adjusted)
    }
}

/// Run the kernel and, where needed, the limiter over one series.
///
/// Returns the number of kernel windows and whether the limiter ran.
pub(crate) fn limit_series(series: &mut [f64], locks: &[bool], options: &SlopeOptions) -> (usize, bool) {
    let threshold = options.threshold();
    let windows = if options.kernel {
        smooth_with_kernel(series, threshold, locks).windows
    } else {
        0
    };
    // the kernel may leave steps just under the threshold plus its tolerance
    let limited = max_step(series) > threshold - LIMIT_MARGIN;
    if limited {
        enforce_slope_limit(series, threshold);
    }
    (windows, limited)
}
