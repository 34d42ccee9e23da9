//! Coverage ceiling clamp and its report.

use serde::{Deserialize, Serialize};

use crate::profile::ChannelProfile;

/// Overshoot smaller than this is float noise, not a clamp event.
const OVERFLOW_EPSILON: f64 = 1e-12;

/// A sample where the solved value exceeded the channel's ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClampEvent {
    pub index: usize,
    pub input_percent: f64,
    pub normalized_before: f64,
    pub desired_normalized_after: f64,
    pub normalized_after: f64,
    /// Amount above the nominal ceiling before clamping.
    pub overflow_normalized: f64,
    /// The buffered limit cut the value, not just the ceiling check.
    pub truncated: bool,
}

/// Per-channel coverage summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub channel: String,
    pub limit: f64,
    pub buffer: f64,
    pub buffered_limit: f64,
    pub max_normalized: f64,
    pub overflow_count: usize,
    /// Largest overflow above the ceiling.
    pub overflow_normalized: f64,
    pub clamped_samples: Vec<ClampEvent>,
}

impl CoverageReport {
    /// Room left under the buffered limit at the fullest sample.
    pub fn headroom(&self) -> f64 {
        (self.buffered_limit - self.max_normalized).max(0.0)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CoverageClamp {
    report: CoverageReport,
}

impl CoverageClamp {
    pub fn new(profile: &ChannelProfile) -> Self {
        Self {
            report: CoverageReport {
                channel: profile.name.clone(),
                limit: profile.ceiling_normalized(),
                buffer: profile.coverage_buffer,
                buffered_limit: profile.buffered_limit(),
                max_normalized: 0.0,
                overflow_count: 0,
                overflow_normalized: 0.0,
                clamped_samples: Vec::new(),
            },
        }
    }

    /// Clamp a solved value to `[0, buffered_limit]`, recording overflow.
    pub fn apply(&mut self, index: usize, input_percent: f64, before: f64, desired: f64) -> f64 {
        let report = &mut self.report;
        let after = desired.max(0.0).min(report.buffered_limit);
        let overflow = desired - report.limit;
        if overflow > OVERFLOW_EPSILON {
            report.overflow_count += 1;
            report.overflow_normalized = report.overflow_normalized.max(overflow);
            report.clamped_samples.push(ClampEvent {
                index,
                input_percent,
                normalized_before: before,
                desired_normalized_after: desired,
                normalized_after: after,
                overflow_normalized: overflow,
                truncated: desired > report.buffered_limit,
            });
        }
        report.max_normalized = report.max_normalized.max(after);
        after
    }

    pub fn into_report(self) -> CoverageReport {
        self.report
    }
}
