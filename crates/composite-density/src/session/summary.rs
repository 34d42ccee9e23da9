use serde::{Deserialize, Serialize};

use crate::curve::InkCurve;
use crate::engine::CoverageReport;
use crate::error::SessionWarning;
use crate::ladder::{MomentumPeak, WeightingMode};
use crate::options::SmoothingWindow;
use crate::slope::SlopeReport;

/// Ink summed over every channel and sample (normalized units).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InkTotals {
    pub baseline_ink: f64,
    pub corrected_ink: f64,
    pub ink_delta: f64,
}

impl InkTotals {
    pub(crate) fn add(&mut self, baseline: f64, corrected: f64) {
        self.baseline_ink += baseline;
        self.corrected_ink += corrected;
    }

    pub(crate) fn finished(mut self) -> Self {
        self.ink_delta = self.corrected_ink - self.baseline_ink;
        self
    }
}

/// Samples whose correction could not be fully placed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UnmetReport {
    pub samples: usize,
    /// Largest absolute remainder (density).
    pub max_remaining: f64,
}

impl UnmetReport {
    pub(crate) fn record(&mut self, remaining: f64) {
        self.samples += 1;
        self.max_remaining = self.max_remaining.max(remaining.abs());
    }

    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumSummary {
    pub window_radius: usize,
    pub sigma: f64,
    pub peaks: Vec<MomentumPeak>,
}

/// What a session did, in declaration order unless noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: u64,
    pub weighting_mode: WeightingMode,
    /// False when the session returned its inputs unchanged.
    pub corrected: bool,
    pub channel_names: Vec<String>,
    /// Ink ceilings in device units.
    pub channel_maxima: Vec<u16>,
    pub density_constants: Vec<f64>,
    pub density_weights: Vec<f64>,
    /// Session-wide ladder order (momentum mode reorders per sample).
    pub density_ladder: Vec<String>,
    pub smoothing: SmoothingWindow,
    pub blend_window: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<Vec<CoverageReport>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub momentum: Option<MomentumSummary>,
    pub totals: InkTotals,
    pub unmet: UnmetReport,
    /// Present when the slope pass ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slope: Option<SlopeReport>,
    pub warnings: Vec<SessionWarning>,
}

impl SessionSummary {
    pub fn coverage_for(&self, channel: &str) -> Option<&CoverageReport> {
        self.coverage.as_ref()?.iter().find(|r| r.channel == channel)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectedCurve {
    pub channel: String,
    pub curve: InkCurve,
}

/// Output of [`CompositeSession::finalize`](super::CompositeSession::finalize).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionResult {
    pub curves: Vec<CorrectedCurve>,
    pub summary: SessionSummary,
}

impl CorrectionResult {
    pub fn curve(&self, channel: &str) -> Option<&InkCurve> {
        self.curves
            .iter()
            .find(|c| c.channel == channel)
            .map(|c| &c.curve)
    }
}
