//! Auto-raise of ink limits
//!
//! Before the real session runs, a dry session with the configured limits
//! shows whether the correction fits. When it does not, channels whose
//! coverage is exhausted (and that no partner channel can relieve) get their
//! ink limit raised to the target. Base curves are left alone; only the
//! ceiling moves.

use composite_density::{
    to_device, ChannelSpec, CompositeSolver, CoverageReport, DensitySource, InkCurve,
    SessionRequest, SessionSummary, WeightingMode,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::AppError;

/// Headroom above which a channel can still take more correction
pub const HEADROOM_TOLERANCE: f64 = 0.005;
/// Headroom a partner channel needs to take over
pub const HANDOFF_TOLERANCE: f64 = 0.003;
/// How close a partner's buffered limit must be to the target
pub const TARGET_TOLERANCE: f64 = 0.01;
const FLOAT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RaiseReason {
    CoverageAvailable,
    HandoffAvailable,
    CoverageExhausted,
    NoCoverageData,
    AlreadyAtTarget,
    Locked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRaise {
    pub channel: String,
    pub previous_limit: u16,
    pub new_limit: u16,
    pub raised: bool,
    pub locked: bool,
    pub reason: RaiseReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headroom: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoRaiseReport {
    /// Target in percent of full scale (0-100)
    pub target_percent: f64,
    /// Whether the dry run left correction unmet
    pub triggered: bool,
    pub unmet_samples: usize,
    pub channels: Vec<ChannelRaise>,
}

impl AutoRaiseReport {
    pub fn raised(&self) -> impl Iterator<Item = &ChannelRaise> {
        self.channels.iter().filter(|c| c.raised)
    }

    pub fn any_raised(&self) -> bool {
        self.channels.iter().any(|c| c.raised)
    }

    /// Write raised limits into the channel specs.
    pub fn apply(&self, specs: &mut [ChannelSpec]) {
        for raise in self.raised() {
            if let Some(spec) = specs.iter_mut().find(|s| s.name == raise.channel) {
                spec.ink_limit = raise.new_limit;
            }
        }
    }
}

/// Target as a percentage: fractions up to 1.0001 are scaled by 100 and
/// anything above 100 is clamped.
pub fn normalize_target_percent(value: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return 100.0;
    }
    let percent = if value <= 1.0001 { value * 100.0 } else { value };
    percent.min(100.0)
}

/// Dry-run a session and decide which limits to raise.
pub fn run(
    solver: &CompositeSolver,
    mode: WeightingMode,
    specs: &[ChannelSpec],
    curves: &[InkCurve],
    source: &dyn DensitySource,
    locked: &HashSet<String>,
    target_percent: f64,
) -> Result<AutoRaiseReport, AppError> {
    let options = solver.options().clone().coverage_reporting(true);
    let mut dry = CompositeSolver::new(options).with_registry(solver.registry().clone());

    let request = SessionRequest::new(mode).channels(specs.iter().cloned());
    let mut session = dry.begin(request, source)?;
    for (spec, curve) in specs.iter().zip(curves) {
        session.register(&spec.name, curve.as_slice());
    }
    let result = session.finalize();

    let report = decide(&result.summary, specs, locked, target_percent);
    tracing::info!(
        triggered = report.triggered,
        raised = report.raised().count(),
        target = report.target_percent,
        "Auto-raise evaluated"
    );
    Ok(report)
}

/// Decide per channel from a dry-run summary.
pub fn decide(
    summary: &SessionSummary,
    specs: &[ChannelSpec],
    locked: &HashSet<String>,
    target_percent: f64,
) -> AutoRaiseReport {
    let target_percent = normalize_target_percent(target_percent);
    let mut report = AutoRaiseReport {
        target_percent,
        triggered: !summary.unmet.is_empty(),
        unmet_samples: summary.unmet.samples,
        channels: Vec::new(),
    };
    if !report.triggered {
        return report;
    }

    let target = target_percent / 100.0;
    let target_limit = to_device(target);
    let coverage = summary.coverage.as_deref().unwrap_or_default();

    for spec in specs.iter().filter(|s| s.ink_limit > 0) {
        let entry = coverage.iter().find(|r| r.channel == spec.name);
        let headroom = entry.map(CoverageReport::headroom);
        let mut raise = ChannelRaise {
            channel: spec.name.clone(),
            previous_limit: spec.ink_limit,
            new_limit: spec.ink_limit,
            raised: false,
            locked: false,
            reason: coverage_reason(coverage, entry, target),
            headroom,
        };

        let wants_raise = matches!(
            raise.reason,
            RaiseReason::CoverageExhausted | RaiseReason::NoCoverageData
        );
        if wants_raise {
            if locked.contains(&spec.name) {
                raise.locked = true;
                raise.reason = RaiseReason::Locked;
            } else if target_limit > spec.ink_limit {
                raise.new_limit = target_limit;
                raise.raised = true;
                tracing::info!(
                    channel = %spec.name,
                    from = spec.ink_limit,
                    to = target_limit,
                    "Raising ink limit"
                );
            } else {
                raise.reason = RaiseReason::AlreadyAtTarget;
            }
        }
        report.channels.push(raise);
    }
    report
}

fn coverage_reason(
    coverage: &[CoverageReport],
    entry: Option<&CoverageReport>,
    target: f64,
) -> RaiseReason {
    let Some(entry) = entry else {
        return RaiseReason::NoCoverageData;
    };
    if entry.headroom() > HEADROOM_TOLERANCE + FLOAT_EPSILON {
        return RaiseReason::CoverageAvailable;
    }
    let partner = coverage.iter().any(|other| {
        other.channel != entry.channel
            && other.headroom() > HANDOFF_TOLERANCE + FLOAT_EPSILON
            && other.buffered_limit + TARGET_TOLERANCE + FLOAT_EPSILON >= target
    });
    if partner {
        RaiseReason::HandoffAvailable
    } else {
        RaiseReason::CoverageExhausted
    }
}
