//! Per-sample redistribution engine.
//!
//! The engine is a scan over the 256 tonal samples. Each channel carries a
//! *correction layer* (normalized ink above or below its base curve) from
//! one sample to the next, and every sample moves those layers toward the
//! requested density delta.
//!
//! # One sample
//!
//! 1. Compute per-channel bounds for the new layer. Growth is limited by the
//!    blend step scaled by the reserve tracker and by the ink ceiling.
//!    Shrinking is limited by the blend step and by the base curve, since
//!    output ink cannot go negative.
//! 2. Walk the ladder. Layers pointing against the remaining correction are
//!    unwound first, last ladder channel first. Then the remainder is
//!    promoted in ladder order; a channel is skipped while an earlier one is
//!    still unwinding.
//! 3. Rebalance. Density held by a later channel moves onto earlier
//!    channels that still have room in the same direction, so black drains
//!    back into cyan once cyan can take it. The sample total is unchanged.
//! 4. Clamp every channel at its coverage limit, record overflow, write the
//!    output value and advance the reserve state.
//!
//! Whatever the walk could not place is reported as an unmet correction.
//!
//! After the last sample an optional slope pass reshapes steep runs (see
//! [`crate::slope`]). Snapshots are built once that pass is done, so they
//! always describe the curves that are returned.
//!
//! If the previous layer no longer fits between the floor and ceiling of
//! the new sample, continuity wins and the coverage clamp has the last word.

mod blend;
mod coverage;
mod reserve;

pub use coverage::{ClampEvent, CoverageReport};
pub use reserve::ReserveState;

use blend::BlendWindow;
use coverage::CoverageClamp;
use reserve::{ReserveStep, ReserveTracker};

use crate::curve::{to_device, to_normalized, InkCurve};
use crate::diagnostics::{
    BlockReason, ChannelSampleState, LadderBlock, LadderDirection, LadderStep, LadderTransfer,
    SampleSnapshot, TraceRecorder,
};
use crate::error::SessionWarning;
use crate::ladder::{DensityLadder, WeightingMode};
use crate::measurement::Sample;
use crate::options::SolverOptions;
use crate::profile::ChannelProfile;
use crate::session::{InkTotals, UnmetReport};
use crate::slope::{self, max_step, SlopeChannelReport, SlopeReport};

const EPSILON: f64 = 1e-9;

/// Delta densities below this are treated as zero.
const NEGLIGIBLE_DELTA: f64 = 1e-6;

/// Limits on one channel's layer at one sample.
#[derive(Debug, Clone, Copy, Default)]
struct Bounds {
    active: bool,
    base: f64,
    lo: f64,
    hi: f64,
    start: f64,
    blend_cap: f64,
    at_roof: bool,
    at_floor: bool,
}

#[derive(Debug, Clone, Copy)]
struct WalkStep {
    channel: usize,
    rank: usize,
    applied: f64,
}

#[derive(Debug, Clone, Copy)]
struct WalkBlock {
    channel: usize,
    reason: BlockReason,
    blocked_by: Option<usize>,
    headroom: f64,
    layer: f64,
}

#[derive(Debug, Clone, Copy)]
struct WalkTransfer {
    from: usize,
    to: usize,
    density: f64,
}

#[derive(Debug, Clone)]
struct Walk {
    layers: Vec<f64>,
    direction: LadderDirection,
    promotions: Vec<WalkStep>,
    releases: Vec<WalkStep>,
    blocked: Vec<WalkBlock>,
    transfers: Vec<WalkTransfer>,
}

impl Walk {
    fn start(bounds: &[Bounds]) -> Self {
        Self {
            layers: bounds.iter().map(|b| b.start).collect(),
            direction: LadderDirection::Hold,
            promotions: Vec::new(),
            releases: Vec::new(),
            blocked: Vec::new(),
            transfers: Vec::new(),
        }
    }

    fn block(&mut self, channel: usize, reason: BlockReason, blocked_by: Option<usize>, headroom: f64) {
        self.blocked.push(WalkBlock {
            channel,
            reason,
            blocked_by,
            headroom,
            layer: self.layers[channel],
        });
    }

    /// Move a layer toward `limit` by at most `gap / unit`, returning the
    /// density placed.
    fn take(&mut self, channel: usize, limit: f64, direction: f64, gap: f64, unit: f64) -> (f64, f64) {
        let room = ((limit - self.layers[channel]) * direction).max(0.0);
        let amount = room.min(gap.abs() / unit);
        if amount > 0.0 {
            self.layers[channel] += amount * direction;
        }
        (amount * direction, room - amount)
    }
}

/// Result of solving one channel at one sample.
#[derive(Debug, Clone, Copy)]
struct ChannelOutcome {
    bounds: Bounds,
    walk_layer: f64,
    after: f64,
    reserve: ReserveState,
    release_scale: f64,
    allowance: f64,
}

impl ChannelOutcome {
    fn inert(bounds: Bounds) -> Self {
        Self {
            bounds,
            walk_layer: 0.0,
            after: bounds.base,
            reserve: ReserveState::Approaching,
            release_scale: 0.0,
            allowance: 0.0,
        }
    }
}

/// Everything a snapshot needs once the scan is over.
struct SampleRecord {
    delta: f64,
    ease: f64,
    order: Vec<usize>,
    walk: Walk,
    outcomes: Vec<ChannelOutcome>,
}

#[derive(Debug, Clone, Default)]
struct Carry {
    layer: f64,
    after: f64,
    reserve: ReserveTracker,
}

pub(crate) struct EngineOutput {
    pub curves: Vec<InkCurve>,
    pub coverage: Vec<CoverageReport>,
    pub warnings: Vec<SessionWarning>,
    pub totals: InkTotals,
    pub unmet: UnmetReport,
    pub slope: Option<SlopeReport>,
}

pub(crate) struct Engine<'a> {
    profiles: &'a [ChannelProfile],
    ladder: &'a DensityLadder,
    options: &'a SolverOptions,
    blend: BlendWindow,
    carry: Vec<Carry>,
    clamps: Vec<CoverageClamp>,
    curves: Vec<InkCurve>,
    /// Final normalized value per channel and sample.
    afters: Vec<Vec<f64>>,
    /// Samples the slope pass must leave alone.
    locks: Vec<Vec<bool>>,
    deltas: Vec<(usize, f64)>,
    warnings: Vec<SessionWarning>,
    totals: InkTotals,
    unmet: UnmetReport,
    previous_delta: f64,
}

impl<'a> Engine<'a> {
    pub fn new(profiles: &'a [ChannelProfile], ladder: &'a DensityLadder, options: &'a SolverOptions) -> Self {
        Self {
            profiles,
            ladder,
            options,
            blend: BlendWindow::new(&options.smoothing, profiles),
            carry: profiles.iter().map(|_| Carry::default()).collect(),
            clamps: profiles.iter().map(CoverageClamp::new).collect(),
            curves: profiles.iter().map(|p| p.base_curve.clone()).collect(),
            afters: profiles
                .iter()
                .map(|p| p.base_curve.iter().map(to_normalized).collect())
                .collect(),
            locks: profiles.iter().map(|p| vec![false; p.base_curve.as_slice().len()]).collect(),
            deltas: Vec::new(),
            warnings: Vec::new(),
            totals: InkTotals::default(),
            unmet: UnmetReport::default(),
            previous_delta: 0.0,
        }
    }

    pub fn run(mut self, samples: &[Sample], recorder: Option<&mut dyn TraceRecorder>) -> EngineOutput {
        let mut records = Vec::new();
        for sample in samples {
            let delta = self.sample_delta(sample);
            self.blend.observe(delta);
            let order = self.ladder.order_at(sample.index);
            let bounds = self.bounds(sample.index);
            let walk = match self.ladder.mode() {
                WeightingMode::Isolated => self.walk_isolated(delta, &bounds),
                WeightingMode::Equal | WeightingMode::Normalized | WeightingMode::Momentum => {
                    self.walk_ladder(delta, &order, &bounds)
                }
            };
            let outcomes = self.commit(sample, delta, &bounds, &walk);
            if recorder.is_some() {
                records.push(SampleRecord {
                    delta,
                    ease: self.blend.ease(),
                    order,
                    walk,
                    outcomes,
                });
            }
        }

        let slope = self.options.slope.enabled.then(|| self.limit_slopes());
        if let Some(recorder) = recorder {
            for (sample, record) in samples.iter().zip(&records) {
                recorder.record(self.snapshot(sample, record));
            }
        }
        self.finish(slope)
    }

    fn sample_delta(&mut self, sample: &Sample) -> f64 {
        let raw = sample.delta_density();
        let delta = if raw.is_finite() {
            raw
        } else {
            tracing::warn!(index = sample.index, "Non-finite density sample, reusing previous delta");
            self.warnings.push(SessionWarning::NonFiniteSample {
                index: sample.index,
            });
            self.previous_delta
        };
        let delta = if delta.abs() < NEGLIGIBLE_DELTA { 0.0 } else { delta };
        self.previous_delta = delta;
        delta
    }

    fn bounds(&self, index: usize) -> Vec<Bounds> {
        let reserve = &self.options.reserve;
        self.profiles
            .iter()
            .enumerate()
            .map(|(c, profile)| {
                let base = profile.base_curve.normalized(index);
                if !profile.is_active() {
                    return Bounds {
                        base,
                        ..Bounds::default()
                    };
                }
                let carry = &self.carry[c];
                let ceiling = profile.ceiling_normalized();
                let step = self.blend.step(c);
                let headroom = (ceiling - base - carry.layer).max(0.0);
                let limits = carry.reserve.limits(headroom, reserve.band(ceiling), reserve);

                let growth_cap = step * limits.growth;
                let shrink_cap = step * limits.shrink;
                let roof = ceiling - base;
                let floor = -base;
                let lo = floor.max(carry.layer - shrink_cap);
                let hi = roof.min(carry.layer + growth_cap).max(lo);
                Bounds {
                    active: true,
                    base,
                    lo,
                    hi,
                    start: carry.layer.max(lo).min(hi),
                    blend_cap: step,
                    at_roof: roof <= carry.layer + growth_cap,
                    at_floor: floor >= carry.layer - shrink_cap,
                }
            })
            .collect()
    }

    fn achieved(&self, layers: &[f64]) -> f64 {
        layers
            .iter()
            .enumerate()
            .map(|(c, layer)| self.ladder.unit_density(c) * layer)
            .sum()
    }

    fn block_reason(&self, channel: usize, direction: f64, bounds: &Bounds) -> BlockReason {
        if direction > 0.0 {
            if self.carry[channel].reserve.state() == ReserveState::Exhausted {
                BlockReason::Exhausted
            } else if bounds.at_roof {
                BlockReason::Ceiling
            } else {
                BlockReason::BlendLimited
            }
        } else if bounds.at_floor {
            BlockReason::Floor
        } else {
            BlockReason::BlendLimited
        }
    }

    fn walk_ladder(&self, delta: f64, order: &[usize], bounds: &[Bounds]) -> Walk {
        let mut walk = Walk::start(bounds);
        let gap = delta - self.achieved(&walk.layers);
        if gap.abs() > self.options.unmet_tolerance {
            self.place(gap, order, bounds, &mut walk);
        }
        self.rebalance(order, bounds, &mut walk);
        walk
    }

    fn place(&self, mut gap: f64, order: &[usize], bounds: &[Bounds], walk: &mut Walk) {
        let tolerance = self.options.unmet_tolerance;
        let direction = gap.signum();
        walk.direction = LadderDirection::of(direction);

        // Unwind layers that point the other way, last ladder channel first.
        for (rank, &c) in order.iter().enumerate().rev() {
            if gap.abs() <= tolerance {
                break;
            }
            let unit = self.ladder.unit_density(c);
            if unit <= 0.0 || walk.layers[c] * direction >= -EPSILON {
                continue;
            }
            let target = if direction > 0.0 {
                bounds[c].hi.min(0.0)
            } else {
                bounds[c].lo.max(0.0)
            };
            let (applied, _) = walk.take(c, target, direction, gap, unit);
            if applied != 0.0 {
                gap -= applied * unit;
                walk.releases.push(WalkStep {
                    channel: c,
                    rank,
                    applied,
                });
            }
        }

        for (rank, &c) in order.iter().enumerate() {
            if gap.abs() <= tolerance {
                break;
            }
            let unit = self.ladder.unit_density(c);
            if unit <= 0.0 {
                walk.block(c, BlockReason::NoDensity, None, 0.0);
                continue;
            }
            let limit = if direction > 0.0 { bounds[c].hi } else { bounds[c].lo };
            let unwinding = order[..rank]
                .iter()
                .copied()
                .find(|&e| walk.layers[e] * direction < -EPSILON);
            if let Some(earlier) = unwinding {
                let room = ((limit - walk.layers[c]) * direction).max(0.0);
                walk.block(c, BlockReason::Unwinding, Some(earlier), room);
                continue;
            }
            let (applied, room_left) = walk.take(c, limit, direction, gap, unit);
            if applied != 0.0 {
                gap -= applied * unit;
                walk.promotions.push(WalkStep {
                    channel: c,
                    rank,
                    applied,
                });
            }
            if gap.abs() > tolerance {
                let reason = self.block_reason(c, direction, &bounds[c]);
                walk.block(c, reason, None, room_left);
            }
        }
    }

    /// Move density from later ladder channels onto earlier ones that still
    /// have room in the same direction. Both stay within their bounds, the
    /// giving layer never passes zero and the sample total is kept.
    fn rebalance(&self, order: &[usize], bounds: &[Bounds], walk: &mut Walk) {
        for direction in [1.0, -1.0] {
            // never grow against the walk
            if walk.direction == LadderDirection::of(-direction) {
                continue;
            }
            for (rank, &from) in order.iter().enumerate().rev() {
                let from_unit = self.ladder.unit_density(from);
                if from_unit <= 0.0 {
                    continue;
                }
                let keep = if direction > 0.0 {
                    bounds[from].lo.max(0.0)
                } else {
                    bounds[from].hi.min(0.0)
                };
                for &to in &order[..rank] {
                    let to_unit = self.ladder.unit_density(to);
                    if to_unit <= 0.0 {
                        continue;
                    }
                    let spare = ((walk.layers[from] - keep) * direction).max(0.0) * from_unit;
                    if spare <= EPSILON {
                        break;
                    }
                    let limit = if direction > 0.0 { bounds[to].hi } else { bounds[to].lo };
                    let room = ((limit - walk.layers[to]) * direction).max(0.0) * to_unit;
                    let density = room.min(spare);
                    if density <= EPSILON {
                        continue;
                    }
                    walk.layers[to] += direction * density / to_unit;
                    walk.layers[from] -= direction * density / from_unit;
                    walk.transfers.push(WalkTransfer {
                        from,
                        to,
                        density: direction * density,
                    });
                }
            }
        }
    }

    /// Every channel takes its own share of the delta, split by baseline
    /// density contribution.
    fn walk_isolated(&self, delta: f64, bounds: &[Bounds]) -> Walk {
        let mut walk = Walk::start(bounds);
        walk.direction = LadderDirection::of(delta);

        let members: Vec<usize> = self
            .ladder
            .order()
            .iter()
            .copied()
            .filter(|&c| self.ladder.unit_density(c) > 0.0)
            .collect();
        let contributions: Vec<f64> = members
            .iter()
            .map(|&c| self.ladder.unit_density(c) * bounds[c].base)
            .collect();
        let total: f64 = contributions.iter().sum();

        for (rank, (&c, &contribution)) in members.iter().zip(&contributions).enumerate() {
            let share = if total > EPSILON {
                contribution / total
            } else {
                1.0 / members.len() as f64
            };
            let desired = share * delta / self.ladder.unit_density(c);
            let layer = desired.max(bounds[c].lo).min(bounds[c].hi);
            let applied = layer - walk.layers[c];
            walk.layers[c] = layer;
            if applied.abs() > EPSILON {
                walk.promotions.push(WalkStep {
                    channel: c,
                    rank,
                    applied,
                });
            }
            if (desired - layer).abs() > EPSILON {
                let reason = self.block_reason(c, (desired - layer).signum(), &bounds[c]);
                walk.block(c, reason, None, 0.0);
            }
        }
        walk
    }

    fn commit(&mut self, sample: &Sample, delta: f64, bounds: &[Bounds], walk: &Walk) -> Vec<ChannelOutcome> {
        let index = sample.index;
        let reserve_options = &self.options.reserve;
        let threshold = self.options.capacity_threshold;
        let mut outcomes = Vec::with_capacity(self.profiles.len());
        let mut applied = 0.0;

        for (c, profile) in self.profiles.iter().enumerate() {
            let b = bounds[c];
            if !b.active {
                self.totals.add(b.base, b.base);
                outcomes.push(ChannelOutcome::inert(b));
                continue;
            }

            let carry = &mut self.carry[c];
            let mut desired = b.base + walk.layers[c];
            if !desired.is_finite() {
                tracing::warn!(channel = %profile.name, index, "Non-finite channel value, holding previous value");
                self.warnings.push(SessionWarning::NonFiniteValue {
                    channel: profile.name.clone(),
                    index,
                });
                desired = carry.after;
            }

            let after = self.clamps[c].apply(index, sample.input_percent, b.base, desired);
            let layer = after - b.base;
            let ceiling = profile.ceiling_normalized();
            let band = reserve_options.band(ceiling);
            let headroom = (ceiling - after).max(0.0);

            carry.reserve.advance(
                ReserveStep {
                    headroom,
                    band,
                    layer,
                    change: layer - carry.layer,
                    step: self.blend.base_step(c),
                    threshold,
                },
                reserve_options,
            );
            let next = carry.reserve.limits(headroom, band, reserve_options);
            carry.layer = layer;
            carry.after = after;

            let blend_limited = walk
                .blocked
                .iter()
                .any(|w| w.channel == c && w.reason == BlockReason::BlendLimited);
            self.locks[c][index] = blend_limited
                || (after - desired).abs() > EPSILON
                || headroom <= threshold
                || carry.reserve.state() == ReserveState::Exhausted;
            self.afters[c][index] = after;

            applied += self.ladder.unit_density(c) * layer;
            self.curves[c].set(index, to_device(after));
            self.totals.add(b.base, after);
            outcomes.push(ChannelOutcome {
                bounds: b,
                walk_layer: walk.layers[c],
                after,
                reserve: carry.reserve.state(),
                release_scale: carry.reserve.release_scale(),
                allowance: headroom * next.growth,
            });
        }

        self.deltas.push((index, delta));
        self.note_unmet(index, delta - applied);
        outcomes
    }

    fn note_unmet(&mut self, index: usize, remaining: f64) {
        if remaining.abs() > self.options.unmet_tolerance {
            tracing::debug!(index, remaining, "Correction not fully applied");
            self.warnings
                .push(SessionWarning::UnmetCorrection { index, remaining });
            self.unmet.record(remaining);
        }
    }

    /// Density delivered at a sample by the final values.
    fn applied_at(&self, index: usize) -> f64 {
        self.profiles
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_active())
            .map(|(c, p)| self.ladder.unit_density(c) * (self.afters[c][index] - p.base_curve.normalized(index)))
            .sum()
    }

    /// Run the slope pass over every active channel and write back what
    /// moved. Totals and unmet samples are recounted when anything did.
    fn limit_slopes(&mut self) -> SlopeReport {
        let options = self.options.slope;
        let mut channels = Vec::new();
        let mut shift = 0.0;

        for (c, profile) in self.profiles.iter().enumerate() {
            if !profile.is_active() {
                continue;
            }
            let mut series = self.afters[c].clone();
            let before = max_step(&series);
            let (kernel_windows, limited) = slope::limit_series(&mut series, &self.locks[c], &options);

            let mut adjusted = false;
            for (index, (&old, &new)) in self.afters[c].iter().zip(&series).enumerate() {
                if (new - old).abs() > EPSILON {
                    self.curves[c].set(index, to_device(new));
                    shift += new - old;
                    adjusted = true;
                }
            }
            if adjusted {
                tracing::debug!(channel = %profile.name, kernel_windows, limited, "Slope pass reshaped curve");
            }
            channels.push(SlopeChannelReport {
                channel: profile.name.clone(),
                kernel_windows,
                limited,
                adjusted,
                max_step_before_percent: before * 100.0,
                max_step_after_percent: max_step(&series) * 100.0,
            });
            self.afters[c] = series;
        }

        let report = SlopeReport {
            threshold_percent: options.threshold() * 100.0,
            channels,
        };
        if report.adjusted() {
            self.totals.corrected_ink += shift;
            self.recount_unmet();
        }
        report
    }

    fn recount_unmet(&mut self) {
        self.warnings
            .retain(|w| !matches!(w, SessionWarning::UnmetCorrection { .. }));
        self.unmet = UnmetReport::default();
        let deltas = std::mem::take(&mut self.deltas);
        for &(index, delta) in &deltas {
            let remaining = delta - self.applied_at(index);
            self.note_unmet(index, remaining);
        }
        self.deltas = deltas;
    }

    fn snapshot(&self, sample: &Sample, record: &SampleRecord) -> SampleSnapshot {
        let SampleRecord {
            delta,
            ease,
            order,
            walk,
            outcomes,
        } = record;
        let index = sample.index;
        let name = |c: usize| self.profiles[c].name.clone();
        let step = |s: &WalkStep| LadderStep {
            channel: name(s.channel),
            ladder_index: s.rank,
            normalized_applied: s.applied,
        };

        let afters: Vec<f64> = self.afters.iter().map(|series| series[index]).collect();
        let applied = self.applied_at(index);
        let baseline_ink: f64 = outcomes.iter().map(|o| o.bounds.base).sum();
        let corrected_ink: f64 = afters.iter().sum();
        let share = |value: f64, total: f64| if total > 0.0 { value / total } else { 0.0 };
        let laddered = self.ladder.mode() != WeightingMode::Isolated;

        let channels = self
            .profiles
            .iter()
            .enumerate()
            .map(|(c, profile)| {
                let o = &outcomes[c];
                let before = o.bounds.base;
                let after = afters[c];
                let unit = self.ladder.unit_density(c);
                let ceiling = profile.ceiling_normalized();
                let baseline_value = profile.base_curve.get(index);
                let corrected_value = self.curves[c].get(index);
                let ladder_rank = order.iter().position(|&x| x == c);
                let floor = match ladder_rank {
                    Some(rank) if laddered && rank > 0 => before.max(afters[order[rank - 1]]),
                    _ => before,
                };
                ChannelSampleState {
                    channel: profile.name.clone(),
                    baseline_value,
                    corrected_value,
                    value_delta: i32::from(corrected_value) - i32::from(baseline_value),
                    normalized_before: before,
                    normalized_after: after,
                    normalized_delta: after - before,
                    share_before: share(before, baseline_ink),
                    share_after: share(after, corrected_ink),
                    density_contribution_before: unit * before,
                    density_contribution_after: unit * after,
                    density_contribution_delta: unit * (after - before),
                    capacity_before_normalized: (ceiling - before).max(0.0),
                    capacity_after_normalized: (ceiling - after).max(0.0),
                    coverage_floor_normalized: floor,
                    layer_normalized: if o.bounds.active {
                        (after - floor).max(0.0)
                    } else {
                        0.0
                    },
                    reserve_state: o.reserve,
                    reserve_allowance_remaining: o.allowance,
                    reserve_release_scale: o.release_scale,
                    blend_cap_normalized: o.bounds.blend_cap,
                    blend_limited: walk
                        .blocked
                        .iter()
                        .any(|b| b.channel == c && b.reason == BlockReason::BlendLimited),
                    effective_headroom_normalized: if o.bounds.active {
                        (o.bounds.hi - o.walk_layer).max(0.0)
                    } else {
                        0.0
                    },
                    slope_adjusted: (after - o.after).abs() > EPSILON,
                    momentum: self.ladder.momentum(c, index),
                    weight: self.ladder.weights()[c],
                    ladder_rank,
                }
            })
            .collect();

        let promotions: Vec<LadderStep> = walk.promotions.iter().map(step).collect();
        SampleSnapshot {
            index,
            input_percent: sample.input_percent,
            target_density: sample.target_density,
            measurement_density: sample.measurement_density,
            delta_density: *delta,
            applied_density: applied,
            unmet_density: delta - applied,
            baseline_ink,
            corrected_ink,
            ink_delta: corrected_ink - baseline_ink,
            weighting_mode: self.ladder.mode(),
            ladder: order.iter().map(|&c| name(c)).collect(),
            direction: walk.direction,
            selection: promotions.last().cloned(),
            releases: walk.releases.iter().map(step).collect(),
            promotions,
            blocked: walk
                .blocked
                .iter()
                .map(|b| LadderBlock {
                    channel: name(b.channel),
                    reason: b.reason,
                    blocked_by: b.blocked_by.map(name),
                    headroom: b.headroom,
                    layer: b.layer,
                })
                .collect(),
            transfers: walk
                .transfers
                .iter()
                .map(|t| LadderTransfer {
                    from: name(t.from),
                    to: name(t.to),
                    density: t.density,
                })
                .collect(),
            sign_flip_ease: *ease,
            channels,
        }
    }

    fn finish(self, slope: Option<SlopeReport>) -> EngineOutput {
        EngineOutput {
            curves: self.curves,
            coverage: self
                .clamps
                .into_iter()
                .map(CoverageClamp::into_report)
                .collect(),
            warnings: self.warnings,
            totals: self.totals.finished(),
            unmet: self.unmet,
            slope,
        }
    }
}
