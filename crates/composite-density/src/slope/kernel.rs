//! Gaussian redistribution of steep runs.
//!
//! A run of steps at or near the threshold is widened into a window of up
//! to [`WINDOW_RADIUS`] samples on each side. The total change across the
//! window is then laid out again along Gaussian weights, flattened toward
//! uniform just enough that no single step exceeds the threshold. Windows
//! never include a locked sample.

use super::{clamp_unit, max_step};

const EPSILON: f64 = 1e-9;
const TOLERANCE: f64 = 1e-4;
const WEIGHT_TOLERANCE: f64 = 1e-6;

const WINDOW_RADIUS: usize = 10;
const MIN_WINDOW: usize = 4;
/// Share of the neighbouring sample mixed into each window anchor.
const ANCHOR_BLEND: f64 = 0.25;
const NEAR_RATIO: f64 = 0.95;
const NEAR_FLOOR: f64 = 0.02;
const NEAR_MIN_SEGMENTS: usize = 3;
const SECOND_PASS_RATIO: f64 = 0.6;
const SECOND_PASS_CEILING: f64 = 0.04;
const BISECTION_STEPS: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Region {
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelOutcome {
    /// Windows that were reshaped.
    pub windows: usize,
    /// Some step is still over the threshold.
    pub needs_limiter: bool,
}

/// Reshape steep runs of `series` in place.
///
/// `locks` marks samples that must keep their value; a missing entry counts
/// as unlocked.
pub fn smooth_with_kernel(series: &mut [f64], threshold: f64, locks: &[bool]) -> KernelOutcome {
    let mut outcome = KernelOutcome {
        windows: 0,
        needs_limiter: true,
    };
    if series.len() < 3 || !threshold.is_finite() || threshold <= 0.0 {
        return outcome;
    }
    let locked = |i: usize| locks.get(i).copied().unwrap_or(false);

    for region in overshoot_regions(series, threshold) {
        let Some(Region { start, end }) = expand(region, series.len(), &locked) else {
            continue;
        };
        let original = series[start..=end].to_vec();
        series[start] = blend_anchor(series[start], series[start + 1]);
        series[end] = blend_anchor(series[end], series[end - 1]);

        if !apply_window(series, start, end, threshold) {
            series[start..=end].copy_from_slice(&original);
            continue;
        }
        let tighter = (threshold * SECOND_PASS_RATIO).min(SECOND_PASS_CEILING);
        if tighter > EPSILON {
            apply_window(series, start, end, tighter);
        }
        if clamp_edges(series, start, end, threshold) {
            apply_window(series, start, end, threshold);
        }
        outcome.windows += 1;
    }

    outcome.needs_limiter = outcome.windows == 0 || max_step(series) > threshold + TOLERANCE;
    outcome
}

struct Run {
    start: usize,
    end: usize,
    segments: usize,
    overshoot: bool,
}

impl Run {
    fn qualifies(&self, series: &[f64], near: f64) -> bool {
        let span = self.end - self.start;
        if !(self.overshoot || self.segments >= NEAR_MIN_SEGMENTS || span >= NEAR_MIN_SEGMENTS) {
            return false;
        }
        self.overshoot || max_step(&series[self.start..=self.end]) >= near - EPSILON
    }
}

/// Runs of steps at or near the threshold, merged where they touch.
fn overshoot_regions(series: &[f64], threshold: f64) -> Vec<Region> {
    let near = (threshold * NEAR_RATIO).max(threshold - NEAR_FLOOR);
    let mut found = Vec::new();
    let mut run: Option<Run> = None;

    for i in 1..series.len() {
        let step = (series[i] - series[i - 1]).abs();
        if step >= near - EPSILON {
            let current = run.get_or_insert(Run {
                start: i - 1,
                end: i,
                segments: 0,
                overshoot: false,
            });
            current.end = i;
            current.segments += 1;
            current.overshoot |= step > threshold + EPSILON;
        } else if let Some(done) = run.take() {
            if done.qualifies(series, near) {
                found.push(Region {
                    start: done.start,
                    end: done.end,
                });
            }
        }
    }
    if let Some(done) = run.take() {
        if done.qualifies(series, near) {
            found.push(Region {
                start: done.start,
                end: done.end,
            });
        }
    }

    let mut merged: Vec<Region> = Vec::with_capacity(found.len());
    for region in found {
        match merged.last_mut() {
            Some(last) if region.start <= last.end + 1 => last.end = last.end.max(region.end),
            _ => merged.push(region),
        }
    }
    merged
}

/// Widen a region by up to [`WINDOW_RADIUS`] on each side, stopping at
/// locked samples.
fn expand(region: Region, len: usize, locked: &impl Fn(usize) -> bool) -> Option<Region> {
    let mut start = region.start;
    for _ in 0..WINDOW_RADIUS {
        if start == 0 || locked(start - 1) {
            break;
        }
        start -= 1;
    }
    let mut end = region.end;
    for _ in 0..WINDOW_RADIUS {
        if end + 1 >= len || locked(end + 1) {
            break;
        }
        end += 1;
    }

    while start < end && locked(start) {
        start += 1;
    }
    while end > start && locked(end) {
        end -= 1;
    }
    if end - start + 1 < MIN_WINDOW || (start..=end).any(locked) {
        return None;
    }
    Some(Region { start, end })
}

fn blend_anchor(anchor: f64, neighbour: f64) -> f64 {
    clamp_unit(anchor * (1.0 - ANCHOR_BLEND) + neighbour * ANCHOR_BLEND)
}

fn kernel_weights(len: usize) -> Vec<f64> {
    let center = (len - 1) as f64 / 2.0;
    let sigma = (len as f64 * 0.35).max(1.1);
    let raw: Vec<f64> = (0..len)
        .map(|i| {
            let d = i as f64 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / sum).collect()
}

fn largest(weights: &[f64]) -> f64 {
    weights.iter().copied().fold(0.0, f64::max)
}

/// Flatten `weights` toward uniform until no step of `total` exceeds
/// `threshold`. `None` if even uniform steps are too large.
fn fit_weights(weights: Vec<f64>, total: f64, threshold: f64) -> Option<Vec<f64>> {
    if total <= EPSILON {
        return Some(weights);
    }
    let allowed = threshold / total;
    if allowed <= WEIGHT_TOLERANCE {
        return None;
    }
    if largest(&weights) <= allowed + WEIGHT_TOLERANCE {
        return Some(weights);
    }
    let uniform = 1.0 / weights.len() as f64;
    if uniform > allowed + WEIGHT_TOLERANCE {
        return None;
    }

    let blend = |alpha: f64| -> Vec<f64> {
        weights
            .iter()
            .map(|w| uniform * (1.0 - alpha) + w * alpha)
            .collect()
    };
    let (mut lower, mut upper) = (0.0, 1.0);
    let mut best = blend(0.0);
    for _ in 0..BISECTION_STEPS {
        let alpha = (lower + upper) / 2.0;
        let candidate = blend(alpha);
        if largest(&candidate) > allowed + WEIGHT_TOLERANCE {
            upper = alpha;
        } else {
            best = candidate;
            lower = alpha;
        }
    }
    let sum: f64 = best.iter().sum();
    Some(best.into_iter().map(|w| w / sum).collect())
}

fn is_monotone(values: &[f64]) -> bool {
    let (Some(first), Some(last)) = (values.first(), values.last()) else {
        return true;
    };
    if last >= first {
        values.windows(2).all(|w| w[1] >= w[0] - EPSILON)
    } else {
        values.windows(2).all(|w| w[1] <= w[0] + EPSILON)
    }
}

/// Lay the change between the window's end points out along kernel
/// weights. Leaves the series untouched and returns `false` if that cannot
/// meet `threshold` or would not be monotone.
fn apply_window(series: &mut [f64], start: usize, end: usize, threshold: f64) -> bool {
    let segments = end - start;
    if segments == 0 {
        return false;
    }
    let from = series[start];
    let total = series[end] - from;
    if total.abs() <= EPSILON {
        return true;
    }
    let Some(weights) = fit_weights(kernel_weights(segments), total.abs(), threshold) else {
        return false;
    };

    let mut updated = series[start..=end].to_vec();
    let mut cursor = from;
    for (k, weight) in weights.iter().enumerate().take(segments - 1) {
        cursor += total * weight;
        updated[k + 1] = clamp_unit(cursor);
    }
    if !is_monotone(&updated) {
        return false;
    }
    series[start..=end].copy_from_slice(&updated);
    true
}

/// Pull window end points toward their outside neighbours when the step
/// across the window edge is too steep.
fn clamp_edges(series: &mut [f64], start: usize, end: usize, threshold: f64) -> bool {
    let edge = (threshold - TOLERANCE).max(threshold * NEAR_RATIO);
    let mut clamped = false;
    if start > 0 {
        let previous = series[start - 1];
        let step = series[start] - previous;
        if step.abs() > edge + EPSILON {
            series[start] = clamp_unit(previous + edge * step.signum());
            clamped = true;
        }
    }
    if end + 1 < series.len() {
        let next = series[end + 1];
        let step = next - series[end];
        if step.abs() > edge + EPSILON {
            series[end] = clamp_unit(next - edge * step.signum());
            clamped = true;
        }
    }
    clamped
}
