//! Hard two-sided slope limiter.

use super::clamp_unit;

/// Margin kept under the threshold so rounding to device units cannot push
/// a step back over it.
pub const LIMIT_MARGIN: f64 = 1e-4;

const EPSILON: f64 = 1e-9;

/// Clamp every step of `series` to just under `threshold`.
///
/// Forward and backward passes alternate until nothing moves. The first and
/// last sample keep their values. Values only ever move toward a
/// neighbour, so the series stays within its original range.
pub fn enforce_slope_limit(series: &mut [f64], threshold: f64) {
    for value in series.iter_mut() {
        *value = clamp_unit(*value);
    }
    let n = series.len();
    if n < 2 || !threshold.is_finite() || threshold <= 0.0 {
        return;
    }
    let first = series[0];
    let last = series[n - 1];
    let limit = (threshold - LIMIT_MARGIN).max(0.0);

    for _ in 0..(n * 3).max(2) {
        let mut changed = false;
        for i in 1..n {
            changed |= pull_toward(series, i, i - 1, limit);
        }
        series[n - 1] = last;
        for i in (0..n - 1).rev() {
            changed |= pull_toward(series, i, i + 1, limit);
        }
        series[0] = first;
        if !changed {
            break;
        }
    }
}

fn pull_toward(series: &mut [f64], index: usize, neighbour: usize, limit: f64) -> bool {
    let anchor = series[neighbour];
    if series[index] > anchor + limit + EPSILON {
        series[index] = anchor + limit;
        true
    } else if series[index] < anchor - limit - EPSILON {
        series[index] = anchor - limit;
        true
    } else {
        false
    }
}
