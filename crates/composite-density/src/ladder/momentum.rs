//! Gaussian-windowed headroom momentum.
//!
//! A channel's momentum at sample `i` is its local share of unused ink
//! (`(ceiling - base) / ceiling`) smoothed with a small Gaussian kernel.
//! Values are in `[0, 1]`; channels with more slack nearby score higher.

use serde::{Deserialize, Serialize};

use crate::curve::{input_percent, CURVE_RESOLUTION};
use crate::options::MomentumOptions;
use crate::profile::ChannelProfile;

/// Normalized Gaussian kernel of `2 * radius + 1` taps.
pub fn gaussian_kernel(radius: usize, sigma: f64) -> Vec<f64> {
    let two_sigma_sq = 2.0 * sigma * sigma;
    let raw: Vec<f64> = (0..=2 * radius)
        .map(|tap| {
            let offset = tap as f64 - radius as f64;
            (-(offset * offset) / two_sigma_sq).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / sum).collect()
}

/// Momentum series for one channel. Zero everywhere for inactive channels.
pub fn headroom_momentum(profile: &ChannelProfile, options: &MomentumOptions) -> Vec<f64> {
    if !profile.is_active() {
        return vec![0.0; CURVE_RESOLUTION];
    }
    let ceiling = profile.ceiling_normalized();
    let slack: Vec<f64> = (0..CURVE_RESOLUTION)
        .map(|i| ((ceiling - profile.base_curve.normalized(i)) / ceiling).clamp(0.0, 1.0))
        .collect();

    let radius = options.window_radius;
    let kernel = gaussian_kernel(radius, options.effective_sigma());
    (0..CURVE_RESOLUTION)
        .map(|i| {
            // Taps past either end are dropped and the rest renormalized.
            let mut acc = 0.0;
            let mut weight = 0.0;
            for (tap, &w) in kernel.iter().enumerate() {
                let Some(j) = (i + tap).checked_sub(radius) else {
                    continue;
                };
                if j >= CURVE_RESOLUTION {
                    continue;
                }
                acc += slack[j] * w;
                weight += w;
            }
            if weight > 0.0 {
                (acc / weight).clamp(0.0, 1.0)
            } else {
                0.0
            }
        })
        .collect()
}

/// Largest momentum value of a channel and where it occurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumPeak {
    pub channel: String,
    pub index: usize,
    pub input_percent: f64,
    pub value: f64,
}

impl MomentumPeak {
    /// Earliest maximum of the series.
    pub fn of(channel: &str, series: &[f64]) -> Self {
        let (index, value) = series
            .iter()
            .copied()
            .enumerate()
            .fold((0, 0.0), |best, (i, v)| if v > best.1 { (i, v) } else { best });
        Self {
            channel: channel.to_string(),
            index,
            input_percent: input_percent(index),
            value,
        }
    }
}
