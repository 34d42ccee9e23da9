//! Density ladder: channel weights and promotion order.
//!
//! The ladder decides which channel is offered a correction first. Lighter
//! inks (lower weight) come first so that heavy inks stay idle until the
//! lighter ones have used their headroom. Ties keep declaration order.
//!
//! # Weighting modes
//!
//! | Mode | Weight | Order |
//! |------|--------|-------|
//! | [`WeightingMode::Normalized`] | `density × ceiling` | ascending weight, fixed |
//! | [`WeightingMode::Equal`] | mean of the normalized weights | declaration order |
//! | [`WeightingMode::Momentum`] | `density × ceiling` | ascending `weight × exp(-bias × momentum)`, per sample |
//! | [`WeightingMode::Isolated`] | `density × ceiling` | none, every channel at once |
//!
//! Channels with a zero ink ceiling have zero weight and never appear in
//! the ladder.

mod momentum;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseModeError;
use crate::options::MomentumOptions;
use crate::profile::ChannelProfile;

pub use momentum::{gaussian_kernel, headroom_momentum, MomentumPeak};

/// Strategy for weighting channels against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightingMode {
    /// Every channel corrects its own share independently.
    Isolated,
    /// Every active channel carries the same weight.
    Equal,
    /// Weight follows the maximum density a channel can contribute.
    #[default]
    Normalized,
    /// Normalized weights reordered per sample by local headroom.
    Momentum,
}

impl WeightingMode {
    pub const ALL: [WeightingMode; 4] = [
        WeightingMode::Isolated,
        WeightingMode::Equal,
        WeightingMode::Normalized,
        WeightingMode::Momentum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WeightingMode::Isolated => "isolated",
            WeightingMode::Equal => "equal",
            WeightingMode::Normalized => "normalized",
            WeightingMode::Momentum => "momentum",
        }
    }
}

impl fmt::Display for WeightingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightingMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        WeightingMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| ParseModeError(s.to_string()))
    }
}

/// Builder for a [`DensityLadder`].
///
/// ```
/// use composite_density::{LadderBuilder, MomentumOptions, WeightingMode};
///
/// let builder = LadderBuilder::new(WeightingMode::Momentum)
///     .momentum(MomentumOptions::default());
/// assert_eq!(builder.mode(), WeightingMode::Momentum);
/// ```
#[derive(Debug, Clone)]
pub struct LadderBuilder {
    mode: WeightingMode,
    momentum: MomentumOptions,
}

impl LadderBuilder {
    pub fn new(mode: WeightingMode) -> Self {
        Self {
            mode,
            momentum: MomentumOptions::default(),
        }
    }

    #[inline]
    pub fn momentum(mut self, options: MomentumOptions) -> Self {
        self.momentum = options;
        self
    }

    pub fn mode(&self) -> WeightingMode {
        self.mode
    }

    pub fn build(&self, profiles: &[ChannelProfile]) -> DensityLadder {
        let normalized: Vec<f64> = profiles
            .iter()
            .map(|p| {
                if p.is_active() {
                    p.density_constant * p.ceiling_normalized()
                } else {
                    0.0
                }
            })
            .collect();

        let weights = match self.mode {
            WeightingMode::Equal => {
                let active: Vec<f64> = profiles
                    .iter()
                    .zip(&normalized)
                    .filter(|(p, _)| p.is_active())
                    .map(|(_, &w)| w)
                    .collect();
                let mean = if active.is_empty() {
                    0.0
                } else {
                    active.iter().sum::<f64>() / active.len() as f64
                };
                profiles
                    .iter()
                    .map(|p| if p.is_active() { mean } else { 0.0 })
                    .collect()
            }
            WeightingMode::Isolated | WeightingMode::Normalized | WeightingMode::Momentum => {
                normalized
            }
        };

        let unit_densities = profiles
            .iter()
            .zip(&weights)
            .map(|(p, &w)| if p.is_active() { w / p.ceiling_normalized() } else { 0.0 })
            .collect();

        let active: Vec<usize> = (0..profiles.len()).filter(|&c| profiles[c].is_active()).collect();
        let order = sort_by_key(&active, |c| weights[c]);

        let momentum = match self.mode {
            WeightingMode::Momentum => profiles
                .iter()
                .map(|p| headroom_momentum(p, &self.momentum))
                .collect(),
            _ => Vec::new(),
        };

        DensityLadder {
            mode: self.mode,
            names: profiles.iter().map(|p| p.name.clone()).collect(),
            weights,
            unit_densities,
            order,
            momentum,
            bias: self.momentum.bias,
        }
    }
}

/// Stable ascending sort of channel indices by a weight key.
fn sort_by_key(indices: &[usize], key: impl Fn(usize) -> f64) -> Vec<usize> {
    let mut sorted = indices.to_vec();
    sorted.sort_by(|&a, &b| key(a).total_cmp(&key(b)));
    sorted
}

/// Promotion order and weights for one session.
///
/// Channel positions refer to the session's declaration order.
#[derive(Debug, Clone)]
pub struct DensityLadder {
    mode: WeightingMode,
    names: Vec<String>,
    weights: Vec<f64>,
    unit_densities: Vec<f64>,
    order: Vec<usize>,
    momentum: Vec<Vec<f64>>,
    bias: f64,
}

impl DensityLadder {
    pub fn mode(&self) -> WeightingMode {
        self.mode
    }

    /// Weight of each channel in declaration order.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Density per unit of normalized ink used for accounting.
    #[inline]
    pub fn unit_density(&self, channel: usize) -> f64 {
        self.unit_densities[channel]
    }

    /// Session-wide order (active channels only).
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn order_names(&self) -> Vec<String> {
        self.order.iter().map(|&c| self.names[c].clone()).collect()
    }

    /// Order at one sample. Only momentum mode differs from [`order`](Self::order).
    pub fn order_at(&self, sample: usize) -> Vec<usize> {
        match self.mode {
            WeightingMode::Momentum => {
                let bias = if self.bias.is_finite() { self.bias } else { 0.0 };
                sort_by_key(&self.order, |c| {
                    self.weights[c] * (-bias * self.momentum(c, sample)).exp()
                })
            }
            _ => self.order.clone(),
        }
    }

    /// Momentum of a channel at a sample; zero outside momentum mode.
    #[inline]
    pub fn momentum(&self, channel: usize, sample: usize) -> f64 {
        self.momentum
            .get(channel)
            .and_then(|series| series.get(sample))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn momentum_peaks(&self) -> Vec<MomentumPeak> {
        self.momentum
            .iter()
            .zip(&self.names)
            .map(|(series, name)| MomentumPeak::of(name, series))
            .collect()
    }
}
