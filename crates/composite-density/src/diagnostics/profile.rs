//! Which channels make up the printed density at one input level.

use serde::{Deserialize, Serialize};

use super::SampleSnapshot;
use crate::curve::CURVE_RESOLUTION;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDensityShare {
    pub channel: String,
    /// Density this channel contributes after correction.
    pub density: f64,
    /// Fraction of the sample's total corrected density.
    pub share: f64,
    /// Density this channel added (or removed) through the correction.
    pub correction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityProfile {
    pub index: usize,
    pub input_percent: f64,
    pub density_delta: f64,
    pub applied_density: f64,
    pub total_density: f64,
    /// Shares sum to one whenever `total_density` is positive.
    pub channels: Vec<ChannelDensityShare>,
}

/// Sample index closest to an input percentage.
pub fn sample_index(percent: f64) -> Option<usize> {
    if !percent.is_finite() {
        return None;
    }
    let last = (CURVE_RESOLUTION - 1) as f64;
    Some((percent.clamp(0.0, 100.0) / 100.0 * last).round() as usize)
}

/// Density make-up at `percent`, if that sample was recorded.
pub fn density_profile(snapshots: &[SampleSnapshot], percent: f64) -> Option<DensityProfile> {
    let index = sample_index(percent)?;
    let snapshot = snapshots.iter().find(|s| s.index == index)?;

    let total: f64 = snapshot
        .channels
        .iter()
        .map(|c| c.density_contribution_after.max(0.0))
        .sum();
    let channels = snapshot
        .channels
        .iter()
        .map(|c| {
            let density = c.density_contribution_after.max(0.0);
            ChannelDensityShare {
                channel: c.channel.clone(),
                density,
                share: if total > 0.0 { density / total } else { 0.0 },
                correction: c.density_contribution_delta,
            }
        })
        .collect();

    Some(DensityProfile {
        index,
        input_percent: snapshot.input_percent,
        density_delta: snapshot.delta_density,
        applied_density: snapshot.applied_density,
        total_density: total,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::test_support::{snapshot, state};

    fn with_density(channel: &str, density: f64) -> crate::ChannelSampleState {
        let mut s = state(channel, 0.5);
        s.density_contribution_after = density;
        s
    }

    #[test]
    fn test_shares_sum_to_one() {
        let snaps = vec![snapshot(
            140,
            vec![
                with_density("K", 0.3),
                with_density("C", 0.06),
                with_density("LK", 0.04),
            ],
        )];
        let profile = density_profile(&snaps, 140.0 / 255.0 * 100.0).expect("sample recorded");
        assert_eq!(profile.index, 140);
        let sum: f64 = profile.channels.iter().map(|c| c.share).sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!((profile.channels[0].share - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_missing_sample_or_bad_percent() {
        let snaps = vec![snapshot(0, vec![with_density("K", 0.0)])];
        assert!(density_profile(&snaps, 50.0).is_none());
        assert!(density_profile(&snaps, f64::NAN).is_none());

        let profile = density_profile(&snaps, -5.0).expect("clamped to the first sample");
        assert_eq!(profile.channels[0].share, 0.0);
    }

    #[test]
    fn test_index_rounding() {
        assert_eq!(sample_index(0.0), Some(0));
        assert_eq!(sample_index(100.0), Some(255));
        assert_eq!(sample_index(50.0), Some(128));
        assert_eq!(sample_index(130.0), Some(255));
    }
}
