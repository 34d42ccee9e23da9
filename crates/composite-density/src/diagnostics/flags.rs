//! Flags for abrupt changes between adjacent snapshots.

use serde::{Deserialize, Serialize};

use super::SampleSnapshot;

/// Jump (in percent of full scale) that raises a flag by default.
pub const DEFAULT_FLAG_THRESHOLD: f64 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagKind {
    Rise,
    Drop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagDetail {
    pub channel: String,
    pub from_percent: f64,
    pub to_percent: f64,
    pub delta_percent: f64,
}

/// A sample where at least one channel jumped by the threshold or more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFlag {
    pub index: usize,
    pub input_percent: f64,
    /// Direction of the largest jump.
    pub kind: FlagKind,
    /// Size of the largest jump in percent.
    pub magnitude: f64,
    pub channels: Vec<String>,
    /// Largest jump first.
    pub details: Vec<FlagDetail>,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Compare each snapshot with the one before it.
///
/// A threshold that is not a positive number uses
/// [`DEFAULT_FLAG_THRESHOLD`]. Channels are matched by name.
pub fn flag_snapshots(snapshots: &[SampleSnapshot], threshold_percent: f64) -> Vec<SnapshotFlag> {
    let threshold = if threshold_percent.is_finite() && threshold_percent > 0.0 {
        threshold_percent
    } else {
        DEFAULT_FLAG_THRESHOLD
    };

    snapshots
        .windows(2)
        .filter_map(|pair| {
            let (previous, current) = (&pair[0], &pair[1]);
            let mut details: Vec<FlagDetail> = current
                .channels
                .iter()
                .filter_map(|state| {
                    let before = previous.channel(&state.channel)?;
                    let from = before.normalized_after * 100.0;
                    let to = state.normalized_after * 100.0;
                    let delta = to - from;
                    (delta.abs() >= threshold).then(|| FlagDetail {
                        channel: state.channel.clone(),
                        from_percent: round3(from),
                        to_percent: round3(to),
                        delta_percent: round3(delta),
                    })
                })
                .collect();
            if details.is_empty() {
                return None;
            }
            details.sort_by(|a, b| b.delta_percent.abs().total_cmp(&a.delta_percent.abs()));

            let dominant = &details[0];
            Some(SnapshotFlag {
                index: current.index,
                input_percent: round3(current.input_percent),
                kind: if dominant.delta_percent >= 0.0 {
                    FlagKind::Rise
                } else {
                    FlagKind::Drop
                },
                magnitude: dominant.delta_percent.abs(),
                channels: details.iter().map(|d| d.channel.clone()).collect(),
                details,
            })
        })
        .collect()
}
