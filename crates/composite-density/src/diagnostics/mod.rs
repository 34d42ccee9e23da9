//! Optional per-sample diagnostics.
//!
//! Pass a [`TraceRecorder`] to
//! [`CompositeSession::finalize_with`](crate::CompositeSession::finalize_with)
//! to receive one [`SampleSnapshot`] per tonal step. The recorder only
//! observes: corrected curves are identical with or without one.

mod flags;
mod profile;
mod snapshot;

use serde::{Deserialize, Serialize};

pub use flags::{flag_snapshots, FlagDetail, FlagKind, SnapshotFlag, DEFAULT_FLAG_THRESHOLD};
pub use profile::{density_profile, sample_index, ChannelDensityShare, DensityProfile};
pub use snapshot::{
    BlockReason, ChannelSampleState, LadderBlock, LadderDirection, LadderStep, LadderTransfer,
    SampleSnapshot,
};

/// Observer for per-sample snapshots.
pub trait TraceRecorder {
    fn record(&mut self, snapshot: SampleSnapshot);
}

/// Recorder that keeps every snapshot in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    snapshots: Vec<SampleSnapshot>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> &[SampleSnapshot] {
        &self.snapshots
    }

    pub fn get(&self, index: usize) -> Option<&SampleSnapshot> {
        self.snapshots.get(index)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// One channel's state at every recorded sample.
    pub fn channel_series(&self, channel: &str) -> Vec<&ChannelSampleState> {
        self.snapshots
            .iter()
            .filter_map(|s| s.channel(channel))
            .collect()
    }

    pub fn flags(&self, threshold_percent: f64) -> Vec<SnapshotFlag> {
        flag_snapshots(&self.snapshots, threshold_percent)
    }

    /// Density make-up at an input percentage.
    pub fn density_profile(&self, percent: f64) -> Option<DensityProfile> {
        density_profile(&self.snapshots, percent)
    }

    pub fn into_snapshots(self) -> Vec<SampleSnapshot> {
        self.snapshots
    }
}

impl TraceRecorder for Trace {
    fn record(&mut self, snapshot: SampleSnapshot) {
        self.snapshots.push(snapshot);
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{snapshot, state};
    use super::*;

    #[test]
    fn test_trace_records_in_order() {
        let mut trace = Trace::new();
        assert!(trace.is_empty());
        trace.record(snapshot(0, vec![state("K", 0.1)]));
        trace.record(snapshot(1, vec![state("K", 0.2)]));

        assert_eq!(trace.len(), 2);
        assert_eq!(trace.get(1).map(|s| s.index), Some(1));
        let series = trace.channel_series("K");
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].normalized_after, 0.2);
        assert!(trace.channel_series("C").is_empty());
    }

    #[test]
    fn test_snapshot_serializes_independently() {
        let snap = snapshot(4, vec![state("LK", 0.3)]);
        let json = serde_json::to_string(&snap).unwrap();
        let back: SampleSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.index, 4);
        assert_eq!(back.channels, snap.channels);
        assert!((back.input_percent - snap.input_percent).abs() < 1e-12);
    }
}
