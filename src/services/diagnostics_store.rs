use chrono::{DateTime, Utc};
use composite_density::{
    density_profile, flag_snapshots, sample_index, DensityProfile, SampleSnapshot, SessionSummary,
    SnapshotFlag,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::auto_raise::AutoRaiseReport;
use crate::error::AppError;

/// A recorded session as written to and read from trace files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTrace {
    pub recorded_at: DateTime<Utc>,
    pub summary: SessionSummary,
    pub snapshots: Vec<SampleSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_raise: Option<AutoRaiseReport>,
}

impl SessionTrace {
    pub fn new(summary: SessionSummary, snapshots: Vec<SampleSnapshot>) -> Self {
        Self {
            recorded_at: Utc::now(),
            summary,
            snapshots,
            auto_raise: None,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::debug!(path = %path.display(), snapshots = self.snapshots.len(), "Wrote trace");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)?;
        let trace: Self = serde_json::from_str(&content)?;
        if trace.snapshots.is_empty() {
            return Err(AppError::EmptyTrace);
        }
        Ok(trace)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    enabled: bool,
    generation: u64,
    recorded_at: Option<DateTime<Utc>>,
    summary: Option<SessionSummary>,
    snapshots: BTreeMap<usize, SampleSnapshot>,
    flags: Vec<SnapshotFlag>,
    selection: Option<usize>,
    auto_raise: Option<AutoRaiseReport>,
}

impl StoreState {
    fn clear(&mut self) {
        self.recorded_at = None;
        self.summary = None;
        self.snapshots.clear();
        self.flags.clear();
        self.selection = None;
        self.auto_raise = None;
    }
}

/// Diagnostics of the most recent session
///
/// Holds the summary, per-sample snapshots and flags of one session plus a
/// selected sample for stepping through them. Accessors return clones.
#[derive(Debug, Default)]
pub struct DiagnosticsStore {
    state: RwLock<StoreState>,
}

impl DiagnosticsStore {
    pub fn new(enabled: bool) -> Self {
        Self {
            state: RwLock::new(StoreState {
                enabled,
                ..StoreState::default()
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_enabled(&self) -> bool {
        self.read().enabled
    }

    /// Enable or disable capture. Changing the flag drops cached data.
    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.write();
        if state.enabled == enabled {
            return;
        }
        state.enabled = enabled;
        state.clear();
        state.generation += 1;
        tracing::debug!(enabled, generation = state.generation, "Diagnostics toggled");
    }

    /// Bumped whenever the cached data is replaced or dropped
    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    /// Replace the cache with a new session. Returns false when disabled.
    pub fn store_session(
        &self,
        summary: SessionSummary,
        snapshots: Vec<SampleSnapshot>,
        flag_threshold: f64,
    ) -> bool {
        let mut state = self.write();
        if !state.enabled {
            return false;
        }
        state.clear();
        state.flags = flag_snapshots(&snapshots, flag_threshold);
        state.snapshots = snapshots.into_iter().map(|s| (s.index, s)).collect();
        state.selection = state.snapshots.keys().next().copied();
        state.recorded_at = Some(Utc::now());
        tracing::info!(
            session = summary.session_id,
            snapshots = state.snapshots.len(),
            flags = state.flags.len(),
            "Stored session diagnostics"
        );
        state.summary = Some(summary);
        state.generation += 1;
        true
    }

    /// Load a trace file's contents, keeping its recording time.
    pub fn store_trace(&self, trace: SessionTrace, flag_threshold: f64) -> bool {
        let SessionTrace {
            recorded_at,
            summary,
            snapshots,
            auto_raise,
        } = trace;
        if !self.store_session(summary, snapshots, flag_threshold) {
            return false;
        }
        let mut state = self.write();
        state.recorded_at = Some(recorded_at);
        state.auto_raise = auto_raise;
        true
    }

    /// Keep the auto-raise report next to the cached summary.
    pub fn attach_auto_raise(&self, report: AutoRaiseReport) {
        let mut state = self.write();
        if state.enabled {
            state.auto_raise = Some(report);
        }
    }

    /// Select a sample. Returns false if there is no snapshot for it.
    pub fn select(&self, index: usize) -> bool {
        let mut state = self.write();
        if !state.enabled || !state.snapshots.contains_key(&index) {
            return false;
        }
        state.selection = Some(index);
        true
    }

    /// Move the selection by `delta` samples, skipping missing snapshots.
    ///
    /// Stops at the first or last snapshot. Returns the new selection.
    pub fn step(&self, delta: isize) -> Option<usize> {
        let mut state = self.write();
        if !state.enabled {
            return state.selection;
        }
        let current = state.selection?;
        let remaining = delta.unsigned_abs();
        let next = if delta >= 0 {
            state
                .snapshots
                .range(current + 1..)
                .map(|(&i, _)| i)
                .take(remaining)
                .last()
        } else {
            state
                .snapshots
                .range(..current)
                .rev()
                .map(|(&i, _)| i)
                .take(remaining)
                .last()
        };
        if let Some(index) = next {
            state.selection = Some(index);
        }
        state.selection
    }

    pub fn selection(&self) -> Option<usize> {
        self.read().selection
    }

    pub fn selected(&self) -> Option<SampleSnapshot> {
        let state = self.read();
        state.selection.and_then(|i| state.snapshots.get(&i).cloned())
    }

    pub fn snapshot(&self, index: usize) -> Option<SampleSnapshot> {
        self.read().snapshots.get(&index).cloned()
    }

    pub fn snapshots(&self) -> Vec<SampleSnapshot> {
        self.read().snapshots.values().cloned().collect()
    }

    pub fn summary(&self) -> Option<SessionSummary> {
        self.read().summary.clone()
    }

    pub fn flags(&self) -> Vec<SnapshotFlag> {
        self.read().flags.clone()
    }

    /// Density make-up of the cached session at an input percentage.
    pub fn density_profile(&self, percent: f64) -> Option<DensityProfile> {
        let state = self.read();
        let snapshot = state.snapshots.get(&sample_index(percent)?)?;
        density_profile(std::slice::from_ref(snapshot), percent)
    }

    pub fn auto_raise(&self) -> Option<AutoRaiseReport> {
        self.read().auto_raise.clone()
    }

    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        self.read().recorded_at
    }

    /// The cached session as a trace file, if there is one.
    pub fn to_trace(&self) -> Option<SessionTrace> {
        let state = self.read();
        Some(SessionTrace {
            recorded_at: state.recorded_at?,
            summary: state.summary.clone()?,
            snapshots: state.snapshots.values().cloned().collect(),
            auto_raise: state.auto_raise.clone(),
        })
    }
}
