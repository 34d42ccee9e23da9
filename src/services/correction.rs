use composite_density::{
    ChannelSpec, CompositeSolver, CorrectionResult, InkCurve, SessionRequest, SnapshotFlag,
    Trace, WeightingMode,
};
use serde::{Deserialize, Serialize};

use super::auto_raise::{self, AutoRaiseReport};
use super::diagnostics_store::{DiagnosticsStore, SessionTrace};
use crate::error::AppError;
use crate::models::{MeasurementTable, SessionConfig};

/// Everything one correction run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionOutcome {
    pub result: CorrectionResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_raise: Option<AutoRaiseReport>,
    #[serde(skip)]
    pub trace: Option<SessionTrace>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<SnapshotFlag>,
}

/// Runs a configured session end to end
///
/// Owns the solver so session ids keep counting across runs.
pub struct CorrectionService {
    config: SessionConfig,
    table: MeasurementTable,
    solver: CompositeSolver,
}

impl CorrectionService {
    /// Load the measurement and set up the solver from a session config.
    pub fn new(config: SessionConfig) -> Result<Self, AppError> {
        let table = config.measurement.load(&config.base_dir)?;
        Ok(Self::with_table(config, table))
    }

    pub fn with_table(config: SessionConfig, table: MeasurementTable) -> Self {
        let solver = CompositeSolver::new(config.solver.clone()).with_registry(config.registry());
        Self {
            config,
            table,
            solver,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SessionConfig {
        &mut self.config
    }

    pub fn table(&self) -> &MeasurementTable {
        &self.table
    }

    pub fn solver(&self) -> &CompositeSolver {
        &self.solver
    }

    /// Run the configured mode.
    pub fn run(&mut self, store: Option<&DiagnosticsStore>) -> Result<CorrectionOutcome, AppError> {
        self.run_mode(self.config.weighting_mode, store)
    }

    /// Auto-raise (if enabled), then begin, register every channel and
    /// finalize. A trace is recorded when diagnostics are enabled.
    pub fn run_mode(
        &mut self,
        mode: WeightingMode,
        store: Option<&DiagnosticsStore>,
    ) -> Result<CorrectionOutcome, AppError> {
        let mut specs: Vec<ChannelSpec> = self.config.channels.iter().map(|c| c.spec()).collect();
        let curves: Vec<InkCurve> = self.config.base_curves()?;

        let auto_raise = if self.config.auto_raise.enabled {
            let report = auto_raise::run(
                &self.solver,
                mode,
                &specs,
                &curves,
                &self.table,
                &self.config.locked_channels(),
                self.config.auto_raise.target_percent,
            )?;
            report.apply(&mut specs);
            Some(report)
        } else {
            None
        };

        let request = SessionRequest::new(mode).channels(specs);
        let mut session = self.solver.begin(request, &self.table)?;
        for (channel, curve) in self.config.channels.iter().zip(&curves) {
            session.register(&channel.name, curve.as_slice());
        }

        let diagnostics = &self.config.diagnostics;
        let (result, trace) = if diagnostics.enabled {
            let mut trace = Trace::new();
            let result = session.finalize_with(&mut trace);
            (result, Some(trace))
        } else {
            (session.finalize(), None)
        };

        let flags = trace
            .as_ref()
            .map(|t| diagnostics.flags(t.snapshots()))
            .unwrap_or_default();
        let trace = trace.map(|t| {
            let mut recorded = SessionTrace::new(result.summary.clone(), t.into_snapshots());
            recorded.auto_raise = auto_raise.clone();
            recorded
        });

        if let (Some(store), Some(recorded)) = (store, trace.as_ref()) {
            store.store_trace(recorded.clone(), diagnostics.flag_threshold);
        }

        tracing::info!(
            session = result.summary.session_id,
            mode = %mode,
            corrected = result.summary.corrected,
            unmet = result.summary.unmet.samples,
            flags = flags.len(),
            "Correction finished"
        );

        Ok(CorrectionOutcome {
            result,
            auto_raise,
            trace,
            flags,
        })
    }
}
