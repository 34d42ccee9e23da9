//! Session lifecycle: `begin -> register -> finalize`.
//!
//! A [`CompositeSession`] mutably borrows its [`CompositeSolver`], so a
//! second session cannot begin while one is open, and the handle cannot be
//! copied. Dropping a session without finalizing it cancels it.

mod summary;

use std::collections::HashSet;

pub use summary::{
    CorrectedCurve, CorrectionResult, InkTotals, MomentumSummary, SessionSummary, UnmetReport,
};

use crate::curve::{InkCurve, CURVE_RESOLUTION};
use crate::diagnostics::TraceRecorder;
use crate::engine::Engine;
use crate::error::{BeginError, SessionWarning};
use crate::ladder::{DensityLadder, LadderBuilder, WeightingMode};
use crate::measurement::{sample_source, DensitySource, Sample};
use crate::options::SolverOptions;
use crate::profile::{
    ChannelProfile, ChannelSpec, ConstantOrigin, DensityRegistry, ResolvedDensity, MAX_DENSITY,
};

/// Channels and weighting mode for one session.
///
/// ```
/// use composite_density::{ChannelSpec, SessionRequest, WeightingMode};
///
/// let request = SessionRequest::new(WeightingMode::Normalized)
///     .channel(ChannelSpec::new("K", 65535))
///     .channel(ChannelSpec::new("LK", 22937));
/// assert_eq!(request.channels.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub mode: WeightingMode,
    pub channels: Vec<ChannelSpec>,
}

impl SessionRequest {
    pub fn new(mode: WeightingMode) -> Self {
        Self {
            mode,
            channels: Vec::new(),
        }
    }

    #[inline]
    pub fn channel(mut self, spec: ChannelSpec) -> Self {
        self.channels.push(spec);
        self
    }

    #[inline]
    pub fn channels(mut self, specs: impl IntoIterator<Item = ChannelSpec>) -> Self {
        self.channels.extend(specs);
        self
    }
}

/// Owns solver options and density constants, and opens sessions.
#[derive(Debug, Clone, Default)]
pub struct CompositeSolver {
    options: SolverOptions,
    registry: DensityRegistry,
    next_id: u64,
}

impl CompositeSolver {
    pub fn new(options: SolverOptions) -> Self {
        Self {
            options,
            registry: DensityRegistry::new(),
            next_id: 1,
        }
    }

    #[inline]
    pub fn with_registry(mut self, registry: DensityRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut SolverOptions {
        &mut self.options
    }

    pub fn registry(&self) -> &DensityRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DensityRegistry {
        &mut self.registry
    }

    /// Id the next session will get.
    pub fn next_session_id(&self) -> u64 {
        self.next_id.max(1)
    }

    /// Start a session.
    ///
    /// The density source is sampled at all 256 tonal steps right away.
    /// Fails when no channels are named, a name repeats, or every channel
    /// has a zero ink limit.
    pub fn begin<S>(&mut self, request: SessionRequest, source: &S) -> Result<CompositeSession<'_>, BeginError>
    where
        S: DensitySource + ?Sized,
    {
        if request.channels.is_empty() {
            return Err(BeginError::NoChannels);
        }
        let mut seen = HashSet::new();
        for spec in &request.channels {
            if !seen.insert(spec.name.as_str()) {
                return Err(BeginError::DuplicateChannel(spec.name.clone()));
            }
        }
        if request.channels.iter().all(|spec| spec.ink_limit == 0) {
            return Err(BeginError::NoActiveChannels);
        }

        let mut warnings = Vec::new();
        let channels: Vec<SessionChannel> = request
            .channels
            .into_iter()
            .map(|spec| {
                let density = match spec.density_constant {
                    Some(value) if value.is_finite() => ResolvedDensity {
                        value: value.clamp(0.0, MAX_DENSITY),
                        origin: ConstantOrigin::Manual,
                    },
                    Some(_) => {
                        warnings.push(SessionWarning::InvalidDensity {
                            channel: spec.name.clone(),
                        });
                        self.registry.resolve(&spec.name)
                    }
                    None => self.registry.resolve(&spec.name),
                };
                SessionChannel {
                    coverage_buffer: self.options.sanitized_buffer(spec.coverage_buffer),
                    ink_limit: spec.ink_limit,
                    name: spec.name,
                    density,
                    curve: None,
                }
            })
            .collect();

        let samples = sample_source(source);
        let id = self.next_session_id();
        self.next_id = id + 1;
        tracing::info!(
            session = id,
            channels = channels.len(),
            mode = %request.mode,
            "Composite session started"
        );

        Ok(CompositeSession {
            solver: self,
            id,
            mode: request.mode,
            channels,
            samples,
            warnings,
        })
    }
}

#[derive(Debug, Clone)]
struct SessionChannel {
    name: String,
    ink_limit: u16,
    density: ResolvedDensity,
    coverage_buffer: f64,
    curve: Option<InkCurve>,
}

impl SessionChannel {
    fn profile(&self) -> ChannelProfile {
        ChannelProfile {
            name: self.name.clone(),
            base_curve: self.curve.clone().unwrap_or_default(),
            ink_ceiling: self.ink_limit,
            density_constant: self.density.value,
            density_origin: self.density.origin,
            coverage_buffer: self.coverage_buffer,
        }
    }
}

/// An open correction session.
#[derive(Debug)]
pub struct CompositeSession<'s> {
    solver: &'s mut CompositeSolver,
    id: u64,
    mode: WeightingMode,
    channels: Vec<SessionChannel>,
    samples: Vec<Sample>,
    warnings: Vec<SessionWarning>,
}

impl CompositeSession<'_> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn mode(&self) -> WeightingMode {
        self.mode
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Channels still waiting for a base curve.
    pub fn pending(&self) -> Vec<&str> {
        self.channels
            .iter()
            .filter(|c| c.curve.is_none())
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn warnings(&self) -> &[SessionWarning] {
        &self.warnings
    }

    /// Attach a channel's base curve.
    ///
    /// Unknown channels and curves of the wrong length are ignored with a
    /// warning. Registering twice keeps the latest curve. Returns whether
    /// the curve was accepted.
    pub fn register(&mut self, channel: &str, curve: &[u16]) -> bool {
        let Some(entry) = self.channels.iter_mut().find(|c| c.name == channel) else {
            tracing::warn!(channel, "Ignoring curve for a channel outside the session");
            self.warnings.push(SessionWarning::UnknownChannel {
                channel: channel.to_string(),
            });
            return false;
        };

        let curve = match InkCurve::try_from(curve) {
            Ok(curve) => curve,
            Err(err) => {
                tracing::warn!(channel, samples = err.actual, "Ignoring curve of the wrong length");
                self.warnings.push(SessionWarning::CurveLength {
                    channel: channel.to_string(),
                    expected: CURVE_RESOLUTION,
                    actual: err.actual,
                });
                return false;
            }
        };

        if entry.curve.is_some() {
            self.warnings.push(SessionWarning::DuplicateRegistration {
                channel: channel.to_string(),
            });
        }
        entry.curve = Some(curve);
        true
    }

    /// Run the engine and close the session.
    pub fn finalize(self) -> CorrectionResult {
        self.finish(None)
    }

    /// Like [`finalize`](Self::finalize), sending one snapshot per sample
    /// to `recorder`.
    pub fn finalize_with(self, recorder: &mut dyn TraceRecorder) -> CorrectionResult {
        self.finish(Some(recorder))
    }

    fn finish(mut self, recorder: Option<&mut dyn TraceRecorder>) -> CorrectionResult {
        let profiles: Vec<ChannelProfile> = self.channels.iter().map(SessionChannel::profile).collect();
        let ladder = LadderBuilder::new(self.mode)
            .momentum(self.solver.options.momentum)
            .build(&profiles);
        let mut warnings = std::mem::take(&mut self.warnings);

        let missing: Vec<String> = self.pending().into_iter().map(str::to_string).collect();
        if !missing.is_empty() {
            tracing::warn!(
                session = self.id,
                missing = missing.len(),
                "Finalize before every channel was registered, returning uncorrected curves"
            );
            warnings.push(SessionWarning::MissingRegistration { channels: missing });

            let curves: Vec<CorrectedCurve> = self
                .channels
                .iter()
                .filter_map(|c| {
                    c.curve.clone().map(|curve| CorrectedCurve {
                        channel: c.name.clone(),
                        curve,
                    })
                })
                .collect();
            let baseline: f64 = curves.iter().map(|c| c.curve.total_normalized()).sum();
            let mut summary = self.describe(&profiles, &ladder);
            summary.totals = InkTotals {
                baseline_ink: baseline,
                corrected_ink: baseline,
                ink_delta: 0.0,
            };
            summary.warnings = warnings;
            return CorrectionResult { curves, summary };
        }

        let options = &self.solver.options;
        let output = Engine::new(&profiles, &ladder, options).run(&self.samples, recorder);
        warnings.extend(output.warnings);

        let clamped: usize = output.coverage.iter().map(|r| r.overflow_count).sum();
        tracing::info!(
            session = self.id,
            clamped,
            unmet = output.unmet.samples,
            warnings = warnings.len(),
            ink_delta = output.totals.ink_delta,
            "Composite session finalized"
        );

        let mut summary = self.describe(&profiles, &ladder);
        summary.corrected = true;
        summary.coverage = options.coverage_reporting.then_some(output.coverage);
        summary.totals = output.totals;
        summary.unmet = output.unmet;
        summary.slope = output.slope;
        summary.warnings = warnings;

        let curves = profiles
            .into_iter()
            .zip(output.curves)
            .map(|(profile, curve)| CorrectedCurve {
                channel: profile.name,
                curve,
            })
            .collect();
        CorrectionResult { curves, summary }
    }

    /// Summary fields that do not depend on the engine run.
    fn describe(&self, profiles: &[ChannelProfile], ladder: &DensityLadder) -> SessionSummary {
        let options = &self.solver.options;
        let momentum = (self.mode == WeightingMode::Momentum).then(|| MomentumSummary {
            window_radius: options.momentum.window_radius,
            sigma: options.momentum.effective_sigma(),
            peaks: ladder.momentum_peaks(),
        });
        SessionSummary {
            session_id: self.id,
            weighting_mode: self.mode,
            corrected: false,
            channel_names: profiles.iter().map(|p| p.name.clone()).collect(),
            channel_maxima: profiles.iter().map(|p| p.ink_ceiling).collect(),
            density_constants: profiles.iter().map(|p| p.density_constant).collect(),
            density_weights: ladder.weights().to_vec(),
            density_ladder: ladder.order_names(),
            smoothing: options.smoothing,
            blend_window: options.smoothing.sample_count(),
            coverage: None,
            momentum,
            totals: InkTotals::default(),
            unmet: UnmetReport::default(),
            slope: None,
            warnings: Vec::new(),
        }
    }
}
