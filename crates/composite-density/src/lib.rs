//! composite-density: density redistribution across overlapping ink channels
//!
//! Given a measured tonal error (how far printed density deviates from a
//! target at each input level) this crate decides, at each of 256 tonal
//! steps, how to spread a correction over several ink channels with
//! different optical densities, ink ceilings and remaining headroom. The
//! corrected curves avoid visible steps, never exceed a channel's ceiling
//! plus its coverage buffer, and use lighter inks before heavier ones.
//!
//! # Quick Start
//!
//! ```
//! use composite_density::{
//!     ChannelSpec, CompositeSolver, InkCurve, SessionRequest, SolverOptions, Trace,
//!     WeightingMode,
//! };
//!
//! let mut solver = CompositeSolver::new(SolverOptions::default());
//!
//! let request = SessionRequest::new(WeightingMode::Normalized)
//!     .channel(ChannelSpec::new("K", 65535))
//!     .channel(ChannelSpec::new("LK", 22937));
//!
//! // Print is a little too light through the midtones.
//! let measurement = |percent: f64| {
//!     let target = percent / 100.0;
//!     (target, target * 0.97)
//! };
//!
//! let mut session = solver.begin(request, &measurement).unwrap();
//! session.register("K", InkCurve::linear(0, 40000).as_slice());
//! session.register("LK", InkCurve::linear(0, 15000).as_slice());
//!
//! let mut trace = Trace::new();
//! let result = session.finalize_with(&mut trace);
//!
//! assert!(result.summary.corrected);
//! assert_eq!(trace.len(), 256);
//! assert_eq!(result.summary.density_ladder, vec!["LK", "K"]);
//! ```
//!
//! # Session Lifecycle
//!
//! 1. [`CompositeSolver::begin`] names the channels (ink limit, optional
//!    density constant and coverage buffer), picks a [`WeightingMode`] and
//!    samples the [`DensitySource`].
//! 2. [`CompositeSession::register`] attaches each channel's base curve.
//! 3. [`CompositeSession::finalize`] runs the engine and returns a
//!    [`CorrectionResult`]. If a channel was never registered the result is
//!    the registered curves unchanged, plus a warning.
//!
//! The session borrows the solver mutably, so only one can be open at a
//! time. Protocol mistakes after `begin` never fail; they become
//! [`SessionWarning`]s in the summary.
//!
//! # Units
//!
//! Curves are in device units (`0..=65535`). Internally everything is
//! normalized to `[0, 1]`. A channel's *weight* is
//! `density_constant * ceiling_normalized`; the density one unit of
//! normalized ink adds is `weight / ceiling_normalized`.
//!
//! # The Engine
//!
//! Each channel carries a correction layer from sample to sample. Per
//! sample the engine:
//!
//! - bounds each layer by the blend step (`ceiling / window^alpha`, see
//!   [`SmoothingWindow`]), the reserve taper near the ceiling and the
//!   ceiling itself,
//! - unwinds layers pointing against the requested correction, then
//!   promotes the remainder along the [`DensityLadder`], lightest first,
//! - moves density a heavier channel still holds onto lighter channels that
//!   have room again (recorded as [`LadderTransfer`]s),
//! - clamps at `ceiling + coverage_buffer` and records any overflow in the
//!   channel's [`CoverageReport`].
//!
//! Right after the delta density changes sign, every step is eased back in
//! over the blend window so no channel lurches. With
//! [`SlopeOptions`] enabled, the finished curves then go through the
//! [`slope`] pass, which keeps adjacent samples under the flag threshold.
//!
//! ## Reserve states
//!
//! | State | Meaning | Growth scale |
//! |-------|---------|--------------|
//! | [`ReserveState::Approaching`] | outside the reserve band | 1 |
//! | [`ReserveState::Within`] | inside the band | `(headroom / band)^exponent`, never rising |
//! | [`ReserveState::Exhausted`] | no usable headroom | 0 |
//! | [`ReserveState::Releasing`] | layer shrinking after saturation | `(headroom / band)^exponent`, climbing back |
//!
//! Shrinking is only bounded by the blend step, in every state.
//!
//! # Diagnostics
//!
//! [`CompositeSession::finalize_with`] takes any [`TraceRecorder`]. [`Trace`]
//! keeps every [`SampleSnapshot`]; [`flag_snapshots`] finds samples where a
//! channel jumped by several percent. Recording never changes the
//! corrected curves.

pub mod curve;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod ladder;
pub mod measurement;
pub mod options;
pub mod profile;
pub mod session;
pub mod slope;

#[cfg(test)]
mod domain_tests;

pub use curve::{input_percent, to_device, to_normalized, InkCurve, CURVE_RESOLUTION, TOTAL_INK};
pub use diagnostics::{
    density_profile, flag_snapshots, sample_index, BlockReason, ChannelDensityShare,
    ChannelSampleState, DensityProfile, FlagDetail, FlagKind, LadderBlock, LadderDirection,
    LadderStep, LadderTransfer, SampleSnapshot, SnapshotFlag, Trace, TraceRecorder,
    DEFAULT_FLAG_THRESHOLD,
};
pub use engine::{ClampEvent, CoverageReport, ReserveState};
pub use error::{BeginError, CurveLengthError, ParseModeError, SessionWarning};
pub use ladder::{DensityLadder, LadderBuilder, MomentumPeak, WeightingMode};
pub use measurement::{sample_source, DensitySource, Sample};
pub use options::{MomentumOptions, ReserveOptions, SlopeOptions, SmoothingWindow, SolverOptions};
pub use profile::{
    ChannelProfile, ChannelSpec, ConstantOrigin, DensityRegistry, ResolvedDensity,
};
pub use session::{
    CompositeSession, CompositeSolver, CorrectedCurve, CorrectionResult, InkTotals,
    MomentumSummary, SessionRequest, SessionSummary, UnmetReport,
};
pub use slope::{SlopeChannelReport, SlopeReport};
