//! Domain-critical regression tests for composite-density.
//!
//! These tests are designed to catch specific classes of bugs, not just
//! confirm happy paths. Each test documents the regression it guards against.
//!
//! Most tests run the same three-channel quad: K (full ceiling, heaviest),
//! C (45% ceiling) and LK (35% ceiling), with a delta density that rises
//! linearly from 0 to 0.15 across the tonal range.

#[cfg(test)]
mod domain_tests {
    use crate::curve::{to_device, to_normalized, InkCurve, TOTAL_INK};
    use crate::diagnostics::{SampleSnapshot, Trace};
    use crate::engine::ReserveState;
    use crate::error::SessionWarning;
    use crate::ladder::WeightingMode;
    use crate::measurement::DensitySource;
    use crate::options::{SlopeOptions, SolverOptions};
    use crate::profile::ChannelSpec;
    use crate::session::{CompositeSolver, CorrectionResult, SessionRequest};

    const C_LIMIT: u16 = 29491;
    const LK_LIMIT: u16 = 22937;
    const FIVE_PERCENT: u16 = 3277;

    fn quad_channels() -> Vec<(ChannelSpec, InkCurve)> {
        vec![
            (ChannelSpec::new("K", TOTAL_INK), InkCurve::linear(0, 32768)),
            (ChannelSpec::new("C", C_LIMIT), InkCurve::flat(FIVE_PERCENT)),
            (ChannelSpec::new("LK", LK_LIMIT), InkCurve::flat(FIVE_PERCENT)),
        ]
    }

    fn rising(percent: f64) -> (f64, f64) {
        (0.15 * percent / 100.0, 0.0)
    }

    fn run_session(
        mode: WeightingMode,
        options: SolverOptions,
        source: &dyn DensitySource,
        channels: &[(ChannelSpec, InkCurve)],
    ) -> (CorrectionResult, Trace) {
        let mut solver = CompositeSolver::new(options);
        let request = SessionRequest::new(mode).channels(channels.iter().map(|(spec, _)| spec.clone()));
        let mut session = solver.begin(request, source).unwrap();
        for (spec, curve) in channels {
            assert!(session.register(&spec.name, curve.as_slice()));
        }
        let mut trace = Trace::new();
        let result = session.finalize_with(&mut trace);
        (result, trace)
    }

    fn run_quad(mode: WeightingMode, source: &dyn DensitySource) -> (CorrectionResult, Trace) {
        run_session(mode, SolverOptions::default(), source, &quad_channels())
    }

    fn layers(trace: &Trace, channel: &str) -> Vec<f64> {
        trace
            .channel_series(channel)
            .iter()
            .map(|s| s.normalized_delta)
            .collect()
    }

    fn first_index(values: &[f64], predicate: impl Fn(f64) -> bool) -> Option<usize> {
        values.iter().position(|&v| predicate(v))
    }

    // ========================================================================
    // GAP 1: Conservation -- the requested correction is placed, not lost
    // ========================================================================

    /// If this breaks, it means: the engine is dropping (or inventing)
    /// density while walking the ladder. Every sample with a real delta
    /// must show a net contribution change of the same sign, and in this
    /// scenario there is always enough headroom to place all of it.
    #[test]
    fn test_conservation_of_requested_density() {
        let (result, trace) = run_quad(WeightingMode::Normalized, &rising);

        assert_eq!(
            result.summary.unmet.samples, 0,
            "REGRESSION: scenario has headroom everywhere but {} samples were left unmet",
            result.summary.unmet.samples
        );

        for snap in trace.snapshots() {
            if snap.delta_density.abs() < 1e-3 {
                continue;
            }
            let placed: f64 = snap
                .channels
                .iter()
                .map(|c| c.density_contribution_delta)
                .sum();
            assert!(
                placed != 0.0 && placed.signum() == snap.delta_density.signum(),
                "REGRESSION: sample {} placed {:.6} for a delta of {:.6}",
                snap.index,
                placed,
                snap.delta_density
            );
            assert!(
                (placed - snap.delta_density).abs() < 1e-6,
                "REGRESSION: sample {} placed {:.6}, expected {:.6}",
                snap.index,
                placed,
                snap.delta_density
            );
        }
    }

    // ========================================================================
    // GAP 2: Ladder priority -- heavy inks wait for lighter ones
    // ========================================================================

    /// If this breaks, it means: a channel later in the ladder received
    /// correction while an earlier channel still had room this sample, so
    /// black would start moving while cyan could still absorb the change.
    #[test]
    fn test_later_channels_wait_for_earlier_headroom() {
        let (result, trace) = run_quad(WeightingMode::Normalized, &rising);
        assert_eq!(result.summary.density_ladder, vec!["LK", "C", "K"]);

        for snap in trace.snapshots() {
            for promotion in &snap.promotions {
                for earlier in snap
                    .channels
                    .iter()
                    .filter(|c| c.ladder_rank.is_some_and(|r| r < promotion.ladder_index))
                {
                    assert!(
                        earlier.effective_headroom_normalized <= 1e-9,
                        "REGRESSION: sample {}: {} promoted while {} still had {:.6} headroom",
                        snap.index,
                        promotion.channel,
                        earlier.channel,
                        earlier.effective_headroom_normalized
                    );
                }
            }
        }

        let k = layers(&trace, "K");
        let first_k = first_index(&k, |v| v > 1e-9).unwrap_or(k.len());
        assert!(
            first_k > 150,
            "REGRESSION: K started correcting at sample {} while C still had headroom",
            first_k
        );
    }

    // ========================================================================
    // GAP 3: End-to-end handoff LK -> C -> K
    // ========================================================================

    /// If this breaks, it means: the handoff order across the quad is wrong.
    /// LK must go approaching -> within -> exhausted before C carries the
    /// bulk of the correction, and C must move well before K does.
    #[test]
    fn test_end_to_end_handoff_order() {
        let (_, trace) = run_quad(WeightingMode::Normalized, &rising);

        let lk_states: Vec<ReserveState> = trace
            .channel_series("LK")
            .iter()
            .map(|s| s.reserve_state)
            .collect();
        assert_eq!(lk_states[0], ReserveState::Approaching);
        let within = lk_states
            .iter()
            .position(|&s| s == ReserveState::Within)
            .expect("LK never entered its reserve band");
        let exhausted = lk_states
            .iter()
            .position(|&s| s == ReserveState::Exhausted)
            .expect("LK never exhausted");
        assert!(
            within < exhausted,
            "REGRESSION: LK exhausted at {} without passing through within (first at {})",
            exhausted,
            within
        );

        let c = layers(&trace, "C");
        let k = layers(&trace, "K");
        let c_bulk = first_index(&c, |v| v > 0.05).expect("C never carried correction");
        assert!(
            exhausted < c_bulk,
            "REGRESSION: C took over at {} before LK exhausted at {}",
            c_bulk,
            exhausted
        );

        let c_moves = first_index(&c, |v| v > 0.01).expect("C never moved");
        let k_moves = first_index(&k, |v| v > 0.001).unwrap_or(k.len());
        assert!(
            c_moves < k_moves,
            "REGRESSION: K moved at {} before C moved at {}",
            k_moves,
            c_moves
        );
    }

    // ========================================================================
    // GAP 4: Reserve transitions are monotone within an excursion
    // ========================================================================

    /// If this breaks, it means: a channel's reserve state stepped backward
    /// (e.g. exhausted -> within) while its correction was still growing, or
    /// the growth scale bounced back up inside the band. Either shows up as
    /// a visible ripple at the saturation point.
    #[test]
    fn test_reserve_states_only_move_forward_while_promoting() {
        let (_, trace) = run_quad(WeightingMode::Normalized, &rising);

        for channel in ["K", "C", "LK"] {
            let series = trace.channel_series(channel);
            for pair in series.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                if a.reserve_state == ReserveState::Releasing || b.reserve_state == ReserveState::Releasing {
                    continue;
                }
                assert!(
                    b.reserve_state >= a.reserve_state,
                    "REGRESSION: {} went {:?} -> {:?} during a rising correction",
                    channel,
                    a.reserve_state,
                    b.reserve_state
                );
                if a.reserve_state != ReserveState::Approaching && b.reserve_state != ReserveState::Approaching {
                    assert!(
                        b.reserve_release_scale <= a.reserve_release_scale + 1e-12,
                        "REGRESSION: {} reserve scale rose from {:.4} to {:.4} inside the band",
                        channel,
                        a.reserve_release_scale,
                        b.reserve_release_scale
                    );
                }
            }
        }
    }

    // ========================================================================
    // GAP 5: Bounded blend step
    // ========================================================================

    /// If this breaks, it means: a ladder reorder or saturation let a
    /// channel jump by more than the blend window allows between adjacent
    /// samples, which prints as a visible band.
    #[test]
    fn test_per_sample_change_is_bounded_by_blend_cap() {
        for mode in WeightingMode::ALL {
            let (_, trace) = run_quad(mode, &rising);
            for channel in ["K", "C", "LK"] {
                let series = trace.channel_series(channel);
                for pair in series.windows(2) {
                    let step = (pair[1].normalized_delta - pair[0].normalized_delta).abs();
                    assert!(
                        step <= pair[1].blend_cap_normalized + 1e-9,
                        "REGRESSION: {mode} {channel} layer moved {step:.6} with a cap of {:.6}",
                        pair[1].blend_cap_normalized
                    );
                }
            }
            // C and LK have flat base curves, so the output obeys the cap too.
            for channel in ["C", "LK"] {
                let series = trace.channel_series(channel);
                for pair in series.windows(2) {
                    let step = (pair[1].normalized_after - pair[0].normalized_after).abs();
                    assert!(step <= pair[1].blend_cap_normalized + 1e-9);
                }
            }
        }
    }

    // ========================================================================
    // GAP 6: Sign flips are eased
    // ========================================================================

    fn rise_then_fall(percent: f64) -> (f64, f64) {
        let i = percent / 100.0 * 255.0;
        let delta = if i <= 120.0 {
            0.12 * i / 120.0
        } else if i <= 140.0 {
            0.12 - 0.14 * (i - 120.0) / 20.0
        } else {
            -0.02
        };
        (delta, 0.0)
    }

    /// If this breaks, it means: when the delta density turns around, black
    /// lurches to the new target while lighter channels are still tapering.
    /// Steps must be eased right after the sign flip, K must stay within its
    /// cap, and C must keep unwinding smoothly instead of freezing. Black only
    /// removes ink once the lighter inks stopped adding it, and in the steady
    /// negative tail LK and C are emptied to their floors before K carries
    /// the rest.
    #[test]
    fn test_sign_flip_eases_every_channel() {
        let (_, trace) = run_quad(WeightingMode::Normalized, &rise_then_fall);
        let snaps = trace.snapshots();

        let flip = snaps
            .iter()
            .position(|s| s.delta_density < 0.0)
            .expect("fixture never goes negative");
        assert!(
            snaps[flip].sign_flip_ease < 0.5,
            "REGRESSION: no easing at the sign flip (ease {:.3})",
            snaps[flip].sign_flip_ease
        );
        assert!(snaps[flip - 1].sign_flip_ease == 1.0);

        let k = trace.channel_series("K");
        for pair in k.windows(2) {
            let step = (pair[1].normalized_delta - pair[0].normalized_delta).abs();
            assert!(
                step <= pair[1].blend_cap_normalized + 1e-9,
                "REGRESSION: K jumped {:.6} around the sign flip",
                step
            );
        }
        for snap in snaps {
            let k = snap.channel("K").unwrap().normalized_delta;
            if k >= -1e-9 {
                continue;
            }
            for lighter in ["C", "LK"] {
                let layer = snap.channel(lighter).unwrap().normalized_delta;
                assert!(
                    layer <= 1e-9,
                    "REGRESSION: sample {}: K removed ink ({k:.6}) while {lighter} still added {layer:.6}",
                    snap.index
                );
            }
        }

        let floor = -f64::from(FIVE_PERCENT) / f64::from(TOTAL_INK);
        for snap in &snaps[200..] {
            for lighter in ["C", "LK"] {
                let layer = snap.channel(lighter).unwrap().normalized_delta;
                assert!(
                    (layer - floor).abs() < 1e-6,
                    "REGRESSION: sample {}: {lighter} held {layer:.6} instead of emptying to {floor:.6}",
                    snap.index
                );
            }
            let k = snap.channel("K").unwrap().normalized_delta;
            assert!(
                (k + 0.006799).abs() < 1e-4,
                "REGRESSION: sample {}: K carries {k:.6} of the steady removal",
                snap.index
            );
        }

        let c = layers(&trace, "C");
        for i in 125..=140 {
            assert!(
                (c[i] - c[i - 1]).abs() >= 1e-4,
                "REGRESSION: C stopped unwinding at sample {}",
                i
            );
        }
    }

    // ========================================================================
    // GAP 7: Weighting modes
    // ========================================================================

    /// If this breaks, it means: equal weighting still leaks the density
    /// constants into the weights.
    #[test]
    fn test_equal_mode_weights_are_identical() {
        let (result, _) = run_quad(WeightingMode::Equal, &rising);
        let weights = &result.summary.density_weights;
        assert_eq!(weights.len(), 3);
        assert!(weights.iter().all(|w| (w - weights[0]).abs() < 1e-12 && *w > 0.0));
    }

    /// If this breaks, it means: momentum diagnostics leak into other modes
    /// or the momentum mode stopped computing them.
    #[test]
    fn test_momentum_only_reported_in_momentum_mode() {
        let (result, trace) = run_quad(WeightingMode::Momentum, &rising);
        let momentum = result.summary.momentum.expect("momentum summary missing");
        assert_eq!(momentum.peaks.len(), 3);
        assert!(momentum.peaks.iter().all(|p| p.value > 0.0));
        assert!(trace
            .snapshots()
            .iter()
            .any(|s| s.channels.iter().any(|c| c.momentum > 0.0)));

        let (result, trace) = run_quad(WeightingMode::Normalized, &rising);
        assert!(result.summary.momentum.is_none());
        assert!(trace
            .snapshots()
            .iter()
            .all(|s| s.channels.iter().all(|c| c.momentum == 0.0)));
    }

    /// If this breaks, it means: isolated mode went back to walking a
    /// ladder instead of correcting every channel by its own share.
    #[test]
    fn test_isolated_mode_moves_all_channels_together() {
        let (_, trace) = run_quad(WeightingMode::Isolated, &rising);
        let snap = &trace.snapshots()[100];
        for channel in &snap.channels {
            assert!(
                channel.normalized_delta > 0.0,
                "REGRESSION: {} idle in isolated mode",
                channel.channel
            );
        }
    }

    // ========================================================================
    // GAP 8: Coverage ceiling is never exceeded
    // ========================================================================

    fn overwhelming(percent: f64) -> (f64, f64) {
        (0.9 * percent / 100.0, 0.0)
    }

    /// If this breaks, it means: a channel printed more ink than its
    /// configured limit plus buffer, which can flood paper. When the
    /// correction cannot fit, it must show up as unmet instead.
    #[test]
    fn test_coverage_limit_holds_under_impossible_correction() {
        for mode in WeightingMode::ALL {
            let (result, trace) = run_quad(mode, &overwhelming);
            let coverage = result.summary.coverage.as_ref().expect("coverage report missing");
            for report in coverage {
                let curve = result.curve(&report.channel).unwrap();
                let device_limit = to_device(report.buffered_limit);
                assert!(
                    curve.iter().all(|v| v <= device_limit),
                    "REGRESSION: {mode} {} exceeded its buffered limit",
                    report.channel
                );
            }
            for snap in trace.snapshots() {
                for state in &snap.channels {
                    let report = result.summary.coverage_for(&state.channel).unwrap();
                    assert!(state.normalized_after <= report.buffered_limit + 1e-12);
                    assert!(state.normalized_after >= 0.0);
                }
            }
            assert!(
                result.summary.unmet.samples > 0,
                "REGRESSION: {mode} reported no unmet correction for an impossible target"
            );
            assert!(result
                .summary
                .warnings
                .iter()
                .any(|w| matches!(w, SessionWarning::UnmetCorrection { .. })));
        }
    }

    // ========================================================================
    // GAP 9: Diagnostics are observation only
    // ========================================================================

    /// If this breaks, it means: recording a trace changes the corrected
    /// curves, so what the diagnostics show is not what gets printed.
    #[test]
    fn test_trace_does_not_change_results() {
        for mode in WeightingMode::ALL {
            let mut solver = CompositeSolver::default();
            let request = || {
                SessionRequest::new(mode).channels(quad_channels().into_iter().map(|(spec, _)| spec))
            };

            let mut plain = solver.begin(request(), &rise_then_fall).unwrap();
            for (spec, curve) in quad_channels() {
                plain.register(&spec.name, curve.as_slice());
            }
            let plain = plain.finalize();

            let mut traced = solver.begin(request(), &rise_then_fall).unwrap();
            for (spec, curve) in quad_channels() {
                traced.register(&spec.name, curve.as_slice());
            }
            let mut trace = Trace::new();
            let traced = traced.finalize_with(&mut trace);

            assert_eq!(trace.len(), 256);
            assert_eq!(plain.curves, traced.curves, "REGRESSION: {mode} curves differ with tracing");
            assert_eq!(plain.summary.totals, traced.summary.totals);
            assert_eq!(plain.summary.warnings, traced.summary.warnings);
        }
    }

    // ========================================================================
    // GAP 10: Edge cases
    // ========================================================================

    /// If this breaks, it means: a channel with no ink limit is being
    /// touched by the solver instead of passing through untouched.
    #[test]
    fn test_zero_ceiling_channel_passes_through() {
        let mut channels = quad_channels();
        let y_curve = InkCurve::linear(0, 5000);
        channels.push((ChannelSpec::new("Y", 0), y_curve.clone()));

        let (result, trace) = run_session(WeightingMode::Normalized, SolverOptions::default(), &rising, &channels);
        assert_eq!(result.curve("Y"), Some(&y_curve));
        assert!(!result.summary.density_ladder.contains(&"Y".to_string()));
        assert!(trace
            .channel_series("Y")
            .iter()
            .all(|s| s.ladder_rank.is_none() && s.layer_normalized == 0.0));
    }

    /// If this breaks, it means: a NaN from the measurement propagated into
    /// the curves instead of being held at the previous sample's delta.
    #[test]
    fn test_non_finite_measurement_is_held() {
        let glitchy = |percent: f64| {
            if (39.9..=41.0).contains(&percent) {
                (f64::NAN, 0.0)
            } else {
                rising(percent)
            }
        };
        let (result, trace) = run_quad(WeightingMode::Normalized, &glitchy);

        let held: Vec<&SampleSnapshot> = trace
            .snapshots()
            .iter()
            .filter(|s| !s.target_density.is_finite())
            .collect();
        assert_eq!(held.len(), 3);
        for snap in held {
            let previous = &trace.snapshots()[snap.index - 1];
            assert!(snap.delta_density.is_finite());
            assert!((snap.delta_density - previous.delta_density).abs() < 1e-15);
        }
        let count = result
            .summary
            .warnings
            .iter()
            .filter(|w| matches!(w, SessionWarning::NonFiniteSample { .. }))
            .count();
        assert_eq!(count, 3);
    }

    /// If this breaks, it means: a negative delta added ink, or removed
    /// heavy ink before the lighter channels gave theirs up.
    #[test]
    fn test_negative_delta_removes_lighter_ink_first() {
        let darker = |_: f64| (0.0, 0.002);
        let (result, trace) = run_quad(WeightingMode::Normalized, &darker);

        for (spec, base) in quad_channels() {
            let curve = result.curve(&spec.name).unwrap();
            assert!(curve.iter().zip(base.iter()).all(|(after, before)| after <= before));
        }
        let snap = &trace.snapshots()[200];
        assert!(snap.channel("LK").unwrap().normalized_delta < 0.0);
        assert!(
            snap.channel("K").unwrap().normalized_delta.abs() < 1e-9,
            "REGRESSION: K gave up ink while LK still had some to remove"
        );
    }

    // ========================================================================
    // GAP 11: Black drains back into lighter inks
    // ========================================================================

    fn step_up(percent: f64) -> (f64, f64) {
        (if percent >= 30.0 { 0.03 } else { 0.0 }, 0.0)
    }

    /// If this breaks, it means: black kept the overflow of a sudden step in
    /// the correction even after cyan and light black had room again, so
    /// the rest of the curve prints with extra black instead of lighter ink.
    #[test]
    fn test_step_overflow_moves_back_to_lighter_channels() {
        let (result, trace) = run_quad(WeightingMode::Normalized, &step_up);
        assert_eq!(result.summary.unmet.samples, 0);

        let snaps = trace.snapshots();
        let step_at = snaps
            .iter()
            .position(|s| s.delta_density > 0.0)
            .expect("fixture never steps");
        assert!(
            snaps[step_at].channel("K").unwrap().normalized_delta > 0.01,
            "fixture should overflow into K at the step"
        );
        assert!(snaps[step_at + 1..]
            .iter()
            .any(|s| s.transfers.iter().any(|t| t.from == "K" && t.density > 0.0)));

        for snap in &snaps[100..] {
            let k = snap.channel("K").unwrap().normalized_delta;
            assert!(
                k <= 1e-9,
                "REGRESSION: sample {}: K still holds {k:.6} while lighter inks have room",
                snap.index
            );
            assert!(snap.channel("C").unwrap().normalized_delta > 0.0);
        }
        assert!(snaps[255].channel("K").unwrap().normalized_delta.abs() < 1e-9);

        let placed: f64 = snaps[150]
            .channels
            .iter()
            .map(|c| c.density_contribution_delta)
            .sum();
        assert!((placed - 0.03).abs() < 1e-6);
    }

    // ========================================================================
    // GAP 12: Receding correction near saturation
    // ========================================================================

    fn recede(percent: f64) -> (f64, f64) {
        let i = percent / 100.0 * 255.0;
        let delta = if i <= 120.0 {
            0.095 * i / 120.0
        } else if i <= 140.0 {
            0.095 - 0.003 * (i - 120.0)
        } else {
            0.035
        };
        (delta, 0.0)
    }

    /// If this breaks, it means: a channel inside its reserve band could
    /// not give ink back at the full blend step, so a falling correction
    /// overshoots while cyan is near its ceiling.
    #[test]
    fn test_receding_correction_is_met_inside_the_band() {
        let (result, trace) = run_quad(WeightingMode::Normalized, &recede);

        let c_states: Vec<ReserveState> = trace
            .channel_series("C")
            .iter()
            .map(|s| s.reserve_state)
            .collect();
        assert!(
            c_states[..=120].contains(&ReserveState::Within),
            "fixture should push C into its reserve band"
        );
        assert_eq!(
            result.summary.unmet.samples, 0,
            "REGRESSION: {} samples left unmet while C was receding",
            result.summary.unmet.samples
        );
        assert!(c_states[121..].contains(&ReserveState::Releasing));
    }

    // ========================================================================
    // GAP 13: Coverage floor follows the ladder
    // ========================================================================

    /// If this breaks, it means: the coverage floor and layer in the trace
    /// stopped describing how much of a channel sits on top of the channel
    /// before it in the ladder.
    #[test]
    fn test_coverage_floor_tracks_previous_ladder_channel() {
        let (_, trace) = run_quad(WeightingMode::Normalized, &rising);
        let mut raised = 0;

        for snap in trace.snapshots() {
            for state in &snap.channels {
                let rank = state.ladder_rank.expect("every quad channel is on the ladder");
                let expected = if rank == 0 {
                    state.normalized_before
                } else {
                    let previous = snap.channel(&snap.ladder[rank - 1]).unwrap();
                    state.normalized_before.max(previous.normalized_after)
                };
                assert!((state.coverage_floor_normalized - expected).abs() < 1e-12);
                assert!(
                    (state.layer_normalized - (state.normalized_after - expected).max(0.0)).abs() < 1e-12
                );
                if state.coverage_floor_normalized > state.normalized_before + 1e-3 {
                    raised += 1;
                }
            }
        }
        assert!(raised > 0, "the floor never rose above a channel's own base");
    }

    // ========================================================================
    // GAP 14: Slope pass
    // ========================================================================

    fn steep_channels() -> Vec<(ChannelSpec, InkCurve)> {
        let mut channels = quad_channels();
        channels[0].1 = InkCurve::from_fn(|i| if i < 128 { 0 } else { 40000 });
        channels
    }

    /// If this breaks, it means: the slope pass left a jump that the
    /// diagnostics flag, or it pushed a channel past its coverage limit.
    #[test]
    fn test_slope_pass_leaves_no_flags() {
        let options = SolverOptions::default().slope(SlopeOptions::enabled());
        let (plain, plain_trace) =
            run_session(WeightingMode::Normalized, SolverOptions::default(), &rising, &steep_channels());
        assert!(!plain_trace.flags(7.0).is_empty(), "fixture should have a steep jump");
        assert!(plain.summary.slope.is_none());

        let (result, trace) = run_session(WeightingMode::Normalized, options, &rising, &steep_channels());
        assert!(trace.flags(7.0).is_empty(), "REGRESSION: flags left after the slope pass");

        let report = result.summary.slope.as_ref().expect("slope report missing");
        let k = report.channel("K").unwrap();
        assert!(k.adjusted);
        assert!(k.max_step_before_percent > 50.0);
        assert!(k.max_step_after_percent < 7.0);
        assert!(!report.channel("C").unwrap().adjusted);

        let curve = result.curve("K").unwrap();
        assert!(curve
            .as_slice()
            .windows(2)
            .all(|w| (to_normalized(w[1]) - to_normalized(w[0])).abs() < 0.07));
        let coverage = result.summary.coverage_for("K").unwrap();
        assert!(curve.iter().all(|v| v <= to_device(coverage.buffered_limit)));

        let moved = trace
            .channel_series("K")
            .iter()
            .filter(|s| s.slope_adjusted)
            .count();
        assert!(moved > 0);
        for snap in trace.snapshots() {
            let state = snap.channel("K").unwrap();
            assert_eq!(state.corrected_value, curve.get(snap.index));
        }
    }
}
