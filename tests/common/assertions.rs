//! Assertion helpers for tests.

use composite_density::{to_device, CorrectionResult, InkCurve};
use pretty_assertions::assert_eq;

/// Assert every channel stays under its ceiling plus coverage buffer
pub fn assert_within_coverage(result: &CorrectionResult) {
    let coverage = result
        .summary
        .coverage
        .as_ref()
        .expect("Expected coverage reports");
    for report in coverage {
        let curve = result
            .curve(&report.channel)
            .unwrap_or_else(|| panic!("No curve for {}", report.channel));
        let limit = to_device(report.buffered_limit);
        let peak = curve.iter().max().unwrap_or(0);
        assert!(
            peak <= limit,
            "{} peaks at {} above its buffered limit {}",
            report.channel,
            peak,
            limit
        );
    }
}

/// Assert adjacent samples never move by more than `max_step` device units
pub fn assert_smooth(curve: &InkCurve, max_step: u16) {
    for (i, pair) in curve.as_slice().windows(2).enumerate() {
        let step = pair[0].abs_diff(pair[1]);
        assert!(
            step <= max_step,
            "Step of {} at sample {} exceeds {}",
            step,
            i + 1,
            max_step
        );
    }
}

/// Assert the result returned the inputs unchanged
pub fn assert_identity(result: &CorrectionResult, inputs: &[(&str, &InkCurve)]) {
    assert!(!result.summary.corrected, "Expected an uncorrected result");
    for (name, curve) in inputs {
        assert_eq!(result.curve(name), Some(*curve), "Curve {name} changed");
    }
}
