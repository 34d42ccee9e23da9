//! Reserve/headroom state machine.
//!
//! Each channel carries a [`ReserveTracker`] across samples. Inside the
//! reserve band near the ceiling, growth is scaled down continuously so a
//! channel decelerates before it saturates. Shrinking is never throttled
//! beyond the blend step: once the layer starts shrinking the channel is
//! releasing, and its growth scale climbs back along the same taper as
//! headroom reopens, so a turnaround resumes growth gradually.
//!
//! State order within one excursion is fixed:
//!
//! ```text
//! approaching -> within -> exhausted
//!       ^                     |
//!       +---- releasing <-----+
//! ```

use serde::{Deserialize, Serialize};

use crate::options::ReserveOptions;

/// Layer changes smaller than this are treated as no change.
const STILL: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReserveState {
    #[default]
    Approaching,
    Within,
    Exhausted,
    Releasing,
}

/// Scales applied to a channel's blend step for one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ReserveLimits {
    pub growth: f64,
    pub shrink: f64,
}

/// What happened to a channel at the sample just solved.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReserveStep {
    /// Headroom under the ceiling after the sample (normalized).
    pub headroom: f64,
    pub band: f64,
    pub layer: f64,
    pub change: f64,
    /// Un-eased blend step of the channel.
    pub step: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct ReserveTracker {
    state: ReserveState,
    scale: f64,
}

impl Default for ReserveTracker {
    fn default() -> Self {
        Self {
            state: ReserveState::Approaching,
            scale: 1.0,
        }
    }
}

impl ReserveTracker {
    pub fn state(&self) -> ReserveState {
        self.state
    }

    /// Share of the blend step the channel may grow by.
    pub fn release_scale(&self) -> f64 {
        self.scale
    }

    /// Growth and shrink scales for the coming sample.
    pub fn limits(&self, headroom: f64, band: f64, options: &ReserveOptions) -> ReserveLimits {
        let natural = natural_scale(headroom, band, options);
        let growth = match self.state {
            ReserveState::Approaching | ReserveState::Releasing => natural,
            ReserveState::Within => self.scale.min(natural),
            ReserveState::Exhausted => 0.0,
        };
        ReserveLimits { growth, shrink: 1.0 }
    }

    /// Advance the state after a sample has been solved.
    pub fn advance(&mut self, step: ReserveStep, options: &ReserveOptions) {
        let x = ratio(step.headroom, step.band);
        let natural = natural_scale(step.headroom, step.band, options);
        let natural_state = if step.headroom <= step.threshold || step.step * natural <= step.threshold {
            ReserveState::Exhausted
        } else if x < 1.0 {
            ReserveState::Within
        } else {
            ReserveState::Approaching
        };
        let shrinking = step.change < -STILL;

        match self.state {
            ReserveState::Approaching => self.enter(natural_state, natural),
            ReserveState::Within | ReserveState::Exhausted => {
                if shrinking {
                    self.state = ReserveState::Releasing;
                    self.scale = natural;
                } else if x >= 1.0 {
                    self.enter(ReserveState::Approaching, natural);
                } else {
                    self.state = self.state.max(natural_state);
                    self.scale = if self.state == ReserveState::Exhausted {
                        0.0
                    } else {
                        self.scale.min(natural)
                    };
                }
            }
            ReserveState::Releasing => {
                if x >= 1.0 || step.layer.abs() <= STILL {
                    self.enter(ReserveState::Approaching, natural);
                } else if step.change > STILL {
                    self.enter(natural_state, natural);
                } else {
                    self.scale = natural;
                }
            }
        }
    }

    fn enter(&mut self, state: ReserveState, natural: f64) {
        self.state = state;
        self.scale = if state == ReserveState::Exhausted {
            0.0
        } else {
            natural
        };
    }
}

fn ratio(headroom: f64, band: f64) -> f64 {
    if band > 0.0 {
        headroom / band
    } else if headroom > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

fn natural_scale(headroom: f64, band: f64, options: &ReserveOptions) -> f64 {
    let x = ratio(headroom, band);
    if x.is_infinite() {
        1.0
    } else {
        options.taper(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BAND: f64 = 0.07;
    const STEP: f64 = 0.35 / 27.0;

    fn step(headroom: f64, layer: f64, change: f64) -> ReserveStep {
        ReserveStep {
            headroom,
            band: BAND,
            layer,
            change,
            step: STEP,
            threshold: 1e-4,
        }
    }

    #[test]
    fn test_outside_band_is_unrestricted() {
        let tracker = ReserveTracker::default();
        let limits = tracker.limits(0.2, BAND, &ReserveOptions::default());
        assert_eq!(limits, ReserveLimits { growth: 1.0, shrink: 1.0 });
    }

    #[test]
    fn test_excursion_moves_forward_only() {
        let options = ReserveOptions::default();
        let mut tracker = ReserveTracker::default();

        tracker.advance(step(0.05, 0.23, 0.01), &options);
        assert_eq!(tracker.state(), ReserveState::Within);
        let first_scale = tracker.release_scale();
        assert!(first_scale < 1.0 && first_scale > 0.0);

        // Headroom reopening slightly inside the band does not go back.
        tracker.advance(step(0.06, 0.23, 0.0), &options);
        assert_eq!(tracker.state(), ReserveState::Within);
        assert!(tracker.release_scale() <= first_scale);

        tracker.advance(step(0.0, 0.30, 0.001), &options);
        assert_eq!(tracker.state(), ReserveState::Exhausted);
        assert_eq!(tracker.release_scale(), 0.0);
        assert_eq!(tracker.limits(0.0, BAND, &options).growth, 0.0);
    }

    #[test]
    fn test_shrinking_is_never_throttled() {
        let options = ReserveOptions::default();
        let mut tracker = ReserveTracker::default();
        tracker.advance(step(0.03, 0.27, 0.01), &options);
        assert_eq!(tracker.state(), ReserveState::Within);
        assert_eq!(tracker.limits(0.03, BAND, &options).shrink, 1.0);

        tracker.advance(step(0.0, 0.30, 0.01), &options);
        assert_eq!(tracker.state(), ReserveState::Exhausted);
        assert_eq!(tracker.limits(0.0, BAND, &options).shrink, 1.0);
    }

    #[test]
    fn test_release_climbs_back_along_the_taper() {
        let options = ReserveOptions::default();
        let mut tracker = ReserveTracker::default();
        tracker.advance(step(0.0, 0.30, 0.01), &options);
        assert_eq!(tracker.state(), ReserveState::Exhausted);

        tracker.advance(step(0.005, 0.295, -0.005), &options);
        assert_eq!(tracker.state(), ReserveState::Releasing);
        let early = tracker.release_scale();
        assert!(early > 0.0 && early < 1.0);
        assert_eq!(tracker.limits(0.005, BAND, &options).growth, early);

        tracker.advance(step(0.03, 0.27, -0.025), &options);
        let later = tracker.release_scale();
        assert!(later > early, "growth scale should climb as headroom reopens");

        tracker.advance(step(0.08, 0.2, -0.07), &options);
        assert_eq!(tracker.state(), ReserveState::Approaching);
        assert_eq!(tracker.release_scale(), 1.0);
    }

    #[test]
    fn test_turnaround_while_releasing_re_enters_band() {
        let options = ReserveOptions::default();
        let mut tracker = ReserveTracker::default();
        tracker.advance(step(0.0, 0.30, 0.01), &options);
        tracker.advance(step(0.02, 0.28, -0.02), &options);
        assert_eq!(tracker.state(), ReserveState::Releasing);

        tracker.advance(step(0.015, 0.285, 0.005), &options);
        assert_eq!(tracker.state(), ReserveState::Within);
        assert!(tracker.release_scale() < 1.0);
    }

    #[test]
    fn test_zero_band_channel() {
        let options = ReserveOptions::default();
        assert_eq!(natural_scale(0.1, 0.0, &options), 1.0);
        assert_eq!(natural_scale(0.0, 0.0, &options), 0.0);
    }
}
