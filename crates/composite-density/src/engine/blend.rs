//! Blend window: per-sample step limits and sign-flip easing.

use crate::options::SmoothingWindow;
use crate::profile::ChannelProfile;

/// Delta densities smaller than this carry no sign.
const SIGN_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone)]
pub(crate) struct BlendWindow {
    window: usize,
    steps: Vec<f64>,
    last_sign: f64,
    flip_age: Option<usize>,
}

impl BlendWindow {
    pub fn new(smoothing: &SmoothingWindow, profiles: &[ChannelProfile]) -> Self {
        Self {
            window: smoothing.sample_count(),
            steps: profiles
                .iter()
                .map(|p| smoothing.max_step(p.ceiling_normalized()))
                .collect(),
            last_sign: 0.0,
            flip_age: None,
        }
    }

    /// Feed the next sample's delta density.
    ///
    /// A change of sign against the last non-negligible delta restarts the
    /// easing ramp.
    pub fn observe(&mut self, delta: f64) {
        self.flip_age = match self.flip_age {
            Some(age) if age + 1 < self.window => Some(age + 1),
            _ => None,
        };
        if delta.abs() > SIGN_EPSILON {
            let sign = delta.signum();
            if self.last_sign != 0.0 && sign != self.last_sign {
                self.flip_age = Some(0);
            }
            self.last_sign = sign;
        }
    }

    /// Step multiplier in `(0, 1]`; below one right after a sign flip.
    pub fn ease(&self) -> f64 {
        match self.flip_age {
            Some(age) => ((age + 1) as f64 / self.window as f64).min(1.0),
            None => 1.0,
        }
    }

    /// Un-eased step of a channel.
    #[inline]
    pub fn base_step(&self, channel: usize) -> f64 {
        self.steps[channel]
    }

    /// Eased step of a channel for the current sample.
    #[inline]
    pub fn step(&self, channel: usize) -> f64 {
        self.steps[channel] * self.ease()
    }
}
