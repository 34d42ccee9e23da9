//! Error and warning types.
//!
//! Only [`CompositeSolver::begin`](crate::CompositeSolver::begin) can fail.
//! Everything that goes wrong after a session exists is reported as a
//! [`SessionWarning`] in the summary, and the session still produces a
//! usable result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::curve::CURVE_RESOLUTION;

/// Reasons a correction session could not be started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BeginError {
    #[error("no channels were named for the session")]
    NoChannels,

    #[error("every channel has a zero ink limit")]
    NoActiveChannels,

    #[error("channel {0} was named more than once")]
    DuplicateChannel(String),
}

/// Non-fatal problems recorded while a session runs.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SessionWarning {
    #[error("channel {channel} is not part of this session")]
    UnknownChannel { channel: String },

    #[error("channel {channel} curve has {actual} samples, expected {expected}")]
    CurveLength {
        channel: String,
        expected: usize,
        actual: usize,
    },

    #[error("channel {channel} was registered more than once, keeping the latest curve")]
    DuplicateRegistration { channel: String },

    #[error("channels not registered before finalize: {}", .channels.join(", "))]
    MissingRegistration { channels: Vec<String> },

    #[error("sample {index}: {remaining:.6} density left unapplied")]
    UnmetCorrection { index: usize, remaining: f64 },

    #[error("sample {index}: non-finite density, reusing the previous delta")]
    NonFiniteSample { index: usize },

    #[error("sample {index}: non-finite value for channel {channel}, holding the previous value")]
    NonFiniteValue { channel: String, index: usize },

    #[error("channel {channel}: density constant is not finite, using the registry value")]
    InvalidDensity { channel: String },
}

impl SessionWarning {
    /// True for warnings raised by the per-sample engine rather than by
    /// the session protocol.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::UnmetCorrection { .. } | Self::NonFiniteSample { .. } | Self::NonFiniteValue { .. }
        )
    }
}

/// A curve did not have [`CURVE_RESOLUTION`] samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("curve has {actual} samples, expected {}", CURVE_RESOLUTION)]
pub struct CurveLengthError {
    pub actual: usize,
}

/// Unrecognized weighting mode name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown weighting mode '{0}' (expected isolated, equal, normalized or momentum)")]
pub struct ParseModeError(pub String);
