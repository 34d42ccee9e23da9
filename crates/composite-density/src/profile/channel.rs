use serde::{Deserialize, Serialize};

use super::registry::ConstantOrigin;
use crate::curve::{to_normalized, InkCurve};

/// A channel as named when a session begins.
///
/// The ink limit is in device units. Density constant and coverage buffer
/// are optional; missing values come from the registry and the solver
/// options respectively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub name: String,
    pub ink_limit: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density_constant: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_buffer: Option<f64>,
}

impl ChannelSpec {
    pub fn new(name: impl Into<String>, ink_limit: u16) -> Self {
        Self {
            name: name.into(),
            ink_limit,
            density_constant: None,
            coverage_buffer: None,
        }
    }

    /// Override the density constant for this session only.
    #[inline]
    pub fn density(mut self, constant: f64) -> Self {
        self.density_constant = Some(constant);
        self
    }

    /// Override the coverage buffer (normalized slack above the ceiling).
    #[inline]
    pub fn coverage_buffer(mut self, buffer: f64) -> Self {
        self.coverage_buffer = Some(buffer);
        self
    }
}

/// Immutable per-session view of one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelProfile {
    pub name: String,
    pub base_curve: InkCurve,
    pub ink_ceiling: u16,
    pub density_constant: f64,
    pub density_origin: ConstantOrigin,
    pub coverage_buffer: f64,
}

impl ChannelProfile {
    /// Channels with a zero ceiling never take part in redistribution.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.ink_ceiling > 0
    }

    #[inline]
    pub fn ceiling_normalized(&self) -> f64 {
        to_normalized(self.ink_ceiling)
    }

    /// Hard clamp limit: ceiling plus buffer, never above full scale.
    #[inline]
    pub fn buffered_limit(&self) -> f64 {
        (self.ceiling_normalized() + self.coverage_buffer).min(1.0)
    }
}
