use serde::{Deserialize, Serialize};

use crate::engine::ReserveState;
use crate::ladder::WeightingMode;

/// Direction the ladder walked at a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LadderDirection {
    Increase,
    Decrease,
    #[default]
    Hold,
}

impl LadderDirection {
    pub(crate) fn of(value: f64) -> Self {
        if value > 0.0 {
            Self::Increase
        } else if value < 0.0 {
            Self::Decrease
        } else {
            Self::Hold
        }
    }
}

/// One channel's move during a ladder walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderStep {
    pub channel: String,
    /// Position in this sample's ladder.
    pub ladder_index: usize,
    /// Signed change of the correction layer (normalized).
    pub normalized_applied: f64,
}

/// Density moved from a heavier channel onto a lighter one that still had
/// room, keeping the sample's total unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderTransfer {
    pub from: String,
    pub to: String,
    /// Signed density moved; negative when removal was shifted.
    pub density: f64,
}

/// Why a channel could not take more of the correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockReason {
    /// Reserve exhausted.
    Exhausted,
    /// At the ink ceiling.
    Ceiling,
    /// No ink left to remove.
    Floor,
    /// Per-sample step limit reached.
    BlendLimited,
    /// An earlier channel is still unwinding the opposite correction.
    Unwinding,
    /// Density constant is zero.
    NoDensity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderBlock {
    pub channel: String,
    pub reason: BlockReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<String>,
    /// Remaining room in the walk direction when the channel was passed.
    pub headroom: f64,
    pub layer: f64,
}

/// Per-channel state at one sample.
///
/// All normalized values are fractions of full scale. `before` refers to the
/// uncorrected base curve, `after` to the corrected output.
///
/// The coverage floor of a ladder channel is the larger of its own base
/// value and the corrected value of the channel just before it in the
/// ladder; capacity and layer are measured from that floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSampleState {
    pub channel: String,
    pub baseline_value: u16,
    pub corrected_value: u16,
    pub value_delta: i32,

    pub normalized_before: f64,
    pub normalized_after: f64,
    pub normalized_delta: f64,
    pub share_before: f64,
    pub share_after: f64,

    pub density_contribution_before: f64,
    pub density_contribution_after: f64,
    pub density_contribution_delta: f64,

    pub capacity_before_normalized: f64,
    pub capacity_after_normalized: f64,
    pub coverage_floor_normalized: f64,
    pub layer_normalized: f64,

    pub reserve_state: ReserveState,
    pub reserve_allowance_remaining: f64,
    pub reserve_release_scale: f64,

    pub blend_cap_normalized: f64,
    pub blend_limited: bool,
    pub effective_headroom_normalized: f64,
    /// Moved by the slope pass after the scan.
    #[serde(default)]
    pub slope_adjusted: bool,

    pub momentum: f64,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ladder_rank: Option<usize>,
}

/// Everything the engine decided at one tonal step.
///
/// Snapshots own all their data, so they can be kept and compared across
/// sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSnapshot {
    pub index: usize,
    pub input_percent: f64,
    pub target_density: f64,
    pub measurement_density: f64,
    pub delta_density: f64,
    pub applied_density: f64,
    pub unmet_density: f64,

    pub baseline_ink: f64,
    pub corrected_ink: f64,
    pub ink_delta: f64,

    pub weighting_mode: WeightingMode,
    pub ladder: Vec<String>,
    pub direction: LadderDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<LadderStep>,
    #[serde(default)]
    pub promotions: Vec<LadderStep>,
    #[serde(default)]
    pub releases: Vec<LadderStep>,
    #[serde(default)]
    pub blocked: Vec<LadderBlock>,
    #[serde(default)]
    pub transfers: Vec<LadderTransfer>,
    pub sign_flip_ease: f64,

    pub channels: Vec<ChannelSampleState>,
}

impl SampleSnapshot {
    pub fn channel(&self, name: &str) -> Option<&ChannelSampleState> {
        self.channels.iter().find(|c| c.channel == name)
    }
}
