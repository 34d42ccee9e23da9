use composite_density::{
    flag_snapshots, to_device, ChannelSpec, DensityRegistry, InkCurve, SolverOptions,
    WeightingMode, DEFAULT_FLAG_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use super::curve_spec::CurveSpec;
use super::measurement::MeasurementSpec;
use crate::error::ConfigError;

/// Calibration session loaded from a YAML file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// How correction is spread across channels
    #[serde(default)]
    pub weighting_mode: WeightingMode,

    /// Channels in declaration order
    pub channels: Vec<ChannelConfig>,

    /// Density constant overrides by channel name
    #[serde(default)]
    pub densities: BTreeMap<String, f64>,

    /// Solver tuning (smoothing window, reserve, momentum, coverage)
    #[serde(default)]
    pub solver: SolverOptions,

    #[serde(default)]
    pub auto_raise: AutoRaiseConfig,

    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    pub measurement: MeasurementSpec,

    /// Directory relative paths resolve against (set by `load`)
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Configuration for a single ink channel
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    pub name: String,

    /// Ink limit in percent of full scale
    pub ink_limit: f64,

    /// Density constant for this session only (wins over `densities`)
    #[serde(default)]
    pub density: Option<f64>,

    #[serde(default)]
    pub coverage_buffer: Option<f64>,

    #[serde(default)]
    pub curve: CurveSpec,

    /// Locked channels keep their ink limit during auto-raise
    #[serde(default)]
    pub locked: bool,
}

impl ChannelConfig {
    pub fn ink_limit_device(&self) -> u16 {
        to_device(self.ink_limit / 100.0)
    }

    pub fn spec(&self) -> ChannelSpec {
        let mut spec = ChannelSpec::new(self.name.clone(), self.ink_limit_device());
        if let Some(density) = self.density {
            spec = spec.density(density);
        }
        if let Some(buffer) = self.coverage_buffer {
            spec = spec.coverage_buffer(buffer);
        }
        spec
    }

    pub fn base_curve(&self) -> Result<InkCurve, ConfigError> {
        self.curve.to_curve(&self.name, self.ink_limit)
    }
}

/// Auto-raise of ink limits before the session runs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AutoRaiseConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Limit to raise exhausted channels to. Values up to 1.0001 are
    /// read as fractions.
    #[serde(default = "default_target_percent")]
    pub target_percent: f64,
}

fn default_target_percent() -> f64 {
    100.0
}

impl Default for AutoRaiseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            target_percent: default_target_percent(),
        }
    }
}

/// Diagnostics capture
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiagnosticsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Percentage-point jump that flags a snapshot
    #[serde(default = "default_flag_threshold")]
    pub flag_threshold: f64,
}

fn default_true() -> bool {
    true
}

fn default_flag_threshold() -> f64 {
    DEFAULT_FLAG_THRESHOLD
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            flag_threshold: DEFAULT_FLAG_THRESHOLD,
        }
    }
}

impl DiagnosticsConfig {
    /// Flag the snapshots of a trace with the configured threshold.
    pub fn flags(
        &self,
        snapshots: &[composite_density::SampleSnapshot],
    ) -> Vec<composite_density::SnapshotFlag> {
        flag_snapshots(snapshots, self.flag_threshold)
    }
}

impl SessionConfig {
    /// Load and validate a session file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_yaml(&content, &path.display().to_string())?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        tracing::info!(
            path = %path.display(),
            channels = config.channels.len(),
            mode = %config.weighting_mode,
            "Loaded session"
        );
        Ok(config)
    }

    /// Parse and validate YAML. `origin` names the source in errors.
    pub fn from_yaml(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        let mut seen = HashSet::new();
        for channel in &self.channels {
            if !seen.insert(channel.name.as_str()) {
                return Err(ConfigError::DuplicateChannel(channel.name.clone()));
            }
            if !channel.ink_limit.is_finite() || !(0.0..=100.0).contains(&channel.ink_limit) {
                return Err(ConfigError::InkLimit {
                    channel: channel.name.clone(),
                    value: channel.ink_limit,
                });
            }
            channel.base_curve()?;
        }
        Ok(())
    }

    /// Density registry with this session's overrides applied.
    pub fn registry(&self) -> DensityRegistry {
        let mut registry = DensityRegistry::new();
        for (channel, &value) in &self.densities {
            if registry.set_manual(channel, value).is_none() {
                tracing::warn!(channel = %channel, value, "Ignoring invalid density override");
            }
        }
        registry
    }

    /// Base curves in channel order.
    pub fn base_curves(&self) -> Result<Vec<InkCurve>, ConfigError> {
        self.channels.iter().map(ChannelConfig::base_curve).collect()
    }

    pub fn locked_channels(&self) -> HashSet<String> {
        self.channels
            .iter()
            .filter(|c| c.locked)
            .map(|c| c.name.clone())
            .collect()
    }
}
