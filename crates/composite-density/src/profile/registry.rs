use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Built-in density constants for common channel names.
pub const DEFAULT_DENSITIES: &[(&str, f64)] = &[("K", 1.0), ("MK", 1.0), ("C", 0.21), ("LK", 0.054)];

/// Upper bound for any density constant.
pub const MAX_DENSITY: f64 = 2.0;

/// Constant used for channels with neither an override nor a default.
pub const FALLBACK_DENSITY: f64 = 0.1;

/// Where a resolved density constant came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstantOrigin {
    Manual,
    Default,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedDensity {
    pub value: f64,
    pub origin: ConstantOrigin,
}

/// Per-channel density constants with manual overrides.
///
/// Channel names are matched case-insensitively.
///
/// ```
/// use composite_density::{ConstantOrigin, DensityRegistry};
///
/// let mut registry = DensityRegistry::new();
/// assert_eq!(registry.resolve("c").value, 0.21);
///
/// registry.set_manual("C", 3.5);
/// let resolved = registry.resolve("C");
/// assert_eq!(resolved.value, 2.0);
/// assert_eq!(resolved.origin, ConstantOrigin::Manual);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DensityRegistry {
    manual: BTreeMap<String, f64>,
}

impl DensityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in constant for a channel, if there is one.
    pub fn default_for(channel: &str) -> Option<f64> {
        let key = normalize_key(channel);
        DEFAULT_DENSITIES
            .iter()
            .find(|(name, _)| *name == key)
            .map(|&(_, value)| value)
    }

    /// Store a manual override, clamped to `[0, MAX_DENSITY]`.
    ///
    /// Returns the stored value, or `None` when `value` is not finite (the
    /// override is left untouched in that case).
    pub fn set_manual(&mut self, channel: &str, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        let clamped = value.clamp(0.0, MAX_DENSITY);
        self.manual.insert(normalize_key(channel), clamped);
        Some(clamped)
    }

    /// Remove a manual override. Returns whether one existed.
    pub fn clear_manual(&mut self, channel: &str) -> bool {
        self.manual.remove(&normalize_key(channel)).is_some()
    }

    pub fn manual_overrides(&self) -> impl Iterator<Item = (&str, f64)> {
        self.manual.iter().map(|(name, &value)| (name.as_str(), value))
    }

    /// Resolve the constant for a channel: manual, then default, then fallback.
    pub fn resolve(&self, channel: &str) -> ResolvedDensity {
        let key = normalize_key(channel);
        if let Some(&value) = self.manual.get(&key) {
            return ResolvedDensity {
                value,
                origin: ConstantOrigin::Manual,
            };
        }
        match Self::default_for(&key) {
            Some(value) => ResolvedDensity {
                value,
                origin: ConstantOrigin::Default,
            },
            None => ResolvedDensity {
                value: FALLBACK_DENSITY,
                origin: ConstantOrigin::Fallback,
            },
        }
    }
}

fn normalize_key(channel: &str) -> String {
    channel.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_ordered_by_density() {
        let registry = DensityRegistry::new();
        let k = registry.resolve("K").value;
        let c = registry.resolve("C").value;
        let lk = registry.resolve("LK").value;
        assert!(k > c && c > lk && lk > 0.0);
        assert_eq!(registry.resolve("MK").value, k);
    }

    #[test]
    fn test_unknown_channel_falls_back() {
        let resolved = DensityRegistry::new().resolve("Y");
        assert_eq!(resolved.value, FALLBACK_DENSITY);
        assert_eq!(resolved.origin, ConstantOrigin::Fallback);
    }

    #[test]
    fn test_manual_override_and_clear() {
        let mut registry = DensityRegistry::new();
        assert_eq!(registry.set_manual(" lk ", 0.08), Some(0.08));
        assert_eq!(registry.resolve("LK").value, 0.08);
        assert_eq!(registry.resolve("LK").origin, ConstantOrigin::Manual);

        assert!(registry.clear_manual("LK"));
        assert!(!registry.clear_manual("LK"));
        assert_eq!(registry.resolve("LK").origin, ConstantOrigin::Default);
    }

    #[test]
    fn test_manual_override_rejects_non_finite_and_clamps_negative() {
        let mut registry = DensityRegistry::new();
        assert_eq!(registry.set_manual("K", f64::NAN), None);
        assert_eq!(registry.manual_overrides().count(), 0);
        assert_eq!(registry.set_manual("K", -1.0), Some(0.0));
    }
}
