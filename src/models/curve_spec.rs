use composite_density::{to_device, InkCurve, CURVE_RESOLUTION};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How a channel's base curve is described in a session file.
///
/// Percentages are of full scale (0-100), not of the channel's ink limit.
/// In YAML exactly one key picks the form:
///
/// ```yaml
/// curve: { ramp: { end: 50, gamma: 1.2 } }
/// curve: { flat: 5 }
/// curve: { samples: [0, 1200, 4800] }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "CurveFields", into = "CurveFields")]
pub enum CurveSpec {
    /// Explicit device values, resampled to 256 entries when needed
    Samples(Vec<u16>),

    /// Constant level
    Flat(f64),

    /// Ramp from `start` to `end` shaped by `gamma`
    Ramp {
        start: f64,
        /// Defaults to the channel's ink limit
        end: Option<f64>,
        gamma: f64,
    },
}

/// Map form of [`CurveSpec`] as it appears in session files.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct CurveFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    samples: Option<Vec<u16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    flat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ramp: Option<RampFields>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct RampFields {
    #[serde(default)]
    start: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end: Option<f64>,
    #[serde(default = "default_gamma")]
    gamma: f64,
}

fn default_gamma() -> f64 {
    1.0
}

impl TryFrom<CurveFields> for CurveSpec {
    type Error = String;

    fn try_from(fields: CurveFields) -> Result<Self, Self::Error> {
        match fields {
            CurveFields {
                samples: Some(values),
                flat: None,
                ramp: None,
            } => Ok(CurveSpec::Samples(values)),
            CurveFields {
                samples: None,
                flat: Some(percent),
                ramp: None,
            } => Ok(CurveSpec::Flat(percent)),
            CurveFields {
                samples: None,
                flat: None,
                ramp: Some(RampFields { start, end, gamma }),
            } => Ok(CurveSpec::Ramp { start, end, gamma }),
            _ => Err("curve needs exactly one of `samples`, `flat` or `ramp`".to_string()),
        }
    }
}

impl From<CurveSpec> for CurveFields {
    fn from(spec: CurveSpec) -> Self {
        match spec {
            CurveSpec::Samples(values) => CurveFields {
                samples: Some(values),
                ..CurveFields::default()
            },
            CurveSpec::Flat(percent) => CurveFields {
                flat: Some(percent),
                ..CurveFields::default()
            },
            CurveSpec::Ramp { start, end, gamma } => CurveFields {
                ramp: Some(RampFields { start, end, gamma }),
                ..CurveFields::default()
            },
        }
    }
}

impl Default for CurveSpec {
    fn default() -> Self {
        CurveSpec::Ramp {
            start: 0.0,
            end: None,
            gamma: 1.0,
        }
    }
}

impl CurveSpec {
    /// Build the 256-sample curve for a channel.
    pub fn to_curve(&self, channel: &str, ink_limit_percent: f64) -> Result<InkCurve, ConfigError> {
        let curve_error = |reason: String| ConfigError::Curve {
            channel: channel.to_string(),
            reason,
        };

        match self {
            CurveSpec::Samples(values) => resample(values).ok_or_else(|| {
                curve_error(format!("needs at least 2 samples, got {}", values.len()))
            }),
            CurveSpec::Flat(percent) => {
                check_percent(*percent).map_err(curve_error)?;
                Ok(InkCurve::flat(to_device(percent / 100.0)))
            }
            CurveSpec::Ramp { start, end, gamma } => {
                let end = end.unwrap_or(ink_limit_percent);
                check_percent(*start).map_err(&curve_error)?;
                check_percent(end).map_err(&curve_error)?;
                if !gamma.is_finite() || *gamma <= 0.0 {
                    return Err(curve_error(format!("gamma must be positive, got {gamma}")));
                }
                let (start, end) = (start / 100.0, end / 100.0);
                let last = (CURVE_RESOLUTION - 1) as f64;
                Ok(InkCurve::from_fn(|i| {
                    let t = (i as f64 / last).powf(*gamma);
                    to_device(start + (end - start) * t)
                }))
            }
        }
    }
}

fn check_percent(percent: f64) -> Result<(), String> {
    if percent.is_finite() && (0.0..=100.0).contains(&percent) {
        Ok(())
    } else {
        Err(format!("{percent}% is outside 0-100"))
    }
}

/// Linear resampling onto the 256-entry grid.
fn resample(values: &[u16]) -> Option<InkCurve> {
    if values.len() == CURVE_RESOLUTION {
        return InkCurve::try_from(values).ok();
    }
    if values.len() < 2 {
        return None;
    }
    let span = (values.len() - 1) as f64;
    let last = (CURVE_RESOLUTION - 1) as f64;
    Some(InkCurve::from_fn(|i| {
        let position = i as f64 / last * span;
        let lower = position.floor() as usize;
        let upper = (lower + 1).min(values.len() - 1);
        let t = position - lower as f64;
        let value = f64::from(values[lower]) * (1.0 - t) + f64::from(values[upper]) * t;
        value.round() as u16
    }))
}
