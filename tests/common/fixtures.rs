//! Test fixtures and session files.

use std::path::{Path, PathBuf};

use quadcomp::models::SessionConfig;

/// Three-channel quad: K ramps to 50%, C and LK sit flat at 5%
pub const QUAD_SESSION: &str = r#"
weighting_mode: normalized
channels:
  - name: K
    ink_limit: 100
    curve: { ramp: { end: 50 } }
  - name: C
    ink_limit: 45
    curve: { flat: 5 }
  - name: LK
    ink_limit: 35
    curve: { flat: 5 }
measurement:
  file: measurement.yaml
"#;

/// Print 15% too light at the top of the range, linearly
pub const LIGHT_MEASUREMENT: &str = r#"
- { input: 0, target: 0.0, measured: 0.0 }
- { input: 100, target: 1.0, measured: 0.85 }
"#;

/// Far more correction than K alone can place under a 20% limit
pub const STARVED_SESSION: &str = r#"
channels:
  - name: K
    ink_limit: 20
auto_raise:
  enabled: true
measurement:
  rows:
    - { input: 0, target: 0.0, measured: 0.0 }
    - { input: 100, target: 1.0, measured: 0.5 }
"#;

/// Write a session (and its measurement file) into `dir`.
pub fn write_session(dir: &Path, session: &str, measurement: &str) -> PathBuf {
    let path = dir.join("session.yaml");
    std::fs::write(&path, session).unwrap();
    std::fs::write(dir.join("measurement.yaml"), measurement).unwrap();
    path
}

/// Load the quad session from a fresh temporary directory.
pub fn quad_config(dir: &Path) -> SessionConfig {
    let path = write_session(dir, QUAD_SESSION, LIGHT_MEASUREMENT);
    SessionConfig::load(&path).unwrap()
}
