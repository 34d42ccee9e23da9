pub mod config;
pub mod curve_spec;
pub mod measurement;

pub use config::{AutoRaiseConfig, ChannelConfig, DiagnosticsConfig, SessionConfig};
pub use curve_spec::CurveSpec;
pub use measurement::{MeasurementRow, MeasurementSpec, MeasurementTable};
