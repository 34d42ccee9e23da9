use composite_density::BeginError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session could not start: {0}")]
    Begin(#[from] BeginError),

    #[error("Trace file has no snapshots")]
    EmptyTrace,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("No channels configured")]
    NoChannels,

    #[error("Duplicate channel: {0}")]
    DuplicateChannel(String),

    #[error("Invalid ink limit for {channel}: {value}% (expected 0-100)")]
    InkLimit { channel: String, value: f64 },

    #[error("Invalid curve for {channel}: {reason}")]
    Curve { channel: String, reason: String },

    #[error("Measurement needs rows or a file")]
    MissingMeasurement,

    #[error("Measurement needs at least 2 rows, got {0}")]
    MeasurementTooShort(usize),

    #[error("Measurement row {row} is not finite")]
    NonFiniteRow { row: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_ink_limit() {
        let error = ConfigError::InkLimit {
            channel: "LK".to_string(),
            value: 140.0,
        };
        assert_eq!(
            error.to_string(),
            "Invalid ink limit for LK: 140% (expected 0-100)"
        );
    }

    #[test]
    fn test_config_error_measurement_too_short() {
        let error = ConfigError::MeasurementTooShort(1);
        assert_eq!(error.to_string(), "Measurement needs at least 2 rows, got 1");
    }

    #[test]
    fn test_app_error_from_config_error() {
        let app_error: AppError = ConfigError::NoChannels.into();
        match app_error {
            AppError::Config(ConfigError::NoChannels) => {}
            _ => panic!("Expected Config variant"),
        }
        assert_eq!(
            AppError::from(ConfigError::NoChannels).to_string(),
            "Configuration error: No channels configured"
        );
    }

    #[test]
    fn test_app_error_from_begin_error() {
        let app_error: AppError = BeginError::NoActiveChannels.into();
        assert!(matches!(app_error, AppError::Begin(_)));
    }

    #[test]
    fn test_app_error_empty_trace() {
        assert_eq!(AppError::EmptyTrace.to_string(), "Trace file has no snapshots");
    }
}
