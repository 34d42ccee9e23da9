//! Session files on disk: loading, relative measurement files, presets.

mod common;

use composite_density::WeightingMode;
use pretty_assertions::assert_eq;
use quadcomp::assets::{PresetLoader, SESSION_PRESET};
use quadcomp::error::{AppError, ConfigError};
use quadcomp::models::SessionConfig;
use quadcomp::services::CorrectionService;
use tempfile::TempDir;

use common::fixtures;

#[test]
fn test_measurement_file_resolves_next_to_session() {
    let dir = TempDir::new().unwrap();
    let config = fixtures::quad_config(dir.path());

    assert_eq!(config.base_dir, dir.path());
    let table = config.measurement.load(&config.base_dir).unwrap();
    assert_eq!(table.rows().len(), 2);
    assert_eq!(table.lookup(100.0), (1.0, 0.85));
}

#[test]
fn test_missing_session_file_is_a_read_error() {
    let dir = TempDir::new().unwrap();
    let result = SessionConfig::load(&dir.path().join("nope.yaml"));
    assert!(matches!(result, Err(ConfigError::Read { .. })));
}

#[test]
fn test_missing_measurement_file_fails_the_service() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.yaml");
    std::fs::write(&path, fixtures::QUAD_SESSION).unwrap();

    let config = SessionConfig::load(&path).unwrap();
    let result = CorrectionService::new(config);
    assert!(matches!(
        result,
        Err(AppError::Config(ConfigError::Read { .. }))
    ));
}

#[test]
fn test_malformed_measurement_file_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = fixtures::write_session(dir.path(), fixtures::QUAD_SESSION, "- { input: [ }");
    let config = SessionConfig::load(&path).unwrap();
    assert!(matches!(
        config.measurement.load(&config.base_dir),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn test_invalid_session_is_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let session = fixtures::QUAD_SESSION.replace("ink_limit: 45", "ink_limit: -3");
    let path = fixtures::write_session(dir.path(), &session, fixtures::LIGHT_MEASUREMENT);
    match SessionConfig::load(&path) {
        Err(ConfigError::InkLimit { channel, value }) => {
            assert_eq!(channel, "C");
            assert_eq!(value, -3.0);
        }
        other => panic!("Expected InkLimit error, got {other:?}"),
    }
}

#[test]
fn test_init_extracts_presets_that_run() {
    let dir = TempDir::new().unwrap();
    let loader = PresetLoader::new(Some(dir.path().to_path_buf()));

    let report = loader.init(false).unwrap();
    assert_eq!(report.written.len(), 2);
    assert!(report.skipped.is_empty());

    let config = SessionConfig::load(&dir.path().join(SESSION_PRESET)).unwrap();
    assert_eq!(config.weighting_mode, WeightingMode::Normalized);
    let mut service = CorrectionService::new(config).unwrap();
    let outcome = service.run(None).unwrap();
    assert!(outcome.result.summary.corrected);
    assert!(outcome.result.summary.slope.is_some(), "preset enables the slope pass");
    assert!(outcome.flags.is_empty());
    common::assert_within_coverage(&outcome.result);
}

#[test]
fn test_init_skips_existing_files_unless_forced() {
    let dir = TempDir::new().unwrap();
    let loader = PresetLoader::new(Some(dir.path().to_path_buf()));
    let session_path = dir.path().join(SESSION_PRESET);
    std::fs::write(&session_path, "# mine\n").unwrap();

    let report = loader.init(false).unwrap();
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.written.len(), 1);
    assert_eq!(std::fs::read_to_string(&session_path).unwrap(), "# mine\n");

    // Filesystem copy wins over the embedded one.
    assert_eq!(loader.read_string(SESSION_PRESET).unwrap(), "# mine\n");

    let report = loader.init(true).unwrap();
    assert_eq!(report.written.len(), 2);
    assert!(std::fs::read_to_string(&session_path)
        .unwrap()
        .contains("channels:"));
}
