use std::fs;

use tale_engine::{ConfigError, EngineConfig};
use tempfile::tempdir;

#[test]
fn config_file_round_trips_through_ron() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tale.ron");
    let mut config = EngineConfig::default();
    config.api.base_url = "https://girder.example/api/v1/".to_string();
    config.redirect = Some("https://dashboard.example/".to_string());
    fs::write(&path, ron::ser::to_string_pretty(&config, Default::default()).unwrap()).unwrap();

    let loaded = EngineConfig::load(&path).unwrap();

    assert_eq!(loaded, config);
}

#[test]
fn missing_config_file_is_an_io_error() {
    let dir = tempdir().unwrap();

    let err = EngineConfig::load(&dir.path().join("absent.ron")).unwrap_err();

    assert!(matches!(err, ConfigError::Io(_)));
}
