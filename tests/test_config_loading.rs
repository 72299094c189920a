use std::io::Write;
use tempfile::NamedTempFile;
use tilegate::{GateConfig, GateError, StoreBackend};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_sample_config() {
    let config = GateConfig::from_file("tilegate.yaml");
    assert!(config.is_ok(), "Failed to load sample config: {:?}", config.err());

    let config = config.unwrap();
    assert_eq!(config.listen_address, "0.0.0.0:8080");
    assert_eq!(config.maps_root, "maps");
    assert_eq!(config.entry_document, "index.html");
    assert_eq!(config.cache_max_age, 3600);
    assert_eq!(config.live_origin.as_deref(), Some("http://127.0.0.1:8100"));
    assert_eq!(config.live_cache_max_age, 5);
    assert_eq!(config.store.backend, StoreBackend::Filesystem);
    assert_eq!(config.store.root.as_deref(), Some("./web"));
    let endpoint = config.metrics_endpoint.unwrap();
    assert!(endpoint.enabled);
    assert_eq!(endpoint.address, "127.0.0.1:9090");
}

#[test]
fn test_load_minimal_config() {
    let file = write_config(
        r#"
store:
  backend: memory
"#,
    );

    let config = GateConfig::from_file(file.path()).unwrap();

    // Check defaults are applied
    assert_eq!(config.maps_root, "maps");
    assert_eq!(config.cache_max_age, 3600);
    assert_eq!(config.live_timeout_ms, 10_000);
    assert!(config.live_origin.is_none());
    assert!(config.metrics_endpoint.is_none());
}

#[test]
fn test_load_empty_maps_root() {
    let file = write_config(
        r#"
maps_root: ""
store:
  backend: filesystem
  root: /srv/web
"#,
    );

    let config = GateConfig::from_file(file.path()).unwrap();
    assert_eq!(config.maps_root, "");
    assert_eq!(config.store.root.as_deref(), Some("/srv/web"));
}

#[test]
fn test_load_invalid_live_cache_max_age() {
    let file = write_config(
        r#"
live_cache_max_age: 600
store:
  backend: memory
"#,
    );

    match GateConfig::from_file(file.path()) {
        Err(GateError::ConfigError(msg)) => assert!(msg.contains("live_cache_max_age")),
        other => panic!("Expected ConfigError, got {:?}", other),
    }
}

#[test]
fn test_load_unknown_backend() {
    let file = write_config(
        r#"
store:
  backend: s3
"#,
    );

    let result = GateConfig::from_file(file.path());
    assert!(matches!(result, Err(GateError::ConfigError(_))));
}

#[test]
fn test_load_missing_file() {
    let result = GateConfig::from_file("does-not-exist.yaml");
    match result {
        Err(GateError::ConfigError(msg)) => assert!(msg.contains("Failed to read config file")),
        other => panic!("Expected ConfigError, got {:?}", other),
    }
}
