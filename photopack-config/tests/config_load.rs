use photopack_config::{ExtractMode, PhotopackConfigLoader};
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn test_config_load() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
version: "1"
fetch:
  timeout_secs: 30
  retries: 0
  headers:
    referer: "${LISTING_REFERER}"
extract:
  mode: slides
logging:
  format: json
  emit_stderr: true
  "#;
    let p = write_yaml(&tmp, "photopack.yaml", file_yaml);

    let config = temp_env::with_var(
        "LISTING_REFERER",
        Some("https://land.example.com/"),
        || {
            PhotopackConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load photopack config")
        },
    );

    assert_eq!(config.version.as_deref(), Some("1"));
    assert_eq!(config.fetch.timeout_secs, 30);
    assert_eq!(config.fetch.retries, 0);
    assert_eq!(config.fetch.connect_timeout_secs, 5);
    assert_eq!(
        config.fetch.headers.referer.as_deref(),
        Some("https://land.example.com/")
    );
    assert_eq!(config.extract.mode, ExtractMode::Slides);
    assert_eq!(config.logging.format, "json");
    assert!(config.logging.emit_stderr);
}

#[test]
#[serial]
fn env_overrides_apply() {
    temp_env::with_vars(
        [
            ("PHOTOPACK__FETCH__CONCURRENCY", Some("3")),
            ("PHOTOPACK__EXTRACT__MODE", Some("style")),
        ],
        || {
            let config = PhotopackConfigLoader::new().load().expect("load");
            assert_eq!(config.fetch.concurrency, 3);
            assert_eq!(config.extract.mode, ExtractMode::Style);
        },
    );
}

#[test]
#[serial]
fn missing_optional_file_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = PhotopackConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("defaults");
    assert_eq!(config.fetch.timeout_secs, 15);
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = PhotopackConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(result.is_err());
}

#[test]
#[serial]
fn invalid_values_are_rejected() {
    let result = PhotopackConfigLoader::new()
        .with_yaml_str("fetch:\n  concurrency: 0\n")
        .load();
    assert!(result.is_err());
}
