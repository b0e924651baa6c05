//! Unit tests for common-config crate

use common_config::{ExecutionConfig, HelionConfig, StorageConfig};

#[test]
fn test_helion_config_default() {
    let config = HelionConfig::default();

    // Check default execution config
    assert_eq!(config.execution.parallelism, None);
    assert_eq!(config.execution.effective_parallelism(), 1);

    // Check default storage config
    assert_eq!(config.storage.base_path, None);
}

#[test]
fn test_execution_config_constructors() {
    assert_eq!(ExecutionConfig::serial().parallelism, None);
    assert_eq!(ExecutionConfig::with_parallelism(6).parallelism, Some(6));
    assert!(ExecutionConfig::multi_threaded().parallelism.unwrap_or(0) >= 1);
}

#[test]
fn test_helion_config_serialization() {
    let mut config = HelionConfig::default();
    config.execution.parallelism = Some(4);
    config.storage.base_path = Some("/data/helion".to_string());

    // Serialize to JSON
    let json = serde_json::to_string(&config).unwrap();

    // Deserialize from JSON
    let deserialized: HelionConfig = serde_json::from_str(&json).unwrap();

    // Verify equality
    assert_eq!(deserialized.execution.parallelism, Some(4));
    assert_eq!(
        deserialized.storage.base_path,
        Some("/data/helion".to_string())
    );
}

#[test]
fn test_config_partial_json() {
    // Optional fields may be absent
    let json = r#"{
        "execution": {},
        "storage": {}
    }"#;

    let config: HelionConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.execution.parallelism, None);
    assert_eq!(config.storage.base_path, None);
}

#[test]
fn test_config_with_null_values() {
    let json = r#"{
        "execution": {
            "parallelism": null
        },
        "storage": {
            "base_path": null
        }
    }"#;

    let config: HelionConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.execution.parallelism, None);
    assert_eq!(config.execution.effective_parallelism(), 1);
}

#[test]
fn test_invalid_parallelism_deserialization() {
    // usize cannot be negative
    let json = r#"{
        "execution": {
            "parallelism": -4
        },
        "storage": {}
    }"#;

    let result: Result<HelionConfig, _> = serde_json::from_str(json);
    assert!(result.is_err());
}

#[test]
fn test_config_clone_is_independent() {
    let base = HelionConfig::default();

    let mut modified = base.clone();
    modified.execution.parallelism = Some(8);
    modified.storage.base_path = Some("/new/path".to_string());

    // Original should be unchanged
    assert_eq!(base.execution.parallelism, None);
    assert_eq!(base.storage.base_path, None);

    assert_eq!(modified.execution.parallelism, Some(8));
    assert_eq!(modified.storage.base_path, Some("/new/path".to_string()));
}

#[test]
fn test_config_debug_format() {
    let config = HelionConfig {
        execution: ExecutionConfig::with_parallelism(16),
        storage: StorageConfig::default(),
    };
    let debug_str = format!("{config:?}");
    assert!(debug_str.contains("HelionConfig"));
    assert!(debug_str.contains("16"));
}
