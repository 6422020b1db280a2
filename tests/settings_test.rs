//! Tests for settings.rs configuration loading

use hive_ingest::hive::mapper::TypePolicy;
use hive_ingest::settings::Settings;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

// Helper to create a test config file
fn create_test_config(dir: &TempDir, content: &str) -> PathBuf {
    let config_path = dir.path().join("hive-ingest.toml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    config_path
}

#[test]
fn test_defaults_match_single_host_deployment() {
    let settings = Settings::default();

    assert_eq!(settings.source.mysql.host, "localhost");
    assert_eq!(settings.source.mysql.port, 3306);
    assert_eq!(settings.source.mysql.database, "sakila");
    assert!(settings.source.mysql.include_views);
    assert_eq!(settings.hdfs.namenode_url, "http://localhost:50070");
    assert_eq!(settings.hdfs.warehouse_dir, "/user/hive/warehouse");
    assert_eq!(settings.hdfs.dir_permission, None);
    assert_eq!(settings.hive.user, "hive");
    assert_eq!(settings.staging.local_dir, PathBuf::from("./tables"));
    assert!(settings.staging.keep_files);
    assert_eq!(settings.mapping.policy, TypePolicy::Widened);
}

#[test]
fn test_explicit_file_overrides_defaults() {
    let config_content = r#"
[source.mysql]
host = "mysql"
database = "inventory"
include_views = false

[hdfs]
namenode_url = "http://hadoop-namenode:50070"
dir_permission = "777"

[hive]
url = "http://hive-server:10099"
database = "staging"

[mapping]
policy = "narrow"
"#;

    let temp_dir = TempDir::new().unwrap();
    let path = create_test_config(&temp_dir, config_content);
    let settings = Settings::load(Some(&path)).unwrap();

    assert_eq!(settings.source.mysql.host, "mysql");
    assert_eq!(settings.source.mysql.database, "inventory");
    assert!(!settings.source.mysql.include_views);
    // Keys absent from the file keep their defaults
    assert_eq!(settings.source.mysql.port, 3306);
    assert_eq!(settings.hdfs.namenode_url, "http://hadoop-namenode:50070");
    assert_eq!(settings.hdfs.dir_permission.as_deref(), Some("777"));
    assert_eq!(settings.hive.url, "http://hive-server:10099");
    assert_eq!(settings.hive.database, "staging");
    assert_eq!(settings.mapping.policy, TypePolicy::Narrow);
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");
    assert!(Settings::load(Some(&path)).is_err());
}

#[test]
fn test_unknown_policy_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_test_config(&temp_dir, "[mapping]\npolicy = \"loose\"\n");
    assert!(Settings::load(Some(&path)).is_err());
}
