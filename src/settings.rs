use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use crate::hive::mapper::TypePolicy;

pub const ENV_PREFIX: &str = "HIVE_INGEST";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub source: SourceConfig,
    pub hdfs: HdfsConfig,
    pub hive: HiveConfig,
    pub staging: StagingConfig,
    pub mapping: MappingConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SourceConfig {
    pub mysql: MySqlConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MySqlConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Views are listed alongside base tables, like `SHOW TABLES` does.
    pub include_views: bool,
    pub acquire_timeout_secs: u64,
}

impl Default for MySqlConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 3306,
            user: "hive".into(),
            password: "hive".into(),
            database: "sakila".into(),
            include_views: true,
            acquire_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HdfsConfig {
    pub namenode_url: String,
    pub user: String,
    pub warehouse_dir: String,
    /// Octal permission passed to MKDIRS, e.g. "777".
    pub dir_permission: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for HdfsConfig {
    fn default() -> Self {
        Self {
            namenode_url: "http://localhost:50070".into(),
            user: "hive".into(),
            warehouse_dir: "/user/hive/warehouse".into(),
            dir_permission: None,
            request_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HiveConfig {
    /// Base URL of the SQL gateway's REST endpoint.
    pub url: String,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
    pub request_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub fetch_size: usize,
}

impl Default for HiveConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:10099".into(),
            user: "hive".into(),
            password: None,
            database: "default".into(),
            request_timeout_secs: 300,
            poll_interval_ms: 500,
            fetch_size: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StagingConfig {
    pub local_dir: PathBuf,
    /// Leave staged files on disk after a successful load.
    pub keep_files: bool,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            local_dir: PathBuf::from("./tables"),
            keep_files: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MappingConfig {
    pub policy: TypePolicy,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Layers `config/default`, `config/<RUN_MODE>`, an optional explicit
    /// file and finally `HIVE_INGEST__*` environment variables.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        let s = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
