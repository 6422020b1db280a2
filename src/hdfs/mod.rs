pub mod client;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatus {
    #[serde(rename = "type")]
    pub file_type: String,
    #[serde(default)]
    pub length: u64,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub permission: String,
    #[serde(default)]
    pub modification_time: i64,
}

impl FileStatus {
    pub fn is_dir(&self) -> bool {
        self.file_type == "DIRECTORY"
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.modification_time)
    }
}

/// Distributed filesystem the staged files are uploaded to.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// `Ok(None)` when the path does not exist.
    async fn status(&self, path: &str) -> Result<Option<FileStatus>>;

    /// Creates `path` and any missing parents.
    async fn mkdirs(&self, path: &str, permission: Option<&str>) -> Result<()>;

    async fn upload(&self, local: &Path, remote: &str, overwrite: bool) -> Result<()>;
}
