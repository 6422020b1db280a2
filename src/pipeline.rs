use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::error::{Stage, TableError};
use crate::hdfs::FileStore;
use crate::hive::ddl;
use crate::hive::mapper::{HiveTable, TypeMapper};
use crate::hive::Warehouse;
use crate::settings::Settings;
use crate::source::SourceCatalog;
use crate::staging::{staged_file_name, StagedFile, StagingWriter};

#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub hive_database: String,
    pub warehouse_dir: String,
    pub dir_permission: Option<String>,
    pub staging_dir: PathBuf,
    pub keep_staged_files: bool,
}

impl MigrationOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            hive_database: settings.hive.database.clone(),
            warehouse_dir: settings.hdfs.warehouse_dir.clone(),
            dir_permission: settings.hdfs.dir_permission.clone(),
            staging_dir: settings.staging.local_dir.clone(),
            keep_staged_files: settings.staging.keep_files,
        }
    }

    /// HDFS path the staged file of `table` is uploaded to.
    pub fn remote_path(&self, table: &str) -> String {
        format!(
            "{}/{}",
            self.warehouse_dir.trim_end_matches('/'),
            staged_file_name(table)
        )
    }
}

#[derive(Debug)]
pub struct TableOutcome {
    pub table: String,
    /// Rows loaded on success.
    pub result: Result<u64, TableError>,
}

impl TableOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Default)]
pub struct MigrationReport {
    pub outcomes: Vec<TableOutcome>,
}

impl MigrationReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &TableOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &TableError> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    pub fn print_summary(&self) {
        println!(
            "Migrated {} of {} tables.",
            self.succeeded().count(),
            self.outcomes.len()
        );
        for err in self.failed() {
            println!("  FAILED {} at {}: {:#}", err.table, err.stage, err.source);
        }
    }
}

/// Copies source tables into the warehouse one at a time.
pub struct Migrator<S, F, W> {
    source: S,
    store: F,
    warehouse: W,
    mapper: TypeMapper,
    options: MigrationOptions,
}

impl<S, F, W> Migrator<S, F, W>
where
    S: SourceCatalog,
    F: FileStore,
    W: Warehouse,
{
    pub fn new(source: S, store: F, warehouse: W, mapper: TypeMapper, options: MigrationOptions) -> Self {
        Self {
            source,
            store,
            warehouse,
            mapper,
            options,
        }
    }

    pub fn warehouse(&self) -> &W {
        &self.warehouse
    }

    pub fn into_parts(self) -> (S, F, W) {
        (self.source, self.store, self.warehouse)
    }

    /// Migrates every listed table, or only those named in `only` when it is
    /// non-empty. A table's failure never stops the run; only failing to list
    /// the source tables does.
    pub async fn run(&self, only: &[String]) -> Result<MigrationReport> {
        let mut tables = self
            .source
            .list_tables()
            .await
            .context("Failed to list source tables")?;

        if !only.is_empty() {
            for name in only {
                if !tables.contains(name) {
                    warn!(table = %name, "Requested table not found in source, skipping");
                }
            }
            tables.retain(|t| only.contains(t));
        }

        info!(count = tables.len(), "Starting migration");
        let mut report = MigrationReport::default();
        for table in &tables {
            report.outcomes.push(self.migrate_table(table).await);
        }
        Ok(report)
    }

    pub async fn migrate_table(&self, table: &str) -> TableOutcome {
        info!(table, "Uploading table to HDFS and loading into Hive");
        let result = self.try_migrate(table).await;
        match &result {
            Ok(rows) => info!(table, rows, "Table migrated"),
            Err(e) => error!(table, stage = %e.stage, "{:#}", e.source),
        }
        TableOutcome {
            table: table.to_string(),
            result,
        }
    }

    async fn try_migrate(&self, table: &str) -> Result<u64, TableError> {
        let fail = |stage: Stage| move |e: anyhow::Error| TableError::new(table, stage, e);

        let schema = self
            .source
            .table_schema(table)
            .await
            .map_err(fail(Stage::Schema))?;
        if schema.is_empty() {
            return Err(TableError::new(
                table,
                Stage::Schema,
                anyhow::anyhow!("No schema available for table {}", table),
            ));
        }
        let hive_table = self.mapper.map_table(&self.options.hive_database, &schema);

        self.create_table(&hive_table)
            .await
            .map_err(fail(Stage::CreateTable))?;

        let staged = self.stage(&hive_table).await.map_err(fail(Stage::Export))?;
        if staged.rows == 0 {
            info!(table, "No rows found in source table, skipping upload");
            return Ok(0);
        }

        let remote = self.options.remote_path(table);
        self.upload(&staged, &remote)
            .await
            .map_err(fail(Stage::Upload))?;

        self.warehouse
            .execute(&ddl::load_data(&remote, &hive_table))
            .await
            .with_context(|| format!("Error loading data into Hive table {}", table))
            .map_err(fail(Stage::Load))?;
        info!(table, path = %remote, "Data loaded into Hive table");

        if !self.options.keep_staged_files {
            if let Err(e) = std::fs::remove_file(&staged.path) {
                warn!(table, path = %staged.path.display(), "Failed to remove staging file: {}", e);
            }
        }
        Ok(staged.rows)
    }

    async fn create_table(&self, table: &HiveTable) -> Result<()> {
        self.warehouse
            .execute(&ddl::drop_table(table))
            .await
            .with_context(|| format!("Error dropping table {} in Hive", table.name))?;
        self.warehouse
            .execute(&ddl::create_table(table))
            .await
            .with_context(|| format!("Error creating table {} in Hive", table.name))?;
        info!(table = %table.name, columns = table.columns.len(), "Table created in Hive");
        Ok(())
    }

    async fn stage(&self, table: &HiveTable) -> Result<StagedFile> {
        let mut writer = StagingWriter::create(&self.options.staging_dir, table)?;
        self.source
            .export_rows(table, &mut writer)
            .await
            .with_context(|| format!("Error exporting rows of {}", table.name))?;
        let staged = writer.finish()?;
        info!(table = %table.name, rows = staged.rows, path = %staged.path.display(), "Rows staged");
        Ok(staged)
    }

    async fn upload(&self, staged: &StagedFile, remote: &str) -> Result<()> {
        self.store
            .status("/")
            .await
            .context("Unable to connect to HDFS")?;

        self.store
            .mkdirs(&self.options.warehouse_dir, self.options.dir_permission.as_deref())
            .await
            .with_context(|| format!("Failed to create HDFS directory {}", self.options.warehouse_dir))?;

        self.store
            .upload(&staged.path, remote, true)
            .await
            .with_context(|| format!("Error uploading {} to {}", staged.path.display(), remote))?;
        info!(local = %staged.path.display(), remote, "Uploaded to HDFS");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_path_is_derived_from_table_name() {
        let options = MigrationOptions::from_settings(&Settings::default());
        assert_eq!(options.remote_path("actor"), "/user/hive/warehouse/actor.tsv");

        let options = MigrationOptions {
            warehouse_dir: "/data/staging/".into(),
            ..options
        };
        assert_eq!(options.remote_path("film"), "/data/staging/film.tsv");
    }
}
