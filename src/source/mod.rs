pub mod mysql;

use anyhow::Result;
use async_trait::async_trait;

use crate::hive::mapper::HiveTable;
use crate::staging::StagingWriter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceColumn {
    pub name: String,
    pub native_type: String,
}

impl SourceColumn {
    pub fn new(name: impl Into<String>, native_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native_type: native_type.into(),
        }
    }
}

/// Ordered column list of one source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<SourceColumn>,
}

impl TableSchema {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Relational database the tables are copied from.
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    /// Table names in the order they should be migrated.
    async fn list_tables(&self) -> Result<Vec<String>>;

    async fn table_schema(&self, table: &str) -> Result<TableSchema>;

    /// Streams every row of `table` into `writer`.
    async fn export_rows(&self, table: &HiveTable, writer: &mut StagingWriter) -> Result<()>;
}
