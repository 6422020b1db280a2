use std::fmt;
use thiserror::Error;

/// Per-table migration stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Schema,
    CreateTable,
    Export,
    Upload,
    Load,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Schema => "schema",
            Stage::CreateTable => "create-table",
            Stage::Export => "export",
            Stage::Upload => "upload",
            Stage::Load => "load",
        };
        f.write_str(name)
    }
}

/// A table whose migration stopped at `stage`.
#[derive(Debug, Error)]
#[error("table {table} failed at {stage}: {source:#}")]
pub struct TableError {
    pub table: String,
    pub stage: Stage,
    #[source]
    pub source: anyhow::Error,
}

impl TableError {
    pub fn new(table: impl Into<String>, stage: Stage, source: impl Into<anyhow::Error>) -> Self {
        Self {
            table: table.into(),
            stage,
            source: source.into(),
        }
    }
}
