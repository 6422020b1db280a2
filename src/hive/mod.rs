pub mod client;
pub mod ddl;
pub mod mapper;

use anyhow::Result;
use async_trait::async_trait;

/// A single result cell; `None` is SQL NULL.
pub type Cell = Option<String>;

/// Rows of a query together with the column names reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ResultSet {
    /// Position of the first column whose name matches one of `names`,
    /// ignoring ASCII case.
    pub fn column_index(&self, names: &[&str]) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| names.iter().any(|n| c.eq_ignore_ascii_case(n)))
    }
}

/// SQL endpoint of the destination warehouse.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Runs a statement whose result set, if any, is discarded.
    async fn execute(&self, statement: &str) -> Result<()>;

    async fn query(&self, statement: &str) -> Result<ResultSet>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_index_ignores_case() {
        let result = ResultSet {
            columns: vec!["namespace".into(), "tableName".into(), "isTemporary".into()],
            rows: vec![],
        };
        assert_eq!(result.column_index(&["tab_name", "tablename"]), Some(1));
        assert_eq!(result.column_index(&["missing"]), None);
    }
}
