use anyhow::{anyhow, bail, Context, Result};
use tracing::{error, info};

use crate::hive::ddl;
use crate::hive::{ResultSet, Warehouse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCount {
    pub table: String,
    /// `None` when the count query failed.
    pub rows: Option<u64>,
}

/// Lists the tables of `database` and counts the rows of each.
pub async fn verify_tables<W: Warehouse + ?Sized>(warehouse: &W, database: &str) -> Result<Vec<TableCount>> {
    let listing = warehouse
        .query(&ddl::show_tables(database))
        .await
        .context("Error fetching tables")?;

    let tables = table_names(listing)?;
    info!(database, count = tables.len(), "Verifying Hive tables");

    let mut counts = Vec::with_capacity(tables.len());
    for table in tables {
        let rows = match count_rows(warehouse, database, &table).await {
            Ok(n) => Some(n),
            Err(e) => {
                error!(table = %table, "Error fetching row count: {:#}", e);
                None
            }
        };
        counts.push(TableCount { table, rows });
    }
    Ok(counts)
}

/// Column names under which engines report the table name in `SHOW TABLES`.
const TABLE_NAME_COLUMNS: &[&str] = &["tab_name", "tableName"];

/// Extracts table names from a `SHOW TABLES` listing. Hive answers with a
/// single `tab_name` column, Spark with `namespace, tableName, isTemporary`.
fn table_names(listing: ResultSet) -> Result<Vec<String>> {
    let index = match listing.column_index(TABLE_NAME_COLUMNS) {
        Some(i) => i,
        None if listing.columns.len() <= 1 => 0,
        None => bail!(
            "SHOW TABLES returned no table name column (columns: {})",
            listing.columns.join(", ")
        ),
    };

    Ok(listing
        .rows
        .into_iter()
        .filter_map(|row| row.into_iter().nth(index).flatten())
        .collect())
}

async fn count_rows<W: Warehouse + ?Sized>(warehouse: &W, database: &str, table: &str) -> Result<u64> {
    let result = warehouse.query(&ddl::count_rows(database, table)).await?;
    let value = result
        .rows
        .into_iter()
        .next()
        .and_then(|row| row.into_iter().next().flatten())
        .ok_or_else(|| anyhow!("COUNT(*) returned no value"))?;
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid row count {:?}", value))
}

pub fn print_counts(counts: &[TableCount]) {
    println!("Tables:");
    for c in counts {
        match c.rows {
            Some(n) => println!("Table: {}, Rows: {}", c.table, n),
            None => println!("Table: {}, Rows: unavailable", c.table),
        }
    }
}
