use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::Row;
use std::time::Duration;
use tracing::debug;

use crate::hive::ddl::quote_ident;
use crate::hive::mapper::{ColumnKind, HiveTable};
use crate::settings::MySqlConfig;
use crate::source::{SourceCatalog, SourceColumn, TableSchema};
use crate::staging::StagingWriter;

pub struct MySqlSource {
    pool: MySqlPool,
    database: String,
    include_views: bool,
}

impl MySqlSource {
    pub async fn connect(config: &MySqlConfig) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to MySQL at {}:{}/{}",
                    config.host, config.port, config.database
                )
            })?;

        Ok(Self {
            pool,
            database: config.database.clone(),
            include_views: config.include_views,
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn is_spatial(native_type: &str) -> bool {
    matches!(
        native_type,
        "geometry"
            | "point"
            | "linestring"
            | "polygon"
            | "multipoint"
            | "multilinestring"
            | "multipolygon"
            | "geometrycollection"
            | "geomcollection"
    )
}

/// Builds the export query. Binary columns are fetched raw, spatial columns
/// as WKT, everything else is cast to text so values arrive in MySQL's
/// canonical rendering.
pub fn select_statement(database: &str, table: &HiveTable) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| match c.kind {
            ColumnKind::Binary => quote_ident(&c.name),
            _ if is_spatial(&c.native_type) => format!("ST_AsText({})", quote_ident(&c.name)),
            _ => format!("CAST({} AS CHAR)", quote_ident(&c.name)),
        })
        .collect();

    format!(
        "SELECT {} FROM {}.{}",
        columns.join(", "),
        quote_ident(database),
        quote_ident(&table.name)
    )
}

/// `bit` and other types without a text form may cast to bytes that are not
/// UTF-8; those are kept with replacement characters.
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

fn row_values(row: &MySqlRow, table: &HiveTable) -> Result<Vec<Option<String>>> {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| -> Result<Option<String>> {
            let value = match c.kind {
                ColumnKind::Binary => row
                    .try_get::<Option<Vec<u8>>, _>(i)?
                    .map(|bytes| BASE64.encode(bytes)),
                _ => row.try_get::<Option<Vec<u8>>, _>(i)?.map(decode_text),
            };
            Ok(value)
        })
        .collect()
}

#[async_trait]
impl SourceCatalog for MySqlSource {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let sql = if self.include_views {
            "SELECT CAST(TABLE_NAME AS CHAR) AS table_name
             FROM INFORMATION_SCHEMA.TABLES
             WHERE TABLE_SCHEMA = ?
             ORDER BY TABLE_NAME"
        } else {
            "SELECT CAST(TABLE_NAME AS CHAR) AS table_name
             FROM INFORMATION_SCHEMA.TABLES
             WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
             ORDER BY TABLE_NAME"
        };

        let rows = sqlx::query(sql)
            .bind(&self.database)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list tables of {}", self.database))?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("table_name").map_err(anyhow::Error::from))
            .collect()
    }

    async fn table_schema(&self, table: &str) -> Result<TableSchema> {
        let rows = sqlx::query(
            "SELECT CAST(COLUMN_NAME AS CHAR) AS column_name,
                    CAST(DATA_TYPE AS CHAR) AS data_type
             FROM INFORMATION_SCHEMA.COLUMNS
             WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
             ORDER BY ORDINAL_POSITION",
        )
        .bind(&self.database)
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to fetch MySQL schema for table {}", table))?;

        let columns = rows
            .iter()
            .map(|row| -> Result<SourceColumn> {
                Ok(SourceColumn {
                    name: row.try_get("column_name")?,
                    native_type: row.try_get("data_type")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(table, columns = columns.len(), "Fetched MySQL schema");
        Ok(TableSchema {
            table: table.to_string(),
            columns,
        })
    }

    async fn export_rows(&self, table: &HiveTable, writer: &mut StagingWriter) -> Result<()> {
        let sql = select_statement(&self.database, table);
        debug!(table = %table.name, %sql, "Exporting rows");

        let mut rows = sqlx::query(&sql).fetch(&self.pool);
        while let Some(row) = rows
            .try_next()
            .await
            .with_context(|| format!("Failed to read rows of {}", table.name))?
        {
            writer.write_row(&row_values(&row, table)?)?;
        }

        Ok(())
    }
}
