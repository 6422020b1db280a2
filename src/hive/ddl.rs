//! HiveQL statement builders.

use crate::hive::mapper::HiveTable;

/// Quotes an identifier with backticks, doubling any embedded backtick.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quotes a string literal with single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

pub fn qualified_name(database: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(database), quote_ident(table))
}

pub fn drop_table(table: &HiveTable) -> String {
    format!(
        "DROP TABLE IF EXISTS {}",
        qualified_name(&table.database, &table.name)
    )
}

/// Text table whose layout matches what `StagingWriter` produces.
pub fn create_table(table: &HiveTable) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.hive_type))
        .collect();

    format!(
        r"CREATE TABLE {} ({}) ROW FORMAT DELIMITED FIELDS TERMINATED BY '\t' ESCAPED BY '\\' LINES TERMINATED BY '\n' STORED AS TEXTFILE",
        qualified_name(&table.database, &table.name),
        columns.join(", ")
    )
}

pub fn load_data(hdfs_path: &str, table: &HiveTable) -> String {
    format!(
        "LOAD DATA INPATH {} INTO TABLE {}",
        quote_literal(hdfs_path),
        qualified_name(&table.database, &table.name)
    )
}

pub fn show_tables(database: &str) -> String {
    format!("SHOW TABLES IN {}", quote_ident(database))
}

pub fn count_rows(database: &str, table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", qualified_name(database, table))
}
