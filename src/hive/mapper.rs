use serde::Deserialize;

use crate::source::{SourceColumn, TableSchema};

/// Hive type used for any native type missing from the table.
pub const FALLBACK_TYPE: &str = "string";

/// How integer and decimal widths are translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypePolicy {
    /// `tinyint` widens to `smallint`, `decimal` becomes `decimal(10,2)`.
    #[default]
    Widened,
    /// `tinyint` stays `tinyint`, `decimal` uses Hive's default precision.
    Narrow,
}

/// Broad class of a Hive column, used when rendering values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Binary,
    Text,
}

impl ColumnKind {
    pub fn of(hive_type: &str) -> Self {
        match hive_type {
            "tinyint" | "smallint" | "int" | "bigint" | "float" | "double" => ColumnKind::Numeric,
            t if t.starts_with("decimal") => ColumnKind::Numeric,
            "binary" => ColumnKind::Binary,
            _ => ColumnKind::Text,
        }
    }

    /// Text written in place of a SQL NULL.
    pub fn null_placeholder(self) -> &'static str {
        match self {
            ColumnKind::Numeric => "0",
            ColumnKind::Binary | ColumnKind::Text => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedColumn {
    pub name: String,
    pub native_type: String,
    pub hive_type: &'static str,
    pub kind: ColumnKind,
}

/// Destination table definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiveTable {
    pub database: String,
    pub name: String,
    pub columns: Vec<MappedColumn>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TypeMapper {
    policy: TypePolicy,
}

impl TypeMapper {
    pub fn new(policy: TypePolicy) -> Self {
        Self { policy }
    }

    /// Maps a MySQL `DATA_TYPE` to a Hive type. Matching is exact and
    /// case-sensitive; unknown names fall back to `string`.
    pub fn map(&self, native: &str) -> &'static str {
        match (native, self.policy) {
            // Integers
            ("tinyint", TypePolicy::Widened) => "smallint",
            ("tinyint", TypePolicy::Narrow) => "tinyint",
            ("smallint", _) => "smallint",
            ("mediumint" | "int", _) => "int",
            ("bigint", _) => "bigint",

            // Floating point & decimals
            ("float", _) => "float",
            ("double", _) => "double",
            ("decimal", TypePolicy::Widened) => "decimal(10,2)",
            ("decimal", TypePolicy::Narrow) => "decimal",

            // Date & time
            ("date", _) => "date",
            ("datetime" | "timestamp", _) => "timestamp",

            // Characters
            ("char" | "varchar" | "tinytext" | "text" | "mediumtext" | "longtext", _) => "string",

            // Binary
            ("binary" | "varbinary" | "tinyblob" | "blob" | "mediumblob" | "longblob", _) => "binary",

            ("enum" | "set", _) => "string",

            _ => FALLBACK_TYPE,
        }
    }

    pub fn map_column(&self, column: &SourceColumn) -> MappedColumn {
        let hive_type = self.map(&column.native_type);
        MappedColumn {
            name: column.name.clone(),
            native_type: column.native_type.clone(),
            hive_type,
            kind: ColumnKind::of(hive_type),
        }
    }

    pub fn map_table(&self, database: &str, schema: &TableSchema) -> HiveTable {
        HiveTable {
            database: database.to_string(),
            name: schema.table.clone(),
            columns: schema.columns.iter().map(|c| self.map_column(c)).collect(),
        }
    }
}

/// Maps a MySQL type name to a Hive type using the default policy.
pub fn map_mysql_to_hive(native: &str) -> &'static str {
    TypeMapper::default().map(native)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_types() {
        assert_eq!(map_mysql_to_hive("bigint"), "bigint");
        assert_eq!(map_mysql_to_hive("varchar"), "string");
        assert_eq!(map_mysql_to_hive("mediumint"), "int");
        assert_eq!(map_mysql_to_hive("datetime"), "timestamp");
        assert_eq!(map_mysql_to_hive("timestamp"), "timestamp");
        assert_eq!(map_mysql_to_hive("longblob"), "binary");
        assert_eq!(map_mysql_to_hive("enum"), "string");
    }

    #[test]
    fn test_policies_differ_on_tinyint_and_decimal() {
        let widened = TypeMapper::new(TypePolicy::Widened);
        let narrow = TypeMapper::new(TypePolicy::Narrow);

        assert_eq!(widened.map("tinyint"), "smallint");
        assert_eq!(narrow.map("tinyint"), "tinyint");
        assert_eq!(widened.map("decimal"), "decimal(10,2)");
        assert_eq!(narrow.map("decimal"), "decimal");
        assert_eq!(widened.map("int"), narrow.map("int"));
    }

    #[test]
    fn test_unknown_and_differently_cased_names_fall_back() {
        assert_eq!(map_mysql_to_hive("made_up_type"), "string");
        assert_eq!(map_mysql_to_hive(""), "string");
        assert_eq!(map_mysql_to_hive("BIGINT"), "string");
        assert_eq!(map_mysql_to_hive("json"), "string");
    }

    #[test]
    fn test_column_kind() {
        assert_eq!(ColumnKind::of("int"), ColumnKind::Numeric);
        assert_eq!(ColumnKind::of("decimal(10,2)"), ColumnKind::Numeric);
        assert_eq!(ColumnKind::of("decimal"), ColumnKind::Numeric);
        assert_eq!(ColumnKind::of("binary"), ColumnKind::Binary);
        assert_eq!(ColumnKind::of("timestamp"), ColumnKind::Text);
        assert_eq!(ColumnKind::of("string"), ColumnKind::Text);
        assert_eq!(ColumnKind::Numeric.null_placeholder(), "0");
        assert_eq!(ColumnKind::Text.null_placeholder(), "");
    }

    #[test]
    fn test_map_table_keeps_column_order() {
        let schema = TableSchema {
            table: "actor".into(),
            columns: vec![
                SourceColumn::new("actor_id", "smallint"),
                SourceColumn::new("first_name", "varchar"),
                SourceColumn::new("last_update", "timestamp"),
            ],
        };
        let table = TypeMapper::default().map_table("sakila", &schema);

        assert_eq!(table.database, "sakila");
        assert_eq!(table.name, "actor");
        let types: Vec<_> = table.columns.iter().map(|c| (c.name.as_str(), c.hive_type)).collect();
        assert_eq!(
            types,
            vec![("actor_id", "smallint"), ("first_name", "string"), ("last_update", "timestamp")]
        );
    }
}
