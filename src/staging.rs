//! Local staging files in Hive's delimited text layout.
//!
//! One line per row, fields separated by a tab, no header. NULLs are
//! normalized before writing: numeric columns get `0`, everything else an
//! empty field. Field text is escaped the way `LazySimpleSerDe` reads it back
//! with `ESCAPED BY '\\'`.

use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::hive::mapper::{ColumnKind, HiveTable};

pub const FIELD_DELIMITER: char = '\t';
pub const FILE_EXTENSION: &str = "tsv";

/// Deterministic file name for a table's staged data.
pub fn staged_file_name(table: &str) -> String {
    format!("{}.{}", table, FILE_EXTENSION)
}

pub fn escape_field(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            FIELD_DELIMITER => {
                out.push('\\');
                out.push(FIELD_DELIMITER);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub rows: u64,
}

pub struct StagingWriter {
    path: PathBuf,
    kinds: Vec<ColumnKind>,
    out: BufWriter<File>,
    rows: u64,
}

impl StagingWriter {
    /// Creates (or truncates) `<dir>/<table>.tsv`, creating `dir` if needed.
    pub fn create(dir: &Path, table: &HiveTable) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create staging directory {}", dir.display()))?;

        let path = dir.join(staged_file_name(&table.name));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create staging file {}", path.display()))?;

        Ok(Self {
            path,
            kinds: table.columns.iter().map(|c| c.kind).collect(),
            out: BufWriter::new(file),
            rows: 0,
        })
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn write_row(&mut self, values: &[Option<String>]) -> Result<()> {
        if values.len() != self.kinds.len() {
            bail!(
                "Row {} has {} values but the table has {} columns",
                self.rows + 1,
                values.len(),
                self.kinds.len()
            );
        }

        let mut line = String::new();
        for (i, (value, kind)) in values.iter().zip(&self.kinds).enumerate() {
            if i > 0 {
                line.push(FIELD_DELIMITER);
            }
            match value {
                Some(v) => line.push_str(&escape_field(v)),
                None => line.push_str(kind.null_placeholder()),
            }
        }
        line.push('\n');

        self.out
            .write_all(line.as_bytes())
            .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        self.rows += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<StagedFile> {
        self.out
            .flush()
            .with_context(|| format!("Failed to flush {}", self.path.display()))?;
        Ok(StagedFile {
            path: self.path,
            rows: self.rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hive::mapper::TypeMapper;
    use crate::source::{SourceColumn, TableSchema};
    use tempfile::TempDir;

    fn table(columns: &[(&str, &str)]) -> HiveTable {
        let schema = TableSchema {
            table: "t".into(),
            columns: columns
                .iter()
                .map(|(n, t)| SourceColumn::new(*n, *t))
                .collect(),
        };
        TypeMapper::default().map_table("default", &schema)
    }

    #[test]
    fn test_nulls_are_normalized_by_column_kind() {
        let dir = TempDir::new().unwrap();
        let t = table(&[("id", "int"), ("name", "varchar"), ("amount", "decimal"), ("at", "datetime")]);

        let mut writer = StagingWriter::create(dir.path(), &t).unwrap();
        writer
            .write_row(&[Some("1".into()), None, None, None])
            .unwrap();
        writer
            .write_row(&[None, Some("x".into()), Some("2.50".into()), Some("2006-02-15 04:34:33".into())])
            .unwrap();
        let staged = writer.finish().unwrap();

        assert_eq!(staged.rows, 2);
        assert_eq!(staged.path, dir.path().join("t.tsv"));
        let content = std::fs::read_to_string(&staged.path).unwrap();
        assert_eq!(content, "1\t\t0\t\n0\tx\t2.50\t2006-02-15 04:34:33\n");
    }

    #[test]
    fn test_special_characters_are_escaped() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a\tb"), "a\\\tb");
        assert_eq!(escape_field("line1\nline2\r"), "line1\\nline2\\r");
        assert_eq!(escape_field(r"C:\dir"), r"C:\\dir");
        assert_eq!(escape_field("a,b"), "a,b");
    }

    #[test]
    fn test_row_width_mismatch_is_rejected() {
        let dir = TempDir::new().unwrap();
        let t = table(&[("id", "int"), ("name", "varchar")]);
        let mut writer = StagingWriter::create(dir.path(), &t).unwrap();

        let err = writer.write_row(&[Some("1".into())]).unwrap_err();
        assert!(err.to_string().contains("has 1 values but the table has 2 columns"));
        assert_eq!(writer.rows(), 0);
    }

    #[test]
    fn test_rewrite_truncates_and_creates_missing_dirs() {
        let dir = TempDir::new().unwrap();
        let t = table(&[("id", "int")]);

        let mut first = StagingWriter::create(dir.path(), &t).unwrap();
        for i in 0..5 {
            first.write_row(&[Some(i.to_string())]).unwrap();
        }
        first.finish().unwrap();

        let mut second = StagingWriter::create(dir.path().join("nested").as_path(), &t).unwrap();
        second.write_row(&[Some("9".into())]).unwrap();
        let staged = second.finish().unwrap();
        assert_eq!(std::fs::read_to_string(staged.path).unwrap(), "9\n");

        let mut again = StagingWriter::create(dir.path(), &t).unwrap();
        again.write_row(&[Some("7".into())]).unwrap();
        let staged = again.finish().unwrap();
        assert_eq!(std::fs::read_to_string(staged.path).unwrap(), "7\n");
    }
}
