//! In-memory catalog of databases and tables.
pub mod entry;

use std::fmt;
use std::str::FromStr;

use hashbrown::HashMap;
use parking_lot::RwLock;
use planscope_error::{ExplainError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use entry::{ColumnDefinition, TableEntry};

pub const DEFAULT_DATABASE: &str = "default";

/// Possibly unqualified reference to a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub database: Option<String>,
    pub table: String,
}

impl TableRef {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        TableRef {
            database: Some(database.into()),
            table: table.into(),
        }
    }

    pub fn unqualified(table: impl Into<String>) -> Self {
        TableRef {
            database: None,
            table: table.into(),
        }
    }

    /// Build a reference from normalized name parts, `[table]` or
    /// `[database, table]`.
    pub fn from_parts(parts: &[String]) -> Result<Self> {
        match parts {
            [table] => Ok(Self::unqualified(table.clone())),
            [database, table] => Ok(Self::new(database.clone(), table.clone())),
            other => Err(ExplainError::analysis(format!(
                "Expected [database.]table, got '{}'",
                other.join(".")
            ))),
        }
    }

    /// Fill in the database if it's missing.
    pub fn qualify(self, default_database: &str) -> Self {
        TableRef {
            database: Some(
                self.database
                    .unwrap_or_else(|| default_database.to_string()),
            ),
            table: self.table,
        }
    }

    pub fn database_or<'a>(&'a self, default_database: &'a str) -> &'a str {
        self.database.as_deref().unwrap_or(default_database)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.database {
            Some(db) => write!(f, "{db}.{}", self.table),
            None => write!(f, "{}", self.table),
        }
    }
}

/// Storage format of a table, `STORED AS <format>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StorageFormat {
    #[default]
    TextFile,
    Parquet,
    Orc,
    Avro,
    Csv,
    Json,
    /// External table backed by a remote database. Read only.
    Jdbc,
}

impl StorageFormat {
    pub const fn is_writable(&self) -> bool {
        !matches!(self, Self::Jdbc)
    }
}

impl FromStr for StorageFormat {
    type Err = ExplainError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "textfile" | "text" => Self::TextFile,
            "parquet" => Self::Parquet,
            "orc" => Self::Orc,
            "avro" => Self::Avro,
            "csv" => Self::Csv,
            "json" => Self::Json,
            "jdbc" => Self::Jdbc,
            other => {
                return Err(ExplainError::parse(format!(
                    "Unsupported storage format: {other}"
                )));
            }
        })
    }
}

impl fmt::Display for StorageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TextFile => "textfile",
            Self::Parquet => "parquet",
            Self::Orc => "orc",
            Self::Avro => "avro",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Jdbc => "jdbc",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Default)]
struct Database {
    tables: HashMap<String, TableEntry>,
}

/// Thread-safe catalog shared by all sessions of an engine.
#[derive(Debug)]
pub struct Catalog {
    databases: RwLock<HashMap<String, Database>>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// Create a catalog containing only the default database.
    pub fn new() -> Self {
        let mut databases = HashMap::new();
        databases.insert(DEFAULT_DATABASE.to_string(), Database::default());
        Catalog {
            databases: RwLock::new(databases),
        }
    }

    pub fn create_database(&self, name: &str) -> Result<()> {
        let mut databases = self.databases.write();
        if databases.contains_key(name) {
            return Err(ExplainError::analysis(format!(
                "Database '{name}' already exists"
            )));
        }
        databases.insert(name.to_string(), Database::default());
        Ok(())
    }

    pub fn database_exists(&self, name: &str) -> bool {
        self.databases.read().contains_key(name)
    }

    /// Create a table. The entry's database must exist.
    pub fn create_table(&self, entry: TableEntry) -> Result<()> {
        let mut databases = self.databases.write();
        let database = databases.get_mut(&entry.database).ok_or_else(|| {
            ExplainError::analysis(format!("Database '{}' not found", entry.database))
        })?;

        if database.tables.contains_key(&entry.name) {
            return Err(ExplainError::analysis(format!(
                "Table {}.{} already exists",
                entry.database, entry.name
            )));
        }

        debug!(database = %entry.database, table = %entry.name, "creating table");
        database.tables.insert(entry.name.clone(), entry);
        Ok(())
    }

    /// Get a copy of a table entry, returning None if it doesn't exist.
    pub fn get_table(&self, table: &TableRef, default_database: &str) -> Option<TableEntry> {
        let databases = self.databases.read();
        databases
            .get(table.database_or(default_database))
            .and_then(|db| db.tables.get(&table.table))
            .cloned()
    }

    pub fn table_exists(&self, table: &TableRef, default_database: &str) -> bool {
        self.get_table(table, default_database).is_some()
    }

    /// Record collected statistics for a table.
    ///
    /// The row count comes from the table's storage metadata.
    pub fn collect_statistics(&self, table: &TableRef, default_database: &str) -> Result<u64> {
        self.modify_table(table, default_database, |entry| {
            let row_count = entry.storage_row_count()?;
            entry.collected_row_count = Some(row_count);
            debug!(table = %entry.name, row_count, "collected statistics");
            Ok(row_count)
        })
    }

    /// Drop any collected statistics for a table.
    pub fn refresh_table(&self, table: &TableRef, default_database: &str) -> Result<()> {
        self.modify_table(table, default_database, |entry| {
            entry.collected_row_count = None;
            debug!(table = %entry.name, "invalidated collected statistics");
            Ok(())
        })
    }

    fn modify_table<T>(
        &self,
        table: &TableRef,
        default_database: &str,
        f: impl FnOnce(&mut TableEntry) -> Result<T>,
    ) -> Result<T> {
        let mut databases = self.databases.write();
        let database_name = table.database_or(default_database);
        let entry = databases
            .get_mut(database_name)
            .and_then(|db| db.tables.get_mut(&table.table))
            .ok_or_else(|| {
                ExplainError::analysis(format!(
                    "Table or view not found: {database_name}.{}",
                    table.table
                ))
            })?;
        f(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::DataType;

    fn src_entry() -> TableEntry {
        TableEntry::new(
            DEFAULT_DATABASE,
            "src",
            vec![
                ColumnDefinition::new("key", DataType::Int),
                ColumnDefinition::new("value", DataType::String),
            ],
        )
        .with_property("numRows", "500")
    }

    #[test]
    fn create_and_get() {
        let catalog = Catalog::new();
        catalog.create_table(src_entry()).unwrap();

        let ent = catalog
            .get_table(&TableRef::unqualified("src"), DEFAULT_DATABASE)
            .unwrap();
        assert_eq!(2, ent.columns.len());
        assert!(
            catalog
                .get_table(&TableRef::new("other", "src"), DEFAULT_DATABASE)
                .is_none()
        );
    }

    #[test]
    fn create_duplicate() {
        let catalog = Catalog::new();
        catalog.create_table(src_entry()).unwrap();
        let err = catalog.create_table(src_entry()).unwrap_err();
        assert_eq!("Table default.src already exists", err.message());
    }

    #[test]
    fn create_in_missing_database() {
        let catalog = Catalog::new();
        let entry = TableEntry::new("nope", "t", Vec::new());
        catalog.create_table(entry).unwrap_err();
    }

    #[test]
    fn collect_then_refresh() {
        let catalog = Catalog::new();
        catalog.create_table(src_entry()).unwrap();
        let table = TableRef::unqualified("src");

        assert_eq!(500, catalog.collect_statistics(&table, DEFAULT_DATABASE).unwrap());
        let ent = catalog.get_table(&table, DEFAULT_DATABASE).unwrap();
        assert_eq!(Some(500), ent.collected_row_count);

        catalog.refresh_table(&table, DEFAULT_DATABASE).unwrap();
        let ent = catalog.get_table(&table, DEFAULT_DATABASE).unwrap();
        assert_eq!(None, ent.collected_row_count);
    }

    #[test]
    fn storage_format_parse() {
        assert_eq!(StorageFormat::Parquet, "PARQUET".parse().unwrap());
        assert!(!"jdbc".parse::<StorageFormat>().unwrap().is_writable());
        "delta".parse::<StorageFormat>().unwrap_err();
    }

    #[test]
    fn table_ref_parts() {
        let r = TableRef::from_parts(&["db".to_string(), "t".to_string()]).unwrap();
        assert_eq!("db.t", r.to_string());
        let r = TableRef::from_parts(&["t".to_string()]).unwrap().qualify("default");
        assert_eq!("default.t", r.to_string());
        TableRef::from_parts(&["a".to_string(), "b".to_string(), "c".to_string()]).unwrap_err();
    }
}
