use std::collections::BTreeMap;

use planscope_error::{ExplainError, Result};
use serde::{Deserialize, Serialize};

use super::{StorageFormat, TableRef};
use crate::plan::{DataType, datatype};

/// Row count assumed when sizing a table that has no storage size metadata.
pub const NOMINAL_ROW_COUNT: u64 = 1000;

/// Property holding the on-disk size of a table in bytes.
pub const TOTAL_SIZE_PROPERTY: &str = "totalSize";
/// Property holding the number of rows as recorded by the storage layer.
pub const NUM_ROWS_PROPERTY: &str = "numRows";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub datatype: DataType,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        ColumnDefinition {
            name: name.into(),
            datatype,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub name: String,
    pub database: String,
    pub columns: Vec<ColumnDefinition>,
    pub format: StorageFormat,
    /// Serde and storage properties.
    pub properties: BTreeMap<String, String>,
    pub owner: Option<String>,
    /// Row count recorded by `ANALYZE TABLE`, cleared on refresh.
    pub collected_row_count: Option<u64>,
}

impl TableEntry {
    pub fn new(
        database: impl Into<String>,
        name: impl Into<String>,
        columns: Vec<ColumnDefinition>,
    ) -> Self {
        TableEntry {
            name: name.into(),
            database: database.into(),
            columns,
            format: StorageFormat::default(),
            properties: BTreeMap::new(),
            owner: None,
            collected_row_count: None,
        }
    }

    pub fn with_format(mut self, format: StorageFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef::new(self.database.clone(), self.name.clone())
    }

    /// Estimated width of a single row.
    pub fn row_width(&self) -> u64 {
        datatype::row_width(self.columns.iter().map(|c| &c.datatype))
    }

    /// Size of the table in bytes.
    ///
    /// Read from storage metadata when available, otherwise estimated from
    /// the column widths.
    pub fn size_in_bytes(&self) -> Result<u64> {
        match self.properties.get(TOTAL_SIZE_PROPERTY) {
            Some(size) => parse_property(self, TOTAL_SIZE_PROPERTY, size),
            None => Ok(self.row_width().saturating_mul(NOMINAL_ROW_COUNT)),
        }
    }

    /// Row count as known to storage, used when collecting statistics.
    pub fn storage_row_count(&self) -> Result<u64> {
        match self.properties.get(NUM_ROWS_PROPERTY) {
            Some(rows) => parse_property(self, NUM_ROWS_PROPERTY, rows),
            None => Ok(self.size_in_bytes()? / self.row_width()),
        }
    }
}

fn parse_property(entry: &TableEntry, key: &str, value: &str) -> Result<u64> {
    value.parse::<u64>().map_err(|_| {
        ExplainError::statistics(format!(
            "Invalid value for '{key}' on table {}.{}: {value}",
            entry.database, entry.name
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> TableEntry {
        TableEntry::new(
            "default",
            "src",
            vec![
                ColumnDefinition::new("key", DataType::Int),
                ColumnDefinition::new("value", DataType::String),
            ],
        )
    }

    #[test]
    fn estimated_size() {
        // 8 overhead + 4 + 20
        assert_eq!(32_000, entry().size_in_bytes().unwrap());
        assert_eq!(1000, entry().storage_row_count().unwrap());
    }

    #[test]
    fn size_from_properties() {
        let ent = entry().with_property(TOTAL_SIZE_PROPERTY, "5812");
        assert_eq!(5812, ent.size_in_bytes().unwrap());
        assert_eq!(5812 / 32, ent.storage_row_count().unwrap());
    }

    #[test]
    fn invalid_size_property() {
        let ent = entry().with_property(TOTAL_SIZE_PROPERTY, "lots");
        let err = ent.size_in_bytes().unwrap_err();
        assert_eq!(planscope_error::ErrorKind::Statistics, err.kind());
    }
}
