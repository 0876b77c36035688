use std::sync::Arc;

use planscope_error::{ExplainError, Result};
use tracing::trace;

use super::Stats;
use crate::catalog::{Catalog, DEFAULT_DATABASE, TableRef};
use crate::pipeline::StatsProvider;

/// Reads table statistics from the in-memory catalog.
#[derive(Debug, Clone)]
pub struct CatalogStatsProvider {
    catalog: Arc<Catalog>,
}

impl CatalogStatsProvider {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        CatalogStatsProvider { catalog }
    }
}

impl StatsProvider for CatalogStatsProvider {
    fn lookup_stats(&self, table: &TableRef, cbo_enabled: bool) -> Result<Stats> {
        let entry = self
            .catalog
            .get_table(table, DEFAULT_DATABASE)
            .ok_or_else(|| {
                ExplainError::statistics(format!("No catalog entry for table {table}"))
            })?;

        let size_in_bytes = entry.size_in_bytes()?;
        let row_count = if cbo_enabled {
            entry.collected_row_count
        } else {
            None
        };

        trace!(%table, size_in_bytes, ?row_count, "looked up table stats");

        Ok(Stats {
            size_in_bytes,
            row_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ColumnDefinition, TableEntry};
    use crate::plan::DataType;

    fn provider() -> (Arc<Catalog>, CatalogStatsProvider) {
        let catalog = Arc::new(Catalog::new());
        catalog
            .create_table(
                TableEntry::new(
                    "default",
                    "src",
                    vec![ColumnDefinition::new("key", DataType::Int)],
                )
                .with_property("totalSize", "5812")
                .with_property("numRows", "500"),
            )
            .unwrap();
        (catalog.clone(), CatalogStatsProvider::new(catalog))
    }

    #[test]
    fn row_count_requires_collection_and_cbo() {
        let (catalog, provider) = provider();
        let table = TableRef::new("default", "src");

        assert_eq!(Stats::size_only(5812), provider.lookup_stats(&table, true).unwrap());

        catalog.collect_statistics(&table, DEFAULT_DATABASE).unwrap();
        assert_eq!(Stats::new(5812, Some(500)), provider.lookup_stats(&table, true).unwrap());
        assert_eq!(Stats::size_only(5812), provider.lookup_stats(&table, false).unwrap());

        catalog.refresh_table(&table, DEFAULT_DATABASE).unwrap();
        assert_eq!(Stats::size_only(5812), provider.lookup_stats(&table, true).unwrap());
    }

    #[test]
    fn missing_table_fails() {
        let (_, provider) = provider();
        let err = provider
            .lookup_stats(&TableRef::new("default", "nope"), false)
            .unwrap_err();
        assert_eq!(planscope_error::ErrorKind::Statistics, err.kind());
    }
}
