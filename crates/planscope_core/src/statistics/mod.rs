//! Size and row count facts attached to plan nodes for cost display.
pub mod annotator;
pub mod provider;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use annotator::StatsAnnotator;
pub use provider::CatalogStatsProvider;

pub mod assumptions {
    //! Assumptions when we don't have complete statistics available to us.

    /// Selectivity with '='.
    pub const EQUALITY_SELECTIVITY: f64 = 0.1;
    /// Selectivity with other comparison operators like '<', '>', '!=' etc.
    pub const INEQUALITY_SELECTIVITY: f64 = 0.3;
    /// Default selectivity to use if neither of the above apply.
    pub const DEFAULT_SELECTIVITY: f64 = 0.2;
}

/// Statistics for a single plan node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Always known once cost display is requested.
    pub size_in_bytes: u64,
    /// Only known when CBO is enabled and statistics were collected.
    pub row_count: Option<u64>,
}

impl Stats {
    pub const fn new(size_in_bytes: u64, row_count: Option<u64>) -> Self {
        Stats {
            size_in_bytes,
            row_count,
        }
    }

    pub const fn size_only(size_in_bytes: u64) -> Self {
        Stats {
            size_in_bytes,
            row_count: None,
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Statistics(sizeInBytes={}", self.size_in_bytes)?;
        if let Some(row_count) = self.row_count {
            write!(f, ", rowCount={row_count}")?;
        }
        write!(f, ")")
    }
}
