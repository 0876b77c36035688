use serde::Serialize;

use crate::explain::RenderedExplain;

/// Result of running a single statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    /// Kind of statement that produced this result, e.g. `EXPLAIN`.
    pub statement_kind: &'static str,
    /// Rows of a single string column.
    pub lines: Vec<String>,
    /// Structured output for `EXPLAIN`.
    pub explain: Option<RenderedExplain>,
}

impl QueryResult {
    pub fn empty(statement_kind: &'static str) -> Self {
        QueryResult {
            statement_kind,
            lines: Vec::new(),
            explain: None,
        }
    }

    pub fn with_lines(statement_kind: &'static str, lines: Vec<String>) -> Self {
        QueryResult {
            statement_kind,
            lines,
            explain: None,
        }
    }
}
