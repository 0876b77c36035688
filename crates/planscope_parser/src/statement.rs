use serde::{Deserialize, Serialize};

use crate::ast::{
    AnalyzeTable,
    CreateTable,
    ExplainNode,
    Insert,
    QueryNode,
    RefreshTable,
    ResetVariable,
    SetVariable,
    ShowVariable,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// EXPLAIN [EXTENDED|COST|CODEGEN] <statement>
    Explain(ExplainNode),

    /// SELECT ...
    Query(QueryNode),

    /// CREATE TABLE ...
    /// CREATE TABLE ... AS SELECT ...
    CreateTable(CreateTable),

    /// INSERT INTO ...
    Insert(Insert),

    /// ANALYZE TABLE <table> COMPUTE STATISTICS
    AnalyzeTable(AnalyzeTable),

    /// REFRESH TABLE <table>
    RefreshTable(RefreshTable),

    /// SET <variable> TO <value>
    SetVariable(SetVariable),

    /// RESET <variable>
    ResetVariable(ResetVariable),

    /// SHOW <variable>
    ShowVariable(ShowVariable),
}

impl Statement {
    /// Short name of the statement kind, used in error messages and logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Explain(_) => "EXPLAIN",
            Self::Query(_) => "SELECT",
            Self::CreateTable(c) if c.source.is_some() => "CREATE TABLE AS SELECT",
            Self::CreateTable(_) => "CREATE TABLE",
            Self::Insert(_) => "INSERT",
            Self::AnalyzeTable(_) => "ANALYZE TABLE",
            Self::RefreshTable(_) => "REFRESH TABLE",
            Self::SetVariable(_) => "SET",
            Self::ResetVariable(_) => "RESET",
            Self::ShowVariable(_) => "SHOW",
        }
    }
}
