use planscope_error::Result;
use serde::{Deserialize, Serialize};

use super::{AstParseable, ObjectReference};
use crate::keywords::Keyword;
use crate::parser::Parser;

/// `ANALYZE TABLE <table> COMPUTE STATISTICS`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeTable {
    pub table: ObjectReference,
}

impl AstParseable for AnalyzeTable {
    fn parse(parser: &mut Parser) -> Result<Self> {
        parser.expect_keyword_sequence(&[Keyword::ANALYZE, Keyword::TABLE])?;
        let table = ObjectReference::parse(parser)?;
        parser.expect_keyword_sequence(&[Keyword::COMPUTE, Keyword::STATISTICS])?;
        Ok(AnalyzeTable { table })
    }
}

/// `REFRESH TABLE <table>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTable {
    pub table: ObjectReference,
}

impl AstParseable for RefreshTable {
    fn parse(parser: &mut Parser) -> Result<Self> {
        parser.expect_keyword_sequence(&[Keyword::REFRESH, Keyword::TABLE])?;
        let table = ObjectReference::parse(parser)?;
        Ok(RefreshTable { table })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::testutil::parse_ast;

    #[test]
    fn analyze_compute_statistics() {
        let analyze: AnalyzeTable = parse_ast("ANALYZE TABLE src COMPUTE STATISTICS").unwrap();
        assert_eq!("src", analyze.table.to_string());
    }

    #[test]
    fn analyze_missing_compute() {
        parse_ast::<AnalyzeTable>("ANALYZE TABLE src").unwrap_err();
    }

    #[test]
    fn refresh() {
        let refresh: RefreshTable = parse_ast("refresh table default.src").unwrap();
        assert_eq!("default.src", refresh.table.to_string());
    }
}
