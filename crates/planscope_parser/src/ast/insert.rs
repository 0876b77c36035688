use planscope_error::Result;
use serde::{Deserialize, Serialize};

use super::{AstParseable, ObjectReference, QueryNode};
use crate::keywords::Keyword;
use crate::parser::Parser;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insert {
    pub table: ObjectReference,
    pub source: QueryNode,
}

impl AstParseable for Insert {
    fn parse(parser: &mut Parser) -> Result<Self> {
        parser.expect_keyword(Keyword::INSERT)?;
        parser.expect_keyword(Keyword::INTO)?;
        // Optional TABLE, `INSERT INTO TABLE t SELECT ...`
        parser.parse_keyword(Keyword::TABLE);

        let table = ObjectReference::parse(parser)?;
        let source = QueryNode::parse(parser)?;

        Ok(Insert { table, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::testutil::parse_ast;

    #[test]
    fn insert_select() {
        let insert: Insert = parse_ast("INSERT INTO dst SELECT key FROM src").unwrap();
        assert_eq!("dst", insert.table.to_string());
        assert!(insert.source.body.from.is_some());
    }

    #[test]
    fn insert_into_table() {
        let insert: Insert = parse_ast("INSERT INTO TABLE db.dst SELECT 1").unwrap();
        assert_eq!("db.dst", insert.table.to_string());
    }

    #[test]
    fn insert_requires_query() {
        parse_ast::<Insert>("INSERT INTO dst").unwrap_err();
    }
}
