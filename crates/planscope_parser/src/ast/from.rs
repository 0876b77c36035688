use planscope_error::Result;
use serde::{Deserialize, Serialize};

use super::{AstParseable, Expr, Ident, ObjectReference, QueryNode};
use crate::keywords::{Keyword, RESERVED_FOR_TABLE_ALIAS};
use crate::parser::Parser;
use crate::tokens::Token;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FromNode {
    pub alias: Option<Ident>,
    pub body: FromNodeBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FromNodeBody {
    BaseTable(FromBaseTable),
    Subquery(FromSubquery),
    Join(FromJoin),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FromBaseTable {
    pub reference: ObjectReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FromSubquery {
    pub query: Box<QueryNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Cross,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FromJoin {
    pub left: Box<FromNode>,
    pub right: Box<FromNode>,
    pub join_type: JoinType,
    pub condition: Option<Expr>,
}

impl AstParseable for FromNode {
    fn parse(parser: &mut Parser) -> Result<Self> {
        let mut node = Self::parse_base(parser)?;

        // Joins are left-associative, keep folding the right side into the
        // node built so far.
        loop {
            let join_type = if parser.consume_token(&Token::Comma) {
                // <left>, <right>
                JoinType::Cross
            } else if parser.parse_keyword_sequence(&[Keyword::CROSS, Keyword::JOIN]) {
                JoinType::Cross
            } else if parser.parse_keyword_sequence(&[Keyword::INNER, Keyword::JOIN])
                || parser.parse_keyword(Keyword::JOIN)
            {
                JoinType::Inner
            } else {
                return Ok(node);
            };

            let right = Self::parse_base(parser)?;

            let condition = if join_type == JoinType::Inner && parser.parse_keyword(Keyword::ON) {
                Some(Expr::parse(parser)?)
            } else {
                None
            };

            node = FromNode {
                alias: None,
                body: FromNodeBody::Join(FromJoin {
                    left: Box::new(node),
                    right: Box::new(right),
                    join_type,
                    condition,
                }),
            };
        }
    }
}

impl FromNode {
    /// Parse a single table reference or derived table, without any joins.
    fn parse_base(parser: &mut Parser) -> Result<Self> {
        let body = if parser.consume_token(&Token::LeftParen) {
            // `FROM (SELECT * FROM my_table) AS alias`
            let query = QueryNode::parse(parser)?;
            parser.expect_token(&Token::RightParen)?;
            FromNodeBody::Subquery(FromSubquery {
                query: Box::new(query),
            })
        } else {
            FromNodeBody::BaseTable(FromBaseTable {
                reference: ObjectReference::parse(parser)?,
            })
        };

        let alias = parser.parse_alias(RESERVED_FOR_TABLE_ALIAS)?;
        Ok(FromNode { alias, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::testutil::parse_ast;

    fn table_name(node: &FromNode) -> String {
        match &node.body {
            FromNodeBody::BaseTable(t) => t.reference.to_string(),
            other => panic!("not a base table: {other:?}"),
        }
    }

    #[test]
    fn base_table_with_alias() {
        let node: FromNode = parse_ast("db.src AS s").unwrap();
        assert_eq!("db.src", table_name(&node));
        assert_eq!("s", node.alias.unwrap().value);
    }

    #[test]
    fn inner_join_on() {
        let node: FromNode = parse_ast("a JOIN b ON a.key = b.key").unwrap();
        match node.body {
            FromNodeBody::Join(join) => {
                assert_eq!(JoinType::Inner, join.join_type);
                assert_eq!("a", table_name(&join.left));
                assert_eq!("b", table_name(&join.right));
                assert!(join.condition.is_some());
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn comma_join_is_cross() {
        let node: FromNode = parse_ast("a, b, c").unwrap();
        match node.body {
            FromNodeBody::Join(join) => {
                assert_eq!(JoinType::Cross, join.join_type);
                assert_eq!("c", table_name(&join.right));
                assert!(matches!(join.left.body, FromNodeBody::Join(_)));
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn derived_table() {
        let node: FromNode = parse_ast("(SELECT key FROM src) t").unwrap();
        assert!(matches!(node.body, FromNodeBody::Subquery(_)));
        assert_eq!("t", node.alias.unwrap().value);
    }
}
