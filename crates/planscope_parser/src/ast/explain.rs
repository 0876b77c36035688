use std::fmt;

use planscope_error::{ExplainError, Result, Span};
use serde::{Deserialize, Serialize};

use super::AstParseable;
use crate::keywords::Keyword;
use crate::parser::Parser;
use crate::statement::Statement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExplainModifier {
    Extended,
    Cost,
    Codegen,
}

impl ExplainModifier {
    fn from_keyword(keyword: Keyword) -> Option<Self> {
        match keyword {
            Keyword::EXTENDED => Some(Self::Extended),
            Keyword::COST => Some(Self::Cost),
            Keyword::CODEGEN => Some(Self::Codegen),
            _ => None,
        }
    }
}

impl fmt::Display for ExplainModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extended => write!(f, "EXTENDED"),
            Self::Cost => write!(f, "COST"),
            Self::Codegen => write!(f, "CODEGEN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainNode {
    /// Modifiers in the order they were written.
    pub modifiers: Vec<ExplainModifier>,
    pub body: Box<Statement>,
    /// Source text of the body statement.
    pub body_sql: String,
    /// Where the body starts in the full source text.
    pub body_span: Span,
}

impl AstParseable for ExplainNode {
    fn parse(parser: &mut Parser) -> Result<Self> {
        parser.expect_keyword(Keyword::EXPLAIN)?;

        let mut modifiers = Vec::new();
        while let Some(modifier) = parser
            .peek()
            .and_then(|tok| tok.keyword())
            .and_then(ExplainModifier::from_keyword)
        {
            parser.next();
            modifiers.push(modifier);
        }

        let (offset, body_span) = match parser.peek() {
            Some(tok) => (tok.offset, tok.span()),
            None => return Err(parser.error_at_current("Expected statement after EXPLAIN")),
        };

        let body = match parser.parse_statement()? {
            body @ (Statement::Query(_) | Statement::Insert(_)) => body,
            Statement::CreateTable(create) if create.source.is_some() => {
                Statement::CreateTable(create)
            }
            other => {
                return Err(ExplainError::parse(format!(
                    "Unexpected body in EXPLAIN: {}",
                    other.kind_name()
                )));
            }
        };

        Ok(ExplainNode {
            modifiers,
            body: Box::new(body),
            body_sql: parser.statement_source_from(offset).to_string(),
            body_span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::testutil::parse_ast;

    #[test]
    fn no_modifiers() {
        let explain: ExplainNode = parse_ast("EXPLAIN SELECT * FROM src WHERE key=123").unwrap();
        assert!(explain.modifiers.is_empty());
        assert!(matches!(*explain.body, Statement::Query(_)));
        assert_eq!("SELECT * FROM src WHERE key=123", explain.body_sql);
        assert_eq!(Span::new(1, 9), explain.body_span);
    }

    #[test]
    fn body_span_on_later_line() {
        let explain: ExplainNode = parse_ast("EXPLAIN COST\n  SELECT 1").unwrap();
        assert_eq!(Span::new(2, 3), explain.body_span);
    }

    #[test]
    fn single_modifier() {
        let explain: ExplainNode = parse_ast("explain extended select 1").unwrap();
        assert_eq!(vec![ExplainModifier::Extended], explain.modifiers);

        let explain: ExplainNode = parse_ast("explain cost select 1").unwrap();
        assert_eq!(vec![ExplainModifier::Cost], explain.modifiers);

        let explain: ExplainNode = parse_ast("explain codegen select 1").unwrap();
        assert_eq!(vec![ExplainModifier::Codegen], explain.modifiers);
    }

    #[test]
    fn modifiers_kept_in_order() {
        let explain: ExplainNode = parse_ast("EXPLAIN CODEGEN EXTENDED SELECT 1").unwrap();
        assert_eq!(
            vec![ExplainModifier::Codegen, ExplainModifier::Extended],
            explain.modifiers
        );
    }

    #[test]
    fn body_sql_stops_at_semicolon() {
        let explain: ExplainNode = parse_ast("EXPLAIN COST SELECT key FROM src ; ").unwrap();
        assert_eq!("SELECT key FROM src", explain.body_sql);
    }

    #[test]
    fn ctas_body() {
        let explain: ExplainNode =
            parse_ast("EXPLAIN EXTENDED CREATE TABLE t AS SELECT * FROM src LIMIT 1").unwrap();
        assert!(matches!(*explain.body, Statement::CreateTable(_)));
    }

    #[test]
    fn missing_body() {
        parse_ast::<ExplainNode>("EXPLAIN EXTENDED").unwrap_err();
    }

    #[test]
    fn nested_explain_rejected() {
        let err = parse_ast::<ExplainNode>("EXPLAIN EXPLAIN SELECT 1").unwrap_err();
        assert!(err.message().contains("Unexpected body"), "{err}");
    }

    #[test]
    fn plain_create_table_rejected() {
        parse_ast::<ExplainNode>("EXPLAIN CREATE TABLE t (a INT)").unwrap_err();
    }
}
