use planscope_error::{ExplainError, Result};
use serde::{Deserialize, Serialize};

use super::{AstParseable, Expr, FromNode, Ident, ObjectReference};
use crate::keywords::{Keyword, RESERVED_FOR_COLUMN_ALIAS};
use crate::parser::Parser;
use crate::tokens::Token;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryNode {
    pub body: SelectNode,
    /// LIMIT
    pub limit: Option<Expr>,
}

impl AstParseable for QueryNode {
    fn parse(parser: &mut Parser) -> Result<Self> {
        parser.expect_keyword(Keyword::SELECT)?;
        let body = SelectNode::parse(parser)?;

        let limit = if parser.parse_keyword(Keyword::LIMIT) {
            Some(Expr::parse(parser)?)
        } else {
            None
        };

        Ok(QueryNode { body, limit })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectNode {
    /// Projection list. May included wildcards.
    pub projections: Vec<SelectExpr>,
    /// FROM
    pub from: Option<FromNode>,
    /// WHERE
    pub where_expr: Option<Expr>,
    /// GROUP BY
    pub group_by: Vec<Expr>,
}

impl AstParseable for SelectNode {
    fn parse(parser: &mut Parser) -> Result<Self> {
        // Select list
        let projections = parser.parse_comma_separated(SelectExpr::parse)?;

        // FROM
        let from = if parser.parse_keyword(Keyword::FROM) {
            Some(FromNode::parse(parser)?)
        } else {
            None
        };

        // WHERE
        let where_expr = if parser.parse_keyword(Keyword::WHERE) {
            Some(Expr::parse(parser)?)
        } else {
            None
        };

        // GROUP BY
        let group_by = if parser.parse_keyword_sequence(&[Keyword::GROUP, Keyword::BY]) {
            parser.parse_comma_separated(Expr::parse)?
        } else {
            Vec::new()
        };

        Ok(SelectNode {
            projections,
            from,
            where_expr,
            group_by,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectExpr {
    /// An unaliased expression.
    Expr(Expr),
    /// An aliased expression.
    ///
    /// `<expr> AS <ident>`
    AliasedExpr(Expr, Ident),
    /// A qualified wild card.
    ///
    /// `<reference>.*`
    QualifiedWildcard(ObjectReference),
    /// An unqualifed wild card.
    Wildcard,
}

impl AstParseable for SelectExpr {
    fn parse(parser: &mut Parser) -> Result<Self> {
        // Needed for resetting the position if this is just an expression.
        let idx = parser.idx;

        let tok = match parser.next() {
            Some(tok) => tok.clone(),
            None => {
                return Err(ExplainError::parse(
                    "Expected select expression, found end of statement",
                ));
            }
        };

        // `*`
        if tok.token == Token::Mul {
            return Ok(SelectExpr::Wildcard);
        }

        // Possibly qualified wildcard.
        //
        // `table.*`
        if let Token::Word(w) = &tok.token {
            let mut idents = vec![Ident {
                value: w.value.clone(),
                quoted: w.quote.is_some(),
                span: Some(tok.span()),
            }];

            while parser.consume_token(&Token::Period) {
                if parser.consume_token(&Token::Mul) {
                    return Ok(SelectExpr::QualifiedWildcard(ObjectReference(idents)));
                }
                idents.push(Ident::parse(parser)?);
            }
        }

        // None of the above. Parse as an expression.
        parser.idx = idx;
        let expr = Expr::parse(parser)?;
        match parser.parse_alias(RESERVED_FOR_COLUMN_ALIAS)? {
            Some(alias) => Ok(SelectExpr::AliasedExpr(expr, alias)),
            None => Ok(SelectExpr::Expr(expr)),
        }
    }
}
