use planscope_error::{ExplainError, Result};
use serde::{Deserialize, Serialize};

use super::{AstDataType, AstParseable, Ident, ObjectReference, QueryNode};
use crate::keywords::Keyword;
use crate::parser::Parser;
use crate::tokens::Token;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: Ident,
    pub datatype: AstDataType,
}

impl AstParseable for ColumnDef {
    fn parse(parser: &mut Parser) -> Result<Self> {
        let name = Ident::parse(parser)?;
        let datatype = AstDataType::parse(parser)?;
        Ok(ColumnDef { name, datatype })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTable {
    pub name: ObjectReference,
    pub columns: Vec<ColumnDef>,
    /// `STORED AS <format>`
    pub stored_as: Option<Ident>,
    /// `TBLPROPERTIES ('key' = 'value', ...)`
    pub properties: Vec<(String, String)>,
    /// `AS SELECT ...`
    pub source: Option<QueryNode>,
}

impl AstParseable for CreateTable {
    fn parse(parser: &mut Parser) -> Result<Self> {
        parser.expect_keyword_sequence(&[Keyword::CREATE, Keyword::TABLE])?;
        let name = ObjectReference::parse(parser)?;

        let columns = if parser.consume_token(&Token::LeftParen) {
            let columns = parser.parse_comma_separated(ColumnDef::parse)?;
            parser.expect_token(&Token::RightParen)?;
            columns
        } else {
            Vec::new()
        };

        let stored_as = if parser.parse_keyword_sequence(&[Keyword::STORED, Keyword::AS]) {
            Some(Ident::parse(parser)?)
        } else {
            None
        };

        let properties = if parser.parse_keyword(Keyword::TBLPROPERTIES) {
            parser.expect_token(&Token::LeftParen)?;
            let props = parser.parse_comma_separated(parse_property)?;
            parser.expect_token(&Token::RightParen)?;
            props
        } else {
            Vec::new()
        };

        let source = if parser.parse_keyword(Keyword::AS) {
            Some(QueryNode::parse(parser)?)
        } else {
            None
        };

        if columns.is_empty() && source.is_none() {
            return Err(parser.error_at_current(format!(
                "Expected a column list or AS SELECT for table {name}"
            )));
        }

        if !columns.is_empty() && source.is_some() {
            return Err(ExplainError::parse(
                "CREATE TABLE AS SELECT cannot specify a column list",
            ));
        }

        Ok(CreateTable {
            name,
            columns,
            stored_as,
            properties,
            source,
        })
    }
}

/// Parse `'key' = 'value'`. Numeric values are accepted unquoted.
fn parse_property(parser: &mut Parser) -> Result<(String, String)> {
    let key = parse_property_part(parser)?;
    parser.expect_token(&Token::Eq)?;
    let value = parse_property_part(parser)?;
    Ok((key, value))
}

fn parse_property_part(parser: &mut Parser) -> Result<String> {
    let tok = match parser.next() {
        Some(tok) => tok,
        None => {
            return Err(ExplainError::parse(
                "Expected a table property, found end of statement",
            ));
        }
    };

    match &tok.token {
        Token::SingleQuotedString(s) | Token::Number(s) => Ok(s.clone()),
        other => Err(ExplainError::parse_at(
            format!("Expected a quoted table property, found {other:?}"),
            tok.span(),
        )),
    }
}
