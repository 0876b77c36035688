use std::fmt;

use planscope_error::{ExplainError, Result};
use serde::{Deserialize, Serialize};

use super::AstParseable;
use crate::keywords::Keyword;
use crate::parser::Parser;

/// Column type as written in a CREATE TABLE statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AstDataType {
    Int,
    BigInt,
    Double,
    Boolean,
    String,
}

impl AstParseable for AstDataType {
    fn parse(parser: &mut Parser) -> Result<Self> {
        let tok = match parser.next() {
            Some(tok) => tok,
            None => {
                return Err(ExplainError::parse(
                    "Expected a data type, found end of statement",
                ));
            }
        };

        let datatype = match tok.keyword() {
            Some(Keyword::INT) | Some(Keyword::INTEGER) => AstDataType::Int,
            Some(Keyword::BIGINT) => AstDataType::BigInt,
            Some(Keyword::DOUBLE) => AstDataType::Double,
            Some(Keyword::BOOLEAN) => AstDataType::Boolean,
            Some(Keyword::STRING) => AstDataType::String,
            _ => {
                return Err(ExplainError::parse_at(
                    format!("Unsupported data type: {:?}", tok.token),
                    tok.span(),
                ));
            }
        };

        Ok(datatype)
    }
}

impl fmt::Display for AstDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::String => "string",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::testutil::parse_ast;

    #[test]
    fn int_aliases() {
        assert_eq!(AstDataType::Int, parse_ast::<AstDataType>("INT").unwrap());
        assert_eq!(AstDataType::Int, parse_ast::<AstDataType>("integer").unwrap());
    }

    #[test]
    fn unsupported() {
        let err = parse_ast::<AstDataType>("varchar").unwrap_err();
        assert!(err.message().contains("Unsupported data type"), "{err}");
    }
}
