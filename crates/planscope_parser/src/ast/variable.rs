use planscope_error::Result;
use serde::{Deserialize, Serialize};

use super::{AstParseable, Expr, ObjectReference};
use crate::keywords::Keyword;
use crate::parser::Parser;
use crate::tokens::Token;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetVariable {
    pub reference: ObjectReference,
    pub value: Expr,
}

impl AstParseable for SetVariable {
    fn parse(parser: &mut Parser) -> Result<Self> {
        parser.expect_keyword(Keyword::SET)?;

        let name = ObjectReference::parse(parser)?;
        if parser.parse_keyword(Keyword::TO) || parser.consume_token(&Token::Eq) {
            let expr = Expr::parse(parser)?;
            return Ok(SetVariable {
                reference: name,
                value: expr,
            });
        }

        Err(parser.error_at_current(format!(
            "Expected 'SET {name} TO <value>' or 'SET {name} = <value>'"
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowVariable {
    pub reference: ObjectReference,
}

impl AstParseable for ShowVariable {
    fn parse(parser: &mut Parser) -> Result<Self> {
        parser.expect_keyword(Keyword::SHOW)?;
        let name = ObjectReference::parse(parser)?;
        Ok(ShowVariable { reference: name })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetVariable {
    pub reference: ObjectReference,
}

impl AstParseable for ResetVariable {
    fn parse(parser: &mut Parser) -> Result<Self> {
        parser.expect_keyword(Keyword::RESET)?;
        let name = ObjectReference::parse(parser)?;
        Ok(ResetVariable { reference: name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Literal;
    use crate::ast::testutil::parse_ast;

    #[test]
    fn set_to_and_eq() {
        let set: SetVariable = parse_ast("SET enable_cbo TO true").unwrap();
        assert_eq!("enable_cbo", set.reference.to_string());
        assert_eq!(Expr::Literal(Literal::Boolean(true)), set.value);

        let set: SetVariable = parse_ast("SET enable_cbo = false").unwrap();
        assert_eq!(Expr::Literal(Literal::Boolean(false)), set.value);
    }

    #[test]
    fn set_missing_value() {
        parse_ast::<SetVariable>("SET enable_cbo").unwrap_err();
    }

    #[test]
    fn show_and_reset() {
        let show: ShowVariable = parse_ast("SHOW enable_cbo").unwrap();
        assert_eq!("enable_cbo", show.reference.to_string());
        let reset: ResetVariable = parse_ast("RESET enable_cbo").unwrap();
        assert_eq!("enable_cbo", reset.reference.to_string());
    }
}
