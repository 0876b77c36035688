pub mod create_table;
pub use create_table::*;
pub mod datatype;
pub use datatype::*;
pub mod explain;
pub use explain::*;
pub mod expr;
pub use expr::*;
pub mod from;
pub use from::*;
pub mod insert;
pub use insert::*;
pub mod query;
pub use query::*;
pub mod statistics;
pub use statistics::*;
pub mod variable;
pub use variable::*;

use std::fmt;

use planscope_error::{ExplainError, Result, Span};
use serde::{Deserialize, Serialize};

use crate::parser::Parser;
use crate::tokens::Token;

pub trait AstParseable: Sized {
    /// Parse an instance of Self from the provided parser.
    ///
    /// It's assumed that the parser is in the correct state for parsing Self,
    /// and if it isn't, an error should be returned.
    fn parse(parser: &mut Parser) -> Result<Self>;
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::tokens::Tokenizer;

    /// Parse an AST node directly from a string.
    pub(crate) fn parse_ast<A: AstParseable>(s: &str) -> Result<A> {
        let toks = Tokenizer::new(s).tokenize()?;
        let mut parser = Parser::with_tokens(s, toks);
        A::parse(&mut parser)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ident {
    pub value: String,
    pub quoted: bool,
    pub span: Option<Span>,
}

impl Ident {
    pub fn new(s: impl Into<String>) -> Self {
        Ident {
            value: s.into(),
            quoted: false,
            span: None,
        }
    }

    /// Value of the identifier as it should be used for lookups.
    ///
    /// Unquoted identifiers are case-insensitive and normalized to lowercase.
    pub fn as_normalized_string(&self) -> String {
        if self.quoted {
            self.value.clone()
        } else {
            self.value.to_lowercase()
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

impl AstParseable for Ident {
    fn parse(parser: &mut Parser) -> Result<Self> {
        let tok = match parser.next() {
            Some(tok) => tok,
            None => {
                return Err(ExplainError::parse(
                    "Expected identifier, found end of statement",
                ));
            }
        };

        match &tok.token {
            Token::Word(w) => Ok(Ident {
                value: w.value.clone(),
                quoted: w.quote.is_some(),
                span: Some(tok.span()),
            }),
            other => Err(ExplainError::parse_at(
                format!("Unexpected token: {other:?}. Expected an identifier."),
                tok.span(),
            )),
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Possibly qualified reference to an object, e.g. `db.table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectReference(pub Vec<Ident>);

impl ObjectReference {
    /// Create an object from an iterator of strings.
    ///
    /// Useful in tests, probably unlikely that it should be used anywhere else.
    pub fn from_strings<S: Into<String>>(strings: impl IntoIterator<Item = S>) -> Self {
        ObjectReference(strings.into_iter().map(Ident::new).collect())
    }

    pub fn base(&self) -> Result<&Ident> {
        self.0
            .last()
            .ok_or_else(|| ExplainError::parse("Empty object reference"))
    }

    pub fn span(&self) -> Option<Span> {
        self.0.first().and_then(|ident| ident.span)
    }

    pub fn normalized_parts(&self) -> Vec<String> {
        self.0.iter().map(|i| i.as_normalized_string()).collect()
    }
}

impl AstParseable for ObjectReference {
    fn parse(parser: &mut Parser) -> Result<Self> {
        let mut idents = vec![Ident::parse(parser)?];
        while parser.consume_token(&Token::Period) {
            idents.push(Ident::parse(parser)?);
        }
        Ok(ObjectReference(idents))
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strings: Vec<_> = self.0.iter().map(|ident| ident.value.as_str()).collect();
        write!(f, "{}", strings.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::parse_ast;
    use super::*;

    #[test]
    fn compound_reference() {
        let reference: ObjectReference = parse_ast("db.\"My Table\"").unwrap();
        assert_eq!(vec!["db".to_string(), "My Table".to_string()], reference.normalized_parts());
        assert_eq!("db.My Table", reference.to_string());
    }

    #[test]
    fn unquoted_normalized() {
        let ident: Ident = parse_ast("SRC").unwrap();
        assert_eq!("src", ident.as_normalized_string());
        assert_eq!(Some(Span::new(1, 1)), ident.span);
    }
}
