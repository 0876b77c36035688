use std::fmt;

use planscope_error::{ExplainError, Result, Span};
use serde::{Deserialize, Serialize};

use super::{AstParseable, Ident};
use crate::keywords::Keyword;
use crate::parser::Parser;
use crate::tokens::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// Minus, e.g. `-9`
    Minus,
    /// Not, e.g. `NOT true`
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    /// Plus, e.g. `a + b`
    Plus,
    /// Minus, e.g. `a - b`
    Minus,
    /// Multiply, e.g. `a * b`
    Multiply,
    /// Divide, e.g. `a / b`
    Divide,
    /// Modulo, e.g. `a % b`
    Modulo,
    /// Greater than, e.g. `a > b`
    Gt,
    /// Less than, e.g. `a < b`
    Lt,
    /// Greater equal, e.g. `a >= b`
    GtEq,
    /// Less equal, e.g. `a <= b`
    LtEq,
    /// Equal, e.g. `a = b`
    Eq,
    /// Not equal, e.g. `a <> b`
    NotEq,
    /// And, e.g. `a AND b`
    And,
    /// Or, e.g. `a OR b`
    Or,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::GtEq => ">=",
            Self::LtEq => "<=",
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::And => "AND",
            Self::Or => "OR",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Literal {
    /// Unparsed number literal.
    Number(String),
    /// String literal.
    SingleQuotedString(String),
    /// Boolean literal.
    Boolean(bool),
    /// Null literal
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionArg {
    Expr(Expr),
    /// `*` as in `count(*)`.
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Function {
    pub name: Ident,
    pub args: Vec<FunctionArg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// Column or table identifier.
    Ident(Ident),
    /// Compound identifier.
    ///
    /// `table.col`
    CompoundIdent(Vec<Ident>),
    /// An expression literal,
    Literal(Literal),
    /// A unary expression.
    UnaryExpr {
        op: UnaryOperator,
        expr: Box<Expr>,
    },
    /// A binary expression.
    BinaryExpr {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    /// A function call.
    Function(Function),
    /// Parenthesized expression.
    Nested(Box<Expr>),
}

impl AstParseable for Expr {
    fn parse(parser: &mut Parser) -> Result<Self> {
        Self::parse_subexpr(parser, 0)
    }
}

const OR_PREC: u8 = 5;
const AND_PREC: u8 = 10;
const NOT_PREC: u8 = 15;
const CMP_PREC: u8 = 20;
const PLUS_MINUS_PREC: u8 = 30;
const MUL_DIV_MOD_PREC: u8 = 40;
const UNARY_MINUS_PREC: u8 = 50;

impl Expr {
    /// Span of the first token making up this expression, if known.
    pub fn span(&self) -> Option<Span> {
        match self {
            Expr::Ident(ident) => ident.span,
            Expr::CompoundIdent(idents) => idents.first().and_then(|i| i.span),
            Expr::Function(func) => func.name.span,
            Expr::UnaryExpr { expr, .. } => expr.span(),
            Expr::BinaryExpr { left, .. } => left.span(),
            Expr::Nested(expr) => expr.span(),
            Expr::Literal(_) => None,
        }
    }

    fn parse_subexpr(parser: &mut Parser, precedence: u8) -> Result<Self> {
        let mut expr = Expr::parse_prefix(parser)?;

        loop {
            let next_precedence = Self::get_infix_precedence(parser);
            if precedence >= next_precedence {
                break;
            }

            expr = Self::parse_infix(parser, expr, next_precedence)?;
        }

        Ok(expr)
    }

    fn parse_prefix(parser: &mut Parser) -> Result<Self> {
        let tok = match parser.next() {
            Some(tok) => tok.clone(),
            None => {
                return Err(ExplainError::parse(
                    "Expected prefix expression, found end of statement",
                ));
            }
        };

        let expr = match &tok.token {
            Token::Word(w) => match w.keyword {
                Some(Keyword::TRUE) => Expr::Literal(Literal::Boolean(true)),
                Some(Keyword::FALSE) => Expr::Literal(Literal::Boolean(false)),
                Some(Keyword::NULL) => Expr::Literal(Literal::Null),
                Some(Keyword::NOT) => Expr::UnaryExpr {
                    op: UnaryOperator::Not,
                    expr: Box::new(Expr::parse_subexpr(parser, NOT_PREC)?),
                },
                _ => {
                    let first = Ident {
                        value: w.value.clone(),
                        quoted: w.quote.is_some(),
                        span: Some(tok.span()),
                    };

                    if parser.consume_token(&Token::LeftParen) {
                        Expr::Function(Function {
                            name: first,
                            args: Self::parse_function_args(parser)?,
                        })
                    } else if parser.consume_token(&Token::Period) {
                        let mut idents = vec![first, Ident::parse(parser)?];
                        while parser.consume_token(&Token::Period) {
                            idents.push(Ident::parse(parser)?);
                        }
                        Expr::CompoundIdent(idents)
                    } else {
                        Expr::Ident(first)
                    }
                }
            },
            Token::SingleQuotedString(s) => Expr::Literal(Literal::SingleQuotedString(s.clone())),
            Token::Number(s) => Expr::Literal(Literal::Number(s.clone())),
            Token::Minus => Expr::UnaryExpr {
                op: UnaryOperator::Minus,
                expr: Box::new(Expr::parse_subexpr(parser, UNARY_MINUS_PREC)?),
            },
            Token::LeftParen => {
                let expr = Expr::parse(parser)?;
                parser.expect_token(&Token::RightParen)?;
                Expr::Nested(Box::new(expr))
            }
            other => {
                return Err(ExplainError::parse_at(
                    format!("Unexpected token '{other:?}'. Expected expression."),
                    tok.span(),
                ));
            }
        };

        Ok(expr)
    }

    fn parse_function_args(parser: &mut Parser) -> Result<Vec<FunctionArg>> {
        if parser.consume_token(&Token::RightParen) {
            return Ok(Vec::new());
        }

        let args = parser.parse_comma_separated(|parser| {
            if parser.consume_token(&Token::Mul) {
                Ok(FunctionArg::Wildcard)
            } else {
                Ok(FunctionArg::Expr(Expr::parse(parser)?))
            }
        })?;
        parser.expect_token(&Token::RightParen)?;

        Ok(args)
    }

    fn parse_infix(parser: &mut Parser, prefix: Expr, precedence: u8) -> Result<Self> {
        let tok = match parser.next() {
            Some(tok) => tok.clone(),
            None => {
                return Err(ExplainError::parse(
                    "Expected infix expression, found end of statement",
                ));
            }
        };

        let bin_op: Option<BinaryOperator> = match &tok.token {
            Token::DoubleEq => Some(BinaryOperator::Eq),
            Token::Eq => Some(BinaryOperator::Eq),
            Token::Neq => Some(BinaryOperator::NotEq),
            Token::Gt => Some(BinaryOperator::Gt),
            Token::GtEq => Some(BinaryOperator::GtEq),
            Token::Lt => Some(BinaryOperator::Lt),
            Token::LtEq => Some(BinaryOperator::LtEq),
            Token::Plus => Some(BinaryOperator::Plus),
            Token::Minus => Some(BinaryOperator::Minus),
            Token::Mul => Some(BinaryOperator::Multiply),
            Token::Div => Some(BinaryOperator::Divide),
            Token::Mod => Some(BinaryOperator::Modulo),
            Token::Word(w) => match w.keyword {
                Some(Keyword::AND) => Some(BinaryOperator::And),
                Some(Keyword::OR) => Some(BinaryOperator::Or),
                _ => None,
            },
            _ => None,
        };

        match bin_op {
            Some(op) => Ok(Expr::BinaryExpr {
                left: Box::new(prefix),
                op,
                right: Box::new(Expr::parse_subexpr(parser, precedence)?),
            }),
            None => Err(ExplainError::parse_at(
                format!("Unexpected token in infix expression: {:?}", tok.token),
                tok.span(),
            )),
        }
    }

    /// Get the relative precedence of the next operator.
    ///
    /// Returns 0 if there's no operator following.
    fn get_infix_precedence(parser: &Parser) -> u8 {
        let tok = match parser.peek() {
            Some(tok) => &tok.token,
            None => return 0,
        };

        match tok {
            Token::Word(w) => match w.keyword {
                Some(Keyword::OR) => OR_PREC,
                Some(Keyword::AND) => AND_PREC,
                _ => 0,
            },
            Token::Eq
            | Token::DoubleEq
            | Token::Neq
            | Token::Lt
            | Token::LtEq
            | Token::Gt
            | Token::GtEq => CMP_PREC,
            Token::Plus | Token::Minus => PLUS_MINUS_PREC,
            Token::Mul | Token::Div | Token::Mod => MUL_DIV_MOD_PREC,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::testutil::parse_ast;

    fn ident(s: &str) -> Expr {
        Expr::Ident(Ident::new(s))
    }

    /// Strip spans so expected values can be written without positions.
    fn strip(expr: Expr) -> Expr {
        match expr {
            Expr::Ident(mut i) => {
                i.span = None;
                Expr::Ident(i)
            }
            Expr::CompoundIdent(idents) => Expr::CompoundIdent(
                idents
                    .into_iter()
                    .map(|mut i| {
                        i.span = None;
                        i
                    })
                    .collect(),
            ),
            Expr::UnaryExpr { op, expr } => Expr::UnaryExpr {
                op,
                expr: Box::new(strip(*expr)),
            },
            Expr::BinaryExpr { left, op, right } => Expr::BinaryExpr {
                left: Box::new(strip(*left)),
                op,
                right: Box::new(strip(*right)),
            },
            Expr::Function(mut func) => {
                func.name.span = None;
                func.args = func
                    .args
                    .into_iter()
                    .map(|a| match a {
                        FunctionArg::Expr(e) => FunctionArg::Expr(strip(e)),
                        other => other,
                    })
                    .collect();
                Expr::Function(func)
            }
            Expr::Nested(e) => Expr::Nested(Box::new(strip(*e))),
            lit @ Expr::Literal(_) => lit,
        }
    }

    #[test]
    fn precedence_and_over_or() {
        let got = strip(parse_ast::<Expr>("a OR b AND c").unwrap());
        let expected = Expr::BinaryExpr {
            left: Box::new(ident("a")),
            op: BinaryOperator::Or,
            right: Box::new(Expr::BinaryExpr {
                left: Box::new(ident("b")),
                op: BinaryOperator::And,
                right: Box::new(ident("c")),
            }),
        };
        assert_eq!(expected, got);
    }

    #[test]
    fn precedence_mul_over_plus() {
        let got = strip(parse_ast::<Expr>("1 + key * 2").unwrap());
        let expected = Expr::BinaryExpr {
            left: Box::new(Expr::Literal(Literal::Number("1".to_string()))),
            op: BinaryOperator::Plus,
            right: Box::new(Expr::BinaryExpr {
                left: Box::new(ident("key")),
                op: BinaryOperator::Multiply,
                right: Box::new(Expr::Literal(Literal::Number("2".to_string()))),
            }),
        };
        assert_eq!(expected, got);
    }

    #[test]
    fn count_star() {
        let got = strip(parse_ast::<Expr>("count(*)").unwrap());
        let expected = Expr::Function(Function {
            name: Ident::new("count"),
            args: vec![FunctionArg::Wildcard],
        });
        assert_eq!(expected, got);
    }

    #[test]
    fn compound_ident() {
        let got = strip(parse_ast::<Expr>("s.key = 1").unwrap());
        let expected = Expr::BinaryExpr {
            left: Box::new(Expr::CompoundIdent(vec![Ident::new("s"), Ident::new("key")])),
            op: BinaryOperator::Eq,
            right: Box::new(Expr::Literal(Literal::Number("1".to_string()))),
        };
        assert_eq!(expected, got);
    }

    #[test]
    fn not_binds_looser_than_comparison() {
        let got = strip(parse_ast::<Expr>("NOT key = 1").unwrap());
        let expected = Expr::UnaryExpr {
            op: UnaryOperator::Not,
            expr: Box::new(Expr::BinaryExpr {
                left: Box::new(ident("key")),
                op: BinaryOperator::Eq,
                right: Box::new(Expr::Literal(Literal::Number("1".to_string()))),
            }),
        };
        assert_eq!(expected, got);
    }

    #[test]
    fn ident_span() {
        let got = parse_ast::<Expr>("key + 1").unwrap();
        assert_eq!(Some(Span::new(1, 1)), got.span());
    }
}
