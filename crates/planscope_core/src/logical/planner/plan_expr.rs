use planscope_error::{ExplainError, Result, internal};
use planscope_parser::ast::{self, Expr, FunctionArg, Literal, SelectExpr};

use crate::plan::{AggregateFunction, BinaryOperator, Expression, ScalarValue, UnaryOperator};

/// Plans AST expressions into unresolved expressions.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionPlanner;

impl ExpressionPlanner {
    pub fn plan_select_expr(&self, expr: SelectExpr) -> Result<Expression> {
        Ok(match expr {
            SelectExpr::Expr(expr) => self.plan_expr(expr)?,
            SelectExpr::AliasedExpr(expr, alias) => Expression::Alias {
                child: Box::new(self.plan_expr(expr)?),
                name: alias.as_normalized_string(),
                id: None,
            },
            SelectExpr::QualifiedWildcard(reference) => Expression::UnresolvedStar {
                qualifier: Some(reference.base()?.as_normalized_string()),
            },
            SelectExpr::Wildcard => Expression::UnresolvedStar { qualifier: None },
        })
    }

    pub fn plan_expr(&self, expr: Expr) -> Result<Expression> {
        let span = expr.span();
        Ok(match expr {
            Expr::Ident(ident) => Expression::UnresolvedAttribute {
                parts: vec![ident.as_normalized_string()],
                span,
            },
            Expr::CompoundIdent(idents) => Expression::UnresolvedAttribute {
                parts: idents.iter().map(|i| i.as_normalized_string()).collect(),
                span,
            },
            Expr::Literal(literal) => Expression::Literal(self.plan_literal(literal)?),
            Expr::UnaryExpr {
                op: ast::UnaryOperator::Minus,
                expr,
            } if matches!(*expr, Expr::Literal(Literal::Number(_))) => {
                // Negative number literals are literals. `-9223372036854775808`
                // only fits once the sign is included.
                match *expr {
                    Expr::Literal(Literal::Number(s)) => {
                        Expression::Literal(ScalarValue::parse_number(&format!("-{s}"))?)
                    }
                    other => return Err(internal!("Expected number literal, got {other:?}")),
                }
            }
            Expr::UnaryExpr { op, expr } => {
                let expr = self.plan_expr(*expr)?;
                match (op, expr) {
                    (ast::UnaryOperator::Minus, Expression::Literal(ScalarValue::Int32(v))) => {
                        match v.checked_neg() {
                            Some(v) => Expression::lit(v),
                            None => Expression::lit(-i64::from(v)),
                        }
                    }
                    (ast::UnaryOperator::Minus, Expression::Literal(ScalarValue::Int64(v))) => {
                        match v.checked_neg() {
                            Some(v) => Expression::lit(v),
                            None => Expression::Unary {
                                op: UnaryOperator::Negate,
                                expr: Box::new(Expression::lit(v)),
                            },
                        }
                    }
                    (ast::UnaryOperator::Minus, Expression::Literal(ScalarValue::Float64(v))) => {
                        Expression::Literal(ScalarValue::Float64(-v))
                    }
                    (ast::UnaryOperator::Minus, expr) => Expression::Unary {
                        op: UnaryOperator::Negate,
                        expr: Box::new(expr),
                    },
                    (ast::UnaryOperator::Not, expr) => Expression::Unary {
                        op: UnaryOperator::Not,
                        expr: Box::new(expr),
                    },
                }
            }
            Expr::BinaryExpr { left, op, right } => Expression::binary(
                BinaryOperator::from(op),
                self.plan_expr(*left)?,
                self.plan_expr(*right)?,
            ),
            Expr::Function(func) => {
                let name = func.name.as_normalized_string();
                let args = func
                    .args
                    .into_iter()
                    .map(|arg| match arg {
                        FunctionArg::Expr(expr) => self.plan_expr(expr),
                        // `count(*)` counts rows, same as `count(1)`.
                        FunctionArg::Wildcard if name == "count" => Ok(Expression::lit(1)),
                        FunctionArg::Wildcard => Err(wildcard_error(&name, span)),
                    })
                    .collect::<Result<Vec<_>>>()?;

                Expression::UnresolvedFunction { name, args, span }
            }
            Expr::Nested(expr) => self.plan_expr(*expr)?,
        })
    }

    fn plan_literal(&self, literal: Literal) -> Result<ScalarValue> {
        Ok(match literal {
            Literal::Number(s) => ScalarValue::parse_number(&s)?,
            Literal::SingleQuotedString(s) => ScalarValue::Utf8(s),
            Literal::Boolean(b) => ScalarValue::Boolean(b),
            Literal::Null => ScalarValue::Null,
        })
    }
}

fn wildcard_error(name: &str, span: Option<planscope_error::Span>) -> ExplainError {
    let msg = format!("Wildcard argument is only supported for count, got {name}(*)");
    match span {
        Some(span) => ExplainError::parse_at(msg, span),
        None => ExplainError::parse(msg),
    }
}

/// Check if an unresolved expression calls an aggregate function.
pub fn calls_aggregate(expr: &Expression) -> bool {
    match expr {
        Expression::UnresolvedFunction { name, .. }
            if AggregateFunction::from_name(name).is_some() =>
        {
            true
        }
        other => other.children().any(calls_aggregate),
    }
}
