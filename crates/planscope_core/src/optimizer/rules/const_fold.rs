use planscope_error::Result;

use crate::context::CompilationContext;
use crate::optimizer::OptimizeRule;
use crate::plan::{BinaryOperator, Expression, PlanNode, ScalarValue, UnaryOperator};

/// Pre-compute expressions made up of only literals.
///
/// Anything that would fail at runtime (overflow, division by zero) is left
/// as is.
#[derive(Debug)]
pub struct ConstFold;

impl OptimizeRule for ConstFold {
    fn name(&self) -> &'static str {
        "const_fold"
    }

    fn optimize(&self, _ctx: &mut CompilationContext, plan: PlanNode) -> Result<PlanNode> {
        plan.transform_up(&mut |node| {
            let PlanNode {
                kind,
                children,
                output,
                extra,
                stats,
            } = node;
            let kind = kind.map_expressions(&mut |expr| expr.transform_up(&mut |e| Ok(fold(e))))?;
            Ok(PlanNode {
                kind,
                children,
                output,
                extra,
                stats,
            })
        })
    }
}

fn fold(expr: Expression) -> Expression {
    match expr {
        Expression::Binary { op, left, right } => match (left.as_ref(), right.as_ref()) {
            (Expression::Literal(l), Expression::Literal(r)) => match fold_binary(op, l, r) {
                Some(v) => Expression::Literal(v),
                None => Expression::Binary { op, left, right },
            },
            _ => Expression::Binary { op, left, right },
        },
        Expression::Unary { op, expr } => match (op, expr.as_ref()) {
            (UnaryOperator::Not, Expression::Literal(ScalarValue::Boolean(b))) => {
                Expression::lit(!b)
            }
            (UnaryOperator::Negate, Expression::Literal(ScalarValue::Int32(v))) => {
                match v.checked_neg() {
                    Some(v) => Expression::lit(v),
                    None => Expression::Unary { op, expr },
                }
            }
            (UnaryOperator::Negate, Expression::Literal(ScalarValue::Int64(v))) => {
                match v.checked_neg() {
                    Some(v) => Expression::lit(v),
                    None => Expression::Unary { op, expr },
                }
            }
            _ => Expression::Unary { op, expr },
        },
        other => other,
    }
}

fn fold_binary(op: BinaryOperator, l: &ScalarValue, r: &ScalarValue) -> Option<ScalarValue> {
    use ScalarValue as S;

    if op.is_logical() {
        let (l, r) = match (l, r) {
            (S::Boolean(l), S::Boolean(r)) => (*l, *r),
            _ => return None,
        };
        return Some(S::Boolean(match op {
            BinaryOperator::And => l && r,
            _ => l || r,
        }));
    }

    if op == BinaryOperator::Divide {
        let (l, r) = (l.as_f64()?, r.as_f64()?);
        if r == 0.0 {
            return None;
        }
        return Some(S::Float64(l / r));
    }

    match (l, r) {
        (S::Int32(a), S::Int32(b)) => match fold_int(op, *a as i64, *b as i64)? {
            Folded::Int(v) => i32::try_from(v).ok().map(S::Int32),
            Folded::Bool(b) => Some(S::Boolean(b)),
        },
        (S::Int32(_) | S::Int64(_), S::Int32(_) | S::Int64(_)) => {
            fold_int(op, l.try_as_i64().ok()?, r.try_as_i64().ok()?).map(|v| match v {
                Folded::Int(v) => S::Int64(v),
                Folded::Bool(b) => S::Boolean(b),
            })
        }
        (a, b) if a.as_f64().is_some() && b.as_f64().is_some() => {
            fold_float(op, a.as_f64()?, b.as_f64()?)
        }
        (S::Utf8(a), S::Utf8(b)) if op.is_comparison() => Some(S::Boolean(compare(op, a, b))),
        (S::Boolean(a), S::Boolean(b)) if op.is_comparison() => {
            Some(S::Boolean(compare(op, a, b)))
        }
        _ => None,
    }
}

enum Folded {
    Int(i64),
    Bool(bool),
}

fn fold_int(op: BinaryOperator, a: i64, b: i64) -> Option<Folded> {
    Some(match op {
        BinaryOperator::Plus => Folded::Int(a.checked_add(b)?),
        BinaryOperator::Minus => Folded::Int(a.checked_sub(b)?),
        BinaryOperator::Multiply => Folded::Int(a.checked_mul(b)?),
        BinaryOperator::Modulo => Folded::Int(a.checked_rem(b)?),
        op if op.is_comparison() => Folded::Bool(compare(op, &a, &b)),
        _ => return None,
    })
}

fn fold_float(op: BinaryOperator, a: f64, b: f64) -> Option<ScalarValue> {
    Some(match op {
        BinaryOperator::Plus => ScalarValue::Float64(a + b),
        BinaryOperator::Minus => ScalarValue::Float64(a - b),
        BinaryOperator::Multiply => ScalarValue::Float64(a * b),
        op if op.is_comparison() => ScalarValue::Boolean(compare(op, &a, &b)),
        _ => return None,
    })
}

fn compare<T: PartialOrd + ?Sized>(op: BinaryOperator, a: &T, b: &T) -> bool {
    match op {
        BinaryOperator::Eq => a == b,
        BinaryOperator::NotEq => a != b,
        BinaryOperator::Lt => a < b,
        BinaryOperator::LtEq => a <= b,
        BinaryOperator::Gt => a > b,
        BinaryOperator::GtEq => a >= b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Attribute, AttributeId, DataType};

    fn lit_binary(
        op: BinaryOperator,
        l: impl Into<ScalarValue>,
        r: impl Into<ScalarValue>,
    ) -> Expression {
        Expression::binary(op, Expression::lit(l), Expression::lit(r))
    }

    #[test]
    fn no_fold_literal() {
        assert_eq!(Expression::lit("a"), fold(Expression::lit("a")));
    }

    #[test]
    fn fold_arithmetic() {
        assert_eq!(Expression::lit(3), fold(lit_binary(BinaryOperator::Plus, 1, 2)));
        assert_eq!(
            Expression::lit(3_i64),
            fold(lit_binary(BinaryOperator::Plus, 1, 2_i64))
        );
        assert_eq!(
            Expression::Literal(ScalarValue::Float64(0.5)),
            fold(lit_binary(BinaryOperator::Divide, 1, 2))
        );
    }

    #[test]
    fn overflow_not_folded() {
        let expr = lit_binary(BinaryOperator::Plus, i32::MAX, 1);
        assert_eq!(expr.clone(), fold(expr));

        let expr = lit_binary(BinaryOperator::Divide, 1, 0);
        assert_eq!(expr.clone(), fold(expr));
    }

    #[test]
    fn negate_min_not_folded() {
        let expr = Expression::Unary {
            op: UnaryOperator::Negate,
            expr: Box::new(Expression::lit(i64::MIN)),
        };
        assert_eq!(expr.clone(), fold(expr));

        let expr = Expression::Unary {
            op: UnaryOperator::Negate,
            expr: Box::new(Expression::lit(i64::MAX)),
        };
        assert_eq!(Expression::lit(-i64::MAX), fold(expr));
    }

    #[test]
    fn fold_comparison() {
        assert_eq!(Expression::lit(true), fold(lit_binary(BinaryOperator::Eq, 1, 1)));
        assert_eq!(Expression::lit(false), fold(lit_binary(BinaryOperator::Lt, "b", "a")));
    }

    #[test]
    fn fold_nested_in_plan() {
        let attr = Attribute::new("key", AttributeId(0), DataType::Int);
        let leaf = PlanNode::new(
            crate::plan::NodeKind::GeneratedLeaf,
            Vec::new(),
            vec![attr.clone()],
        );
        let condition = Expression::binary(
            BinaryOperator::Eq,
            Expression::Attribute(attr),
            lit_binary(BinaryOperator::Multiply, 10, 12),
        );
        let plan = PlanNode::passthrough(crate::plan::NodeKind::Filter { condition }, leaf);
        let got = ConstFold
            .optimize(&mut CompilationContext::default(), plan)
            .unwrap();
        match got.kind {
            crate::plan::NodeKind::Filter { condition } => {
                assert_eq!("(key#0 = 120)", condition.to_string())
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }
}
