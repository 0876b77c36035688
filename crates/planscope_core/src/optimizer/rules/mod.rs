pub mod collapse_project;
pub mod const_fold;
pub mod eliminate_subquery;
pub mod filter_pushdown;
pub mod prune_filters;
pub mod remove_noop_project;

use hashbrown::HashMap;
use planscope_error::Result;

use crate::plan::{AttributeId, BinaryOperator, Expression};

/// Replace references to aliased attributes with the aliased expression.
pub fn replace_aliases(
    expr: Expression,
    aliases: &HashMap<AttributeId, Expression>,
) -> Result<Expression> {
    expr.transform_up(&mut |expr| match expr {
        Expression::Attribute(attr) => match aliases.get(&attr.id) {
            Some(replacement) => Ok(replacement.clone()),
            None => Ok(Expression::Attribute(attr)),
        },
        other => Ok(other),
    })
}

/// Map of alias ids to their child expressions for a projection list.
pub fn alias_map(projections: &[Expression]) -> HashMap<AttributeId, Expression> {
    projections
        .iter()
        .filter_map(|p| match p {
            Expression::Alias {
                child,
                id: Some(id),
                ..
            } => Some((*id, child.as_ref().clone())),
            _ => None,
        })
        .collect()
}

/// Split an expression on AND.
pub fn split_conjunction(expr: Expression, out: &mut Vec<Expression>) {
    match expr {
        Expression::Binary {
            op: BinaryOperator::And,
            left,
            right,
        } => {
            split_conjunction(*left, out);
            split_conjunction(*right, out);
        }
        other => out.push(other),
    }
}

/// Join expressions with AND, None if there are no expressions.
pub fn conjunction(exprs: impl IntoIterator<Item = Expression>) -> Option<Expression> {
    exprs
        .into_iter()
        .reduce(|acc, expr| Expression::binary(BinaryOperator::And, acc, expr))
}
