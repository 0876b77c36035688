use hashbrown::HashSet;
use planscope_error::{OptionExt, Result, internal};

use super::{alias_map, conjunction, replace_aliases, split_conjunction};
use crate::context::CompilationContext;
use crate::optimizer::OptimizeRule;
use crate::plan::{AttributeId, Expression, JoinType, NodeKind, PlanNode};

/// Pushes filters closer to the relations they filter.
///
/// Filters move beneath projections (substituting aliased expressions),
/// adjacent filters are combined, and filters above joins are split between
/// the join sides with whatever is left becoming part of the join condition.
#[derive(Debug)]
pub struct FilterPushdown;

impl OptimizeRule for FilterPushdown {
    fn name(&self) -> &'static str {
        "filter_pushdown"
    }

    fn optimize(&self, _ctx: &mut CompilationContext, plan: PlanNode) -> Result<PlanNode> {
        plan.transform_down(&mut pushdown)
    }
}

fn pushdown(node: PlanNode) -> Result<PlanNode> {
    if !matches!(node.kind, NodeKind::Filter { .. }) || node.children.len() != 1 {
        return Ok(node);
    }

    match &node.children[0].kind {
        NodeKind::Project { projections }
            if !projections.iter().any(|p| p.contains_aggregate()) =>
        {
            pushdown_project(node)
        }
        NodeKind::Filter { .. } => combine_filters(node),
        NodeKind::Join { .. } => pushdown_join(node),
        _ => Ok(node),
    }
}

/// Split a filter node into its condition and child.
fn into_filter_parts(node: PlanNode) -> Result<(Expression, PlanNode)> {
    let PlanNode { kind, children, .. } = node;
    match (kind, <[PlanNode; 1]>::try_from(children)) {
        (NodeKind::Filter { condition }, Ok([child])) => Ok((condition, child)),
        _ => Err(internal!("Expected a filter with one child")),
    }
}

fn pushdown_project(filter: PlanNode) -> Result<PlanNode> {
    let (condition, project) = into_filter_parts(filter)?;
    let PlanNode {
        kind,
        children,
        output,
        extra,
        ..
    } = project;
    let projections = match kind {
        NodeKind::Project { projections } => projections,
        other => return Err(internal!("Expected project, got {}", other.name())),
    };
    let grandchild = match <[PlanNode; 1]>::try_from(children) {
        Ok([child]) => child,
        Err(_) => return Err(internal!("Expected project with one child")),
    };

    let condition = replace_aliases(condition, &alias_map(&projections))?;
    let filter = PlanNode::passthrough(NodeKind::Filter { condition }, grandchild);

    Ok(PlanNode {
        kind: NodeKind::Project { projections },
        children: vec![filter],
        output,
        extra,
        stats: None,
    })
}

fn combine_filters(filter: PlanNode) -> Result<PlanNode> {
    let (outer, child) = into_filter_parts(filter)?;
    let (inner, grandchild) = into_filter_parts(child)?;

    let mut conjuncts = Vec::new();
    split_conjunction(inner, &mut conjuncts);
    split_conjunction(outer, &mut conjuncts);
    let condition = conjunction(conjuncts).required("filter condition")?;

    Ok(PlanNode::passthrough(NodeKind::Filter { condition }, grandchild))
}

fn pushdown_join(filter: PlanNode) -> Result<PlanNode> {
    let (condition, join) = into_filter_parts(filter)?;
    let PlanNode {
        kind,
        children,
        output,
        extra,
        ..
    } = join;
    let (join_type, join_condition) = match kind {
        NodeKind::Join {
            join_type,
            condition,
        } => (join_type, condition),
        other => return Err(internal!("Expected join, got {}", other.name())),
    };
    let [left, right] = match <[PlanNode; 2]>::try_from(children) {
        Ok(children) => children,
        Err(_) => return Err(internal!("Expected join with two children")),
    };

    let left_ids: HashSet<AttributeId> = left.output.iter().map(|a| a.id).collect();
    let right_ids: HashSet<AttributeId> = right.output.iter().map(|a| a.id).collect();

    let mut conjuncts = Vec::new();
    split_conjunction(condition, &mut conjuncts);

    let mut left_filters = Vec::new();
    let mut right_filters = Vec::new();
    let mut remaining = Vec::new();
    if let Some(join_condition) = join_condition {
        split_conjunction(join_condition, &mut remaining);
    }

    for expr in conjuncts {
        let refs = expr.references();
        if refs.is_empty() {
            remaining.push(expr);
        } else if refs.iter().all(|id| left_ids.contains(id)) {
            left_filters.push(expr);
        } else if refs.iter().all(|id| right_ids.contains(id)) {
            right_filters.push(expr);
        } else {
            remaining.push(expr);
        }
    }

    let left = wrap_filter(left, left_filters);
    let right = wrap_filter(right, right_filters);
    let condition = conjunction(remaining);
    let join_type = if condition.is_some() {
        JoinType::Inner
    } else {
        join_type
    };

    Ok(PlanNode {
        kind: NodeKind::Join {
            join_type,
            condition,
        },
        children: vec![left, right],
        output,
        extra,
        stats: None,
    })
}

fn wrap_filter(plan: PlanNode, filters: Vec<Expression>) -> PlanNode {
    match conjunction(filters) {
        Some(condition) => PlanNode::passthrough(NodeKind::Filter { condition }, plan),
        None => plan,
    }
}
