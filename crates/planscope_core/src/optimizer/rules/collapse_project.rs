use planscope_error::{Result, internal};

use super::{alias_map, replace_aliases};
use crate::context::CompilationContext;
use crate::optimizer::OptimizeRule;
use crate::plan::{Expression, NodeKind, PlanNode};

/// Merges a projection into the projection directly beneath it.
///
/// Output attributes of the upper projection keep their ids.
#[derive(Debug)]
pub struct CollapseProject;

impl OptimizeRule for CollapseProject {
    fn name(&self) -> &'static str {
        "collapse_project"
    }

    fn optimize(&self, _ctx: &mut CompilationContext, plan: PlanNode) -> Result<PlanNode> {
        plan.transform_up(&mut |node| {
            let collapsible = matches!(node.kind, NodeKind::Project { .. })
                && node.children.len() == 1
                && matches!(node.children[0].kind, NodeKind::Project { .. });
            if collapsible { collapse(node) } else { Ok(node) }
        })
    }
}

fn collapse(node: PlanNode) -> Result<PlanNode> {
    let PlanNode {
        kind,
        children,
        output,
        extra,
        ..
    } = node;

    let (projections, child) = match (kind, <[PlanNode; 1]>::try_from(children)) {
        (NodeKind::Project { projections }, Ok([child])) => (projections, child),
        _ => return Err(internal!("Expected project with one child")),
    };
    let PlanNode {
        kind: child_kind,
        children: grandchildren,
        ..
    } = child;
    let child_projections = match child_kind {
        NodeKind::Project { projections } => projections,
        other => return Err(internal!("Expected project, got {}", other.name())),
    };

    let aliases = alias_map(&child_projections);
    let projections = projections
        .into_iter()
        .map(|p| match p {
            // Reference to an aliased expression below, pull the alias up as is.
            Expression::Attribute(attr) if aliases.contains_key(&attr.id) => child_projections
                .iter()
                .find(|c| matches!(c, Expression::Alias { id: Some(id), .. } if *id == attr.id))
                .cloned()
                .ok_or_else(|| internal!("Missing alias for {attr}")),
            Expression::Alias { child, name, id } => Ok(Expression::Alias {
                child: Box::new(replace_aliases(*child, &aliases)?),
                name,
                id,
            }),
            other => replace_aliases(other, &aliases),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PlanNode {
        kind: NodeKind::Project { projections },
        children: grandchildren,
        output,
        extra,
        stats: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Attribute, AttributeId, BinaryOperator, DataType};

    #[test]
    fn collapse_keeps_ids() {
        let leaf = PlanNode::new(
            NodeKind::GeneratedLeaf,
            Vec::new(),
            vec![Attribute::new("key", AttributeId(0), DataType::Int)],
        );
        let key = Expression::Attribute(leaf.output[0].clone());
        let lower = PlanNode::project(
            vec![Expression::Alias {
                child: Box::new(Expression::binary(BinaryOperator::Plus, key, Expression::lit(1))),
                name: "k".to_string(),
                id: Some(AttributeId(1)),
            }],
            leaf.clone(),
        )
        .unwrap();
        let k = Expression::Attribute(lower.output[0].clone());
        let upper = PlanNode::project(
            vec![
                k.clone(),
                Expression::Alias {
                    child: Box::new(Expression::binary(
                        BinaryOperator::Multiply,
                        k,
                        Expression::lit(2),
                    )),
                    name: "d".to_string(),
                    id: Some(AttributeId(2)),
                },
            ],
            lower,
        )
        .unwrap();
        let expected_output = upper.output.clone();

        let got = CollapseProject
            .optimize(&mut CompilationContext::default(), upper)
            .unwrap();
        assert_eq!(expected_output, got.output);
        assert_eq!(leaf, got.children[0]);
        match &got.kind {
            NodeKind::Project { projections } => {
                assert_eq!("(key#0 + 1) AS k#1", projections[0].to_string());
                assert_eq!("((key#0 + 1) * 2) AS d#2", projections[1].to_string());
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }
}
