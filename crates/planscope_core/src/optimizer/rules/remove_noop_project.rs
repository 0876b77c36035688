use planscope_error::Result;

use crate::context::CompilationContext;
use crate::optimizer::OptimizeRule;
use crate::plan::{Expression, NodeKind, PlanNode};

/// Removes projections that output exactly their input.
#[derive(Debug)]
pub struct RemoveNoopProject;

impl OptimizeRule for RemoveNoopProject {
    fn name(&self) -> &'static str {
        "remove_noop_project"
    }

    fn optimize(&self, _ctx: &mut CompilationContext, plan: PlanNode) -> Result<PlanNode> {
        plan.transform_up(&mut |node| {
            if is_noop(&node) {
                node.into_single_child()
            } else {
                Ok(node)
            }
        })
    }
}

fn is_noop(node: &PlanNode) -> bool {
    let projections = match &node.kind {
        NodeKind::Project { projections } => projections,
        _ => return false,
    };
    let child = match node.children.as_slice() {
        [child] => child,
        _ => return false,
    };

    projections.len() == child.output.len()
        && projections
            .iter()
            .zip(&child.output)
            .all(|(p, attr)| matches!(p, Expression::Attribute(a) if a.id == attr.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Attribute, AttributeId, DataType};

    fn leaf() -> PlanNode {
        PlanNode::new(
            NodeKind::GeneratedLeaf,
            Vec::new(),
            vec![
                Attribute::new("a", AttributeId(0), DataType::Int),
                Attribute::new("b", AttributeId(1), DataType::Int),
            ],
        )
    }

    #[test]
    fn removes_identity_projection() {
        let leaf = leaf();
        let projections = leaf.output.iter().cloned().map(Expression::Attribute).collect();
        let plan = PlanNode::project(projections, leaf.clone()).unwrap();
        let got = RemoveNoopProject
            .optimize(&mut CompilationContext::default(), plan)
            .unwrap();
        assert_eq!(leaf, got);
    }

    #[test]
    fn keeps_reordering_projection() {
        let leaf = leaf();
        let projections = leaf.output.iter().rev().cloned().map(Expression::Attribute).collect();
        let plan = PlanNode::project(projections, leaf).unwrap();
        let got = RemoveNoopProject
            .optimize(&mut CompilationContext::default(), plan.clone())
            .unwrap();
        assert_eq!(plan, got);
    }
}
