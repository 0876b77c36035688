use planscope_error::Result;

use crate::context::CompilationContext;
use crate::optimizer::OptimizeRule;
use crate::plan::{Expression, NodeKind, PlanNode, ScalarValue};

/// Removes filters that always evaluate to true.
#[derive(Debug)]
pub struct PruneFilters;

impl OptimizeRule for PruneFilters {
    fn name(&self) -> &'static str {
        "prune_filters"
    }

    fn optimize(&self, _ctx: &mut CompilationContext, plan: PlanNode) -> Result<PlanNode> {
        plan.transform_up(&mut |node| match &node.kind {
            NodeKind::Filter {
                condition: Expression::Literal(ScalarValue::Boolean(true)),
            } => node.into_single_child(),
            _ => Ok(node),
        })
    }
}
