use planscope_error::Result;

use crate::context::CompilationContext;
use crate::optimizer::OptimizeRule;
use crate::plan::{NodeKind, PlanNode};

/// Removes `Subquery` alias nodes. Qualifiers only matter during analysis.
#[derive(Debug)]
pub struct EliminateSubqueryAliases;

impl OptimizeRule for EliminateSubqueryAliases {
    fn name(&self) -> &'static str {
        "eliminate_subquery_aliases"
    }

    fn optimize(&self, _ctx: &mut CompilationContext, plan: PlanNode) -> Result<PlanNode> {
        plan.transform_up(&mut |node| match node.kind {
            NodeKind::Subquery { .. } => node.into_single_child(),
            _ => Ok(node),
        })
    }
}
