use planscope_error::Result;
use tracing::trace;

use crate::plan::{NodeKind, PlanNode};

/// Groups chains of fusible physical operators into `WholeStageCodegen`
/// nodes.
///
/// A stage starts at the topmost fusible operator of a chain and extends down
/// through fusible children. The build side of a hash join always begins a
/// new search. Stage ids are assigned in pre-order starting at 1.
#[derive(Debug)]
pub struct CollapseCodegenStages {
    next_stage_id: usize,
}

impl Default for CollapseCodegenStages {
    fn default() -> Self {
        CollapseCodegenStages { next_stage_id: 1 }
    }
}

impl CollapseCodegenStages {
    pub fn apply(mut self, plan: PlanNode) -> Result<PlanNode> {
        Ok(self.collapse(plan))
    }

    fn collapse(&mut self, mut node: PlanNode) -> PlanNode {
        if is_fusible(&node.kind) {
            let stage_id = self.next_stage_id;
            self.next_stage_id += 1;
            trace!(stage_id, root = node.kind.name(), "forming codegen stage");
            let fused = self.fuse(node);
            return PlanNode::passthrough(NodeKind::WholeStageCodegen { stage_id }, fused);
        }

        node.children = std::mem::take(&mut node.children)
            .into_iter()
            .map(|c| self.collapse(c))
            .collect();
        node
    }

    /// Continue the current stage through the children of a fused node.
    fn fuse(&mut self, mut node: PlanNode) -> PlanNode {
        let is_hash_join = matches!(node.kind, NodeKind::BroadcastHashJoin { .. });
        node.children = std::mem::take(&mut node.children)
            .into_iter()
            .enumerate()
            .map(|(idx, child)| {
                if (is_hash_join && idx == 1) || !is_fusible(&child.kind) {
                    self.collapse(child)
                } else {
                    self.fuse(child)
                }
            })
            .collect();
        node
    }
}

/// Operators that can be compiled into a stage's loop.
pub const fn is_fusible(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::ProjectExec { .. }
            | NodeKind::FilterExec { .. }
            | NodeKind::HashAggregate { .. }
            | NodeKind::BroadcastHashJoin { .. }
    )
}
