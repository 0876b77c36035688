//! Rule based logical optimizer.
pub mod rules;

use planscope_error::Result;
use tracing::{debug, trace, warn};

use self::rules::collapse_project::CollapseProject;
use self::rules::const_fold::ConstFold;
use self::rules::eliminate_subquery::EliminateSubqueryAliases;
use self::rules::filter_pushdown::FilterPushdown;
use self::rules::prune_filters::PruneFilters;
use self::rules::remove_noop_project::RemoveNoopProject;
use crate::context::CompilationContext;
use crate::pipeline::Optimizer;
use crate::plan::PlanNode;

/// Max number of passes over the rule list before giving up on reaching a
/// fixed point.
pub const MAX_ITERATIONS: usize = 100;

pub trait OptimizeRule: std::fmt::Debug + Sync + Send {
    /// Name of the rule, used in logs.
    fn name(&self) -> &'static str;

    /// Apply an optimization rule to the logical plan.
    fn optimize(&self, ctx: &mut CompilationContext, plan: PlanNode) -> Result<PlanNode>;
}

/// Applies a fixed list of rules until the plan stops changing.
#[derive(Debug)]
pub struct RuleOptimizer {
    rules: Vec<Box<dyn OptimizeRule>>,
    max_iterations: usize,
}

impl Default for RuleOptimizer {
    fn default() -> Self {
        RuleOptimizer {
            rules: vec![
                Box::new(EliminateSubqueryAliases),
                Box::new(ConstFold),
                Box::new(PruneFilters),
                Box::new(FilterPushdown),
                Box::new(CollapseProject),
                Box::new(RemoveNoopProject),
            ],
            max_iterations: MAX_ITERATIONS,
        }
    }
}

impl RuleOptimizer {
    pub fn new(rules: Vec<Box<dyn OptimizeRule>>, max_iterations: usize) -> Self {
        RuleOptimizer {
            rules,
            max_iterations,
        }
    }
}

impl Optimizer for RuleOptimizer {
    fn optimize(&self, ctx: &mut CompilationContext, mut plan: PlanNode) -> Result<PlanNode> {
        for iteration in 0..self.max_iterations {
            let before = plan.clone();
            for rule in &self.rules {
                plan = rule.optimize(ctx, plan)?;
                trace!(rule = rule.name(), iteration, "applied rule");
            }

            if plan == before {
                debug!(iterations = iteration + 1, "optimizer reached fixed point");
                return Ok(plan);
            }
        }

        warn!(
            max_iterations = self.max_iterations,
            "optimizer did not reach a fixed point"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::NodeKind;

    /// Rule that never converges, wraps the plan in another limit each time.
    #[derive(Debug)]
    struct AlwaysChanges;

    impl OptimizeRule for AlwaysChanges {
        fn name(&self) -> &'static str {
            "always_changes"
        }

        fn optimize(&self, _ctx: &mut CompilationContext, plan: PlanNode) -> Result<PlanNode> {
            Ok(PlanNode::passthrough(NodeKind::Limit { limit: 1 }, plan))
        }
    }

    #[test]
    fn iteration_limit() {
        let optimizer = RuleOptimizer::new(vec![Box::new(AlwaysChanges)], 3);
        let plan = PlanNode::new(NodeKind::GeneratedLeaf, Vec::new(), Vec::new());
        let got = optimizer
            .optimize(&mut CompilationContext::default(), plan)
            .unwrap();

        let mut depth = 0;
        got.for_each_pre_order(&mut |_| {
            depth += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(4, depth);
    }
}
