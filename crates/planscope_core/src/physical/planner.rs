use hashbrown::HashSet;
use planscope_error::{ExplainError, Result, internal};
use tracing::debug;

use super::codegen_stages::CollapseCodegenStages;
use crate::catalog::{StorageFormat, TableRef};
use crate::context::CompilationContext;
use crate::optimizer::rules::{conjunction, split_conjunction};
use crate::pipeline::PhysicalPlanner;
use crate::plan::{AttributeId, BinaryOperator, Expression, JoinType, NodeKind, PlanNode};

/// Maps each logical node to a single physical operator, then groups fusible
/// operators into codegen stages.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPhysicalPlanner;

impl PhysicalPlanner for DefaultPhysicalPlanner {
    fn select_physical(&self, ctx: &mut CompilationContext, plan: PlanNode) -> Result<PlanNode> {
        let physical = plan_node(plan, true)?;
        if !ctx.enable_whole_stage_codegen {
            debug!("whole stage codegen disabled, skipping stage collapse");
            return Ok(physical);
        }
        CollapseCodegenStages::default().apply(physical)
    }
}

/// Plan a logical node and its children.
///
/// `root` is set while the node is the root of the query being returned to
/// the client.
fn plan_node(node: PlanNode, root: bool) -> Result<PlanNode> {
    let PlanNode {
        kind,
        children,
        output,
        extra,
        ..
    } = node;

    let kind_name = kind.name();
    let plan_children = |children: Vec<PlanNode>| {
        children
            .into_iter()
            .map(|c| plan_node(c, false))
            .collect::<Result<Vec<_>>>()
    };

    let planned = match kind {
        NodeKind::UnresolvedRelation { reference, .. } => {
            return Err(ExplainError::planning(format!(
                "Cannot plan unresolved relation '{}'",
                reference.join(".")
            )));
        }
        NodeKind::Relation { table } => PlanNode {
            kind: NodeKind::HiveTableScan { table },
            children: Vec::new(),
            output,
            extra,
            stats: None,
        },
        // Aliases don't exist physically.
        NodeKind::Subquery { .. } => {
            let child = single(children, kind_name)?;
            return plan_node(child, root);
        }
        NodeKind::Project { projections } => PlanNode::new(
            NodeKind::ProjectExec { projections },
            plan_children(children)?,
            output,
        ),
        NodeKind::Filter { condition } => PlanNode::new(
            NodeKind::FilterExec { condition },
            plan_children(children)?,
            output,
        ),
        NodeKind::Aggregate { groups, aggregates } => PlanNode::new(
            NodeKind::HashAggregate { groups, aggregates },
            plan_children(children)?,
            output,
        ),
        NodeKind::Join {
            join_type,
            condition,
        } => plan_join(join_type, condition, plan_children(children)?, output)?,
        NodeKind::Limit { limit } => {
            let kind = if root {
                NodeKind::CollectLimit { limit }
            } else {
                NodeKind::LimitExec { limit }
            };
            PlanNode::new(kind, plan_children(children)?, output)
        }
        NodeKind::GeneratedLeaf => PlanNode::new(NodeKind::LocalTableScan, Vec::new(), output),
        NodeKind::InsertIntoTable { table, format } => {
            let format = format.ok_or_else(|| internal!("Missing format for insert into {table}"))?;
            check_writable(&table, format)?;
            PlanNode::new(
                NodeKind::InsertIntoHiveTable { table },
                plan_children(children)?,
                Vec::new(),
            )
        }
        NodeKind::CreateTableAsSelect { table, format, .. } => {
            check_writable(&table, format)?;
            let insert = PlanNode::new(
                NodeKind::InsertIntoHiveTable {
                    table: table.clone(),
                },
                plan_children(children)?,
                Vec::new(),
            );
            PlanNode {
                kind: NodeKind::CreateHiveTableAsSelect { table },
                children: vec![insert],
                output: Vec::new(),
                extra,
                stats: None,
            }
            .with_extra("format", format)
        }
        other => {
            return Err(internal!(
                "Unexpected physical node {} in logical plan",
                other.name()
            ));
        }
    };

    if !planned.kind.expressions().iter().all(|e| e.is_resolved()) {
        return Err(ExplainError::planning(format!(
            "Cannot plan {} with unresolved expressions",
            planned.kind.name()
        )));
    }

    Ok(planned)
}

fn single(children: Vec<PlanNode>, parent: &str) -> Result<PlanNode> {
    match <[PlanNode; 1]>::try_from(children) {
        Ok([child]) => Ok(child),
        Err(children) => Err(internal!(
            "Expected one child for {parent}, got {}",
            children.len()
        )),
    }
}

fn check_writable(table: &TableRef, format: StorageFormat) -> Result<()> {
    if format.is_writable() {
        Ok(())
    } else {
        Err(ExplainError::planning(format!(
            "Cannot write to {table}: {format} tables are read-only"
        )))
    }
}

fn plan_join(
    join_type: JoinType,
    condition: Option<Expression>,
    children: Vec<PlanNode>,
    output: Vec<crate::plan::Attribute>,
) -> Result<PlanNode> {
    let [left, right] = match <[PlanNode; 2]>::try_from(children) {
        Ok(children) => children,
        Err(children) => {
            return Err(internal!("Expected two join children, got {}", children.len()));
        }
    };

    let left_ids: HashSet<AttributeId> = left.output.iter().map(|a| a.id).collect();
    let right_ids: HashSet<AttributeId> = right.output.iter().map(|a| a.id).collect();
    let within = |expr: &Expression, ids: &HashSet<AttributeId>| {
        let refs = expr.references();
        !refs.is_empty() && refs.iter().all(|id| ids.contains(id))
    };

    let mut left_keys = Vec::new();
    let mut right_keys = Vec::new();
    let mut residual = Vec::new();

    let mut conjuncts = Vec::new();
    if let Some(condition) = condition {
        split_conjunction(condition, &mut conjuncts);
    }

    for expr in conjuncts {
        match expr {
            Expression::Binary {
                op: BinaryOperator::Eq,
                left: l,
                right: r,
            } => {
                if within(&l, &left_ids) && within(&r, &right_ids) {
                    left_keys.push(*l);
                    right_keys.push(*r);
                } else if within(&r, &left_ids) && within(&l, &right_ids) {
                    left_keys.push(*r);
                    right_keys.push(*l);
                } else {
                    residual.push(Expression::Binary {
                        op: BinaryOperator::Eq,
                        left: l,
                        right: r,
                    });
                }
            }
            other => residual.push(other),
        }
    }

    let kind = if left_keys.is_empty() {
        NodeKind::BroadcastNestedLoopJoin {
            join_type,
            condition: conjunction(residual),
        }
    } else {
        NodeKind::BroadcastHashJoin {
            join_type,
            left_keys,
            right_keys,
            condition: conjunction(residual),
        }
    };

    Ok(PlanNode::new(kind, vec![left, right], output))
}
