use std::sync::Arc;

use planscope_error::{Result, internal};
use tracing::trace;

use super::Stats;
use super::assumptions::{DEFAULT_SELECTIVITY, EQUALITY_SELECTIVITY, INEQUALITY_SELECTIVITY};
use crate::pipeline::StatsProvider;
use crate::plan::datatype::row_width;
use crate::plan::{Attribute, BinaryOperator, Expression, NodeKind, PlanNode};

/// Attaches [`Stats`] to every node of an optimized or physical plan.
///
/// Stats for relations come from the provider, everything else is derived
/// bottom-up from the children. A row count is only derived if every input
/// has one.
#[derive(Debug, Clone)]
pub struct StatsAnnotator {
    provider: Arc<dyn StatsProvider>,
    cbo_enabled: bool,
}

impl StatsAnnotator {
    pub fn new(provider: Arc<dyn StatsProvider>, cbo_enabled: bool) -> Self {
        StatsAnnotator {
            provider,
            cbo_enabled,
        }
    }

    /// Return a copy of the plan with stats attached to every node.
    pub fn annotate(&self, plan: &PlanNode) -> Result<PlanNode> {
        let children = plan
            .children
            .iter()
            .map(|c| self.annotate(c))
            .collect::<Result<Vec<_>>>()?;

        let stats = self.node_stats(plan, &children)?;
        trace!(node = plan.kind.name(), %stats, "annotated node");

        Ok(PlanNode {
            kind: plan.kind.clone(),
            children,
            output: plan.output.clone(),
            extra: plan.extra.clone(),
            stats: Some(stats),
        })
    }

    fn node_stats(&self, node: &PlanNode, children: &[PlanNode]) -> Result<Stats> {
        let child_stats = children
            .iter()
            .map(|c| {
                c.stats
                    .ok_or_else(|| internal!("Child of {} missing stats", node.kind.name()))
            })
            .collect::<Result<Vec<_>>>()?;

        let stats = match &node.kind {
            NodeKind::Relation { table } | NodeKind::HiveTableScan { table } => {
                self.provider.lookup_stats(table, self.cbo_enabled)?
            }
            NodeKind::UnresolvedRelation { .. } => {
                return Err(internal!("Cannot compute stats for unresolved relation"));
            }
            NodeKind::GeneratedLeaf | NodeKind::LocalTableScan => Stats::size_only(1),
            NodeKind::Project { .. } | NodeKind::ProjectExec { .. } => {
                let child = single(node, &child_stats)?;
                let width_in = row_width(datatypes(&children[0].output));
                let width_out = row_width(datatypes(&node.output));
                Stats::new(scale(child.size_in_bytes, width_out, width_in), child.row_count)
            }
            NodeKind::Filter { condition } | NodeKind::FilterExec { condition } => {
                let child = single(node, &child_stats)?;
                let sel = selectivity(condition);
                Stats::new(
                    apply_selectivity(child.size_in_bytes, sel),
                    child.row_count.map(|rc| apply_selectivity(rc, sel)),
                )
            }
            NodeKind::Aggregate { groups, .. } | NodeKind::HashAggregate { groups, .. } => {
                let child = single(node, &child_stats)?;
                let row_count = match child.row_count {
                    Some(_) if groups.is_empty() => Some(1),
                    Some(rc) => Some(apply_selectivity(rc, DEFAULT_SELECTIVITY)),
                    None => None,
                };
                let width = row_width(datatypes(&node.output));
                let size = match row_count {
                    Some(rc) => rc.saturating_mul(width),
                    None if groups.is_empty() => width,
                    None => apply_selectivity(child.size_in_bytes, DEFAULT_SELECTIVITY),
                };
                Stats::new(size, row_count)
            }
            NodeKind::Join { .. }
            | NodeKind::BroadcastHashJoin { .. }
            | NodeKind::BroadcastNestedLoopJoin { .. } => {
                let (left, right) = match child_stats.as_slice() {
                    [left, right] => (left, right),
                    other => {
                        return Err(internal!("Expected two join children, got {}", other.len()));
                    }
                };
                let row_count = match (left.row_count, right.row_count) {
                    (Some(l), Some(r)) => Some(l.saturating_mul(r)),
                    _ => None,
                };
                Stats::new(
                    left.size_in_bytes.saturating_mul(right.size_in_bytes),
                    row_count,
                )
            }
            NodeKind::Limit { limit }
            | NodeKind::LimitExec { limit }
            | NodeKind::CollectLimit { limit } => {
                let child = single(node, &child_stats)?;
                let width = row_width(datatypes(&node.output));
                Stats::new(
                    child.size_in_bytes.min(limit.saturating_mul(width)),
                    child.row_count.map(|rc| rc.min(*limit)),
                )
            }
            NodeKind::Subquery { .. }
            | NodeKind::InsertIntoTable { .. }
            | NodeKind::CreateTableAsSelect { .. }
            | NodeKind::InsertIntoHiveTable { .. }
            | NodeKind::CreateHiveTableAsSelect { .. }
            | NodeKind::WholeStageCodegen { .. } => *single(node, &child_stats)?,
        };

        Ok(stats)
    }
}

fn single<'a>(node: &PlanNode, stats: &'a [Stats]) -> Result<&'a Stats> {
    match stats {
        [s] => Ok(s),
        other => Err(internal!(
            "Expected one child for {}, got {}",
            node.kind.name(),
            other.len()
        )),
    }
}

fn datatypes(attrs: &[Attribute]) -> impl Iterator<Item = &crate::plan::DataType> {
    attrs.iter().map(|a| &a.datatype)
}

fn scale(size: u64, numerator: u64, denominator: u64) -> u64 {
    if denominator == 0 {
        return size;
    }
    ((size as u128 * numerator as u128) / denominator as u128).min(u64::MAX as u128) as u64
}

fn apply_selectivity(v: u64, selectivity: f64) -> u64 {
    (v as f64 * selectivity) as u64
}

/// Estimated fraction of rows passing a predicate.
fn selectivity(expr: &Expression) -> f64 {
    match expr {
        Expression::Binary { op, left, right } => match op {
            BinaryOperator::Eq => EQUALITY_SELECTIVITY,
            op if op.is_comparison() => INEQUALITY_SELECTIVITY,
            BinaryOperator::And => selectivity(left) * selectivity(right),
            BinaryOperator::Or => {
                let (l, r) = (selectivity(left), selectivity(right));
                l + r - l * r
            }
            _ => DEFAULT_SELECTIVITY,
        },
        _ => DEFAULT_SELECTIVITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableRef;
    use crate::plan::{AttributeId, DataType};

    #[derive(Debug)]
    struct FixedStats(Stats);

    impl StatsProvider for FixedStats {
        fn lookup_stats(&self, _table: &TableRef, cbo_enabled: bool) -> Result<Stats> {
            Ok(Stats::new(
                self.0.size_in_bytes,
                if cbo_enabled { self.0.row_count } else { None },
            ))
        }
    }

    fn scan() -> PlanNode {
        PlanNode::new(
            NodeKind::HiveTableScan {
                table: TableRef::new("default", "src"),
            },
            Vec::new(),
            vec![
                Attribute::new("key", AttributeId(0), DataType::Int),
                Attribute::new("value", AttributeId(1), DataType::String),
            ],
        )
    }

    fn filter_eq(child: PlanNode) -> PlanNode {
        let cond = Expression::binary(
            BinaryOperator::Eq,
            Expression::Attribute(child.output[0].clone()),
            Expression::lit(123),
        );
        PlanNode::passthrough(NodeKind::FilterExec { condition: cond }, child)
    }

    #[test]
    fn every_node_gets_size() {
        let provider = Arc::new(FixedStats(Stats::new(10_000, Some(500))));
        let plan = PlanNode::passthrough(NodeKind::CollectLimit { limit: 10 }, filter_eq(scan()));

        let annotated = StatsAnnotator::new(provider, false).annotate(&plan).unwrap();
        assert!(plan.stats.is_none());

        let mut all = Vec::new();
        annotated
            .for_each_pre_order(&mut |n| {
                all.push(n.stats.unwrap());
                Ok(())
            })
            .unwrap();

        assert_eq!(
            vec![
                Stats::size_only(320),
                Stats::size_only(1000),
                Stats::size_only(10_000)
            ],
            all
        );
    }

    #[test]
    fn row_count_derived_with_cbo() {
        let provider = Arc::new(FixedStats(Stats::new(10_000, Some(500))));
        let plan = PlanNode::passthrough(NodeKind::CollectLimit { limit: 10 }, filter_eq(scan()));

        let annotated = StatsAnnotator::new(provider, true).annotate(&plan).unwrap();
        assert_eq!(Some(10), annotated.stats.unwrap().row_count);
        assert_eq!(Some(50), annotated.children[0].stats.unwrap().row_count);
    }

    #[test]
    fn selectivities() {
        let eq = Expression::binary(BinaryOperator::Eq, Expression::lit(1), Expression::lit(2));
        let lt = Expression::binary(BinaryOperator::Lt, Expression::lit(1), Expression::lit(2));
        let and = Expression::binary(BinaryOperator::And, eq.clone(), lt.clone());
        assert_eq!(EQUALITY_SELECTIVITY, selectivity(&eq));
        assert_eq!(INEQUALITY_SELECTIVITY, selectivity(&lt));
        assert!((selectivity(&and) - 0.03).abs() < 1e-9);
        assert_eq!(DEFAULT_SELECTIVITY, selectivity(&Expression::lit(true)));
    }
}
