use planscope_error::{ExplainError, Result};
use planscope_parser::ast::{Expr, Literal, QueryNode};

use super::plan_expr::{ExpressionPlanner, calls_aggregate};
use super::plan_from::FromPlanner;
use crate::plan::{NodeKind, PlanNode};

#[derive(Debug, Clone, Copy)]
pub struct QueryPlanner;

impl QueryPlanner {
    pub fn plan(&self, query: QueryNode) -> Result<PlanNode> {
        let select = query.body;

        // Handle FROM
        let mut plan = match select.from {
            Some(from) => FromPlanner.plan(from)?,
            None => PlanNode::unresolved(NodeKind::GeneratedLeaf, Vec::new()),
        };

        // Handle WHERE
        if let Some(expr) = select.where_expr {
            let condition = ExpressionPlanner.plan_expr(expr)?;
            plan = PlanNode::unresolved(NodeKind::Filter { condition }, vec![plan]);
        }

        let projections = select
            .projections
            .into_iter()
            .map(|p| ExpressionPlanner.plan_select_expr(p))
            .collect::<Result<Vec<_>>>()?;

        // Handle GROUP BY/aggregates, otherwise a plain projection.
        if !select.group_by.is_empty() || projections.iter().any(calls_aggregate) {
            let groups = select
                .group_by
                .into_iter()
                .map(|g| ExpressionPlanner.plan_expr(g))
                .collect::<Result<Vec<_>>>()?;
            plan = PlanNode::unresolved(
                NodeKind::Aggregate {
                    groups,
                    aggregates: projections,
                },
                vec![plan],
            );
        } else {
            plan = PlanNode::unresolved(NodeKind::Project { projections }, vec![plan]);
        }

        // Handle LIMIT
        if let Some(limit) = query.limit {
            let limit = plan_limit(limit)?;
            plan = PlanNode::unresolved(NodeKind::Limit { limit }, vec![plan]);
        }

        Ok(plan)
    }
}

fn plan_limit(expr: Expr) -> Result<u64> {
    let span = expr.span();
    if let Expr::Literal(Literal::Number(s)) = &expr {
        if let Ok(limit) = s.parse::<u64>() {
            return Ok(limit);
        }
    }

    let msg = "LIMIT must be a non-negative integer literal";
    Err(match span {
        Some(span) => ExplainError::parse_at(msg, span),
        None => ExplainError::parse(msg),
    })
}

#[cfg(test)]
mod tests {
    use planscope_parser::parser::parse_one;
    use planscope_parser::statement::Statement;

    use super::*;

    fn plan(sql: &str) -> Result<PlanNode> {
        match parse_one(sql)? {
            Statement::Query(query) => QueryPlanner.plan(query),
            other => panic!("not a query: {other:?}"),
        }
    }

    #[test]
    fn aggregate_without_group_by() {
        let plan = plan("SELECT count(*) FROM src").unwrap();
        match plan.kind {
            NodeKind::Aggregate { groups, aggregates } => {
                assert!(groups.is_empty());
                assert_eq!(1, aggregates.len());
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn derived_table_gets_alias() {
        let plan = plan("SELECT * FROM (SELECT key FROM src)").unwrap();
        let child = plan.single_child().unwrap();
        assert_eq!(
            NodeKind::Subquery {
                alias: "__auto_generated_subquery_name".to_string()
            },
            child.kind
        );
    }

    #[test]
    fn limit_must_be_literal() {
        assert_eq!(
            NodeKind::Limit { limit: 5 },
            plan("SELECT 1 LIMIT 5").unwrap().kind
        );
        plan("SELECT 1 LIMIT key").unwrap_err();
        plan("SELECT 1 LIMIT 1.5").unwrap_err();
    }

    #[test]
    fn no_from_uses_generated_leaf() {
        let plan = plan("SELECT 1").unwrap();
        assert_eq!(NodeKind::GeneratedLeaf, plan.single_child().unwrap().kind);
    }
}
