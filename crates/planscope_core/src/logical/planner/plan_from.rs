use planscope_error::Result;
use planscope_parser::ast::{self, FromNode, FromNodeBody};

use super::plan_expr::ExpressionPlanner;
use super::plan_select::QueryPlanner;
use super::table_ref;
use crate::plan::{JoinType, NodeKind, PlanNode};

/// Alias given to derived tables written without one.
pub const AUTO_SUBQUERY_ALIAS: &str = "__auto_generated_subquery_name";

#[derive(Debug, Clone, Copy)]
pub struct FromPlanner;

impl FromPlanner {
    pub fn plan(&self, from: FromNode) -> Result<PlanNode> {
        let alias = from.alias.map(|a| a.as_normalized_string());

        match from.body {
            FromNodeBody::BaseTable(table) => {
                // Validate the number of parts early.
                table_ref(&table.reference)?;
                let relation = PlanNode::unresolved(
                    NodeKind::UnresolvedRelation {
                        reference: table.reference.normalized_parts(),
                        span: table.reference.span(),
                    },
                    Vec::new(),
                );
                Ok(match alias {
                    Some(alias) => {
                        PlanNode::unresolved(NodeKind::Subquery { alias }, vec![relation])
                    }
                    None => relation,
                })
            }
            FromNodeBody::Subquery(subquery) => {
                let plan = QueryPlanner.plan(*subquery.query)?;
                let alias = alias.unwrap_or_else(|| AUTO_SUBQUERY_ALIAS.to_string());
                Ok(PlanNode::unresolved(NodeKind::Subquery { alias }, vec![plan]))
            }
            FromNodeBody::Join(join) => {
                let left = self.plan(*join.left)?;
                let right = self.plan(*join.right)?;
                let condition = join
                    .condition
                    .map(|c| ExpressionPlanner.plan_expr(c))
                    .transpose()?;
                let join_type = match join.join_type {
                    ast::JoinType::Inner => JoinType::Inner,
                    ast::JoinType::Cross => JoinType::Cross,
                };

                Ok(PlanNode::unresolved(
                    NodeKind::Join {
                        join_type,
                        condition,
                    },
                    vec![left, right],
                ))
            }
        }
    }
}
