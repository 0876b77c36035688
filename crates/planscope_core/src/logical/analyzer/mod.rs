//! Default analyzer, resolves a parsed plan against the catalog.
pub mod bind_expr;

use std::sync::Arc;

use planscope_error::{ExplainError, Result, internal};
use tracing::trace;

use self::bind_expr::{BindClause, ExpressionBinder, check_predicate};
use crate::catalog::{Catalog, StorageFormat, TableRef};
use crate::context::CompilationContext;
use crate::pipeline::Analyzer;
use crate::plan::{Attribute, Expression, JoinType, NodeKind, PlanNode};

/// Resolves relations, columns and functions, assigning attribute ids from the
/// compilation context.
#[derive(Debug, Clone)]
pub struct CatalogAnalyzer {
    catalog: Arc<Catalog>,
}

impl CatalogAnalyzer {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        CatalogAnalyzer { catalog }
    }

    fn analyze_node(&self, ctx: &mut CompilationContext, node: PlanNode) -> Result<PlanNode> {
        let PlanNode {
            kind,
            children,
            output,
            extra,
            ..
        } = node;
        let mut children = children
            .into_iter()
            .map(|c| self.analyze_node(ctx, c))
            .collect::<Result<Vec<_>>>()?;

        let node = match kind {
            NodeKind::UnresolvedRelation { reference, span } => {
                let table = TableRef::from_parts(&reference)?;
                let entry = self
                    .catalog
                    .get_table(&table, &ctx.default_database)
                    .ok_or_else(|| {
                        ExplainError::analysis_at(
                            format!("Table or view not found: {}", reference.join(".")),
                            span,
                        )
                    })?;

                let output = entry
                    .columns
                    .iter()
                    .map(|col| {
                        Attribute::new(col.name.clone(), ctx.next_attribute_id(), col.datatype)
                            .with_qualifier(entry.name.clone())
                    })
                    .collect();

                let relation = PlanNode::new(
                    NodeKind::Relation {
                        table: entry.table_ref(),
                    },
                    Vec::new(),
                    output,
                )
                .with_extra("format", entry.format);

                PlanNode::passthrough(
                    NodeKind::Subquery {
                        alias: entry.name.clone(),
                    },
                    relation,
                )
            }
            NodeKind::Subquery { alias } => {
                let child = take_single(&mut children)?;
                let output = child
                    .output
                    .iter()
                    .map(|a| a.clone().with_qualifier(alias.clone()))
                    .collect();
                PlanNode::new(NodeKind::Subquery { alias }, vec![child], output)
            }
            NodeKind::Filter { condition } => {
                let child = take_single(&mut children)?;
                let binder = ExpressionBinder::new(&child.output, BindClause::Where);
                let condition = binder.bind(condition)?;
                check_predicate(&condition, BindClause::Where)?;
                PlanNode::passthrough(NodeKind::Filter { condition }, child)
            }
            NodeKind::Project { projections } => {
                let child = take_single(&mut children)?;
                let binder = ExpressionBinder::new(&child.output, BindClause::Select);
                let projections = binder
                    .expand_stars(projections)?
                    .into_iter()
                    .map(|p| binder.bind(p))
                    .collect::<Result<Vec<_>>>()?;
                let projections = name_projections(ctx, projections);
                PlanNode::project(projections, child)?
            }
            NodeKind::Aggregate { groups, aggregates } => {
                let child = take_single(&mut children)?;
                let group_binder = ExpressionBinder::new(&child.output, BindClause::GroupBy);
                let groups = groups
                    .into_iter()
                    .map(|g| group_binder.bind(g))
                    .collect::<Result<Vec<_>>>()?;

                let agg_binder = ExpressionBinder::new(&child.output, BindClause::Aggregate);
                let aggregates = agg_binder
                    .expand_stars(aggregates)?
                    .into_iter()
                    .map(|a| agg_binder.bind(a))
                    .collect::<Result<Vec<_>>>()?;
                for agg in &aggregates {
                    check_grouped(agg, &groups)?;
                }
                let aggregates = name_projections(ctx, aggregates);

                let output = aggregates
                    .iter()
                    .map(|a| a.to_attribute())
                    .collect::<Result<Vec<_>>>()?;
                PlanNode::new(NodeKind::Aggregate { groups, aggregates }, vec![child], output)
            }
            NodeKind::Join {
                join_type,
                condition,
            } => {
                let (left, right) = take_pair(&mut children)?;
                let output: Vec<_> = left.output.iter().chain(&right.output).cloned().collect();

                let condition = match condition {
                    Some(condition) => {
                        let binder = ExpressionBinder::new(&output, BindClause::JoinCondition);
                        let condition = binder.bind(condition)?;
                        check_predicate(&condition, BindClause::JoinCondition)?;
                        Some(condition)
                    }
                    None => None,
                };
                let join_type = match (join_type, &condition) {
                    (JoinType::Inner, None) => JoinType::Cross,
                    (join_type, _) => join_type,
                };

                PlanNode::new(
                    NodeKind::Join {
                        join_type,
                        condition,
                    },
                    vec![left, right],
                    output,
                )
            }
            NodeKind::Limit { limit } => {
                PlanNode::passthrough(NodeKind::Limit { limit }, take_single(&mut children)?)
            }
            NodeKind::GeneratedLeaf => {
                PlanNode::new(NodeKind::GeneratedLeaf, Vec::new(), Vec::new())
            }
            NodeKind::InsertIntoTable { table, .. } => {
                let child = take_single(&mut children)?;
                let table = table.qualify(&ctx.default_database);
                let entry = self
                    .catalog
                    .get_table(&table, &ctx.default_database)
                    .ok_or_else(|| ExplainError::analysis(format!("Table not found: {table}")))?;

                if entry.columns.len() != child.output.len() {
                    return Err(ExplainError::analysis(format!(
                        "Cannot insert into {table}: target has {} columns but the query \
                         produces {}",
                        entry.columns.len(),
                        child.output.len()
                    )));
                }

                PlanNode::new(
                    NodeKind::InsertIntoTable {
                        table,
                        format: Some(entry.format),
                    },
                    vec![child],
                    Vec::new(),
                )
            }
            NodeKind::CreateTableAsSelect {
                table,
                format,
                properties,
            } => {
                let child = take_single(&mut children)?;
                let table = table.qualify(&ctx.default_database);
                let database = table.database_or(&ctx.default_database).to_string();

                if !self.catalog.database_exists(&database) {
                    return Err(ExplainError::analysis(format!(
                        "Database '{database}' not found"
                    )));
                }
                if self.catalog.table_exists(&table, &ctx.default_database) {
                    return Err(ExplainError::analysis(format!(
                        "Table {table} already exists. You need to drop it first."
                    )));
                }

                ctas_node(table, format, properties, child)
                    .with_extra("Database", database)
                    .with_extra("Owner", &ctx.session_user)
            }
            // Already resolved, e.g. a plan built by hand.
            kind @ NodeKind::Relation { .. } => PlanNode {
                kind,
                children,
                output,
                extra,
                stats: None,
            },
            other => {
                return Err(internal!(
                    "Unexpected {} node in a plan being analyzed",
                    other.name()
                ));
            }
        };

        trace!(node = node.kind.name(), output = node.output.len(), "analyzed node");
        Ok(node)
    }
}

impl Analyzer for CatalogAnalyzer {
    fn analyze(&self, ctx: &mut CompilationContext, plan: PlanNode) -> Result<PlanNode> {
        let plan = self.analyze_node(ctx, plan)?;
        if !plan.is_resolved() {
            return Err(internal!("Plan not fully resolved after analysis"));
        }
        Ok(plan)
    }
}

fn ctas_node(
    table: TableRef,
    format: StorageFormat,
    properties: Vec<(String, String)>,
    child: PlanNode,
) -> PlanNode {
    PlanNode::new(
        NodeKind::CreateTableAsSelect {
            table,
            format,
            properties,
        },
        vec![child],
        Vec::new(),
    )
}

/// Make sure every projection is a named expression with an id.
///
/// Unnamed expressions get a positional name, `_c<idx>`.
fn name_projections(ctx: &mut CompilationContext, exprs: Vec<Expression>) -> Vec<Expression> {
    exprs
        .into_iter()
        .enumerate()
        .map(|(idx, expr)| match expr {
            Expression::Attribute(attr) => Expression::Attribute(attr),
            Expression::Alias { child, name, .. } => Expression::Alias {
                child,
                name,
                id: Some(ctx.next_attribute_id()),
            },
            other => Expression::Alias {
                child: Box::new(other),
                name: format!("_c{idx}"),
                id: Some(ctx.next_attribute_id()),
            },
        })
        .collect()
}

/// Check that an expression in an aggregate only references grouped
/// expressions outside of aggregate calls.
fn check_grouped(expr: &Expression, groups: &[Expression]) -> Result<()> {
    if groups.iter().any(|g| g == expr) {
        return Ok(());
    }
    match expr {
        Expression::Aggregate { .. } | Expression::Literal(_) => Ok(()),
        Expression::Attribute(attr) => Err(ExplainError::analysis(format!(
            "Expression '{attr}' is neither present in the group by, nor is it an aggregate \
             function"
        ))),
        other => {
            for child in other.children() {
                check_grouped(child, groups)?;
            }
            Ok(())
        }
    }
}

fn take_single(children: &mut Vec<PlanNode>) -> Result<PlanNode> {
    match children.len() {
        1 => children.pop().ok_or_else(|| internal!("Missing child")),
        n => Err(internal!("Expected one child, got {n}")),
    }
}

fn take_pair(children: &mut Vec<PlanNode>) -> Result<(PlanNode, PlanNode)> {
    match (children.pop(), children.pop(), children.is_empty()) {
        (Some(right), Some(left), true) => Ok((left, right)),
        _ => Err(internal!("Expected two children for join")),
    }
}
