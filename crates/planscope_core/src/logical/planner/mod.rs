//! Default parser collaborator, converts SQL text into an unresolved plan.
mod plan_expr;
mod plan_from;
mod plan_select;

use planscope_error::{ExplainError, Result, not_implemented};
use planscope_parser::ast::ObjectReference;
use planscope_parser::parser::parse_one;
use planscope_parser::statement::Statement;
use tracing::trace;

pub use self::plan_expr::ExpressionPlanner;
use self::plan_select::QueryPlanner;
use crate::catalog::{StorageFormat, TableRef};
use crate::context::CompilationContext;
use crate::pipeline::Parser;
use crate::plan::{NodeKind, PlanNode};

/// Parses SQL with `planscope_parser` and plans the AST into a tree of
/// unresolved logical nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlParser;

impl Parser for SqlParser {
    fn parse(&self, ctx: &mut CompilationContext, sql: &str) -> Result<PlanNode> {
        let statement = parse_one(sql)?;
        trace!(query_id = %ctx.query_id, kind = statement.kind_name(), "planning parsed statement");
        plan_statement(statement)
    }
}

/// Plan an already parsed statement.
pub fn plan_statement(statement: Statement) -> Result<PlanNode> {
    match statement {
        Statement::Query(query) => QueryPlanner.plan(query),
        Statement::CreateTable(create) => {
            let source = match create.source {
                Some(source) => source,
                None => not_implemented!("Planning CREATE TABLE without AS SELECT"),
            };

            let table = table_ref(&create.name)?;
            let format = match create.stored_as {
                Some(ident) => {
                    let format: StorageFormat = ident.as_normalized_string().parse()?;
                    format
                }
                None => StorageFormat::default(),
            };

            let source = QueryPlanner.plan(source)?;
            Ok(PlanNode::unresolved(
                NodeKind::CreateTableAsSelect {
                    table,
                    format,
                    properties: create.properties,
                },
                vec![source],
            ))
        }
        Statement::Insert(insert) => {
            let table = table_ref(&insert.table)?;
            let source = QueryPlanner.plan(insert.source)?;
            Ok(PlanNode::unresolved(
                NodeKind::InsertIntoTable {
                    table,
                    format: None,
                },
                vec![source],
            ))
        }
        other => not_implemented!("Planning {}", other.kind_name()),
    }
}

/// Convert a table reference from the AST, `[database.]table`.
pub(crate) fn table_ref(reference: &ObjectReference) -> Result<TableRef> {
    let parts = reference.normalized_parts();
    match parts.as_slice() {
        [_] | [_, _] => TableRef::from_parts(&parts),
        _ => match reference.span() {
            Some(span) => Err(ExplainError::parse_at(
                format!("Too many parts in table reference: {reference}"),
                span,
            )),
            None => Err(ExplainError::parse(format!(
                "Too many parts in table reference: {reference}"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Expression;

    fn parse(sql: &str) -> Result<PlanNode> {
        SqlParser.parse(&mut CompilationContext::default(), sql)
    }

    fn kinds(plan: &PlanNode) -> Vec<&'static str> {
        let mut names = Vec::new();
        plan.for_each_pre_order(&mut |n| {
            names.push(n.kind.name());
            Ok(())
        })
        .unwrap();
        names
    }

    #[test]
    fn select_where() {
        let plan = parse("SELECT * FROM src WHERE key = 123").unwrap();
        assert_eq!(vec!["Project", "Filter", "UnresolvedRelation"], kinds(&plan));
        assert!(!plan.is_resolved());
        assert!(plan.output.is_empty());

        match &plan.kind {
            NodeKind::Project { projections } => {
                assert_eq!(vec![Expression::UnresolvedStar { qualifier: None }], *projections)
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn ctas_with_format() {
        let plan =
            parse("CREATE TABLE t STORED AS parquet AS SELECT key FROM src LIMIT 10").unwrap();
        assert_eq!(
            vec!["CreateTableAsSelect", "Limit", "Project", "UnresolvedRelation"],
            kinds(&plan)
        );
        match &plan.kind {
            NodeKind::CreateTableAsSelect { table, format, .. } => {
                assert_eq!(TableRef::unqualified("t"), *table);
                assert_eq!(StorageFormat::Parquet, *format);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn ctas_unknown_format() {
        let err = parse("CREATE TABLE t STORED AS delta AS SELECT 1").unwrap_err();
        assert_eq!(planscope_error::ErrorKind::Parse, err.kind());
    }

    #[test]
    fn insert_into() {
        let plan = parse("INSERT INTO db.t SELECT * FROM src").unwrap();
        assert_eq!(
            NodeKind::InsertIntoTable {
                table: TableRef::new("db", "t"),
                format: None
            },
            plan.kind
        );
    }

    #[test]
    fn plain_create_table_not_planned() {
        let err = parse("CREATE TABLE t (a INT)").unwrap_err();
        assert_eq!(planscope_error::ErrorKind::NotImplemented, err.kind());
    }

    #[test]
    fn too_many_table_parts() {
        let err = parse("SELECT * FROM a.b.c").unwrap_err();
        assert_eq!(planscope_error::ErrorKind::Parse, err.kind());
    }
}
