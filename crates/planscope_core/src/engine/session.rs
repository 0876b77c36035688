use std::sync::Arc;

use planscope_error::{ExplainError, Result, not_implemented};
use planscope_parser::ast::{CreateTable, ExplainModifier, ObjectReference};
use planscope_parser::parser;
use planscope_parser::statement::Statement;
use tracing::{debug, info};

use super::query_result::QueryResult;
use crate::catalog::entry::{ColumnDefinition, TableEntry};
use crate::catalog::{Catalog, StorageFormat, TableRef};
use crate::config::session::SessionConfig;
use crate::explain::{self, RenderedExplain, RenderingPolicy};
use crate::logical::planner::{ExpressionPlanner, table_ref};
use crate::pipeline::Pipeline;
use crate::plan::{Expression, ScalarValue};

/// A client session.
///
/// Sessions share the engine's catalog, but each has its own config. Every
/// explain compiles the statement in a fresh context, so sessions can be used
/// from different threads at the same time.
#[derive(Debug)]
pub struct Session {
    catalog: Arc<Catalog>,
    pipeline: Pipeline,
    config: SessionConfig,
}

impl Session {
    pub fn new(catalog: Arc<Catalog>, pipeline: Pipeline) -> Self {
        Session {
            catalog,
            pipeline,
            config: SessionConfig::default(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SessionConfig {
        &mut self.config
    }

    /// Run every statement in the sql string.
    ///
    /// Statements run in order, the first failure stops execution. Explain
    /// modifiers of every statement are validated before anything runs.
    pub fn sql(&mut self, sql: &str) -> Result<Vec<QueryResult>> {
        let statements = parser::parse(sql)?;
        for stmt in &statements {
            if let Statement::Explain(node) = stmt {
                RenderingPolicy::resolve(&node.modifiers)?;
            }
        }

        statements
            .into_iter()
            .map(|stmt| self.run_statement(stmt))
            .collect()
    }

    /// Explain a statement's body with the given modifiers.
    pub fn explain(&self, sql: &str, modifiers: &[ExplainModifier]) -> Result<RenderedExplain> {
        explain::explain_rendered(&self.pipeline, &self.config, sql, modifiers)
    }

    fn run_statement(&mut self, stmt: Statement) -> Result<QueryResult> {
        let kind = stmt.kind_name();
        debug!(kind, "running statement");

        match stmt {
            Statement::Explain(node) => {
                let rendered = self
                    .explain(&node.body_sql, &node.modifiers)
                    .map_err(|e| e.offset_span(node.body_span))?;
                Ok(QueryResult {
                    statement_kind: kind,
                    lines: rendered.lines(),
                    explain: Some(rendered),
                })
            }
            Statement::CreateTable(create) if create.source.is_none() => {
                self.create_table(create)?;
                Ok(QueryResult::empty(kind))
            }
            Statement::AnalyzeTable(analyze) => {
                let table = self.resolve_table_ref(&analyze.table)?;
                let row_count = self
                    .catalog
                    .collect_statistics(&table, &self.config.default_database)?;
                info!(%table, row_count, "analyzed table");
                Ok(QueryResult::empty(kind))
            }
            Statement::RefreshTable(refresh) => {
                let table = self.resolve_table_ref(&refresh.table)?;
                self.catalog
                    .refresh_table(&table, &self.config.default_database)?;
                Ok(QueryResult::empty(kind))
            }
            Statement::SetVariable(set) => {
                let name = setting_name(&set.reference);
                let value = match ExpressionPlanner.plan_expr(set.value)? {
                    Expression::Literal(value) => value,
                    // `SET default_database = other`
                    Expression::UnresolvedAttribute { parts, .. } if parts.len() == 1 => {
                        ScalarValue::Utf8(parts.join("."))
                    }
                    other => {
                        return Err(ExplainError::analysis(format!(
                            "Expected a literal value for '{name}', got {other}"
                        )));
                    }
                };
                self.set_variable(&name, value)?;
                Ok(QueryResult::empty(kind))
            }
            Statement::ResetVariable(reset) => {
                let name = setting_name(&reset.reference);
                self.config.reset(&name)?;
                Ok(QueryResult::empty(kind))
            }
            Statement::ShowVariable(show) => {
                let name = setting_name(&show.reference);
                let value = self.config.get_as_scalar(&name)?;
                Ok(QueryResult::with_lines(kind, vec![value.to_string()]))
            }
            Statement::CreateTable(_) | Statement::Query(_) | Statement::Insert(_) => {
                not_implemented!("Executing {kind}, only EXPLAIN is supported")
            }
        }
    }

    fn set_variable(&mut self, name: &str, value: ScalarValue) -> Result<()> {
        let mut config = self.config.clone();
        config.set_from_scalar(name, value)?;
        if !self.catalog.database_exists(&config.default_database) {
            return Err(ExplainError::analysis(format!(
                "Database '{}' not found",
                config.default_database
            )));
        }
        self.config = config;
        Ok(())
    }

    fn create_table(&self, create: CreateTable) -> Result<()> {
        let table = self.resolve_table_ref(&create.name)?;
        let format = match create.stored_as {
            Some(ident) => ident.as_normalized_string().parse::<StorageFormat>()?,
            None => StorageFormat::default(),
        };
        let columns = create
            .columns
            .into_iter()
            .map(|col| ColumnDefinition::new(col.name.as_normalized_string(), col.datatype.into()))
            .collect();

        let mut entry = TableEntry::new(
            table.database_or(&self.config.default_database),
            table.table.clone(),
            columns,
        )
        .with_format(format)
        .with_owner(self.config.session_user.clone());
        for (key, value) in create.properties {
            entry = entry.with_property(key, value);
        }

        self.catalog.create_table(entry)
    }

    fn resolve_table_ref(&self, reference: &ObjectReference) -> Result<TableRef> {
        Ok(table_ref(reference)?.qualify(&self.config.default_database))
    }
}

fn setting_name(reference: &ObjectReference) -> String {
    reference.normalized_parts().join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    fn session() -> Session {
        let mut session = Engine::new().new_session();
        session
            .sql("CREATE TABLE src (key INT, value STRING)")
            .unwrap();
        session
    }

    #[test]
    fn create_table_records_owner() {
        let session = session();
        let entry = session
            .catalog
            .get_table(&TableRef::unqualified("src"), "default")
            .unwrap();
        assert_eq!(Some("planscope"), entry.owner.as_deref());
        assert_eq!(StorageFormat::TextFile, entry.format);
    }

    #[test]
    fn show_and_set() {
        let mut session = session();
        let results = session.sql("SET enable_cbo = true; SHOW enable_cbo").unwrap();
        assert_eq!(vec!["true".to_string()], results[1].lines);

        session.sql("RESET enable_cbo").unwrap();
        assert!(!session.config().enable_cbo);
    }

    #[test]
    fn default_database_must_exist() {
        let mut session = session();
        let err = session.sql("SET default_database = missing").unwrap_err();
        assert_eq!(planscope_error::ErrorKind::Analysis, err.kind());
        assert_eq!("default", session.config().default_database);
    }

    #[test]
    fn queries_not_executed() {
        let mut session = session();
        let err = session.sql("SELECT * FROM src").unwrap_err();
        assert_eq!(planscope_error::ErrorKind::NotImplemented, err.kind());
    }

    #[test]
    fn invalid_modifiers_reject_whole_batch() {
        let mut session = session();
        let err = session
            .sql("CREATE TABLE x (a INT); EXPLAIN EXTENDED CODEGEN SELECT 1")
            .unwrap_err();
        assert_eq!(planscope_error::ErrorKind::Parse, err.kind());
        assert!(
            session
                .catalog
                .get_table(&TableRef::unqualified("x"), "default")
                .is_none()
        );

        let err = session
            .sql("SET enable_cbo = true; EXPLAIN COST COST SELECT 1")
            .unwrap_err();
        assert_eq!(planscope_error::ErrorKind::Parse, err.kind());
        assert!(!session.config().enable_cbo);
    }

    #[test]
    fn error_span_in_full_source() {
        let mut session = session();
        let err = session
            .sql("SET enable_cbo = true;\n  EXPLAIN SELECT nope FROM src")
            .unwrap_err();
        assert_eq!(planscope_error::ErrorKind::Analysis, err.kind());
        assert_eq!(Some(planscope_error::Span::new(2, 18)), err.span());

        let err = session
            .sql("EXPLAIN EXTENDED\nSELECT key\nFROM src WHERE nope = 1")
            .unwrap_err();
        assert_eq!(Some(planscope_error::Span::new(3, 16)), err.span());
    }

    #[test]
    fn explain_result() {
        let mut session = session();
        let results = session.sql("EXPLAIN SELECT * FROM src").unwrap();
        assert_eq!("EXPLAIN", results[0].statement_kind);
        assert_eq!("== Physical Plan ==", results[0].lines[0]);
        assert!(results[0].explain.is_some());
    }
}
