//! Collaborators driven by stage capture.
//!
//! Each stage of compilation sits behind a trait so that alternative
//! implementations can be swapped in. [`Pipeline::with_catalog`] wires up the
//! default implementations.
use std::fmt::Debug;
use std::sync::Arc;

use planscope_error::Result;

use crate::catalog::{Catalog, TableRef};
use crate::codegen::{CodeFragment, LoopCodeGenerator};
use crate::context::CompilationContext;
use crate::logical::analyzer::CatalogAnalyzer;
use crate::logical::planner::SqlParser;
use crate::optimizer::RuleOptimizer;
use crate::physical::planner::DefaultPhysicalPlanner;
use crate::plan::PlanNode;
use crate::statistics::{CatalogStatsProvider, Stats};

/// Produces an unresolved plan from statement text.
pub trait Parser: Debug + Sync + Send {
    fn parse(&self, ctx: &mut CompilationContext, sql: &str) -> Result<PlanNode>;
}

/// Resolves references and types against the catalog.
pub trait Analyzer: Debug + Sync + Send {
    fn analyze(&self, ctx: &mut CompilationContext, plan: PlanNode) -> Result<PlanNode>;
}

pub trait Optimizer: Debug + Sync + Send {
    fn optimize(&self, ctx: &mut CompilationContext, plan: PlanNode) -> Result<PlanNode>;
}

/// Chooses physical operators for a logical plan.
pub trait PhysicalPlanner: Debug + Sync + Send {
    fn select_physical(&self, ctx: &mut CompilationContext, plan: PlanNode) -> Result<PlanNode>;
}

/// Generates source for fused physical nodes.
pub trait CodeGenerator: Debug + Sync + Send {
    /// Returns None if the node isn't a fused unit.
    fn generate(&self, node: &PlanNode) -> Result<Option<CodeFragment>>;
}

pub trait StatsProvider: Debug + Sync + Send {
    /// Get stats for a table.
    ///
    /// The row count is only returned if `cbo_enabled` is set and statistics
    /// have been collected.
    fn lookup_stats(&self, table: &TableRef, cbo_enabled: bool) -> Result<Stats>;
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    pub parser: Arc<dyn Parser>,
    pub analyzer: Arc<dyn Analyzer>,
    pub optimizer: Arc<dyn Optimizer>,
    pub physical_planner: Arc<dyn PhysicalPlanner>,
    pub code_generator: Arc<dyn CodeGenerator>,
    pub stats_provider: Arc<dyn StatsProvider>,
}

impl Pipeline {
    /// Create a pipeline using the default implementations, resolving tables
    /// in the given catalog.
    pub fn with_catalog(catalog: Arc<Catalog>) -> Self {
        Pipeline {
            parser: Arc::new(SqlParser),
            analyzer: Arc::new(CatalogAnalyzer::new(catalog.clone())),
            optimizer: Arc::new(RuleOptimizer::default()),
            physical_planner: Arc::new(DefaultPhysicalPlanner),
            code_generator: Arc::new(LoopCodeGenerator),
            stats_provider: Arc::new(CatalogStatsProvider::new(catalog)),
        }
    }

    pub fn with_stats_provider(mut self, provider: Arc<dyn StatsProvider>) -> Self {
        self.stats_provider = provider;
        self
    }
}
