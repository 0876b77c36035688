use planscope_error::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::mode::RenderingPolicy;
use crate::codegen::CodeFragmentStore;
use crate::config::session::SessionConfig;
use crate::context::CompilationContext;
use crate::pipeline::Pipeline;
use crate::plan::{Stage, StageSnapshot};
use crate::statistics::StatsAnnotator;

/// What to attach to the captured stages besides the plan trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Attach stats to the optimized and physical trees.
    pub annotate_cost: bool,
    /// Generate code for fused stages in the physical tree.
    pub generate_code: bool,
    pub cbo_enabled: bool,
    pub optimizer_enabled: bool,
}

impl CaptureOptions {
    pub fn new(policy: &RenderingPolicy, config: &SessionConfig) -> Self {
        CaptureOptions {
            annotate_cost: policy.show_cost,
            generate_code: policy.show_codegen,
            cbo_enabled: config.enable_cbo,
            optimizer_enabled: config.enable_optimizer,
        }
    }
}

/// Plan trees captured at each pipeline boundary for a single statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedStages {
    pub parsed: StageSnapshot,
    pub analyzed: StageSnapshot,
    pub optimized: StageSnapshot,
    pub physical: StageSnapshot,
    /// Generated code for the physical tree, only when requested.
    pub fragments: Option<CodeFragmentStore>,
}

impl CapturedStages {
    pub fn snapshot(&self, stage: Stage) -> &StageSnapshot {
        match stage {
            Stage::Parsed => &self.parsed,
            Stage::Analyzed => &self.analyzed,
            Stage::Optimized => &self.optimized,
            Stage::Physical => &self.physical,
        }
    }
}

/// Drives a statement through every stage of the pipeline.
#[derive(Debug)]
pub struct StageCapture<'a> {
    pipeline: &'a Pipeline,
}

impl<'a> StageCapture<'a> {
    pub fn new(pipeline: &'a Pipeline) -> Self {
        StageCapture { pipeline }
    }

    /// Run the statement through parse, analyze, optimize and physical
    /// selection.
    ///
    /// The first failing stage ends the capture, nothing captured before it
    /// is returned.
    pub fn capture(
        &self,
        ctx: &mut CompilationContext,
        sql: &str,
        options: &CaptureOptions,
    ) -> Result<CapturedStages> {
        let parsed = self.pipeline.parser.parse(ctx, sql)?;
        debug!(root = parsed.kind.name(), "parsed statement");

        let analyzed = self.pipeline.analyzer.analyze(ctx, parsed.clone())?;
        debug!(
            root = analyzed.kind.name(),
            allocated_ids = ctx.allocated_ids(),
            "analyzed plan"
        );

        let optimized = if options.optimizer_enabled {
            let optimized = self.pipeline.optimizer.optimize(ctx, analyzed.clone())?;
            debug!(root = optimized.kind.name(), "optimized plan");
            optimized
        } else {
            debug!("optimizer disabled, using analyzed plan");
            analyzed.clone()
        };

        let physical = self
            .pipeline
            .physical_planner
            .select_physical(ctx, optimized.clone())?;
        debug!(root = physical.kind.name(), "selected physical plan");

        let (optimized, physical) = if options.annotate_cost {
            let annotator =
                StatsAnnotator::new(self.pipeline.stats_provider.clone(), options.cbo_enabled);
            let optimized = annotator.annotate(&optimized)?;
            let physical = annotator.annotate(&physical)?;
            debug!(cbo_enabled = options.cbo_enabled, "annotated stats");
            (optimized, physical)
        } else {
            (optimized, physical)
        };

        let fragments = if options.generate_code {
            let store =
                CodeFragmentStore::collect(self.pipeline.code_generator.as_ref(), &physical)?;
            debug!(fragments = store.len(), "generated code");
            Some(store)
        } else {
            None
        };

        Ok(CapturedStages {
            parsed: StageSnapshot::new(Stage::Parsed, parsed),
            analyzed: StageSnapshot::new(Stage::Analyzed, analyzed),
            optimized: StageSnapshot::new(Stage::Optimized, optimized),
            physical: StageSnapshot::new(Stage::Physical, physical),
            fragments,
        })
    }
}
