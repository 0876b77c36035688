//! `EXPLAIN` entry points.
//!
//! Modifiers are resolved into a [`RenderingPolicy`] before any pipeline work
//! happens. The statement is then captured at every stage boundary and the
//! sections selected by the policy are rendered.
pub mod capture;
pub mod explainable;
pub mod mode;
pub mod render;

use planscope_error::Result;
use planscope_parser::ast::ExplainModifier;
use tracing::info_span;

pub use capture::{CaptureOptions, CapturedStages, StageCapture};
pub use mode::RenderingPolicy;
pub use render::{ExplainSection, RenderedExplain, Renderer};

use crate::config::session::SessionConfig;
use crate::context::CompilationContext;
use crate::pipeline::Pipeline;

/// Explain a statement, returning the output lines.
pub fn explain(
    pipeline: &Pipeline,
    config: &SessionConfig,
    sql: &str,
    modifiers: &[ExplainModifier],
) -> Result<Vec<String>> {
    Ok(explain_rendered(pipeline, config, sql, modifiers)?.lines())
}

/// Explain a statement, returning the structured output.
pub fn explain_rendered(
    pipeline: &Pipeline,
    config: &SessionConfig,
    sql: &str,
    modifiers: &[ExplainModifier],
) -> Result<RenderedExplain> {
    let policy = RenderingPolicy::resolve(modifiers)?;

    let mut ctx = CompilationContext::new(config);
    let span = info_span!("explain", query_id = %ctx.query_id);
    let _guard = span.enter();

    let options = CaptureOptions::new(&policy, config);
    let captured = StageCapture::new(pipeline).capture(&mut ctx, sql, &options)?;

    Renderer::new(policy).render(&captured)
}
