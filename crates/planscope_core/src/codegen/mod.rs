//! Source generation for fused codegen stages.
pub mod generator;
pub mod store;

use serde::{Deserialize, Serialize};

pub use generator::LoopCodeGenerator;
pub use store::CodeFragmentStore;

/// Generated source for a single `WholeStageCodegen` node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFragment {
    pub stage_id: usize,
    pub source: String,
}

impl CodeFragment {
    pub fn new(stage_id: usize, source: impl Into<String>) -> Self {
        CodeFragment {
            stage_id,
            source: source.into(),
        }
    }

    /// Source lines prefixed with a fixed-width line number, `/* 001 */`.
    ///
    /// Numbers are at least three digits wide, and wider if the fragment has
    /// more lines than that.
    pub fn numbered_lines(&self) -> Vec<String> {
        let lines: Vec<&str> = self.source.lines().collect();
        let width = lines.len().to_string().len().max(3);
        lines
            .iter()
            .enumerate()
            .map(|(idx, line)| {
                if line.is_empty() {
                    format!("/* {:0width$} */", idx + 1)
                } else {
                    format!("/* {:0width$} */ {line}", idx + 1)
                }
            })
            .collect()
    }
}
