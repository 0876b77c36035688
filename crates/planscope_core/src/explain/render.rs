use planscope_error::{OptionExt, Result};
use serde::{Deserialize, Serialize};

use super::capture::CapturedStages;
use super::explainable::{ExplainEntry, ExplainNode};
use super::mode::RenderingPolicy;
use crate::codegen::store::StoredFragment;
use crate::plan::Stage;

/// Generated code for one fused stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedFragment {
    pub sequence: usize,
    pub stage_id: usize,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionBody {
    Plan(ExplainNode),
    Codegen(Vec<RenderedFragment>),
}

/// A single section of explain output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainSection {
    /// Header title. Generated code has no header.
    pub title: Option<String>,
    pub body: SectionBody,
}

impl ExplainSection {
    fn write_lines(&self, out: &mut Vec<String>) {
        if let Some(title) = &self.title {
            out.push(format!("== {title} =="));
        }
        match &self.body {
            SectionBody::Plan(root) => root.write_lines(0, out),
            SectionBody::Codegen(fragments) => {
                out.push(format!(
                    "Found {} WholeStageCodegen subtrees.",
                    fragments.len()
                ));
                for fragment in fragments {
                    let marker = ExplainEntry::new("WholeStageCodegen")
                        .with_value("sequence", fragment.sequence)
                        .with_value("stage_id", fragment.stage_id);
                    out.push(marker.to_string());
                    out.push("Generated code:".to_string());
                    out.extend(fragment.lines.iter().cloned());
                }
            }
        }
    }
}

/// Output of an explain, in section order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedExplain {
    pub sections: Vec<ExplainSection>,
}

impl RenderedExplain {
    /// Output lines, sections separated by an empty line.
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (idx, section) in self.sections.iter().enumerate() {
            if idx > 0 {
                out.push(String::new());
            }
            section.write_lines(&mut out);
        }
        out
    }
}

/// Serializes captured stages according to a rendering policy.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    policy: RenderingPolicy,
}

impl Renderer {
    pub fn new(policy: RenderingPolicy) -> Self {
        Renderer { policy }
    }

    /// Render the stages selected by the policy.
    ///
    /// Captured trees are only read.
    pub fn render(&self, captured: &CapturedStages) -> Result<RenderedExplain> {
        let mut sections = Vec::new();

        for stage in Stage::ALL {
            if !self.policy.shows(stage) {
                continue;
            }
            let with_stats =
                self.policy.show_cost && matches!(stage, Stage::Optimized | Stage::Physical);
            let root = &captured.snapshot(stage).root;
            sections.push(ExplainSection {
                title: Some(stage.title().to_string()),
                body: SectionBody::Plan(ExplainNode::walk(root, with_stats)),
            });
        }

        if self.policy.show_codegen {
            let store = captured
                .fragments
                .as_ref()
                .required("code fragments")?;
            sections.push(ExplainSection {
                title: None,
                body: SectionBody::Codegen(store.iter().map(render_fragment).collect()),
            });
        }

        Ok(RenderedExplain { sections })
    }
}

fn render_fragment(stored: &StoredFragment) -> RenderedFragment {
    RenderedFragment {
        sequence: stored.sequence,
        stage_id: stored.fragment.stage_id,
        lines: stored.fragment.numbered_lines(),
    }
}
