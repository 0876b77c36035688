use std::fmt;

use serde::{Deserialize, Serialize};

use super::node::PlanNode;

/// Pipeline boundary a plan tree was captured at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Parsed,
    Analyzed,
    Optimized,
    Physical,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Parsed,
        Stage::Analyzed,
        Stage::Optimized,
        Stage::Physical,
    ];

    /// Title used in section headers.
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Parsed => "Parsed Logical Plan",
            Self::Analyzed => "Analyzed Logical Plan",
            Self::Optimized => "Optimized Logical Plan",
            Self::Physical => "Physical Plan",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// Plan tree captured at a stage boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSnapshot {
    pub stage: Stage,
    pub root: PlanNode,
}

impl StageSnapshot {
    pub fn new(stage: Stage, root: PlanNode) -> Self {
        StageSnapshot { stage, root }
    }
}
