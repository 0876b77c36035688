//! Physical operator selection.
pub mod codegen_stages;
pub mod planner;

pub use codegen_stages::CollapseCodegenStages;
pub use planner::DefaultPhysicalPlanner;
