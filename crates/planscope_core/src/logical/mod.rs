//! Logical planning, turning statements into resolved logical plans.
pub mod analyzer;
pub mod planner;
