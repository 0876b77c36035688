//! Plan capture and rendering for `EXPLAIN`.
//!
//! A statement is threaded through parse, analyze, optimize and physical
//! selection by a [`pipeline::Pipeline`], with each stage boundary captured and
//! rendered according to the explain modifiers.
pub mod catalog;
pub mod codegen;
pub mod config;
pub mod context;
pub mod engine;
pub mod explain;
pub mod logical;
pub mod optimizer;
pub mod physical;
pub mod pipeline;
pub mod plan;
pub mod statistics;
pub mod testutil;
