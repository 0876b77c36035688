//! SQL parser for the statements planscope can explain. Heavily inspired by
//! sqlparser-rs.
pub mod ast;
pub mod keywords;
pub mod parser;
pub mod statement;
pub mod tokens;
