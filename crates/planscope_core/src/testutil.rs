//! Helpers for tests comparing explain output.
use planscope_error::Result;

use crate::engine::Engine;
use crate::engine::session::Session;

/// Replace every attribute id marker `#<digits>` with `#N`.
///
/// Used when comparing output across compilations, where ids differ.
pub fn normalize_ids(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '#' && chars.peek().is_some_and(|c| c.is_ascii_digit()) {
            out.push('N');
            while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                chars.next();
            }
        }
    }
    out
}

/// Create an engine with the `src(key INT, value STRING)` table in the
/// default database, along with a session on it.
pub fn engine_with_src() -> Result<(Engine, Session)> {
    let engine = Engine::new();
    let mut session = engine.new_session();
    session.sql("CREATE TABLE src (key INT, value STRING)")?;
    Ok((engine, session))
}
