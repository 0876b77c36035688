//! Errors shared by every stage of explain planning.
use std::fmt;

use serde::{Deserialize, Serialize};

pub type Result<T, E = ExplainError> = std::result::Result<T, E>;

/// Location in the source text, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub const fn new(line: usize, column: usize) -> Self {
        Span { line, column }
    }

    /// Translate a span within text that starts at `origin` into the
    /// coordinates of the enclosing text.
    pub const fn offset_from(self, origin: Span) -> Self {
        if self.line == 1 {
            Span::new(origin.line, origin.column + self.column - 1)
        } else {
            Span::new(origin.line + self.line - 1, self.column)
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Coarse classification of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parse,
    Analysis,
    Planning,
    Statistics,
    NotImplemented,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExplainError {
    /// Malformed statement or an invalid set of explain modifiers.
    #[error("Parse error: {msg}{}", span_suffix(.span))]
    Parse { msg: String, span: Option<Span> },

    /// Unresolved reference or type mismatch.
    #[error("Analysis error: {msg}{}", span_suffix(.span))]
    Analysis { msg: String, span: Option<Span> },

    /// No viable physical plan.
    #[error("Planning error: {msg}")]
    Planning { msg: String },

    /// Statistics could not be read from the catalog.
    #[error("Statistics error: {msg}")]
    Statistics { msg: String },

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn span_suffix(span: &Option<Span>) -> String {
    match span {
        Some(span) => format!(" (at {span})"),
        None => String::new(),
    }
}

impl ExplainError {
    pub fn parse(msg: impl Into<String>) -> Self {
        ExplainError::Parse {
            msg: msg.into(),
            span: None,
        }
    }

    pub fn parse_at(msg: impl Into<String>, span: Span) -> Self {
        ExplainError::Parse {
            msg: msg.into(),
            span: Some(span),
        }
    }

    pub fn analysis(msg: impl Into<String>) -> Self {
        ExplainError::Analysis {
            msg: msg.into(),
            span: None,
        }
    }

    pub fn analysis_at(msg: impl Into<String>, span: Option<Span>) -> Self {
        ExplainError::Analysis {
            msg: msg.into(),
            span,
        }
    }

    pub fn planning(msg: impl Into<String>) -> Self {
        ExplainError::Planning { msg: msg.into() }
    }

    pub fn statistics(msg: impl Into<String>) -> Self {
        ExplainError::Statistics { msg: msg.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Analysis { .. } => ErrorKind::Analysis,
            Self::Planning { .. } => ErrorKind::Planning,
            Self::Statistics { .. } => ErrorKind::Statistics,
            Self::NotImplemented(_) => ErrorKind::NotImplemented,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Human readable message without the classification prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Parse { msg, .. }
            | Self::Analysis { msg, .. }
            | Self::Planning { msg }
            | Self::Statistics { msg } => msg,
            Self::NotImplemented(msg) | Self::Internal(msg) => msg,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Parse { span, .. } | Self::Analysis { span, .. } => *span,
            _ => None,
        }
    }

    /// Move the span of an error raised on a fragment of the source into the
    /// coordinates of the full source, `origin` being where the fragment
    /// starts.
    pub fn offset_span(self, origin: Span) -> Self {
        match self {
            Self::Parse { msg, span } => Self::Parse {
                msg,
                span: span.map(|s| s.offset_from(origin)),
            },
            Self::Analysis { msg, span } => Self::Analysis {
                msg,
                span: span.map(|s| s.offset_from(origin)),
            },
            other => other,
        }
    }
}

#[macro_export]
macro_rules! internal {
    ($($arg:tt)*) => {
        $crate::ExplainError::Internal(std::format!($($arg)*))
    };
}

#[macro_export]
macro_rules! not_implemented {
    ($($arg:tt)*) => {
        return Err($crate::ExplainError::NotImplemented(std::format!($($arg)*)))
    };
}

pub trait OptionExt<T> {
    /// Return an internal error if the value is None.
    fn required(self, what: &'static str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, what: &'static str) -> Result<T> {
        match self {
            Some(v) => Ok(v),
            None => Err(internal!("Missing required value: {what}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_span() {
        let err = ExplainError::parse_at("Unexpected token ')'", Span::new(1, 14));
        assert_eq!(
            "Parse error: Unexpected token ')' (at line 1, column 14)",
            err.to_string()
        );
    }

    #[test]
    fn display_without_span() {
        let err = ExplainError::analysis("Table or view not found: nope");
        assert_eq!("Analysis error: Table or view not found: nope", err.to_string());
        assert_eq!(None, err.span());
    }

    #[test]
    fn kinds() {
        assert_eq!(ErrorKind::Parse, ExplainError::parse("a").kind());
        assert_eq!(ErrorKind::Planning, ExplainError::planning("a").kind());
        assert_eq!(ErrorKind::Statistics, ExplainError::statistics("a").kind());
        assert_eq!(ErrorKind::Internal, internal!("{}", 4).kind());
    }

    #[test]
    fn offset_span() {
        let origin = Span::new(2, 11);
        // (span in fragment, span in full source)
        let tests = [
            (Span::new(1, 1), Span::new(2, 11)),
            (Span::new(1, 8), Span::new(2, 18)),
            (Span::new(3, 4), Span::new(4, 4)),
        ];
        for (span, expected) in tests {
            let err = ExplainError::parse_at("bad", span).offset_span(origin);
            assert_eq!(Some(expected), err.span());
        }

        let err = ExplainError::analysis("no span").offset_span(origin);
        assert_eq!(None, err.span());
        let err = ExplainError::planning("no span").offset_span(origin);
        assert_eq!(ErrorKind::Planning, err.kind());
    }

    #[test]
    fn required_missing() {
        let v: Option<u8> = None;
        let err = v.required("stage").unwrap_err();
        assert_eq!("Missing required value: stage", err.message());
    }
}
