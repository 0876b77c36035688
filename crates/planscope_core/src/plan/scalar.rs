use std::fmt;

use planscope_error::{ExplainError, Result};
use serde::{Deserialize, Serialize};

use super::datatype::DataType;

/// A single literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Utf8(String),
}

impl ScalarValue {
    pub fn datatype(&self) -> DataType {
        match self {
            Self::Null => DataType::Null,
            Self::Boolean(_) => DataType::Boolean,
            Self::Int32(_) => DataType::Int,
            Self::Int64(_) => DataType::BigInt,
            Self::Float64(_) => DataType::Double,
            Self::Utf8(_) => DataType::String,
        }
    }

    /// Parse a number literal, picking the narrowest type that fits.
    pub fn parse_number(s: &str) -> Result<Self> {
        if let Ok(v) = s.parse::<i32>() {
            return Ok(Self::Int32(v));
        }
        if let Ok(v) = s.parse::<i64>() {
            return Ok(Self::Int64(v));
        }
        match s.parse::<f64>() {
            Ok(v) => Ok(Self::Float64(v)),
            Err(_) => Err(ExplainError::parse(format!("Invalid number literal: {s}"))),
        }
    }

    pub fn try_as_bool(&self) -> Result<bool> {
        match self {
            Self::Boolean(b) => Ok(*b),
            Self::Utf8(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Self::Utf8(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            other => Err(ExplainError::analysis(format!(
                "Expected a boolean value, got {other}"
            ))),
        }
    }

    pub fn try_as_i64(&self) -> Result<i64> {
        match self {
            Self::Int32(v) => Ok(*v as i64),
            Self::Int64(v) => Ok(*v),
            other => Err(ExplainError::analysis(format!(
                "Expected an integer value, got {other}"
            ))),
        }
    }

    pub fn try_into_string(self) -> Result<String> {
        match self {
            Self::Utf8(s) => Ok(s),
            other => Err(ExplainError::analysis(format!(
                "Expected a string value, got {other}"
            ))),
        }
    }

    /// Numeric value widened to f64, used for folding mixed-type arithmetic.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int32(v) => Some(*v as f64),
            Self::Int64(v) => Some(*v as f64),
            Self::Float64(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        Self::Utf8(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        Self::Utf8(value.to_string())
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        Self::Int32(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v:?}"),
            Self::Utf8(v) => write!(f, "'{v}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_numbers() {
        assert_eq!(ScalarValue::Int32(123), ScalarValue::parse_number("123").unwrap());
        assert_eq!(
            ScalarValue::Int64(3_000_000_000),
            ScalarValue::parse_number("3000000000").unwrap()
        );
        assert_eq!(ScalarValue::Float64(1.5), ScalarValue::parse_number("1.5").unwrap());
        ScalarValue::parse_number("1.2.3").unwrap_err();
    }

    #[test]
    fn display() {
        assert_eq!("'abc'", ScalarValue::from("abc").to_string());
        assert_eq!("2.0", ScalarValue::Float64(2.0).to_string());
        assert_eq!("null", ScalarValue::Null.to_string());
    }

    #[test]
    fn bool_from_string() {
        assert!(ScalarValue::from("TRUE").try_as_bool().unwrap());
        ScalarValue::Int32(1).try_as_bool().unwrap_err();
    }
}
