use std::fmt;

use planscope_parser::ast::AstDataType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Type of an untyped NULL literal.
    Null,
    Boolean,
    Int,
    BigInt,
    Double,
    String,
}

impl DataType {
    /// Estimated width in bytes of a single value of this type.
    pub const fn default_size(&self) -> u64 {
        match self {
            Self::Null | Self::Boolean => 1,
            Self::Int => 4,
            Self::BigInt | Self::Double => 8,
            Self::String => 20,
        }
    }

    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::BigInt | Self::Double)
    }

    /// Wider of two numeric types, None if either isn't numeric.
    ///
    /// NULL widens to the other side.
    pub fn wider_numeric(a: DataType, b: DataType) -> Option<DataType> {
        match (a, b) {
            (Self::Null, other) | (other, Self::Null) if other.is_numeric() => Some(other),
            (Self::Null, Self::Null) => Some(Self::Int),
            (Self::Double, b) if b.is_numeric() => Some(Self::Double),
            (a, Self::Double) if a.is_numeric() => Some(Self::Double),
            (Self::BigInt, b) if b.is_numeric() => Some(Self::BigInt),
            (a, Self::BigInt) if a.is_numeric() => Some(Self::BigInt),
            (Self::Int, Self::Int) => Some(Self::Int),
            _ => None,
        }
    }
}

/// Estimated size of a row with the given column types.
///
/// Includes a fixed per-row overhead.
pub fn row_width<'a>(types: impl IntoIterator<Item = &'a DataType>) -> u64 {
    const ROW_OVERHEAD: u64 = 8;
    ROW_OVERHEAD + types.into_iter().map(|t| t.default_size()).sum::<u64>()
}

impl From<AstDataType> for DataType {
    fn from(value: AstDataType) -> Self {
        match value {
            AstDataType::Int => Self::Int,
            AstDataType::BigInt => Self::BigInt,
            AstDataType::Double => Self::Double,
            AstDataType::Boolean => Self::Boolean,
            AstDataType::String => Self::String,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::Double => "double",
            Self::String => "string",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widen() {
        // (a, b, expected)
        let tests = [
            (DataType::Int, DataType::Int, Some(DataType::Int)),
            (DataType::Int, DataType::BigInt, Some(DataType::BigInt)),
            (DataType::Double, DataType::Int, Some(DataType::Double)),
            (DataType::Null, DataType::BigInt, Some(DataType::BigInt)),
            (DataType::String, DataType::Int, None),
            (DataType::Boolean, DataType::Null, None),
        ];

        for (a, b, expected) in tests {
            assert_eq!(expected, DataType::wider_numeric(a, b), "{a} {b}");
        }
    }

    #[test]
    fn widths() {
        assert_eq!(
            8 + 4 + 20,
            row_width(&[DataType::Int, DataType::String])
        );
        assert_eq!(8, row_width(&[]));
    }
}
