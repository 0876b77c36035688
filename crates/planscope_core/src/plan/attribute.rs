use std::fmt;

use serde::{Deserialize, Serialize};

use super::datatype::DataType;

/// Identifier of an attribute, unique within a single compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeId(pub u64);

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A column produced by a plan node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub id: AttributeId,
    pub datatype: DataType,
    /// Relation or alias this attribute can be qualified with.
    pub qualifier: Option<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, id: AttributeId, datatype: DataType) -> Self {
        Attribute {
            name: name.into(),
            id,
            datatype,
            qualifier: None,
        }
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// Check if this attribute matches a possibly qualified column reference.
    ///
    /// Names are compared case-insensitively.
    pub fn matches(&self, qualifier: Option<&str>, name: &str) -> bool {
        if !self.name.eq_ignore_ascii_case(name) {
            return false;
        }
        match (qualifier, &self.qualifier) {
            (None, _) => true,
            (Some(want), Some(have)) => want.eq_ignore_ascii_case(have),
            (Some(_), None) => false,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}
