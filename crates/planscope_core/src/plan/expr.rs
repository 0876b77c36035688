use std::fmt;

use planscope_error::{ExplainError, Result, Span, internal};
use serde::{Deserialize, Serialize};

use super::attribute::{Attribute, AttributeId};
use super::datatype::DataType;
use super::scalar::ScalarValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOperator {
    pub const fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Self::Plus | Self::Minus | Self::Multiply | Self::Divide | Self::Modulo
        )
    }

    pub const fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }

    pub const fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

impl From<planscope_parser::ast::BinaryOperator> for BinaryOperator {
    fn from(value: planscope_parser::ast::BinaryOperator) -> Self {
        use planscope_parser::ast::BinaryOperator as Ast;
        match value {
            Ast::Plus => Self::Plus,
            Ast::Minus => Self::Minus,
            Ast::Multiply => Self::Multiply,
            Ast::Divide => Self::Divide,
            Ast::Modulo => Self::Modulo,
            Ast::Eq => Self::Eq,
            Ast::NotEq => Self::NotEq,
            Ast::Lt => Self::Lt,
            Ast::LtEq => Self::LtEq,
            Ast::Gt => Self::Gt,
            Ast::GtEq => Self::GtEq,
            Ast::And => Self::And,
            Ast::Or => Self::Or,
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateFunction {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl AggregateFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(Self::Count),
            "sum" => Some(Self::Sum),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "avg" => Some(Self::Avg),
            _ => None,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Avg => "avg",
        }
    }

    /// Return type given the input type.
    pub fn return_type(&self, input: DataType) -> Result<DataType> {
        match self {
            Self::Count => Ok(DataType::BigInt),
            Self::Min | Self::Max => Ok(input),
            Self::Sum => match input {
                DataType::Int | DataType::BigInt | DataType::Null => Ok(DataType::BigInt),
                DataType::Double => Ok(DataType::Double),
                other => Err(ExplainError::analysis(format!(
                    "Function sum requires a numeric input, got {other}"
                ))),
            },
            Self::Avg => {
                if input.is_numeric() || input == DataType::Null {
                    Ok(DataType::Double)
                } else {
                    Err(ExplainError::analysis(format!(
                        "Function avg requires a numeric input, got {input}"
                    )))
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Column reference that hasn't been bound yet. Qualified references have
    /// more than one part.
    UnresolvedAttribute {
        parts: Vec<String>,
        span: Option<Span>,
    },
    /// `*` or `qualifier.*`, expanded during analysis.
    UnresolvedStar { qualifier: Option<String> },
    /// Function call that hasn't been bound yet.
    UnresolvedFunction {
        name: String,
        args: Vec<Expression>,
        span: Option<Span>,
    },
    Attribute(Attribute),
    Literal(ScalarValue),
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOperator,
        expr: Box<Expression>,
    },
    /// Named expression. The id is assigned during analysis.
    Alias {
        child: Box<Expression>,
        name: String,
        id: Option<AttributeId>,
    },
    Aggregate {
        func: AggregateFunction,
        arg: Box<Expression>,
    },
}

impl Expression {
    pub fn lit(value: impl Into<ScalarValue>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn is_resolved(&self) -> bool {
        match self {
            Self::UnresolvedAttribute { .. }
            | Self::UnresolvedStar { .. }
            | Self::UnresolvedFunction { .. } => false,
            Self::Alias { child, id, .. } => id.is_some() && child.is_resolved(),
            other => other.children().all(|c| c.is_resolved()),
        }
    }

    pub fn contains_aggregate(&self) -> bool {
        match self {
            Self::Aggregate { .. } => true,
            other => other.children().any(|c| c.contains_aggregate()),
        }
    }

    /// Iterate over direct children of this expression.
    pub fn children(&self) -> impl Iterator<Item = &Expression> {
        let children: Vec<&Expression> = match self {
            Self::UnresolvedFunction { args, .. } => args.iter().collect(),
            Self::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Self::Unary { expr, .. } => vec![expr.as_ref()],
            Self::Alias { child, .. } => vec![child.as_ref()],
            Self::Aggregate { arg, .. } => vec![arg.as_ref()],
            Self::UnresolvedAttribute { .. }
            | Self::UnresolvedStar { .. }
            | Self::Attribute(_)
            | Self::Literal(_) => Vec::new(),
        };
        children.into_iter()
    }

    /// Rewrite this expression bottom-up.
    pub fn transform_up<F>(self, f: &mut F) -> Result<Expression>
    where
        F: FnMut(Expression) -> Result<Expression>,
    {
        let expr = match self {
            Self::UnresolvedFunction { name, args, span } => Self::UnresolvedFunction {
                name,
                args: args
                    .into_iter()
                    .map(|a| a.transform_up(f))
                    .collect::<Result<Vec<_>>>()?,
                span,
            },
            Self::Binary { op, left, right } => Self::Binary {
                op,
                left: Box::new(left.transform_up(f)?),
                right: Box::new(right.transform_up(f)?),
            },
            Self::Unary { op, expr } => Self::Unary {
                op,
                expr: Box::new(expr.transform_up(f)?),
            },
            Self::Alias { child, name, id } => Self::Alias {
                child: Box::new(child.transform_up(f)?),
                name,
                id,
            },
            Self::Aggregate { func, arg } => Self::Aggregate {
                func,
                arg: Box::new(arg.transform_up(f)?),
            },
            leaf => leaf,
        };
        f(expr)
    }

    /// Ids of all attributes referenced by this expression.
    pub fn references(&self) -> Vec<AttributeId> {
        let mut ids = Vec::new();
        self.collect_references(&mut ids);
        ids
    }

    fn collect_references(&self, ids: &mut Vec<AttributeId>) {
        if let Self::Attribute(attr) = self {
            ids.push(attr.id);
        }
        for child in self.children() {
            child.collect_references(ids);
        }
    }

    /// Output type of a resolved expression.
    pub fn datatype(&self) -> Result<DataType> {
        match self {
            Self::Attribute(attr) => Ok(attr.datatype),
            Self::Literal(v) => Ok(v.datatype()),
            Self::Alias { child, .. } => child.datatype(),
            Self::Aggregate { func, arg } => func.return_type(arg.datatype()?),
            Self::Unary { op, expr } => match op {
                UnaryOperator::Not => Ok(DataType::Boolean),
                UnaryOperator::Negate => expr.datatype(),
            },
            Self::Binary { op, left, right } => {
                if op.is_comparison() || op.is_logical() {
                    return Ok(DataType::Boolean);
                }
                if *op == BinaryOperator::Divide {
                    return Ok(DataType::Double);
                }
                let (l, r) = (left.datatype()?, right.datatype()?);
                DataType::wider_numeric(l, r)
                    .ok_or_else(|| internal!("Arithmetic on non-numeric types {l} and {r}"))
            }
            Self::UnresolvedAttribute { .. }
            | Self::UnresolvedStar { .. }
            | Self::UnresolvedFunction { .. } => {
                Err(internal!("Cannot get the type of unresolved expression {self}"))
            }
        }
    }

    /// Output attribute for a resolved named expression.
    pub fn to_attribute(&self) -> Result<Attribute> {
        match self {
            Self::Attribute(attr) => Ok(attr.clone()),
            Self::Alias {
                child,
                name,
                id: Some(id),
            } => Ok(Attribute::new(name.clone(), *id, child.datatype()?)),
            other => Err(internal!("Expression is not a named expression: {other}")),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedAttribute { parts, .. } => write!(f, "'{}", parts.join(".")),
            Self::UnresolvedStar { qualifier: None } => write!(f, "*"),
            Self::UnresolvedStar {
                qualifier: Some(q),
            } => write!(f, "{q}.*"),
            Self::UnresolvedFunction { name, args, .. } => {
                write!(f, "'{name}(")?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Self::Attribute(attr) => write!(f, "{attr}"),
            Self::Literal(v) => write!(f, "{v}"),
            Self::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
            Self::Unary {
                op: UnaryOperator::Not,
                expr,
            } => write!(f, "NOT {expr}"),
            Self::Unary {
                op: UnaryOperator::Negate,
                expr,
            } => write!(f, "-{expr}"),
            Self::Alias {
                child,
                name,
                id: Some(id),
            } => write!(f, "{child} AS {name}#{id}"),
            Self::Alias {
                child,
                name,
                id: None,
            } => write!(f, "{child} AS {name}"),
            Self::Aggregate { func, arg } => write!(f, "{}({arg})", func.name()),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, exprs: &[Expression]) -> fmt::Result {
    for (idx, expr) in exprs.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{expr}")?;
    }
    Ok(())
}
