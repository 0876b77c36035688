use planscope_error::{ExplainError, Result, Span};

use crate::plan::{
    AggregateFunction,
    Attribute,
    BinaryOperator,
    DataType,
    Expression,
    UnaryOperator,
};

/// Where an expression is being bound, determines if aggregates are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindClause {
    Where,
    JoinCondition,
    Select,
    GroupBy,
    Aggregate,
}

impl BindClause {
    const fn allows_aggregates(&self) -> bool {
        matches!(self, Self::Aggregate)
    }

    const fn describe(&self) -> &'static str {
        match self {
            Self::Where => "WHERE",
            Self::JoinCondition => "JOIN conditions",
            Self::Select => "a non-aggregate SELECT",
            Self::GroupBy => "GROUP BY",
            Self::Aggregate => "aggregates",
        }
    }
}

/// Binds expressions against the output attributes of a node's children.
#[derive(Debug)]
pub struct ExpressionBinder<'a> {
    pub input: &'a [Attribute],
    pub clause: BindClause,
}

impl<'a> ExpressionBinder<'a> {
    pub fn new(input: &'a [Attribute], clause: BindClause) -> Self {
        ExpressionBinder { input, clause }
    }

    /// Bind a single expression, resolving columns and functions and checking
    /// operand types.
    ///
    /// Aliases are left without ids.
    pub fn bind(&self, expr: Expression) -> Result<Expression> {
        expr.transform_up(&mut |expr| self.bind_one(expr))
    }

    /// Expand star expressions into the matching input attributes.
    pub fn expand_stars(&self, exprs: Vec<Expression>) -> Result<Vec<Expression>> {
        let mut expanded = Vec::with_capacity(exprs.len());
        for expr in exprs {
            match expr {
                Expression::UnresolvedStar { qualifier } => {
                    let attrs: Vec<_> = self
                        .input
                        .iter()
                        .filter(|attr| match &qualifier {
                            Some(q) => attr
                                .qualifier
                                .as_deref()
                                .is_some_and(|have| have.eq_ignore_ascii_case(q)),
                            None => true,
                        })
                        .collect();

                    if let Some(q) = &qualifier {
                        if attrs.is_empty() {
                            return Err(ExplainError::analysis(format!(
                                "Cannot resolve '{q}.*' given input columns: [{}]",
                                self.input_names()
                            )));
                        }
                    }

                    expanded.extend(attrs.into_iter().map(|a| Expression::Attribute(a.clone())));
                }
                other => expanded.push(other),
            }
        }
        Ok(expanded)
    }

    fn bind_one(&self, expr: Expression) -> Result<Expression> {
        match expr {
            Expression::UnresolvedAttribute { parts, span } => self.bind_column(parts, span),
            Expression::UnresolvedStar { qualifier } => Err(ExplainError::analysis(format!(
                "Invalid usage of '{}' in expression",
                match qualifier {
                    Some(q) => format!("{q}.*"),
                    None => "*".to_string(),
                }
            ))),
            Expression::UnresolvedFunction { name, args, span } => {
                self.bind_function(name, args, span)
            }
            Expression::Binary { op, left, right } => {
                check_binary(op, &left, &right)?;
                Ok(Expression::Binary { op, left, right })
            }
            Expression::Unary { op, expr } => {
                let datatype = expr.datatype()?;
                let ok = match op {
                    UnaryOperator::Not => matches!(datatype, DataType::Boolean | DataType::Null),
                    UnaryOperator::Negate => datatype.is_numeric() || datatype == DataType::Null,
                };
                if !ok {
                    return Err(ExplainError::analysis(format!(
                        "Data type mismatch: cannot apply {} to {datatype}",
                        match op {
                            UnaryOperator::Not => "NOT",
                            UnaryOperator::Negate => "unary minus",
                        }
                    )));
                }
                Ok(Expression::Unary { op, expr })
            }
            other => Ok(other),
        }
    }

    fn bind_column(&self, parts: Vec<String>, span: Option<Span>) -> Result<Expression> {
        let (qualifier, name) = match parts.as_slice() {
            [name] => (None, name.as_str()),
            [qualifier, name] => (Some(qualifier.as_str()), name.as_str()),
            _ => {
                return Err(ExplainError::analysis_at(
                    format!("Too many parts in column reference: {}", parts.join(".")),
                    span,
                ));
            }
        };

        let mut matches = self.input.iter().filter(|a| a.matches(qualifier, name));
        match (matches.next(), matches.next()) {
            (Some(attr), None) => Ok(Expression::Attribute(attr.clone())),
            (Some(_), Some(_)) => Err(ExplainError::analysis_at(
                format!("Reference '{}' is ambiguous", parts.join(".")),
                span,
            )),
            (None, _) => Err(ExplainError::analysis_at(
                format!(
                    "Cannot resolve '{}' given input columns: [{}]",
                    parts.join("."),
                    self.input_names()
                ),
                span,
            )),
        }
    }

    fn bind_function(
        &self,
        name: String,
        mut args: Vec<Expression>,
        span: Option<Span>,
    ) -> Result<Expression> {
        let func = AggregateFunction::from_name(&name).ok_or_else(|| {
            ExplainError::analysis_at(format!("Undefined function: '{name}'"), span)
        })?;

        if !self.clause.allows_aggregates() {
            return Err(ExplainError::analysis_at(
                format!(
                    "Aggregate function {name} is not allowed in {}",
                    self.clause.describe()
                ),
                span,
            ));
        }

        if args.len() != 1 {
            return Err(ExplainError::analysis_at(
                format!("Function {name} expects 1 argument, got {}", args.len()),
                span,
            ));
        }
        let arg = args.remove(0);

        if arg.contains_aggregate() {
            return Err(ExplainError::analysis_at(
                format!("Aggregate function calls cannot be nested in {name}"),
                span,
            ));
        }

        // Check the argument type now so the error points at the call.
        func.return_type(arg.datatype()?)
            .map_err(|e| ExplainError::analysis_at(e.message(), span))?;

        Ok(Expression::Aggregate {
            func,
            arg: Box::new(arg),
        })
    }

    fn input_names(&self) -> String {
        self.input
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Check that the operand types of a resolved binary expression are
/// compatible.
fn check_binary(op: BinaryOperator, left: &Expression, right: &Expression) -> Result<()> {
    let (l, r) = (left.datatype()?, right.datatype()?);

    let ok = if op.is_arithmetic() {
        DataType::wider_numeric(l, r).is_some()
    } else if op.is_logical() {
        matches!(l, DataType::Boolean | DataType::Null)
            && matches!(r, DataType::Boolean | DataType::Null)
    } else {
        comparable(l, r)
    };

    if ok {
        Ok(())
    } else {
        Err(ExplainError::analysis(format!(
            "Data type mismatch: cannot apply '{op}' to {l} and {r} in '({left} {op} {right})'"
        )))
    }
}

/// Whether values of two types can be compared.
///
/// Strings are implicitly cast when compared against numbers.
fn comparable(l: DataType, r: DataType) -> bool {
    if l == r || l == DataType::Null || r == DataType::Null {
        return true;
    }
    match (l, r) {
        (a, b) if a.is_numeric() && b.is_numeric() => true,
        (DataType::String, b) if b.is_numeric() => true,
        (a, DataType::String) if a.is_numeric() => true,
        _ => false,
    }
}

/// Require a bound predicate to be boolean.
pub fn check_predicate(expr: &Expression, clause: BindClause) -> Result<()> {
    match expr.datatype()? {
        DataType::Boolean | DataType::Null => Ok(()),
        other => Err(ExplainError::analysis(format!(
            "Data type mismatch: {} expression '{expr}' must be boolean, got {other}",
            clause.describe()
        ))),
    }
}
