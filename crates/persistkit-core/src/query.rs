//! Predicates over records.
//!
//! A [`Predicate`] is validated structurally when a query is built and
//! evaluated per record when results are read. Evaluation fails, rather
//! than matching nothing, when a predicate names a field the record does
//! not have or compares values that have no ordering between them.

use std::cmp::Ordering;

use crate::error::QueryError;
use crate::record::{FieldValue, Record};

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    fn is_ordering(self) -> bool {
        !matches!(self, CompareOp::Eq | CompareOp::Ne)
    }
}

/// A filter over the fields of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        field: String,
        op: CompareOp,
        value: FieldValue,
    },
    Contains {
        field: String,
        needle: String,
    },
    IsNull(String),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

/// Starting point for building a predicate on one field.
#[derive(Debug, Clone)]
pub struct FieldRef(String);

impl FieldRef {
    fn compare(self, op: CompareOp, value: impl Into<FieldValue>) -> Predicate {
        Predicate::Compare {
            field: self.0,
            op,
            value: value.into(),
        }
    }

    pub fn eq(self, value: impl Into<FieldValue>) -> Predicate {
        self.compare(CompareOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<FieldValue>) -> Predicate {
        self.compare(CompareOp::Ne, value)
    }

    pub fn lt(self, value: impl Into<FieldValue>) -> Predicate {
        self.compare(CompareOp::Lt, value)
    }

    pub fn le(self, value: impl Into<FieldValue>) -> Predicate {
        self.compare(CompareOp::Le, value)
    }

    pub fn gt(self, value: impl Into<FieldValue>) -> Predicate {
        self.compare(CompareOp::Gt, value)
    }

    pub fn ge(self, value: impl Into<FieldValue>) -> Predicate {
        self.compare(CompareOp::Ge, value)
    }

    pub fn contains(self, needle: impl Into<String>) -> Predicate {
        Predicate::Contains {
            field: self.0,
            needle: needle.into(),
        }
    }

    pub fn is_null(self) -> Predicate {
        Predicate::IsNull(self.0)
    }
}

impl Predicate {
    /// Begin a predicate on `field`. Dotted paths reach into embedded records.
    pub fn field(field: impl Into<String>) -> FieldRef {
        FieldRef(field.into())
    }

    pub fn and(self, other: Predicate) -> Predicate {
        match self {
            Predicate::And(mut all) => {
                all.push(other);
                Predicate::And(all)
            }
            first => Predicate::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Predicate) -> Predicate {
        match self {
            Predicate::Or(mut any) => {
                any.push(other);
                Predicate::Or(any)
            }
            first => Predicate::Or(vec![first, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }

    /// Check the predicate's structure without a record.
    pub fn validate(&self) -> Result<(), QueryError> {
        match self {
            Predicate::Compare { field, op, value } => {
                check_field(field)?;
                if op.is_ordering() && !is_orderable(value) {
                    return Err(QueryError::Incomparable {
                        field: field.clone(),
                        op: op.symbol(),
                        reason: format!("{} values have no ordering", value.kind()),
                    });
                }
                Ok(())
            }
            Predicate::Contains { field, .. } | Predicate::IsNull(field) => check_field(field),
            Predicate::And(all) => {
                if all.is_empty() {
                    return Err(QueryError::EmptyCombinator("and"));
                }
                all.iter().try_for_each(Predicate::validate)
            }
            Predicate::Or(any) => {
                if any.is_empty() {
                    return Err(QueryError::EmptyCombinator("or"));
                }
                any.iter().try_for_each(Predicate::validate)
            }
            Predicate::Not(inner) => inner.validate(),
        }
    }

    /// Evaluate against one record.
    pub fn evaluate(&self, record: &Record) -> Result<bool, QueryError> {
        match self {
            Predicate::Compare { field, op, value } => {
                let actual = lookup(record, field)?;
                compare(field, *op, actual, value)
            }
            Predicate::Contains { field, needle } => match lookup(record, field)? {
                FieldValue::Text(text) => Ok(text.contains(needle.as_str())),
                FieldValue::Null => Ok(false),
                other => Err(QueryError::Incomparable {
                    field: field.clone(),
                    op: "contains",
                    reason: format!("field holds {}", other.kind()),
                }),
            },
            Predicate::IsNull(field) => Ok(lookup(record, field)?.is_null()),
            Predicate::And(all) => {
                for p in all {
                    if !p.evaluate(record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(any) => {
                for p in any {
                    if p.evaluate(record)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Not(inner) => Ok(!inner.evaluate(record)?),
        }
    }
}

fn check_field(field: &str) -> Result<(), QueryError> {
    if field.is_empty() || field.split('.').any(str::is_empty) {
        return Err(QueryError::EmptyField);
    }
    Ok(())
}

fn lookup<'a>(record: &'a Record, field: &str) -> Result<&'a FieldValue, QueryError> {
    record
        .get_path(field)
        .ok_or_else(|| QueryError::UnknownField(field.to_string()))
}

fn is_orderable(value: &FieldValue) -> bool {
    matches!(
        value,
        FieldValue::Int(_) | FieldValue::Double(_) | FieldValue::Text(_)
    )
}

fn compare(field: &str, op: CompareOp, actual: &FieldValue, expected: &FieldValue) -> Result<bool, QueryError> {
    let incomparable = || QueryError::Incomparable {
        field: field.to_string(),
        op: op.symbol(),
        reason: format!("{} against {}", actual.kind(), expected.kind()),
    };

    // Null only supports equality, and is unequal to everything but null.
    if actual.is_null() || expected.is_null() {
        return match op {
            CompareOp::Eq => Ok(actual.is_null() && expected.is_null()),
            CompareOp::Ne => Ok(!(actual.is_null() && expected.is_null())),
            _ => Ok(false),
        };
    }

    let ordering = match (actual, expected) {
        (FieldValue::Int(a), FieldValue::Int(b)) => Some(a.cmp(b)),
        (FieldValue::Double(a), FieldValue::Double(b)) => a.partial_cmp(b),
        (FieldValue::Int(a), FieldValue::Double(b)) => (*a as f64).partial_cmp(b),
        (FieldValue::Double(a), FieldValue::Int(b)) => a.partial_cmp(&(*b as f64)),
        (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
        (FieldValue::Bool(a), FieldValue::Bool(b)) if !op.is_ordering() => Some(a.cmp(b)),
        (FieldValue::Array(a), FieldValue::Array(b)) if !op.is_ordering() => {
            return Ok((a == b) == (op == CompareOp::Eq));
        }
        (FieldValue::Embedded(a), FieldValue::Embedded(b)) if !op.is_ordering() => {
            return Ok((a == b) == (op == CompareOp::Eq));
        }
        _ => return Err(incomparable()),
    };

    // NaN compares false under every operator but `!=`.
    let Some(ordering) = ordering else {
        return Ok(op == CompareOp::Ne);
    };

    Ok(match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
    })
}
