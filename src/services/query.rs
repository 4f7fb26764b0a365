//! PuppetDB query AST
//!
//! Builds the array-form filter expressions accepted by the PuppetDB v4 query
//! API (`["=", "certname", "web1"]`, `["and", ...]`, ...). Expressions are kept
//! as structures until the whole tree is rendered, so every value is JSON
//! encoded exactly once.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::utils::error::{PuppetDbError, Result};

/// Ordered comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
}

impl Comparison {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::GreaterThan => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::LessThan => "<",
            Comparison::LessOrEqual => "<=",
        }
    }

    fn from_op(op: &str) -> Option<Self> {
        match op {
            ">" => Some(Comparison::GreaterThan),
            ">=" => Some(Comparison::GreaterOrEqual),
            "<" => Some(Comparison::LessThan),
            "<=" => Some(Comparison::LessOrEqual),
            _ => None,
        }
    }
}

/// A query expression
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// `["=", field, value]`
    Equal { field: String, value: Value },
    /// `["~", field, pattern]`
    Match { field: String, pattern: String },
    /// `[">", field, value]` and friends
    Compare {
        op: Comparison,
        field: String,
        value: Value,
    },
    /// `["null?", field, bool]`
    Null { field: String, is_null: bool },
    /// `["and", expr, ...]`
    And(Vec<Query>),
    /// `["or", expr, ...]`
    Or(Vec<Query>),
    /// `["not", expr]`
    Not(Box<Query>),
}

/// Equality condition: `["=", field, value]`
pub fn equals(field: &str, value: impl Into<Value>) -> Query {
    Query::Equal {
        field: field.to_string(),
        value: value.into(),
    }
}

/// Regex match condition: `["~", field, pattern]`
pub fn matches(field: &str, pattern: &str) -> Query {
    Query::Match {
        field: field.to_string(),
        pattern: pattern.to_string(),
    }
}

/// Null check: `["null?", field, true/false]`
pub fn is_null(field: &str, is_null: bool) -> Query {
    Query::Null {
        field: field.to_string(),
        is_null,
    }
}

/// Conjunction: `["and", expr, ...]`
pub fn and(exprs: Vec<Query>) -> Query {
    Query::And(exprs)
}

impl Query {
    /// Array form of the expression
    pub fn to_value(&self) -> Value {
        match self {
            Query::Equal { field, value } => {
                Value::Array(vec!["=".into(), field.as_str().into(), value.clone()])
            }
            Query::Match { field, pattern } => Value::Array(vec![
                "~".into(),
                field.as_str().into(),
                pattern.as_str().into(),
            ]),
            Query::Compare { op, field, value } => Value::Array(vec![
                op.as_str().into(),
                field.as_str().into(),
                value.clone(),
            ]),
            Query::Null { field, is_null } => Value::Array(vec![
                "null?".into(),
                field.as_str().into(),
                Value::Bool(*is_null),
            ]),
            Query::And(exprs) => Self::boolean("and", exprs),
            Query::Or(exprs) => Self::boolean("or", exprs),
            Query::Not(expr) => Value::Array(vec!["not".into(), expr.to_value()]),
        }
    }

    fn boolean(op: &str, exprs: &[Query]) -> Value {
        let mut items = Vec::with_capacity(exprs.len() + 1);
        items.push(Value::from(op));
        items.extend(exprs.iter().map(Query::to_value));
        Value::Array(items)
    }

    /// Serialized form, ready to be sent as the `query` parameter
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    /// Parse serialized query text
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| PuppetDbError::ValidationError(format!("Query is not valid JSON: {}", e)))?;
        Self::from_value(&value)
    }

    /// Reconstruct an expression from its array form
    pub fn from_value(value: &Value) -> Result<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| invalid(format!("expected an array expression, got {}", value)))?;
        let op = items
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("expression must start with an operator string"))?;
        let args = &items[1..];

        match op {
            "and" | "or" => {
                if args.is_empty() {
                    return Err(invalid(format!("'{}' needs at least one operand", op)));
                }
                let exprs = args.iter().map(Self::from_value).collect::<Result<Vec<_>>>()?;
                Ok(if op == "and" {
                    Query::And(exprs)
                } else {
                    Query::Or(exprs)
                })
            }
            "not" => match args {
                [inner] => Ok(Query::Not(Box::new(Self::from_value(inner)?))),
                _ => Err(invalid("'not' takes exactly one operand")),
            },
            "=" => {
                let (field, value) = binary(op, args)?;
                Ok(Query::Equal {
                    field,
                    value: value.clone(),
                })
            }
            "~" => {
                let (field, value) = binary(op, args)?;
                let pattern = value
                    .as_str()
                    .ok_or_else(|| invalid("'~' pattern must be a string"))?;
                Ok(Query::Match {
                    field,
                    pattern: pattern.to_string(),
                })
            }
            "null?" => {
                let (field, value) = binary(op, args)?;
                let is_null = value
                    .as_bool()
                    .ok_or_else(|| invalid("'null?' takes a boolean"))?;
                Ok(Query::Null { field, is_null })
            }
            other => match Comparison::from_op(other) {
                Some(cmp) => {
                    let (field, value) = binary(other, args)?;
                    Ok(Query::Compare {
                        op: cmp,
                        field,
                        value: value.clone(),
                    })
                }
                None => Err(invalid(format!("unknown operator '{}'", other))),
            },
        }
    }
}

fn binary<'a>(op: &str, args: &'a [Value]) -> Result<(String, &'a Value)> {
    match args {
        [field, value] => {
            let field = field
                .as_str()
                .ok_or_else(|| invalid(format!("'{}' field name must be a string", op)))?;
            Ok((field.to_string(), value))
        }
        _ => Err(invalid(format!(
            "'{}' takes a field and a value, got {} operands",
            op,
            args.len()
        ))),
    }
}

fn invalid(msg: impl Into<String>) -> PuppetDbError {
    PuppetDbError::ValidationError(msg.into())
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Builder for AST queries
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    conditions: Vec<Query>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self { conditions: vec![] }
    }

    /// Add an equality condition: ["=", field, value]
    pub fn equals(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(equals(field, value));
        self
    }

    /// Add a regex match condition: ["~", field, pattern]
    pub fn matches(mut self, field: &str, pattern: &str) -> Self {
        self.conditions.push(matches(field, pattern));
        self
    }

    /// Add a greater-than condition: [">", field, value]
    pub fn greater_than(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(compare(Comparison::GreaterThan, field, value));
        self
    }

    /// Add a less-than condition: ["<", field, value]
    pub fn less_than(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(compare(Comparison::LessThan, field, value));
        self
    }

    /// Add a greater-than-or-equal condition: [">=", field, value]
    pub fn gte(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(compare(Comparison::GreaterOrEqual, field, value));
        self
    }

    /// Add a less-than-or-equal condition: ["<=", field, value]
    pub fn lte(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(compare(Comparison::LessOrEqual, field, value));
        self
    }

    /// Add a null check: ["null?", field, true/false]
    pub fn is_null(mut self, field: &str, null: bool) -> Self {
        self.conditions.push(is_null(field, null));
        self
    }

    /// Negate a sub-query: ["not", query]
    pub fn not(mut self, subquery: QueryBuilder) -> Self {
        if let Some(q) = subquery.build() {
            self.conditions.push(Query::Not(Box::new(q)));
        }
        self
    }

    /// Add an already-built expression
    pub fn condition(mut self, query: Query) -> Self {
        self.conditions.push(query);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Build the query; `None` means "no filter", and the caller omits the parameter
    pub fn build(&self) -> Option<Query> {
        match self.conditions.len() {
            0 => None,
            1 => Some(self.conditions[0].clone()),
            _ => Some(Query::And(self.conditions.clone())),
        }
    }
}

fn compare(op: Comparison, field: &str, value: impl Into<Value>) -> Query {
    Query::Compare {
        op,
        field: field.to_string(),
        value: value.into(),
    }
}
