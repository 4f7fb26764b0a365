//! Fact data model

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Represents a fact from a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    /// Certificate name of the node
    pub certname: String,

    /// Fact name
    pub name: String,

    /// Fact value, any JSON shape
    pub value: Value,

    /// Environment
    #[serde(default)]
    pub environment: Option<String>,
}

impl Fact {
    pub fn value_type(&self) -> FactValueType {
        FactValueType::from(&self.value)
    }

    /// Render the value for display
    pub fn display_value(&self) -> String {
        display_fact_value(&self.value)
    }
}

/// Type of a fact value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactValueType {
    String,
    Integer,
    Float,
    Boolean,
    Array,
    Map,
    Null,
}

impl FactValueType {
    /// Arrays and maps are shown expanded, everything else inline
    pub fn is_structured(&self) -> bool {
        matches!(self, FactValueType::Array | FactValueType::Map)
    }
}

impl From<&Value> for FactValueType {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => FactValueType::Null,
            Value::Bool(_) => FactValueType::Boolean,
            Value::Number(n) => {
                if n.is_f64() {
                    FactValueType::Float
                } else {
                    FactValueType::Integer
                }
            }
            Value::String(_) => FactValueType::String,
            Value::Array(_) => FactValueType::Array,
            Value::Object(_) => FactValueType::Map,
        }
    }
}

/// Structured values become pretty JSON, strings lose their quotes, other
/// scalars print as JSON literals.
pub fn display_fact_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}

/// All facts of one node, joined client-side from the nodes and facts endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeFacts {
    /// Certificate name of the node
    pub certname: String,

    /// Facts environment of the node
    pub environment: Option<String>,

    /// Fact name to value
    pub values: BTreeMap<String, Value>,

    /// Timestamp when facts were collected
    pub timestamp: Option<DateTime<Utc>>,

    pub producer_timestamp: Option<DateTime<Utc>>,

    pub producer: String,
}

/// Entry of a name catalog endpoint (`/fact-names`, `/environments`)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NameEntry {
    Wrapped { name: String },
    Bare(String),
}

impl NameEntry {
    pub fn into_name(self) -> String {
        match self {
            NameEntry::Wrapped { name } | NameEntry::Bare(name) => name,
        }
    }
}
