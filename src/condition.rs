//! The condition model: one user-authored `(field, operator, value)` row.

use crate::wire;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A single filter condition authored in the UI
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// UI-facing field key, possibly carrying a namespace prefix
    pub field_key: String,
    pub operator: Operator,
    pub value: ConditionValue,
    pub metadata: ConditionMetadata,
}

impl FilterCondition {
    pub fn new(field_key: impl Into<String>, operator: Operator, value: ConditionValue) -> Self {
        Self {
            field_key: field_key.into(),
            operator,
            value,
            metadata: ConditionMetadata::default(),
        }
    }

    /// Records the prefix stripped off a secondary custom field key when it was surfaced to the UI.
    pub fn with_transformed_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.metadata.transformed_prefix = Some(prefix.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionMetadata {
    pub transformed_prefix: Option<String>,
}

/// The fixed operator set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    NotEquals,
    StartsWith,
    Contains,
    Between,
}

impl Operator {
    pub const ALL: [Operator; 5] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::StartsWith,
        Operator::Contains,
        Operator::Between,
    ];

    /// The `param` spelling used by the UI rows
    pub fn as_param(self) -> &'static str {
        match self {
            Operator::Equals => "EQUALS",
            Operator::NotEquals => "DOES_NOT_EQUAL",
            Operator::StartsWith => "STARTS_WITH",
            Operator::Contains => "CONTAINS",
            Operator::Between => "IS_BETWEEN",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

/// Returned when a `param` string is outside the operator set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperator(pub String);

impl FromStr for Operator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.as_param() == s)
            .ok_or_else(|| UnknownOperator(s.to_string()))
    }
}

/// The value side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    Scalar(String),
    /// Multi-select rows
    List(Vec<String>),
    /// `"true"` / `"false"`, only for the rollback field
    BooleanAsString(String),
    /// Absolute bounds, `$gt` / `$lt` on the wire
    Range { lower_bound: String, upper_bound: String },
    /// Relative bound, `$age` on the wire
    RelativeAge { age_seconds: String },
    /// Anything else, carried through verbatim
    Opaque(Value),
}

impl ConditionValue {
    pub fn scalar(s: impl Into<String>) -> Self {
        ConditionValue::Scalar(s.into())
    }

    pub fn range(lower: impl Into<String>, upper: impl Into<String>) -> Self {
        ConditionValue::Range {
            lower_bound: lower.into(),
            upper_bound: upper.into(),
        }
    }

    pub fn empty_range() -> Self {
        Self::range("", "")
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ConditionValue::Scalar(s) | ConditionValue::BooleanAsString(s) => s.is_empty(),
            ConditionValue::List(items) => items.is_empty(),
            ConditionValue::Range { lower_bound, upper_bound } => {
                lower_bound.is_empty() && upper_bound.is_empty()
            }
            ConditionValue::RelativeAge { age_seconds } => age_seconds.is_empty(),
            ConditionValue::Opaque(value) => match value {
                Value::Null => true,
                Value::String(s) => s.is_empty(),
                Value::Array(items) => items.is_empty(),
                Value::Object(map) => map.is_empty(),
                _ => false,
            },
        }
    }

    /// Whether this value has a date/between shape
    pub fn is_range_like(&self) -> bool {
        matches!(
            self,
            ConditionValue::Range { .. } | ConditionValue::RelativeAge { .. }
        )
    }

    /// The literal text of a string-shaped value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ConditionValue::Scalar(s) | ConditionValue::BooleanAsString(s) => Some(s.as_str()),
            ConditionValue::Opaque(Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            ConditionValue::Scalar(_) => "scalar",
            ConditionValue::List(_) => "list",
            ConditionValue::BooleanAsString(_) => "boolean",
            ConditionValue::Range { .. } => "range",
            ConditionValue::RelativeAge { .. } => "relative age",
            ConditionValue::Opaque(_) => "opaque",
        }
    }

    /// Reads a value as it sits in a query document bucket.
    pub fn from_wire(value: &Value) -> Self {
        match value {
            Value::String(s) => ConditionValue::Scalar(s.clone()),
            Value::Array(items) => match string_items(items) {
                Some(list) => ConditionValue::List(list),
                None => ConditionValue::Opaque(value.clone()),
            },
            Value::Object(map) => {
                if map.contains_key(wire::AGE) {
                    ConditionValue::RelativeAge {
                        age_seconds: bound_text(map.get(wire::AGE)),
                    }
                } else if map.contains_key(wire::GT) || map.contains_key(wire::LT) {
                    ConditionValue::Range {
                        lower_bound: bound_text(map.get(wire::GT)),
                        upper_bound: bound_text(map.get(wire::LT)),
                    }
                } else {
                    ConditionValue::Opaque(value.clone())
                }
            }
            other => ConditionValue::Opaque(other.clone()),
        }
    }

    /// Renders the value in its query document form.
    pub fn to_wire(&self) -> Value {
        match self {
            ConditionValue::Scalar(s) | ConditionValue::BooleanAsString(s) => Value::String(s.clone()),
            ConditionValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            ConditionValue::Range { lower_bound, upper_bound } => {
                let mut map = Map::new();
                map.insert(wire::GT.to_string(), Value::String(lower_bound.clone()));
                map.insert(wire::LT.to_string(), Value::String(upper_bound.clone()));
                Value::Object(map)
            }
            ConditionValue::RelativeAge { age_seconds } => {
                let mut map = Map::new();
                map.insert(wire::AGE.to_string(), Value::String(age_seconds.clone()));
                Value::Object(map)
            }
            ConditionValue::Opaque(value) => value.clone(),
        }
    }
}

pub(crate) fn string_items(items: &[Value]) -> Option<Vec<String>> {
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

/// Bound text: strings as-is, numbers as decimal text, absent as `""`.
pub(crate) fn bound_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// One record of the custom-field catalog supplied by the integration metadata service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldRecord {
    #[serde(alias = "field_key")]
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CustomFieldMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformed: Option<String>,
}

impl CustomFieldRecord {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into(), metadata: None }
    }

    pub fn transformed(key: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            metadata: Some(CustomFieldMetadata {
                transformed: Some(prefix.into()),
            }),
        }
    }

    pub fn transformed_prefix(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.transformed.as_deref())
            .filter(|p| !p.is_empty())
    }
}
