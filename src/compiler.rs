//! Condition compiler that folds flat UI conditions into a bucketed query document.

use crate::condition::{ConditionValue, FilterCondition, Operator};
use crate::document::{DocumentError, FieldBucketMap, PartialMatch, QueryDocument};
use crate::resolver::{strip_transformed_prefix, to_backend_key, to_bucket, BucketKind, FieldKeyRegistry};
use crate::rows::{self, RowError};
use crate::sanitize::sanitize_object;
use crate::wire::{self, MatchMode};
use serde_json::Value;

/// Errors raised while compiling a batch. The whole batch is rejected on the first one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Row(#[from] RowError),
    #[error("condition #{index} (`{key}`): {operator} does not accept a {found} value")]
    InvalidValue {
        index: usize,
        key: String,
        operator: Operator,
        found: &'static str,
    },
    #[error("condition #{index}: `{key}` is reserved by the query document layout")]
    ReservedKey { index: usize, key: String },
    #[error("condition #{index}: {operator} is not supported on `{key}`")]
    UnsupportedOperator {
        index: usize,
        key: String,
        operator: Operator,
    },
    #[error("compiled document is malformed: {0}")]
    Document(#[from] DocumentError),
}

impl CompileError {
    /// Index of the offending condition, when the error is tied to one
    pub fn index(&self) -> Option<usize> {
        match self {
            CompileError::Row(RowError::InvalidOperator { index, .. })
            | CompileError::Row(RowError::MalformedRow { index, .. })
            | CompileError::InvalidValue { index, .. }
            | CompileError::ReservedKey { index, .. }
            | CompileError::UnsupportedOperator { index, .. } => Some(*index),
            CompileError::Document(_) => None,
        }
    }
}

/// Compiler over a borrowed registry snapshot
pub struct ConditionCompiler<'r> {
    registry: &'r FieldKeyRegistry,
}

impl<'r> ConditionCompiler<'r> {
    pub fn new(registry: &'r FieldKeyRegistry) -> Self {
        Self { registry }
    }

    /// Compile conditions into a sanitized query document.
    ///
    /// The returned document has no empty bucket or value; its `exclude`
    /// and `partial_match` fields are always present, possibly empty.
    pub fn compile(&self, conditions: &[FilterCondition]) -> Result<QueryDocument, CompileError> {
        let mut document = QueryDocument::default();
        for (index, condition) in conditions.iter().enumerate() {
            self.fold_condition(index, condition, &mut document)?;
        }

        // Sanitization decides what survives; the typed document is rebuilt from its output
        let sanitized = sanitize_object(&document.to_wire_unsanitized());
        let compiled = QueryDocument::from_wire(&Value::Object(sanitized))?;

        tracing::debug!(
            conditions = conditions.len(),
            partial_matches = compiled.partial_match.len(),
            "compiled filter conditions"
        );
        Ok(compiled)
    }

    /// Parse UI rows, then compile them.
    pub fn compile_rows(&self, rows: &Value) -> Result<QueryDocument, CompileError> {
        let conditions = rows::parse_rows(rows)?;
        self.compile(&conditions)
    }

    fn fold_condition(
        &self,
        index: usize,
        condition: &FilterCondition,
        document: &mut QueryDocument,
    ) -> Result<(), CompileError> {
        let key = condition.field_key.as_str();
        tracing::trace!(index, key, operator = %condition.operator, "folding condition");

        match condition.operator {
            Operator::Equals => {
                self.place(index, condition, condition.value.clone(), &mut document.include)
            }
            Operator::NotEquals => {
                self.place(index, condition, condition.value.clone(), &mut document.exclude)
            }
            Operator::StartsWith | Operator::Contains => {
                if condition.value.is_range_like() {
                    return Err(self.invalid_value(index, condition));
                }
                let mode = if condition.operator == Operator::StartsWith {
                    MatchMode::Begins
                } else {
                    MatchMode::Contains
                };
                let backend_key = to_backend_key(self.registry, payload_key(condition));
                document.partial_match.insert(
                    backend_key,
                    PartialMatch {
                        mode,
                        pattern: condition.value.clone(),
                    },
                );
                Ok(())
            }
            Operator::Between => {
                if to_bucket(self.registry, key) == BucketKind::Rollback {
                    return Err(CompileError::UnsupportedOperator {
                        index,
                        key: key.to_string(),
                        operator: condition.operator,
                    });
                }
                // An empty value stays as an explicit empty range; sanitization prunes it
                let value = if condition.value.is_empty() {
                    ConditionValue::empty_range()
                } else if condition.value.is_range_like() {
                    condition.value.clone()
                } else {
                    return Err(self.invalid_value(index, condition));
                };
                self.place(index, condition, value, &mut document.include)
            }
        }
    }

    /// Write a value into the bucket its key classifies into.
    fn place(
        &self,
        index: usize,
        condition: &FilterCondition,
        value: ConditionValue,
        fields: &mut FieldBucketMap,
    ) -> Result<(), CompileError> {
        let key = condition.field_key.as_str();
        let kind = to_bucket(self.registry, key);
        let bucket_key = match kind {
            BucketKind::Rollback => {
                fields.rollback = Some(rollback_literal(&value).to_string());
                return Ok(());
            }
            BucketKind::Generic if wire::is_reserved(key) => {
                return Err(CompileError::ReservedKey {
                    index,
                    key: key.to_string(),
                });
            }
            BucketKind::SecondaryCustomField => payload_key(condition),
            BucketKind::Generic | BucketKind::CustomField | BucketKind::Attribute => key,
        };
        if let Some(bucket) = fields.bucket_mut(kind) {
            bucket.insert(bucket_key.to_string(), value);
        }
        Ok(())
    }

    fn invalid_value(&self, index: usize, condition: &FilterCondition) -> CompileError {
        CompileError::InvalidValue {
            index,
            key: condition.field_key.clone(),
            operator: condition.operator,
            found: condition.value.kind(),
        }
    }
}

/// Key with its recorded transformed prefix removed, when it carries one
fn payload_key(condition: &FilterCondition) -> &str {
    let key = condition.field_key.as_str();
    condition
        .metadata
        .transformed_prefix
        .as_deref()
        .and_then(|prefix| strip_transformed_prefix(key, prefix))
        .unwrap_or(key)
}

/// Anything other than a literal `"true"` is `"false"`.
fn rollback_literal(value: &ConditionValue) -> &'static str {
    let is_true = match value {
        ConditionValue::Opaque(Value::Bool(flag)) => *flag,
        other => other.as_text() == Some("true"),
    };
    if is_true {
        "true"
    } else {
        "false"
    }
}

/// Compile with a registry snapshot.
pub fn compile(conditions: &[FilterCondition], registry: &FieldKeyRegistry) -> Result<QueryDocument, CompileError> {
    ConditionCompiler::new(registry).compile(conditions)
}
