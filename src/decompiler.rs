//! Condition decompiler: the inverse of [`crate::compiler`].
//!
//! Conditions are emitted in a fixed order:
//!
//! 1. include rollback
//! 2. include equals (generic, custom, secondary, attributes)
//! 3. exclude not-equals, same bucket order
//! 4. exclude rollback
//! 5. partial matches
//! 6. include betweens, same bucket order

use crate::condition::{ConditionMetadata, ConditionValue, CustomFieldRecord, FilterCondition, Operator};
use crate::document::{DocumentError, QueryDocument};
use crate::resolver::{to_ui_key, FieldKeyRegistry};
use crate::wire::{self, MatchMode};
use serde_json::Value;

pub struct ConditionDecompiler<'r> {
    registry: &'r FieldKeyRegistry,
    catalog: &'r [CustomFieldRecord],
}

impl<'r> ConditionDecompiler<'r> {
    pub fn new(registry: &'r FieldKeyRegistry, catalog: &'r [CustomFieldRecord]) -> Self {
        Self { registry, catalog }
    }

    pub fn decompile(&self, document: &QueryDocument) -> Vec<FilterCondition> {
        let mut conditions = Vec::new();

        if let Some(flag) = &document.include.rollback {
            conditions.push(self.rollback_condition(Operator::Equals, flag));
        }

        // Range-shaped include values become betweens; everything else is an equals
        let (dates, normal): (Vec<_>, Vec<_>) = document
            .include
            .keyed_entries()
            .partition(|(_, _, value)| value.is_range_like());
        for (_, key, value) in normal {
            conditions.push(self.emit(key, Operator::Equals, value.clone()));
        }

        // Between has no negated form; exclude ranges come back as not-equals
        for (_, key, value) in document.exclude.keyed_entries() {
            conditions.push(self.emit(key, Operator::NotEquals, value.clone()));
        }

        if let Some(flag) = &document.exclude.rollback {
            conditions.push(self.rollback_condition(Operator::NotEquals, flag));
        }

        for (key, partial) in &document.partial_match {
            let operator = match partial.mode {
                MatchMode::Begins => Operator::StartsWith,
                MatchMode::Contains => Operator::Contains,
            };
            conditions.push(self.emit(key, operator, partial.pattern.clone()));
        }

        for (_, key, value) in dates {
            conditions.push(self.emit(key, Operator::Between, value.clone()));
        }

        tracing::debug!(conditions = conditions.len(), "decompiled query document");
        conditions
    }

    /// Parse a wire document, then decompile it.
    pub fn decompile_value(&self, document: &Value) -> Result<Vec<FilterCondition>, DocumentError> {
        let document = QueryDocument::from_wire(document)?;
        Ok(self.decompile(&document))
    }

    fn emit(&self, stored_key: &str, operator: Operator, value: ConditionValue) -> FilterCondition {
        let resolved = to_ui_key(self.registry, self.catalog, stored_key);
        FilterCondition {
            field_key: resolved.ui_key,
            operator,
            value,
            metadata: ConditionMetadata {
                transformed_prefix: resolved.transformed_prefix,
            },
        }
    }

    /// The reserved key is never renamed or restored through the catalog.
    fn rollback_condition(&self, operator: Operator, flag: &str) -> FilterCondition {
        FilterCondition::new(
            wire::ROLLBACK_KEY,
            operator,
            ConditionValue::BooleanAsString(flag.to_string()),
        )
    }
}

/// Decompile with a registry snapshot and custom-field catalog.
pub fn decompile(
    document: &QueryDocument,
    registry: &FieldKeyRegistry,
    catalog: &[CustomFieldRecord],
) -> Vec<FilterCondition> {
    ConditionDecompiler::new(registry, catalog).decompile(document)
}
