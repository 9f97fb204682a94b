//! Typed query document and its two-tier wire form.
//!
//! ```text
//! {
//!   <generic_key>: <value>,
//!   custom_fields: {..}, workitem_custom_fields: {..}, workitem_attributes: {..},
//!   rollback: "true" | "false",
//!   exclude: { <same layout> },
//!   partial_match: { <backend_key>: { "$begins" | "$contains": <value> } }
//! }
//! ```

use crate::condition::ConditionValue;
use crate::resolver::BucketKind;
use crate::sanitize::sanitize_object;
use crate::wire::{self, MatchMode};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("`{path}` must be a JSON object")]
    NotAnObject { path: String },
}

/// Fields of one section (`include` at the root, or `exclude`), split by bucket
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldBucketMap {
    /// Keyed by the raw field key
    pub generic: IndexMap<String, ConditionValue>,
    /// Keyed by the UI key
    pub custom_fields: IndexMap<String, ConditionValue>,
    /// Keyed by the key with its transformed prefix stripped
    pub secondary_custom_fields: IndexMap<String, ConditionValue>,
    pub attributes: IndexMap<String, ConditionValue>,
    /// `"true"` / `"false"`
    pub rollback: Option<String>,
}

impl FieldBucketMap {
    pub fn is_empty(&self) -> bool {
        self.generic.is_empty()
            && self.custom_fields.is_empty()
            && self.secondary_custom_fields.is_empty()
            && self.attributes.is_empty()
            && self.rollback.is_none()
    }

    /// The keyed bucket for a kind; `None` for rollback, which is a single slot.
    pub fn bucket(&self, kind: BucketKind) -> Option<&IndexMap<String, ConditionValue>> {
        match kind {
            BucketKind::Generic => Some(&self.generic),
            BucketKind::CustomField => Some(&self.custom_fields),
            BucketKind::SecondaryCustomField => Some(&self.secondary_custom_fields),
            BucketKind::Attribute => Some(&self.attributes),
            BucketKind::Rollback => None,
        }
    }

    pub fn bucket_mut(&mut self, kind: BucketKind) -> Option<&mut IndexMap<String, ConditionValue>> {
        match kind {
            BucketKind::Generic => Some(&mut self.generic),
            BucketKind::CustomField => Some(&mut self.custom_fields),
            BucketKind::SecondaryCustomField => Some(&mut self.secondary_custom_fields),
            BucketKind::Attribute => Some(&mut self.attributes),
            BucketKind::Rollback => None,
        }
    }

    /// Keyed buckets in emission order: generic, custom, secondary, attributes
    pub fn keyed_entries(&self) -> impl Iterator<Item = (BucketKind, &String, &ConditionValue)> {
        const ORDER: [BucketKind; 4] = [
            BucketKind::Generic,
            BucketKind::CustomField,
            BucketKind::SecondaryCustomField,
            BucketKind::Attribute,
        ];
        ORDER.into_iter().flat_map(move |kind| {
            self.bucket(kind)
                .into_iter()
                .flat_map(move |bucket| bucket.iter().map(move |(k, v)| (kind, k, v)))
        })
    }

    fn write_wire(&self, out: &mut Map<String, Value>) {
        for (key, value) in &self.generic {
            out.insert(key.clone(), value.to_wire());
        }
        for kind in [
            BucketKind::CustomField,
            BucketKind::SecondaryCustomField,
            BucketKind::Attribute,
        ] {
            if let (Some(name), Some(bucket)) = (kind.wire_name(), self.bucket(kind)) {
                let nested: Map<String, Value> =
                    bucket.iter().map(|(k, v)| (k.clone(), v.to_wire())).collect();
                out.insert(name.to_string(), Value::Object(nested));
            }
        }
        if let Some(flag) = &self.rollback {
            out.insert(wire::ROLLBACK_KEY.to_string(), Value::String(flag.clone()));
        }
    }

    /// Reads a section, skipping the keys in `skip` (the root's nested sections).
    fn read_wire(map: &Map<String, Value>, path: &str, skip: &[&str]) -> Result<Self, DocumentError> {
        let mut fields = FieldBucketMap::default();
        for (key, value) in map {
            if skip.contains(&key.as_str()) {
                continue;
            }
            let kind = match key.as_str() {
                wire::CUSTOM_FIELDS => BucketKind::CustomField,
                wire::WORKITEM_CUSTOM_FIELDS => BucketKind::SecondaryCustomField,
                wire::WORKITEM_ATTRIBUTES => BucketKind::Attribute,
                wire::ROLLBACK_KEY => {
                    fields.rollback = Some(match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    });
                    continue;
                }
                _ => {
                    fields.generic.insert(key.clone(), ConditionValue::from_wire(value));
                    continue;
                }
            };
            let nested = value.as_object().ok_or_else(|| DocumentError::NotAnObject {
                path: join_path(path, key),
            })?;
            if let Some(bucket) = fields.bucket_mut(kind) {
                for (k, v) in nested {
                    bucket.insert(k.clone(), ConditionValue::from_wire(v));
                }
            }
        }
        Ok(fields)
    }
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// One `STARTS_WITH` / `CONTAINS` entry
#[derive(Debug, Clone, PartialEq)]
pub struct PartialMatch {
    pub mode: MatchMode,
    pub pattern: ConditionValue,
}

impl PartialMatch {
    fn to_wire(&self) -> Value {
        let mut map = Map::new();
        map.insert(self.mode.marker().to_string(), self.pattern.to_wire());
        Value::Object(map)
    }

    /// `$contains` wins when both markers are present; `None` when neither is.
    fn from_wire(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        [MatchMode::Contains, MatchMode::Begins]
            .into_iter()
            .find_map(|mode| {
                map.get(mode.marker()).map(|pattern| PartialMatch {
                    mode,
                    pattern: ConditionValue::from_wire(pattern),
                })
            })
    }
}

/// The backend-facing query document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryDocument {
    pub include: FieldBucketMap,
    pub exclude: FieldBucketMap,
    pub partial_match: IndexMap<String, PartialMatch>,
}

impl QueryDocument {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty() && self.partial_match.is_empty()
    }

    /// Wire layout before pruning; every section and bucket is present.
    pub fn to_wire_unsanitized(&self) -> Map<String, Value> {
        let mut root = Map::new();
        self.include.write_wire(&mut root);

        let mut exclude = Map::new();
        self.exclude.write_wire(&mut exclude);
        root.insert(wire::EXCLUDE.to_string(), Value::Object(exclude));

        let partial: Map<String, Value> = self
            .partial_match
            .iter()
            .map(|(k, m)| (k.clone(), m.to_wire()))
            .collect();
        root.insert(wire::PARTIAL_MATCH.to_string(), Value::Object(partial));
        root
    }

    /// Sanitized wire form: no empty bucket, section, or value.
    pub fn to_wire(&self) -> Value {
        Value::Object(sanitize_object(&self.to_wire_unsanitized()))
    }

    pub fn from_wire(value: &Value) -> Result<Self, DocumentError> {
        let root = value.as_object().ok_or_else(|| DocumentError::NotAnObject {
            path: "$".to_string(),
        })?;

        let include = FieldBucketMap::read_wire(root, "", &[wire::EXCLUDE, wire::PARTIAL_MATCH])?;

        let exclude = match root.get(wire::EXCLUDE) {
            None | Some(Value::Null) => FieldBucketMap::default(),
            Some(Value::Object(map)) => FieldBucketMap::read_wire(map, wire::EXCLUDE, &[])?,
            Some(_) => {
                return Err(DocumentError::NotAnObject {
                    path: wire::EXCLUDE.to_string(),
                })
            }
        };

        let mut partial_match = IndexMap::new();
        match root.get(wire::PARTIAL_MATCH) {
            None | Some(Value::Null) => {}
            Some(Value::Object(map)) => {
                for (key, entry) in map {
                    match PartialMatch::from_wire(entry) {
                        Some(m) => {
                            partial_match.insert(key.clone(), m);
                        }
                        None => tracing::debug!(key = %key, "skipping partial match entry without a marker"),
                    }
                }
            }
            Some(_) => {
                return Err(DocumentError::NotAnObject {
                    path: wire::PARTIAL_MATCH.to_string(),
                })
            }
        }

        Ok(Self {
            include,
            exclude,
            partial_match,
        })
    }
}

impl Serialize for QueryDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for QueryDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        QueryDocument::from_wire(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reads_two_tier_layout() {
        let wire = json!({
            "status": "open",
            "custom_fields": {"customfield_1": ["a"]},
            "workitem_custom_fields": {"storypoints": "5"},
            "workitem_attributes": {"teams": "core"},
            "rollback": "true",
            "exclude": {"custom_fields": {"custom_field_team": "ops"}, "rollback": false},
            "partial_match": {"title": {"$contains": "bug"}, "name": {"$begins": "foo"}}
        });
        let doc = QueryDocument::from_wire(&wire).unwrap();

        assert_eq!(doc.include.generic.get("status"), Some(&ConditionValue::scalar("open")));
        assert_eq!(
            doc.include.custom_fields.get("customfield_1"),
            Some(&ConditionValue::List(vec!["a".to_string()]))
        );
        assert_eq!(doc.include.secondary_custom_fields.len(), 1);
        assert_eq!(doc.include.attributes.len(), 1);
        assert_eq!(doc.include.rollback.as_deref(), Some("true"));
        assert_eq!(doc.exclude.rollback.as_deref(), Some("false"));
        assert!(doc.exclude.generic.is_empty());
        assert_eq!(doc.partial_match["title"].mode, MatchMode::Contains);
        assert_eq!(doc.partial_match["name"].mode, MatchMode::Begins);
        assert!(!doc.include.generic.contains_key("exclude"));
    }

    #[test]
    fn test_wire_form_omits_empty_sections() {
        let mut doc = QueryDocument::default();
        doc.include.generic.insert("status".to_string(), ConditionValue::scalar("open"));
        assert_eq!(doc.to_wire(), json!({"status": "open"}));
        assert_eq!(QueryDocument::default().to_wire(), json!({}));
    }

    #[test]
    fn test_rejects_non_object_sections() {
        assert_eq!(
            QueryDocument::from_wire(&json!([])),
            Err(DocumentError::NotAnObject { path: "$".to_string() })
        );
        assert_eq!(
            QueryDocument::from_wire(&json!({"exclude": {"custom_fields": "x"}})),
            Err(DocumentError::NotAnObject { path: "exclude.custom_fields".to_string() })
        );
        assert!(QueryDocument::from_wire(&json!({"partial_match": 3})).is_err());
    }

    #[test]
    fn test_partial_entry_without_marker_is_skipped() {
        let doc = QueryDocument::from_wire(&json!({
            "partial_match": {"title": {"$regex": "x"}, "name": {"$begins": "a", "$contains": "b"}}
        }))
        .unwrap();
        assert_eq!(doc.partial_match.len(), 1);
        assert_eq!(doc.partial_match["name"].mode, MatchMode::Contains);
    }

    #[test]
    fn test_serde_goes_through_wire_form() {
        let doc: QueryDocument =
            serde_json::from_value(json!({"workitem_attributes": {"code_area": "a/b"}})).unwrap();
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({"workitem_attributes": {"code_area": "a/b"}})
        );
    }
}
