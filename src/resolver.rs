//! Field key routing: bucket classification and UI/backend key mapping.

use crate::condition::CustomFieldRecord;
use crate::wire;
use indexmap::IndexMap;
use std::collections::HashMap;

/// The namespace a field key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketKind {
    Generic,
    CustomField,
    SecondaryCustomField,
    Attribute,
    Rollback,
}

impl BucketKind {
    /// Name of the nested bucket on the wire, `None` for keys that sit flat in their section
    pub fn wire_name(self) -> Option<&'static str> {
        match self {
            BucketKind::CustomField => Some(wire::CUSTOM_FIELDS),
            BucketKind::SecondaryCustomField => Some(wire::WORKITEM_CUSTOM_FIELDS),
            BucketKind::Attribute => Some(wire::WORKITEM_ATTRIBUTES),
            BucketKind::Generic | BucketKind::Rollback => None,
        }
    }
}

/// Prefix and membership rules used by [`BucketRules::classify`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRules {
    pub custom_field_prefixes: Vec<String>,
    pub secondary_custom_field_prefixes: Vec<String>,
    pub attribute_keys: Vec<String>,
}

impl Default for BucketRules {
    fn default() -> Self {
        Self {
            custom_field_prefixes: vec!["customfield_".to_string(), "custom_field_".to_string()],
            secondary_custom_field_prefixes: vec!["wi_".to_string()],
            attribute_keys: vec!["teams".to_string(), "code_area".to_string()],
        }
    }
}

impl BucketRules {
    /// Classifies a key. First match wins: rollback, custom prefix,
    /// secondary prefix, attribute set, generic.
    pub fn classify(&self, field_key: &str) -> BucketKind {
        if field_key == wire::ROLLBACK_KEY {
            BucketKind::Rollback
        } else if has_prefix(field_key, &self.custom_field_prefixes) {
            BucketKind::CustomField
        } else if has_prefix(field_key, &self.secondary_custom_field_prefixes) {
            BucketKind::SecondaryCustomField
        } else if self.attribute_keys.iter().any(|k| k == field_key) {
            BucketKind::Attribute
        } else {
            BucketKind::Generic
        }
    }
}

fn has_prefix(key: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| !p.is_empty() && key.starts_with(p.as_str()))
}

/// Read-only snapshot of the key mapping tables.
///
/// The forward map goes backend key -> UI key. The reverse map is derived
/// from it; when two backend keys share a UI key the first one wins.
/// Aliases map a historical spelling onto its canonical backend key; only
/// `to_backend_key` consults them.
#[derive(Debug, Clone, Default)]
pub struct FieldKeyRegistry {
    ui_keys: IndexMap<String, String>,
    backend_keys: HashMap<String, String>,
    aliases: HashMap<String, String>,
    rules: BucketRules,
}

impl FieldKeyRegistry {
    pub fn new(forward: IndexMap<String, String>, aliases: HashMap<String, String>, rules: BucketRules) -> Self {
        let mut backend_keys = HashMap::with_capacity(forward.len());
        for (backend, ui) in &forward {
            backend_keys.entry(ui.clone()).or_insert_with(|| backend.clone());
        }
        Self {
            ui_keys: forward,
            backend_keys,
            aliases,
            rules,
        }
    }

    /// Registry with the built-in forward map, alias table and default rules.
    pub fn with_defaults() -> Self {
        Self::new(default_field_keys(), default_aliases(), BucketRules::default())
    }

    pub fn rules(&self) -> &BucketRules {
        &self.rules
    }

    /// Raw forward lookup, backend -> UI
    pub fn ui_key_for(&self, backend_key: &str) -> Option<&str> {
        self.ui_keys.get(backend_key).map(String::as_str)
    }

    /// Raw reverse lookup, UI -> backend
    pub fn backend_key_for(&self, ui_key: &str) -> Option<&str> {
        self.backend_keys.get(ui_key).map(String::as_str)
    }

    /// Canonical spelling for a key with more than one historical spelling
    pub fn canonical_alias(&self, key: &str) -> Option<&str> {
        self.aliases.get(key).map(String::as_str)
    }
}

/// `job_normalized_full_names` has two backend spellings; the singular one is canonical.
// TODO: confirm with product whether the plural backend spelling still occurs in saved definitions.
/// Built-in forward map; the canonical job name key surfaces under its plural UI spelling.
pub fn default_field_keys() -> IndexMap<String, String> {
    IndexMap::from([(
        "job_normalized_full_name".to_string(),
        "job_normalized_full_names".to_string(),
    )])
}

pub fn default_aliases() -> HashMap<String, String> {
    HashMap::from([(
        "job_normalized_full_names".to_string(),
        "job_normalized_full_name".to_string(),
    )])
}

pub fn to_bucket(registry: &FieldKeyRegistry, field_key: &str) -> BucketKind {
    registry.rules().classify(field_key)
}

/// UI key -> backend key, identity when the registry has no mapping.
pub fn to_backend_key(registry: &FieldKeyRegistry, ui_key: &str) -> String {
    if let Some(canonical) = registry.canonical_alias(ui_key) {
        return canonical.to_string();
    }
    registry.backend_key_for(ui_key).unwrap_or(ui_key).to_string()
}

/// A key resolved for the UI, along with the prefix restored from the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    pub ui_key: String,
    pub transformed_prefix: Option<String>,
}

/// Stored document key -> UI key.
///
/// Catalog restore runs first, then the forward lookup; unmatched keys come
/// back unchanged. Aliases only apply towards the backend.
pub fn to_ui_key(registry: &FieldKeyRegistry, catalog: &[CustomFieldRecord], stored_key: &str) -> ResolvedKey {
    let (key, transformed_prefix) = match restore_transformed_key(catalog, stored_key) {
        Some(record) => {
            tracing::trace!(stored_key, restored = %record.key, "restored transformed custom field key");
            (record.key.as_str(), record.transformed_prefix().map(str::to_string))
        }
        None => (stored_key, None),
    };
    let ui_key = registry.ui_key_for(key).unwrap_or(key).to_string();
    ResolvedKey { ui_key, transformed_prefix }
}

/// Strips a recorded prefix from the front of a key; `None` if the key does not carry it.
pub fn strip_transformed_prefix<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return None;
    }
    key.strip_prefix(prefix)
}

/// Finds the catalog record whose key, once stripped of its recorded prefix,
/// is exactly `stored_key`.
pub fn restore_transformed_key<'c>(catalog: &'c [CustomFieldRecord], stored_key: &str) -> Option<&'c CustomFieldRecord> {
    catalog.iter().find(|record| {
        record
            .transformed_prefix()
            .and_then(|prefix| strip_transformed_prefix(&record.key, prefix))
            == Some(stored_key)
    })
}
