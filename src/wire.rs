//! The fixed vocabulary of the query document wire format.

/// Section holding negated (`DOES_NOT_EQUAL`) fields.
pub const EXCLUDE: &str = "exclude";
/// Section holding `STARTS_WITH` / `CONTAINS` fields, always flat.
pub const PARTIAL_MATCH: &str = "partial_match";

// Bucket names, valid at the document root and inside `exclude`
pub const CUSTOM_FIELDS: &str = "custom_fields";
pub const WORKITEM_CUSTOM_FIELDS: &str = "workitem_custom_fields";
pub const WORKITEM_ATTRIBUTES: &str = "workitem_attributes";

/// The single reserved boolean field, carried as `"true"` / `"false"`.
pub const ROLLBACK_KEY: &str = "rollback";

// Range markers
pub const GT: &str = "$gt";   // lower bound
pub const LT: &str = "$lt";   // upper bound
pub const AGE: &str = "$age"; // relative bound, seconds

// Partial match markers
pub const BEGINS: &str = "$begins";
pub const CONTAINS: &str = "$contains";

/// Keys a generic field may never take because the document layout owns them.
pub const RESERVED_KEYS: [&str; 5] = [
    EXCLUDE,
    PARTIAL_MATCH,
    CUSTOM_FIELDS,
    WORKITEM_CUSTOM_FIELDS,
    WORKITEM_ATTRIBUTES,
];

pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// The kind of a partial match entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    Begins,   // "$begins"
    Contains, // "$contains"
}

impl MatchMode {
    pub fn marker(self) -> &'static str {
        match self {
            MatchMode::Begins => BEGINS,
            MatchMode::Contains => CONTAINS,
        }
    }
}
