//! Typed identifiers.
//!
//! Every entity kind gets its own newtype so ids cannot be mixed up at
//! compile time. Generated ids follow the `{prefix}{hex}` shape with a
//! fixed overall length of 16 characters (e.g. `rec3f9a1c07b2d4e8`-style,
//! truncated to 16), seeded from a v4 UUID.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall length of a generated id, prefix included.
pub const GENERATED_ID_LEN: usize = 16;

/// Generates a prefixed random id of [`GENERATED_ID_LEN`] characters.
///
/// The prefix identifies the entity kind ("rec", "fld", "att", ...); the
/// remainder is hex from a v4 UUID. Uniqueness within a batch is the
/// caller's concern (see the attachment resolver, which de-duplicates
/// within one resolve call).
pub fn generate_prefixed_id(prefix: &str) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    let body_len = GENERATED_ID_LEN.saturating_sub(prefix.len());
    format!("{}{}", prefix, &hex[..body_len])
}

/// Identifier of a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(String);

impl TableId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(generate_prefixed_id("tbl"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a record within a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(generate_prefixed_id("rec"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a field (column) within a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(generate_prefixed_id("fld"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a view over a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(String);

impl ViewId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(generate_prefixed_id("viw"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a stored attachment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentId(String);

impl AttachmentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh `att`-prefixed id.
    pub fn generate() -> Self {
        Self(generate_prefixed_id("att"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_length_and_prefix() {
        let id = generate_prefixed_id("att");
        assert_eq!(id.len(), GENERATED_ID_LEN);
        assert!(id.starts_with("att"));
    }

    #[test]
    fn test_generated_ids_differ() {
        let a = AttachmentId::generate();
        let b = AttachmentId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_record_id_roundtrip() {
        let id = RecordId::new("rec123");
        assert_eq!(id.as_str(), "rec123");
        assert_eq!(format!("{}", id), "rec123");

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"rec123\"");
        let back: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn test_field_id_generate_prefix() {
        let id = FieldId::generate();
        assert!(id.as_str().starts_with("fld"));
        assert_eq!(id.as_str().len(), GENERATED_ID_LEN);
    }
}
