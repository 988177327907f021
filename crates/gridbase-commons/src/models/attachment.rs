//! Attachment cell items and their unresolved/stored counterparts.

use serde::{Deserialize, Serialize};

use crate::ids::AttachmentId;

/// Fully resolved attachment item as stored in a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentItem {
    pub id: AttachmentId,
    pub name: String,
    pub token: String,
    pub path: String,
    pub size: u64,
    pub mimetype: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Raw attachment reference supplied by a caller, before resolution.
///
/// Carries a token (preferred) or a business id (fallback). An input with
/// neither is malformed and rejected by the attachment resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<AttachmentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Display name override; falls back to the stored name when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AttachmentInput {
    pub fn by_token(token: impl Into<String>) -> Self {
        Self {
            id: None,
            token: Some(token.into()),
            name: None,
        }
    }

    pub fn by_id(id: AttachmentId) -> Self {
        Self {
            id: Some(id),
            token: None,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Attachment metadata as returned by the attachment lookup port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAttachment {
    pub id: AttachmentId,
    pub token: String,
    pub name: String,
    pub path: String,
    pub size: u64,
    pub mimetype: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl StoredAttachment {
    /// Builds the cell item for this stored attachment under the given id
    /// and display name.
    pub fn into_item(self, id: AttachmentId, name: Option<String>) -> AttachmentItem {
        AttachmentItem {
            id,
            name: name.unwrap_or(self.name),
            token: self.token,
            path: self.path,
            size: self.size,
            mimetype: self.mimetype,
            width: self.width,
            height: self.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_item_keeps_stored_metadata() {
        let stored = StoredAttachment {
            id: AttachmentId::new("attstored1"),
            token: "tok1".to_string(),
            name: "photo.png".to_string(),
            path: "/objects/tok1".to_string(),
            size: 1024,
            mimetype: "image/png".to_string(),
            width: Some(64),
            height: Some(64),
        };
        let item = stored.into_item(AttachmentId::new("attfresh1"), None);
        assert_eq!(item.id.as_str(), "attfresh1");
        assert_eq!(item.name, "photo.png");
        assert_eq!(item.path, "/objects/tok1");
        assert_eq!(item.size, 1024);
    }

    #[test]
    fn test_into_item_name_override() {
        let stored = StoredAttachment {
            id: AttachmentId::new("att1"),
            token: "tok1".to_string(),
            name: "upload.bin".to_string(),
            path: "/objects/tok1".to_string(),
            size: 10,
            mimetype: "application/octet-stream".to_string(),
            width: None,
            height: None,
        };
        let item = stored.into_item(AttachmentId::new("att1"), Some("renamed.bin".to_string()));
        assert_eq!(item.name, "renamed.bin");
    }
}
