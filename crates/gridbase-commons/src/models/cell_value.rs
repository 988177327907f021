//! Cell values.
//!
//! `CellValue` is a closed tagged union over the supported field kinds.
//! `Null` is a first-class state distinct from "absent" (a record that never
//! had a field set reads as `Null`, but a paste can explicitly write `Null`
//! over an old value and that difference matters for events and undo).
//!
//! Invariant: instances are constructed from already-validated input; the
//! builder and resolvers are the only producers, and they validate or
//! typecast before constructing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{RecordId, UserId};
use crate::models::attachment::AttachmentItem;

/// One collaborator referenced by a user cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCellItem {
    pub id: UserId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserCellItem {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// One linked foreign record. The title is denormalized for display and may
/// lag behind the foreign record's actual primary value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkItem {
    pub record_id: RecordId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl LinkItem {
    pub fn new(record_id: RecordId) -> Self {
        Self {
            record_id,
            title: None,
        }
    }

    pub fn titled(record_id: RecordId, title: impl Into<String>) -> Self {
        Self {
            record_id,
            title: Some(title.into()),
        }
    }
}

/// A validated cell value. Equality is value-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    Null,
    Text(String),
    Number(f64),
    Checkbox(bool),
    Date(DateTime<Utc>),
    SingleSelect(String),
    MultipleSelect(Vec<String>),
    Attachments(Vec<AttachmentItem>),
    /// Single-collaborator cell (user field with `multiple: false`)
    User(UserCellItem),
    /// Multi-collaborator cell (user field with `multiple: true`)
    Users(Vec<UserCellItem>),
    Links(Vec<LinkItem>),
}

impl CellValue {
    pub const NULL: CellValue = CellValue::Null;

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Returns the variant name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Null => "null",
            CellValue::Text(_) => "text",
            CellValue::Number(_) => "number",
            CellValue::Checkbox(_) => "checkbox",
            CellValue::Date(_) => "date",
            CellValue::SingleSelect(_) => "single_select",
            CellValue::MultipleSelect(_) => "multiple_select",
            CellValue::Attachments(_) => "attachments",
            CellValue::User(_) => "user",
            CellValue::Users(_) => "users",
            CellValue::Links(_) => "links",
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Null
    }
}
