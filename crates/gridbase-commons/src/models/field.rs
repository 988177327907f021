//! Field (column) metadata.
//!
//! Field kinds form a closed tagged union so every visitor and converter in
//! the workspace can match exhaustively; adding a kind is a compile-time
//! event, not a runtime surprise.

use serde::{Deserialize, Serialize};

use crate::ids::{FieldId, TableId};

/// One selectable option of a single/multiple select field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: String,
    pub name: String,
}

impl SelectOption {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Closed set of field kinds, with per-kind configuration as payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Single line of text. Also the only kind a link-title lookup accepts
    /// as the foreign table's primary field.
    SingleLineText,
    /// 64-bit floating point number
    Number,
    SingleSelect { options: Vec<SelectOption> },
    MultipleSelect { options: Vec<SelectOption> },
    Checkbox,
    /// Point in time, stored as UTC
    Date,
    Attachment,
    User { multiple: bool },
    /// Link to records of another table
    Link { foreign_table_id: TableId, multiple: bool },
}

impl FieldKind {
    /// Returns the kind name for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldKind::SingleLineText => "single_line_text",
            FieldKind::Number => "number",
            FieldKind::SingleSelect { .. } => "single_select",
            FieldKind::MultipleSelect { .. } => "multiple_select",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Date => "date",
            FieldKind::Attachment => "attachment",
            FieldKind::User { .. } => "user",
            FieldKind::Link { .. } => "link",
        }
    }
}

/// A table field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub name: String,
    pub kind: FieldKind,
    /// Computed fields (formula/rollup outputs) are never user-writable.
    #[serde(default)]
    pub is_computed: bool,
    /// Raw default applied on record creation when the field key is absent
    /// from the caller input. Converted with typecast semantics because it
    /// originates from configuration, not untrusted input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
}

impl Field {
    pub fn new(id: FieldId, name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            is_computed: false,
            default_value: None,
        }
    }

    pub fn computed(mut self) -> Self {
        self.is_computed = true;
        self
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default_value = Some(default);
        self
    }

    /// Looks up a select option by display name. Only meaningful for
    /// select kinds; other kinds have no options.
    pub fn select_option_by_name(&self, name: &str) -> Option<&SelectOption> {
        let options = match &self.kind {
            FieldKind::SingleSelect { options } | FieldKind::MultipleSelect { options } => options,
            _ => return None,
        };
        options.iter().find(|o| o.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(FieldKind::SingleLineText.kind_name(), "single_line_text");
        assert_eq!(
            FieldKind::Link {
                foreign_table_id: TableId::new("tbl1"),
                multiple: true
            }
            .kind_name(),
            "link"
        );
    }

    #[test]
    fn test_select_option_lookup() {
        let field = Field::new(
            FieldId::new("fld1"),
            "Status",
            FieldKind::SingleSelect {
                options: vec![
                    SelectOption::new("opt1", "Todo"),
                    SelectOption::new("opt2", "Done"),
                ],
            },
        );
        assert_eq!(field.select_option_by_name("Done").unwrap().id, "opt2");
        assert!(field.select_option_by_name("Missing").is_none());
    }

    #[test]
    fn test_select_option_lookup_on_non_select() {
        let field = Field::new(FieldId::new("fld1"), "Name", FieldKind::SingleLineText);
        assert!(field.select_option_by_name("anything").is_none());
    }

    #[test]
    fn test_field_serialization_tags_kind() {
        let field = Field::new(FieldId::new("fld1"), "Done", FieldKind::Checkbox);
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["kind"]["type"], "checkbox");
    }
}
