//! Typed cell-value specifications, one per field kind.
//!
//! Each spec is an immutable command object pairing a field id with a
//! validated value. Cell-value specs are mutate-only: they are always
//! "satisfied" as predicates and their work happens in `mutate`. The
//! `SetLinkValueByTitle`, `SetUserValueByIdentifier` and
//! `SetUnresolvedAttachmentValue` variants carry raw external references
//! and must be rewritten by a resolver before they can mutate.

use chrono::{DateTime, Utc};

use gridbase_commons::models::attachment::AttachmentInput;
use gridbase_commons::{
    AttachmentItem, CellValue, DomainError, DomainResult, Field, FieldId, LinkItem, TableId,
    TableRecord, UserCellItem, ViewId,
};

use crate::visitor::SpecVisitor;

/// Value of a select spec: option display names, validated against the
/// field's option set (strict) or filtered to it (typecast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectValue {
    Single(String),
    Multiple(Vec<String>),
}

/// Resolved user cell content, preserving single-vs-array multiplicity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserSelection {
    Single(UserCellItem),
    Multiple(Vec<UserCellItem>),
}

/// Raw user identifiers awaiting resolution (ids, emails, names, "me"),
/// preserving single-vs-array multiplicity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIdentifiers {
    Single(String),
    Multiple(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetTextValueSpec {
    pub field_id: FieldId,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetNumberValueSpec {
    pub field_id: FieldId,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetSelectValueSpec {
    pub field_id: FieldId,
    pub value: Option<SelectValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetCheckboxValueSpec {
    pub field_id: FieldId,
    pub value: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetDateValueSpec {
    pub field_id: FieldId,
    pub value: Option<DateTime<Utc>>,
}

/// Resolved attachment cell content.
#[derive(Debug, Clone, PartialEq)]
pub struct SetAttachmentValueSpec {
    pub field_id: FieldId,
    pub value: Option<Vec<AttachmentItem>>,
}

/// Attachment references as supplied by the caller; resolved by the
/// attachment resolver into a [`SetAttachmentValueSpec`].
#[derive(Debug, Clone, PartialEq)]
pub struct SetUnresolvedAttachmentValueSpec {
    pub field_id: FieldId,
    pub value: Option<Vec<AttachmentInput>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetUserValueSpec {
    pub field_id: FieldId,
    pub value: Option<UserSelection>,
}

/// User references by raw identifier; resolved into a [`SetUserValueSpec`].
#[derive(Debug, Clone, PartialEq)]
pub struct SetUserValueByIdentifierSpec {
    pub field_id: FieldId,
    pub identifiers: Option<UserIdentifiers>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetLinkValueSpec {
    pub field_id: FieldId,
    pub value: Option<Vec<LinkItem>>,
}

/// Link references by foreign record title; resolved into a
/// [`SetLinkValueSpec`]. Unmatched titles are dropped, not errors.
#[derive(Debug, Clone, PartialEq)]
pub struct SetLinkValueByTitleSpec {
    pub field_id: FieldId,
    pub foreign_table_id: TableId,
    pub titles: Option<Vec<String>>,
    pub multiple: bool,
}

/// Clears a field. Carries the whole [`Field`] (not just the id) so storage
/// adapters can special-case their native clear per field kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ClearFieldValueSpec {
    pub field: Field,
}

/// Sets the per-view row-order system column. The in-memory mutate is
/// identity: row order only becomes visible after the storage round-trip,
/// the record's in-memory state is not authoritative for it.
#[derive(Debug, Clone, PartialEq)]
pub struct SetRowOrderValueSpec {
    pub view_id: ViewId,
    pub order: f64,
}

/// Closed union over the cell-value spec family.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValueSpec {
    Text(SetTextValueSpec),
    Number(SetNumberValueSpec),
    Select(SetSelectValueSpec),
    Checkbox(SetCheckboxValueSpec),
    Date(SetDateValueSpec),
    Attachment(SetAttachmentValueSpec),
    UnresolvedAttachment(SetUnresolvedAttachmentValueSpec),
    User(SetUserValueSpec),
    UserByIdentifier(SetUserValueByIdentifierSpec),
    Link(SetLinkValueSpec),
    LinkByTitle(SetLinkValueByTitleSpec),
    Clear(ClearFieldValueSpec),
    RowOrder(SetRowOrderValueSpec),
}

impl CellValueSpec {
    /// The target field, when the spec addresses a user field (row-order
    /// targets a system column instead).
    pub fn field_id(&self) -> Option<&FieldId> {
        match self {
            CellValueSpec::Text(s) => Some(&s.field_id),
            CellValueSpec::Number(s) => Some(&s.field_id),
            CellValueSpec::Select(s) => Some(&s.field_id),
            CellValueSpec::Checkbox(s) => Some(&s.field_id),
            CellValueSpec::Date(s) => Some(&s.field_id),
            CellValueSpec::Attachment(s) => Some(&s.field_id),
            CellValueSpec::UnresolvedAttachment(s) => Some(&s.field_id),
            CellValueSpec::User(s) => Some(&s.field_id),
            CellValueSpec::UserByIdentifier(s) => Some(&s.field_id),
            CellValueSpec::Link(s) => Some(&s.field_id),
            CellValueSpec::LinkByTitle(s) => Some(&s.field_id),
            CellValueSpec::Clear(s) => Some(&s.field.id),
            CellValueSpec::RowOrder(_) => None,
        }
    }

    /// True for specs that still reference external keys and must pass
    /// through a resolver before mutating.
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self,
            CellValueSpec::UnresolvedAttachment(_)
                | CellValueSpec::UserByIdentifier(_)
                | CellValueSpec::LinkByTitle(_)
        )
    }

    /// Applies the spec to a record, returning the updated record.
    ///
    /// Total: unresolved specs report an invariant error instead of
    /// writing raw tokens into a cell.
    pub fn mutate(&self, record: TableRecord) -> DomainResult<TableRecord> {
        match self {
            CellValueSpec::Text(s) => Ok(record.set_field_value(
                s.field_id.clone(),
                s.value.clone().map_or(CellValue::Null, CellValue::Text),
            )),
            CellValueSpec::Number(s) => Ok(record.set_field_value(
                s.field_id.clone(),
                s.value.map_or(CellValue::Null, CellValue::Number),
            )),
            CellValueSpec::Select(s) => {
                let value = match &s.value {
                    None => CellValue::Null,
                    Some(SelectValue::Single(name)) => CellValue::SingleSelect(name.clone()),
                    Some(SelectValue::Multiple(names)) => CellValue::MultipleSelect(names.clone()),
                };
                Ok(record.set_field_value(s.field_id.clone(), value))
            }
            CellValueSpec::Checkbox(s) => Ok(record.set_field_value(
                s.field_id.clone(),
                s.value.map_or(CellValue::Null, CellValue::Checkbox),
            )),
            CellValueSpec::Date(s) => Ok(record.set_field_value(
                s.field_id.clone(),
                s.value.map_or(CellValue::Null, CellValue::Date),
            )),
            CellValueSpec::Attachment(s) => Ok(record.set_field_value(
                s.field_id.clone(),
                s.value
                    .clone()
                    .map_or(CellValue::Null, CellValue::Attachments),
            )),
            CellValueSpec::User(s) => {
                let value = match &s.value {
                    None => CellValue::Null,
                    Some(UserSelection::Single(item)) => CellValue::User(item.clone()),
                    Some(UserSelection::Multiple(items)) => CellValue::Users(items.clone()),
                };
                Ok(record.set_field_value(s.field_id.clone(), value))
            }
            CellValueSpec::Link(s) => Ok(record.set_field_value(
                s.field_id.clone(),
                s.value.clone().map_or(CellValue::Null, CellValue::Links),
            )),
            CellValueSpec::Clear(s) => {
                Ok(record.set_field_value(s.field.id.clone(), CellValue::Null))
            }
            // Row order lives in a system column; nothing to do in memory.
            CellValueSpec::RowOrder(_) => Ok(record),
            CellValueSpec::UnresolvedAttachment(s) => Err(unresolved_error(&s.field_id)),
            CellValueSpec::UserByIdentifier(s) => Err(unresolved_error(&s.field_id)),
            CellValueSpec::LinkByTitle(s) => Err(unresolved_error(&s.field_id)),
        }
    }

    /// Dispatches to the single correspondingly-named visitor method.
    pub fn accept(&self, visitor: &mut dyn SpecVisitor) -> DomainResult<()> {
        match self {
            CellValueSpec::Text(s) => visitor.visit_text(s),
            CellValueSpec::Number(s) => visitor.visit_number(s),
            CellValueSpec::Select(s) => visitor.visit_select(s),
            CellValueSpec::Checkbox(s) => visitor.visit_checkbox(s),
            CellValueSpec::Date(s) => visitor.visit_date(s),
            CellValueSpec::Attachment(s) => visitor.visit_attachment(s),
            CellValueSpec::UnresolvedAttachment(s) => visitor.visit_unresolved_attachment(s),
            CellValueSpec::User(s) => visitor.visit_user(s),
            CellValueSpec::UserByIdentifier(s) => visitor.visit_user_by_identifier(s),
            CellValueSpec::Link(s) => visitor.visit_link(s),
            CellValueSpec::LinkByTitle(s) => visitor.visit_link_by_title(s),
            CellValueSpec::Clear(s) => visitor.visit_clear(s),
            CellValueSpec::RowOrder(s) => visitor.visit_row_order(s),
        }
    }
}

fn unresolved_error(field_id: &FieldId) -> DomainError {
    DomainError::invariant(
        "invariant.unresolved_spec",
        format!(
            "spec for field {} still holds unresolved references; run it through the resolver first",
            field_id
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridbase_commons::RecordId;

    fn record() -> TableRecord {
        TableRecord::new(RecordId::new("rec1"))
    }

    #[test]
    fn test_text_mutate_sets_value() {
        let spec = CellValueSpec::Text(SetTextValueSpec {
            field_id: FieldId::new("fld1"),
            value: Some("hello".to_string()),
        });
        let record = spec.mutate(record()).unwrap();
        assert_eq!(
            record.field_value(&FieldId::new("fld1")),
            &CellValue::Text("hello".to_string())
        );
    }

    #[test]
    fn test_null_value_mutates_to_null() {
        let spec = CellValueSpec::Number(SetNumberValueSpec {
            field_id: FieldId::new("fld1"),
            value: None,
        });
        let record = spec.mutate(record()).unwrap();
        assert!(record.is_field_null(&FieldId::new("fld1")));
    }

    #[test]
    fn test_row_order_mutate_is_identity() {
        let spec = CellValueSpec::RowOrder(SetRowOrderValueSpec {
            view_id: ViewId::new("viw1"),
            order: 7.5,
        });
        let before = record();
        let after = spec.mutate(before.clone()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_unresolved_spec_refuses_mutate() {
        let spec = CellValueSpec::LinkByTitle(SetLinkValueByTitleSpec {
            field_id: FieldId::new("fld1"),
            foreign_table_id: TableId::new("tbl2"),
            titles: Some(vec!["First".to_string()]),
            multiple: false,
        });
        let err = spec.mutate(record()).unwrap_err();
        assert_eq!(err.code, "invariant.unresolved_spec");
    }

    #[test]
    fn test_clear_sets_null() {
        use gridbase_commons::FieldKind;
        let field = Field::new(FieldId::new("fld1"), "Name", FieldKind::SingleLineText);
        let start = record().set_field_value(field.id.clone(), CellValue::Text("x".to_string()));
        let spec = CellValueSpec::Clear(ClearFieldValueSpec { field });
        let cleared = spec.mutate(start).unwrap();
        assert!(cleared.is_field_null(&FieldId::new("fld1")));
    }

    #[test]
    fn test_is_unresolved() {
        let resolved = CellValueSpec::Checkbox(SetCheckboxValueSpec {
            field_id: FieldId::new("fld1"),
            value: Some(true),
        });
        let unresolved = CellValueSpec::UserByIdentifier(SetUserValueByIdentifierSpec {
            field_id: FieldId::new("fld2"),
            identifiers: Some(UserIdentifiers::Single("me".to_string())),
        });
        assert!(!resolved.is_unresolved());
        assert!(unresolved.is_unresolved());
    }
}
