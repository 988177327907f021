//! Raw-value conversion into typed cell-value specs.
//!
//! Two modes, per the builder contract:
//! - **Strict**: the raw JSON value must already match the field's schema;
//!   anything else is a validation error.
//! - **Typecast**: paste/import semantics. Input is converted toward the
//!   field's shape where possible and coerced to null where not; select
//!   fields accept option display names, link fields accept foreign
//!   titles (deferred to the link-title resolver) and user fields accept
//!   raw identifiers (deferred to the user resolver).

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use gridbase_commons::models::attachment::AttachmentInput;
use gridbase_commons::{AttachmentId, DomainError, DomainResult, Field, FieldKind, LinkItem, RecordId};

use crate::builder::FieldValidationMode;
use crate::cell_specs::{
    CellValueSpec, SelectValue, SetCheckboxValueSpec, SetDateValueSpec, SetLinkValueByTitleSpec,
    SetLinkValueSpec, SetNumberValueSpec, SetSelectValueSpec, SetTextValueSpec,
    SetUnresolvedAttachmentValueSpec, SetUserValueByIdentifierSpec, UserIdentifiers,
};

/// Converts one raw field value into a cell-value spec.
pub fn convert(field: &Field, raw: &Value, mode: FieldValidationMode) -> DomainResult<CellValueSpec> {
    match &field.kind {
        FieldKind::SingleLineText => convert_text(field, raw, mode),
        FieldKind::Number => convert_number(field, raw, mode),
        FieldKind::SingleSelect { .. } => convert_single_select(field, raw, mode),
        FieldKind::MultipleSelect { .. } => convert_multiple_select(field, raw, mode),
        FieldKind::Checkbox => convert_checkbox(field, raw, mode),
        FieldKind::Date => convert_date(field, raw, mode),
        FieldKind::Attachment => convert_attachment(field, raw, mode),
        FieldKind::User { multiple } => convert_user(field, raw, mode, *multiple),
        FieldKind::Link {
            foreign_table_id,
            multiple,
        } => convert_link(field, raw, mode, foreign_table_id.clone(), *multiple),
    }
}

fn rejected(field: &Field, raw: &Value, expected: &str) -> DomainError {
    DomainError::validation(
        "validation.field.invalid_value",
        format!(
            "field '{}' ({}) rejected value: expected {}",
            field.name,
            field.kind.kind_name(),
            expected
        ),
    )
    .with_details(serde_json::json!({
        "field_id": field.id.as_str(),
        "raw": raw,
    }))
}

fn convert_text(field: &Field, raw: &Value, mode: FieldValidationMode) -> DomainResult<CellValueSpec> {
    let value = match (raw, mode) {
        (Value::Null, _) => None,
        (Value::String(s), _) => Some(s.clone()),
        (Value::Number(n), FieldValidationMode::Typecast) => Some(n.to_string()),
        (Value::Bool(b), FieldValidationMode::Typecast) => Some(b.to_string()),
        (_, FieldValidationMode::Typecast) => None,
        (_, FieldValidationMode::Strict) => return Err(rejected(field, raw, "a string or null")),
    };
    Ok(CellValueSpec::Text(SetTextValueSpec {
        field_id: field.id.clone(),
        value,
    }))
}

fn convert_number(
    field: &Field,
    raw: &Value,
    mode: FieldValidationMode,
) -> DomainResult<CellValueSpec> {
    let value = match (raw, mode) {
        (Value::Null, _) => None,
        (Value::Number(n), _) => n.as_f64(),
        (Value::String(s), FieldValidationMode::Typecast) => s.trim().parse::<f64>().ok(),
        (_, FieldValidationMode::Typecast) => None,
        (_, FieldValidationMode::Strict) => return Err(rejected(field, raw, "a number or null")),
    };
    Ok(CellValueSpec::Number(SetNumberValueSpec {
        field_id: field.id.clone(),
        value,
    }))
}

fn convert_checkbox(
    field: &Field,
    raw: &Value,
    mode: FieldValidationMode,
) -> DomainResult<CellValueSpec> {
    let value = match (raw, mode) {
        (Value::Null, _) => None,
        (Value::Bool(b), _) => Some(*b),
        (Value::Number(n), FieldValidationMode::Typecast) => Some(n.as_f64() != Some(0.0)),
        (Value::String(s), FieldValidationMode::Typecast) => {
            match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "checked" => Some(true),
                "false" | "0" | "no" | "" => Some(false),
                _ => None,
            }
        }
        (_, FieldValidationMode::Typecast) => None,
        (_, FieldValidationMode::Strict) => return Err(rejected(field, raw, "a boolean or null")),
    };
    Ok(CellValueSpec::Checkbox(SetCheckboxValueSpec {
        field_id: field.id.clone(),
        value,
    }))
}

fn convert_date(field: &Field, raw: &Value, mode: FieldValidationMode) -> DomainResult<CellValueSpec> {
    let value = match (raw, mode) {
        (Value::Null, _) => None,
        (Value::String(s), _) => match DateTime::parse_from_rfc3339(s) {
            Ok(dt) => Some(dt.with_timezone(&Utc)),
            Err(_) => match mode {
                FieldValidationMode::Typecast => None,
                FieldValidationMode::Strict => {
                    return Err(rejected(field, raw, "an RFC 3339 datetime or null"))
                }
            },
        },
        (Value::Number(n), FieldValidationMode::Typecast) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        (_, FieldValidationMode::Typecast) => None,
        (_, FieldValidationMode::Strict) => {
            return Err(rejected(field, raw, "an RFC 3339 datetime or null"))
        }
    };
    Ok(CellValueSpec::Date(SetDateValueSpec {
        field_id: field.id.clone(),
        value,
    }))
}

fn convert_single_select(
    field: &Field,
    raw: &Value,
    mode: FieldValidationMode,
) -> DomainResult<CellValueSpec> {
    let value = match (raw, mode) {
        (Value::Null, _) => None,
        (Value::String(s), FieldValidationMode::Strict) => {
            if field.select_option_by_name(s).is_none() {
                return Err(DomainError::validation(
                    "validation.field.unknown_option",
                    format!("'{}' is not an option of field '{}'", s, field.name),
                ));
            }
            Some(SelectValue::Single(s.clone()))
        }
        (Value::String(s), FieldValidationMode::Typecast) => field
            .select_option_by_name(s)
            .map(|opt| SelectValue::Single(opt.name.clone())),
        (_, FieldValidationMode::Typecast) => None,
        (_, FieldValidationMode::Strict) => {
            return Err(rejected(field, raw, "an option name or null"))
        }
    };
    Ok(CellValueSpec::Select(SetSelectValueSpec {
        field_id: field.id.clone(),
        value,
    }))
}

fn convert_multiple_select(
    field: &Field,
    raw: &Value,
    mode: FieldValidationMode,
) -> DomainResult<CellValueSpec> {
    let value = match (raw, mode) {
        (Value::Null, _) => None,
        (Value::Array(items), FieldValidationMode::Strict) => {
            let mut names = Vec::with_capacity(items.len());
            for item in items {
                let name = item
                    .as_str()
                    .ok_or_else(|| rejected(field, raw, "an array of option names"))?;
                if field.select_option_by_name(name).is_none() {
                    return Err(DomainError::validation(
                        "validation.field.unknown_option",
                        format!("'{}' is not an option of field '{}'", name, field.name),
                    ));
                }
                names.push(name.to_string());
            }
            Some(SelectValue::Multiple(names))
        }
        (Value::Array(items), FieldValidationMode::Typecast) => {
            // Keep the names that match an option, drop the rest.
            let names: Vec<String> = items
                .iter()
                .filter_map(|item| item.as_str())
                .filter(|name| field.select_option_by_name(name).is_some())
                .map(|name| name.to_string())
                .collect();
            Some(SelectValue::Multiple(names))
        }
        (Value::String(s), FieldValidationMode::Typecast) => field
            .select_option_by_name(s)
            .map(|opt| SelectValue::Multiple(vec![opt.name.clone()])),
        (_, FieldValidationMode::Typecast) => None,
        (_, FieldValidationMode::Strict) => {
            return Err(rejected(field, raw, "an array of option names or null"))
        }
    };
    Ok(CellValueSpec::Select(SetSelectValueSpec {
        field_id: field.id.clone(),
        value,
    }))
}

fn convert_attachment(
    field: &Field,
    raw: &Value,
    mode: FieldValidationMode,
) -> DomainResult<CellValueSpec> {
    let value = match (raw, mode) {
        (Value::Null, _) => None,
        (Value::Array(items), _) => {
            let mut inputs = Vec::with_capacity(items.len());
            for item in items {
                match item.as_object() {
                    Some(obj) => inputs.push(AttachmentInput {
                        id: obj
                            .get("id")
                            .and_then(Value::as_str)
                            .map(AttachmentId::new),
                        token: obj
                            .get("token")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        name: obj.get("name").and_then(Value::as_str).map(str::to_string),
                    }),
                    None => match mode {
                        // Non-object entries are dropped on the permissive path.
                        FieldValidationMode::Typecast => continue,
                        FieldValidationMode::Strict => {
                            return Err(rejected(field, raw, "an array of attachment objects"))
                        }
                    },
                }
            }
            Some(inputs)
        }
        (_, FieldValidationMode::Typecast) => None,
        (_, FieldValidationMode::Strict) => {
            return Err(rejected(field, raw, "an array of attachment objects or null"))
        }
    };
    Ok(CellValueSpec::UnresolvedAttachment(
        SetUnresolvedAttachmentValueSpec {
            field_id: field.id.clone(),
            value,
        },
    ))
}

fn user_identifier_of(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn convert_user(
    field: &Field,
    raw: &Value,
    mode: FieldValidationMode,
    multiple: bool,
) -> DomainResult<CellValueSpec> {
    let identifiers = match (raw, mode) {
        (Value::Null, _) => None,
        (Value::Object(obj), _) if !multiple => match obj.get("id").and_then(Value::as_str) {
            Some(id) => Some(UserIdentifiers::Single(id.to_string())),
            None => match mode {
                FieldValidationMode::Typecast => None,
                FieldValidationMode::Strict => {
                    return Err(rejected(field, raw, "an object with an 'id' key"))
                }
            },
        },
        (Value::String(s), FieldValidationMode::Typecast) => Some(if multiple {
            UserIdentifiers::Multiple(vec![s.clone()])
        } else {
            UserIdentifiers::Single(s.clone())
        }),
        (Value::Array(items), _) if multiple => {
            let mut ids = Vec::with_capacity(items.len());
            for item in items {
                match (user_identifier_of(item), mode) {
                    (Some(id), _) => ids.push(id),
                    (None, FieldValidationMode::Typecast) => continue,
                    (None, FieldValidationMode::Strict) => {
                        return Err(rejected(field, raw, "an array of user objects"))
                    }
                }
            }
            Some(UserIdentifiers::Multiple(ids))
        }
        (_, FieldValidationMode::Typecast) => None,
        (_, FieldValidationMode::Strict) => {
            let expected = if multiple {
                "an array of user objects or null"
            } else {
                "a user object or null"
            };
            return Err(rejected(field, raw, expected));
        }
    };
    Ok(CellValueSpec::UserByIdentifier(
        SetUserValueByIdentifierSpec {
            field_id: field.id.clone(),
            identifiers,
        },
    ))
}

fn link_item_of(item: &Value) -> Option<LinkItem> {
    let obj = item.as_object()?;
    let id = obj.get("id").and_then(Value::as_str)?;
    let mut link = LinkItem::new(RecordId::new(id));
    link.title = obj.get("title").and_then(Value::as_str).map(str::to_string);
    Some(link)
}

fn convert_link(
    field: &Field,
    raw: &Value,
    mode: FieldValidationMode,
    foreign_table_id: gridbase_commons::TableId,
    multiple: bool,
) -> DomainResult<CellValueSpec> {
    // Null resolves to a null link value directly.
    if raw.is_null() {
        return Ok(CellValueSpec::Link(SetLinkValueSpec {
            field_id: field.id.clone(),
            value: None,
        }));
    }

    // Structured input (objects with record ids) needs no resolution.
    let structured: Option<Vec<LinkItem>> = match raw {
        Value::Object(_) if !multiple => link_item_of(raw).map(|item| vec![item]),
        Value::Array(items) if multiple => items.iter().map(link_item_of).collect(),
        _ => None,
    };
    if let Some(items) = structured {
        return Ok(CellValueSpec::Link(SetLinkValueSpec {
            field_id: field.id.clone(),
            value: Some(items),
        }));
    }

    match mode {
        FieldValidationMode::Strict => {
            let expected = if multiple {
                "an array of record references or null"
            } else {
                "a record reference or null"
            };
            Err(rejected(field, raw, expected))
        }
        FieldValidationMode::Typecast => {
            // Pasted titles: defer to the link-title resolver.
            let titles: Option<Vec<String>> = match raw {
                Value::String(s) => Some(vec![s.clone()]),
                Value::Array(items) => Some(
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect(),
                ),
                _ => None,
            };
            match titles {
                Some(titles) => Ok(CellValueSpec::LinkByTitle(SetLinkValueByTitleSpec {
                    field_id: field.id.clone(),
                    foreign_table_id,
                    titles: Some(titles),
                    multiple,
                })),
                None => Ok(CellValueSpec::Link(SetLinkValueSpec {
                    field_id: field.id.clone(),
                    value: None,
                })),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridbase_commons::{FieldId, SelectOption, TableId};
    use serde_json::json;

    fn number_field() -> Field {
        Field::new(FieldId::new("fld1"), "Score", FieldKind::Number)
    }

    #[test]
    fn test_typecast_number_from_string() {
        let spec = convert(&number_field(), &json!("123"), FieldValidationMode::Typecast).unwrap();
        match spec {
            CellValueSpec::Number(s) => assert_eq!(s.value, Some(123.0)),
            other => panic!("expected number spec, got {:?}", other),
        }
    }

    #[test]
    fn test_typecast_number_junk_coerces_to_null() {
        let spec =
            convert(&number_field(), &json!("abc"), FieldValidationMode::Typecast).unwrap();
        match spec {
            CellValueSpec::Number(s) => assert_eq!(s.value, None),
            other => panic!("expected number spec, got {:?}", other),
        }
    }

    #[test]
    fn test_strict_number_rejects_string() {
        let err = convert(&number_field(), &json!("123"), FieldValidationMode::Strict).unwrap_err();
        assert_eq!(err.code, "validation.field.invalid_value");
    }

    #[test]
    fn test_strict_select_unknown_option() {
        let field = Field::new(
            FieldId::new("fld1"),
            "Status",
            FieldKind::SingleSelect {
                options: vec![SelectOption::new("opt1", "Todo")],
            },
        );
        let err = convert(&field, &json!("Done"), FieldValidationMode::Strict).unwrap_err();
        assert_eq!(err.code, "validation.field.unknown_option");
    }

    #[test]
    fn test_typecast_select_unknown_option_is_null() {
        let field = Field::new(
            FieldId::new("fld1"),
            "Status",
            FieldKind::SingleSelect {
                options: vec![SelectOption::new("opt1", "Todo")],
            },
        );
        let spec = convert(&field, &json!("Done"), FieldValidationMode::Typecast).unwrap();
        match spec {
            CellValueSpec::Select(s) => assert_eq!(s.value, None),
            other => panic!("expected select spec, got {:?}", other),
        }
    }

    #[test]
    fn test_typecast_multi_select_drops_unknown() {
        let field = Field::new(
            FieldId::new("fld1"),
            "Tags",
            FieldKind::MultipleSelect {
                options: vec![
                    SelectOption::new("opt1", "red"),
                    SelectOption::new("opt2", "blue"),
                ],
            },
        );
        let spec = convert(
            &field,
            &json!(["red", "green", "blue"]),
            FieldValidationMode::Typecast,
        )
        .unwrap();
        match spec {
            CellValueSpec::Select(s) => assert_eq!(
                s.value,
                Some(SelectValue::Multiple(vec![
                    "red".to_string(),
                    "blue".to_string()
                ]))
            ),
            other => panic!("expected select spec, got {:?}", other),
        }
    }

    #[test]
    fn test_typecast_link_titles_deferred() {
        let field = Field::new(
            FieldId::new("fld1"),
            "Project",
            FieldKind::Link {
                foreign_table_id: TableId::new("tbl2"),
                multiple: false,
            },
        );
        let spec = convert(&field, &json!("Apollo"), FieldValidationMode::Typecast).unwrap();
        match spec {
            CellValueSpec::LinkByTitle(s) => {
                assert_eq!(s.foreign_table_id, TableId::new("tbl2"));
                assert_eq!(s.titles, Some(vec!["Apollo".to_string()]));
                assert!(!s.multiple);
            }
            other => panic!("expected link-by-title spec, got {:?}", other),
        }
    }

    #[test]
    fn test_strict_link_takes_structured_reference() {
        let field = Field::new(
            FieldId::new("fld1"),
            "Projects",
            FieldKind::Link {
                foreign_table_id: TableId::new("tbl2"),
                multiple: true,
            },
        );
        let spec = convert(
            &field,
            &json!([{ "id": "rec7" }]),
            FieldValidationMode::Strict,
        )
        .unwrap();
        match spec {
            CellValueSpec::Link(s) => {
                assert_eq!(s.value.unwrap()[0].record_id, RecordId::new("rec7"))
            }
            other => panic!("expected link spec, got {:?}", other),
        }
    }

    #[test]
    fn test_user_me_identifier_deferred() {
        let field = Field::new(
            FieldId::new("fld1"),
            "Owner",
            FieldKind::User { multiple: false },
        );
        let spec = convert(&field, &json!("me"), FieldValidationMode::Typecast).unwrap();
        match spec {
            CellValueSpec::UserByIdentifier(s) => {
                assert_eq!(s.identifiers, Some(UserIdentifiers::Single("me".to_string())))
            }
            other => panic!("expected user-by-identifier spec, got {:?}", other),
        }
    }

    #[test]
    fn test_null_attachment_stays_null() {
        let field = Field::new(FieldId::new("fld1"), "Files", FieldKind::Attachment);
        let spec = convert(&field, &Value::Null, FieldValidationMode::Strict).unwrap();
        match spec {
            CellValueSpec::UnresolvedAttachment(s) => assert!(s.value.is_none()),
            other => panic!("expected unresolved attachment spec, got {:?}", other),
        }
    }

    #[test]
    fn test_typecast_date_from_epoch_millis() {
        let field = Field::new(FieldId::new("fld1"), "Due", FieldKind::Date);
        let spec = convert(&field, &json!(0), FieldValidationMode::Typecast).unwrap();
        match spec {
            CellValueSpec::Date(s) => {
                assert_eq!(s.value.unwrap().timestamp_millis(), 0)
            }
            other => panic!("expected date spec, got {:?}", other),
        }
    }
}
