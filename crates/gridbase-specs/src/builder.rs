//! Record mutation builder: raw caller input in, spec tree out.
//!
//! The builder validates each raw value against the table schema (strict
//! or typecast, see [`crate::typecast`]), collects errors instead of
//! failing fast so `set` calls stay chainable, and folds the accepted
//! specs into a single `And` tree on `build`. It also produces new
//! records, applying field defaults for keys the caller omitted.

use std::collections::BTreeMap;

use serde_json::Value;

use gridbase_commons::{DomainError, DomainResult, Field, FieldId, RecordId, Table, TableRecord};

use crate::cell_specs::CellValueSpec;
use crate::spec::RecordSpec;
use crate::typecast;

/// How raw values are validated against the field schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValidationMode {
    /// Values must already match the field's schema exactly.
    Strict,
    /// Paste/import semantics: convert where possible, coerce to null
    /// where not.
    Typecast,
}

/// Output of a successful build: the spec tree plus the mapping from the
/// caller's original field keys to the resolved field ids, so responses
/// can echo values under the keys the caller used.
#[derive(Debug, Clone)]
pub struct BuiltMutation {
    pub spec: RecordSpec,
    pub field_key_mapping: BTreeMap<String, FieldId>,
}

/// Builds a record mutation from raw field values.
#[derive(Debug)]
pub struct RecordMutationSpecBuilder<'a> {
    table: &'a Table,
    mode: FieldValidationMode,
    specs: Vec<CellValueSpec>,
    errors: Vec<DomainError>,
    field_key_mapping: BTreeMap<String, FieldId>,
}

impl<'a> RecordMutationSpecBuilder<'a> {
    pub fn new(table: &'a Table, mode: FieldValidationMode) -> Self {
        Self {
            table,
            mode,
            specs: Vec::new(),
            errors: Vec::new(),
            field_key_mapping: BTreeMap::new(),
        }
    }

    /// Queues a value for a field addressed by id.
    pub fn set(&mut self, field_id: &FieldId, raw: &Value) -> &mut Self {
        match self.table.field_by_id(field_id) {
            Some(field) => {
                let key = field.id.as_str().to_string();
                self.push_field_value(field.clone(), key, raw);
            }
            None => self.errors.push(unknown_field_error(field_id.as_str())),
        }
        self
    }

    /// Queues a value for a field addressed by caller key (field id first,
    /// falling back to field name).
    pub fn set_by_key(&mut self, key: &str, raw: &Value) -> &mut Self {
        match self.table.field_by_key(key) {
            Some(field) => self.push_field_value(field.clone(), key.to_string(), raw),
            None => self.errors.push(unknown_field_error(key)),
        }
        self
    }

    fn push_field_value(&mut self, field: Field, key: String, raw: &Value) {
        if field.is_computed {
            self.errors.push(DomainError::validation(
                "validation.field.computed",
                format!("field '{}' is computed and cannot be written", field.name),
            ));
            return;
        }
        match typecast::convert(&field, raw, self.mode) {
            Ok(spec) => {
                self.field_key_mapping.insert(key, field.id.clone());
                self.specs.push(spec);
            }
            Err(err) => self.errors.push(err),
        }
    }

    /// Finishes the build. The first collected validation error wins;
    /// a builder with no accepted values is itself a validation error.
    pub fn build(mut self) -> DomainResult<BuiltMutation> {
        if let Some(err) = self.errors.drain(..).next() {
            return Err(err);
        }
        let spec = RecordSpec::from_value_specs(self.specs).ok_or_else(|| {
            DomainError::validation(
                "validation.mutation.empty",
                "mutation builder holds no field values",
            )
        })?;
        Ok(BuiltMutation {
            spec,
            field_key_mapping: self.field_key_mapping,
        })
    }

    /// Builds and immediately applies the spec to a record.
    ///
    /// Only valid when every queued spec is already resolved; deferred
    /// specs (attachments by token, users by identifier, links by title)
    /// must pass through their resolver first.
    pub fn build_and_mutate(self, record: TableRecord) -> DomainResult<TableRecord> {
        let built = self.build()?;
        built.spec.mutate(record)
    }
}

/// Builds a new record from raw caller values.
///
/// Keys absent from `values` fall back to the field's configured default.
/// Defaults come from table configuration, not caller input, so they are
/// always converted with typecast semantics even when the caller's values
/// are validated strictly. An explicit null suppresses the default.
pub fn create_record(
    table: &Table,
    values: &BTreeMap<String, Value>,
    mode: FieldValidationMode,
) -> DomainResult<TableRecord> {
    let mut builder = RecordMutationSpecBuilder::new(table, mode);
    let mut defaulted: Vec<CellValueSpec> = Vec::new();

    for (key, raw) in values {
        builder.set_by_key(key, raw);
    }
    for field in &table.fields {
        if field.is_computed || provided(table, values, field) {
            continue;
        }
        if let Some(default) = &field.default_value {
            defaulted.push(typecast::convert(field, default, FieldValidationMode::Typecast)?);
        }
    }

    let record = TableRecord::new(RecordId::generate());
    if values.is_empty() && defaulted.is_empty() {
        return Ok(record);
    }

    let mut record = if values.is_empty() {
        record
    } else {
        builder.build_and_mutate(record)?
    };
    for spec in defaulted {
        record = spec.mutate(record)?;
    }
    Ok(record)
}

/// Builds a batch of new records, stopping at the first invalid one.
pub fn create_records(
    table: &Table,
    batches: &[BTreeMap<String, Value>],
    mode: FieldValidationMode,
) -> DomainResult<Vec<TableRecord>> {
    batches
        .iter()
        .map(|values| create_record(table, values, mode))
        .collect()
}

fn provided(table: &Table, values: &BTreeMap<String, Value>, field: &Field) -> bool {
    values
        .keys()
        .any(|key| table.field_by_key(key).map(|f| &f.id) == Some(&field.id))
}

fn unknown_field_error(key: &str) -> DomainError {
    DomainError::validation(
        "validation.field.unknown",
        format!("no field matches key '{}'", key),
    )
}
