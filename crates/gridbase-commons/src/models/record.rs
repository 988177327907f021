//! The record entity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{FieldId, RecordId};
use crate::models::cell_value::CellValue;

/// A table record: identity plus an ordered FieldId → CellValue mapping.
///
/// Records are value-like: mutation consumes the record and returns a new
/// one, so a command handler can keep the pre-mutation snapshot around for
/// undo bookkeeping at no extra cost. The `version` is advisory, read
/// before mutation and bumped by one on update for realtime-sync
/// consumers; actual conflict detection belongs to the storage adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    pub id: RecordId,
    pub version: i64,
    values: BTreeMap<FieldId, CellValue>,
}

impl TableRecord {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            version: 0,
            values: BTreeMap::new(),
        }
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    /// Sets a field value, returning the updated record.
    pub fn set_field_value(mut self, field_id: FieldId, value: CellValue) -> Self {
        self.values.insert(field_id, value);
        self
    }

    /// Reads a field value; absent fields read as `Null`.
    pub fn field_value(&self, field_id: &FieldId) -> &CellValue {
        self.values.get(field_id).unwrap_or(&CellValue::NULL)
    }

    /// True when the field is null or was never set.
    pub fn is_field_null(&self, field_id: &FieldId) -> bool {
        self.field_value(field_id).is_null()
    }

    /// Bumps the advisory version by one.
    pub fn bump_version(mut self) -> Self {
        self.version += 1;
        self
    }

    pub fn field_ids(&self) -> impl Iterator<Item = &FieldId> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldId, &CellValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_read_field_value() {
        let record = TableRecord::new(RecordId::new("rec1"))
            .set_field_value(FieldId::new("fld1"), CellValue::Text("hello".to_string()));
        assert_eq!(
            record.field_value(&FieldId::new("fld1")),
            &CellValue::Text("hello".to_string())
        );
    }

    #[test]
    fn test_absent_field_reads_as_null() {
        let record = TableRecord::new(RecordId::new("rec1"));
        assert!(record.field_value(&FieldId::new("nope")).is_null());
        assert!(record.is_field_null(&FieldId::new("nope")));
    }

    #[test]
    fn test_explicit_null_overwrites() {
        let fld = FieldId::new("fld1");
        let record = TableRecord::new(RecordId::new("rec1"))
            .set_field_value(fld.clone(), CellValue::Number(1.0))
            .set_field_value(fld.clone(), CellValue::Null);
        assert!(record.is_field_null(&fld));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_version_bump() {
        let record = TableRecord::new(RecordId::new("rec1")).with_version(3);
        let bumped = record.clone().bump_version();
        assert_eq!(record.version, 3);
        assert_eq!(bumped.version, 4);
    }
}
