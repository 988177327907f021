//! Per-command result DTOs and the batch rows handed to storage adapters.

use std::collections::BTreeMap;

use gridbase_commons::{FieldId, RecordId, TableRecord};
use gridbase_specs::RecordSpec;

use crate::events::RecordEvent;

/// One record to insert, paired with the spec that produced it so storage
/// adapters can translate it into native statements. The key mapping maps
/// caller-supplied field keys to field ids for response mirroring.
#[derive(Debug, Clone)]
pub struct RecordCreateResult {
    pub record: TableRecord,
    pub spec: Option<RecordSpec>,
    pub field_key_mapping: BTreeMap<String, FieldId>,
}

/// One record to update, with the version read before mutation.
#[derive(Debug, Clone)]
pub struct RecordUpdateResult {
    pub record: TableRecord,
    pub old_version: i64,
    pub spec: RecordSpec,
    pub field_key_mapping: BTreeMap<String, FieldId>,
}

#[derive(Debug, Clone, Default)]
pub struct PasteResult {
    pub updated_count: u64,
    pub created_count: u64,
    pub created_record_ids: Vec<RecordId>,
    pub events: Vec<RecordEvent>,
}

#[derive(Debug, Clone, Default)]
pub struct ClearResult {
    pub updated_count: u64,
    pub events: Vec<RecordEvent>,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteResult {
    pub deleted_record_ids: Vec<RecordId>,
    pub events: Vec<RecordEvent>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateRecordsResult {
    pub created_count: u64,
    pub created_record_ids: Vec<RecordId>,
    pub events: Vec<RecordEvent>,
}
