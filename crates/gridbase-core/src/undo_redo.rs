//! Undo/redo command pairs.
//!
//! Every committed batch mutation appends exactly one entry. Field-level
//! updates undo by restoring the captured prior values; creates and
//! deletes use whole-record create/delete command pairs instead of
//! field-level diffs.

use std::collections::BTreeMap;

use serde::Serialize;

use gridbase_commons::{CellValue, FieldId, RecordId, TableId, TableRecord};

/// A replayable mutation command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MutationCommand {
    SetFieldValues {
        table_id: TableId,
        record_id: RecordId,
        values: BTreeMap<FieldId, CellValue>,
    },
    CreateRecords {
        table_id: TableId,
        records: Vec<TableRecord>,
    },
    DeleteRecords {
        table_id: TableId,
        record_ids: Vec<RecordId>,
    },
}

/// Symmetric undo/redo pair for one committed operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UndoRedoEntry {
    pub undo: Vec<MutationCommand>,
    pub redo: Vec<MutationCommand>,
}

impl UndoRedoEntry {
    pub fn new(undo: Vec<MutationCommand>, redo: Vec<MutationCommand>) -> Self {
        Self { undo, redo }
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty() && self.redo.is_empty()
    }
}
