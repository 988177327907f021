//! Domain events published after a mutation commits.
//!
//! Events are emitted only after the unit-of-work commit resolves; a
//! rolled-back operation publishes nothing. Version numbers on update
//! events are advisory bookkeeping for realtime-sync consumers, not an
//! optimistic-lock CAS.

use serde::Serialize;

use gridbase_commons::{CellValue, FieldId, RecordId, TableId, TableRecord};

/// One field-level change of an updated record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field_id: FieldId,
    pub old_value: CellValue,
    pub new_value: CellValue,
}

/// A record-level domain event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordEvent {
    Created {
        table_id: TableId,
        record: TableRecord,
    },
    Updated {
        table_id: TableId,
        record_id: RecordId,
        /// Version read before the mutation.
        old_version: i64,
        /// Always `old_version + 1`.
        new_version: i64,
        changes: Vec<FieldChange>,
    },
    Deleted {
        table_id: TableId,
        record_id: RecordId,
    },
}

impl RecordEvent {
    pub fn updated(
        table_id: TableId,
        record_id: RecordId,
        old_version: i64,
        changes: Vec<FieldChange>,
    ) -> Self {
        RecordEvent::Updated {
            table_id,
            record_id,
            old_version,
            new_version: old_version + 1,
            changes,
        }
    }
}
