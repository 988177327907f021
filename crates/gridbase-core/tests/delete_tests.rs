//! Delete command behavior: snapshots, idempotence, undo fidelity.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use gridbase_commons::{
    CellValue, Field, FieldId, FieldKind, RecordId, Table, TableId, TableRecord,
};
use gridbase_core::test_helpers::{
    InMemoryRecordStore, InMemoryTableRepository, RecordingEventBus, RecordingUndoRedoService,
    RecordingUnitOfWork,
};
use gridbase_core::{
    DeleteCommandHandler, DeleteRequest, DeleteTarget, MutationCommand, RecordEvent,
    RequestContext, TargetRange,
};

struct Fixture {
    store: Arc<InMemoryRecordStore>,
    unit_of_work: Arc<RecordingUnitOfWork>,
    event_bus: Arc<RecordingEventBus>,
    undo_redo: Arc<RecordingUndoRedoService>,
    handler: DeleteCommandHandler,
}

fn table_id() -> TableId {
    TableId::new("tbl1")
}

fn table() -> Table {
    Table::new(
        table_id(),
        "Tasks",
        vec![Field::new(
            FieldId::new("fld_name"),
            "Name",
            FieldKind::SingleLineText,
        )],
        FieldId::new("fld_name"),
    )
}

fn records() -> Vec<TableRecord> {
    vec![
        TableRecord::new(RecordId::new("rec1"))
            .set_field_value(FieldId::new("fld_name"), CellValue::Text("a".to_string())),
        TableRecord::new(RecordId::new("rec2"))
            .set_field_value(FieldId::new("fld_name"), CellValue::Text("b".to_string())),
        TableRecord::new(RecordId::new("rec3"))
            .set_field_value(FieldId::new("fld_name"), CellValue::Text("c".to_string())),
    ]
}

fn fixture(records: Vec<TableRecord>) -> Fixture {
    let tables = Arc::new(InMemoryTableRepository::with_tables(vec![table()]));
    let store = Arc::new(InMemoryRecordStore::with_records(table_id(), records));
    let unit_of_work = Arc::new(RecordingUnitOfWork::default());
    let event_bus = Arc::new(RecordingEventBus::default());
    let undo_redo = Arc::new(RecordingUndoRedoService::default());
    let handler = DeleteCommandHandler::new(
        tables,
        store.clone(),
        store.clone(),
        unit_of_work.clone(),
        event_bus.clone(),
        undo_redo.clone(),
    );
    Fixture {
        store,
        unit_of_work,
        event_bus,
        undo_redo,
        handler,
    }
}

#[tokio::test]
async fn test_delete_by_ids() {
    let fx = fixture(records());
    let ctx = RequestContext::anonymous();

    let result = fx
        .handler
        .execute(
            &ctx,
            DeleteRequest {
                table_id: table_id(),
                target: DeleteTarget::ByIds(vec![RecordId::new("rec1"), RecordId::new("rec3")]),
            },
        )
        .await
        .unwrap();

    assert_eq!(result.deleted_record_ids.len(), 2);
    let remaining = fx.store.records_in(&table_id());
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id.as_str(), "rec2");

    let events = fx.event_bus.published();
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .all(|e| matches!(e, RecordEvent::Deleted { .. })));
    assert_eq!(fx.unit_of_work.committed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_delete_missing_ids_is_idempotent() {
    let fx = fixture(records());
    let ctx = RequestContext::anonymous();

    // rec9 never existed; only rec1 is snapshotted and reported.
    let result = fx
        .handler
        .execute(
            &ctx,
            DeleteRequest {
                table_id: table_id(),
                target: DeleteTarget::ByIds(vec![RecordId::new("rec1"), RecordId::new("rec9")]),
            },
        )
        .await
        .unwrap();

    assert_eq!(result.deleted_record_ids, vec![RecordId::new("rec1")]);
    assert_eq!(fx.event_bus.published().len(), 1);
}

#[tokio::test]
async fn test_delete_nothing_is_a_noop() {
    let fx = fixture(records());
    let ctx = RequestContext::anonymous();

    let result = fx
        .handler
        .execute(
            &ctx,
            DeleteRequest {
                table_id: table_id(),
                target: DeleteTarget::ByIds(Vec::new()),
            },
        )
        .await
        .unwrap();

    assert!(result.deleted_record_ids.is_empty());
    assert!(fx.event_bus.published().is_empty());
    assert!(fx.undo_redo.entries().is_empty());
    assert_eq!(fx.unit_of_work.begun.load(Ordering::SeqCst), 0);
    assert_eq!(fx.store.records_in(&table_id()).len(), 3);
}

#[tokio::test]
async fn test_delete_undo_restores_identical_snapshots() {
    let original = records();
    let fx = fixture(original.clone());
    let ctx = RequestContext::anonymous();

    fx.handler
        .execute(
            &ctx,
            DeleteRequest {
                table_id: table_id(),
                target: DeleteTarget::ByRange {
                    view_id: None,
                    range: TargetRange::Rows {
                        start: 0,
                        end: Some(1),
                    },
                    projection: None,
                    filter: None,
                    order: Vec::new(),
                },
            },
        )
        .await
        .unwrap();

    let entries = fx.undo_redo.entries();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0].1;
    match &entry.undo[0] {
        MutationCommand::CreateRecords { records, .. } => {
            // Snapshots restore the exact records, ids and values included.
            assert_eq!(records.as_slice(), &original[0..2]);
        }
        other => panic!("expected snapshot restore, got {:?}", other),
    }
    match &entry.redo[0] {
        MutationCommand::DeleteRecords { record_ids, .. } => {
            assert_eq!(
                record_ids,
                &vec![RecordId::new("rec1"), RecordId::new("rec2")]
            );
        }
        other => panic!("expected redo delete, got {:?}", other),
    }
}
