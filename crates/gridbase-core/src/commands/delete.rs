//! The delete command: remove records by id list or by range.

use std::sync::Arc;

use futures::StreamExt;

use gridbase_commons::{
    DomainResult, FieldId, FilterExpr, RecordId, SortKey, TableId, TableRecord, ViewId,
};
use gridbase_specs::{PredicateSpec, RecordSpec};

use crate::commands::merge_view_query;
use crate::commands::paste::resolve_view;
use crate::commands::range::{normalize_range, TargetRange};
use crate::context::RequestContext;
use crate::events::RecordEvent;
use crate::ports::{
    EventBus, RecordQuery, TableRecordQueryRepository, TableRecordRepository, TableRepository,
    UndoRedoService, UnitOfWork,
};
use crate::results::DeleteResult;
use crate::undo_redo::{MutationCommand, UndoRedoEntry};

#[derive(Debug, Clone)]
pub enum DeleteTarget {
    ByIds(Vec<RecordId>),
    ByRange {
        view_id: Option<ViewId>,
        range: TargetRange,
        projection: Option<Vec<FieldId>>,
        filter: Option<FilterExpr>,
        order: Vec<SortKey>,
    },
}

#[derive(Debug, Clone)]
pub struct DeleteRequest {
    pub table_id: TableId,
    pub target: DeleteTarget,
}

/// Deletes records, snapshotting them first so undo can restore them
/// whole. Already-gone records are tolerated (idempotent); the deletion
/// event covers whatever the pre-delete snapshot found.
pub struct DeleteCommandHandler {
    tables: Arc<dyn TableRepository>,
    records: Arc<dyn TableRecordRepository>,
    queries: Arc<dyn TableRecordQueryRepository>,
    unit_of_work: Arc<dyn UnitOfWork>,
    event_bus: Arc<dyn EventBus>,
    undo_redo: Arc<dyn UndoRedoService>,
}

impl DeleteCommandHandler {
    pub fn new(
        tables: Arc<dyn TableRepository>,
        records: Arc<dyn TableRecordRepository>,
        queries: Arc<dyn TableRecordQueryRepository>,
        unit_of_work: Arc<dyn UnitOfWork>,
        event_bus: Arc<dyn EventBus>,
        undo_redo: Arc<dyn UndoRedoService>,
    ) -> Self {
        Self {
            tables,
            records,
            queries,
            unit_of_work,
            event_bus,
            undo_redo,
        }
    }

    pub async fn execute(
        &self,
        ctx: &RequestContext,
        request: DeleteRequest,
    ) -> DomainResult<DeleteResult> {
        // 1. Snapshot the records the target selects.
        let snapshots = self.snapshot(ctx, &request).await?;
        if snapshots.is_empty() {
            // Nothing matched; deleting nothing is a successful no-op.
            return Ok(DeleteResult::default());
        }
        let record_ids: Vec<RecordId> = snapshots.iter().map(|r| r.id.clone()).collect();

        // 2. Delete by an Or tree of record-id leaves.
        let spec = RecordSpec::any_of(
            record_ids
                .iter()
                .map(|id| RecordSpec::Predicate(PredicateSpec::record_id_equals(id.clone())))
                .collect(),
        );
        let Some(spec) = spec else {
            return Ok(DeleteResult::default());
        };

        self.unit_of_work.begin(ctx).await?;
        let deleted = match self
            .records
            .delete_by_spec(ctx, &request.table_id, &spec)
            .await
        {
            Ok(deleted) => deleted,
            Err(err) => {
                if let Err(rollback_err) = self.unit_of_work.rollback(ctx).await {
                    log::warn!("delete rollback failed: {}", rollback_err);
                }
                return Err(err);
            }
        };
        self.unit_of_work.commit(ctx).await?;
        if (deleted as usize) < snapshots.len() {
            // Concurrently removed records are not an error.
            log::debug!(
                "delete on table {}: {} of {} records were already gone",
                request.table_id,
                snapshots.len() - deleted as usize,
                snapshots.len()
            );
        }

        // 3. Events for the snapshot set; undo restores the snapshots.
        let events: Vec<RecordEvent> = record_ids
            .iter()
            .map(|id| RecordEvent::Deleted {
                table_id: request.table_id.clone(),
                record_id: id.clone(),
            })
            .collect();
        self.event_bus.publish_many(ctx, events.clone()).await?;
        self.undo_redo
            .record_entry(
                ctx,
                &request.table_id,
                UndoRedoEntry::new(
                    vec![MutationCommand::CreateRecords {
                        table_id: request.table_id.clone(),
                        records: snapshots,
                    }],
                    vec![MutationCommand::DeleteRecords {
                        table_id: request.table_id.clone(),
                        record_ids: record_ids.clone(),
                    }],
                ),
            )
            .await?;

        Ok(DeleteResult {
            deleted_record_ids: record_ids,
            events,
        })
    }

    async fn snapshot(
        &self,
        ctx: &RequestContext,
        request: &DeleteRequest,
    ) -> DomainResult<Vec<TableRecord>> {
        let query = match &request.target {
            DeleteTarget::ByIds(ids) => {
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                RecordQuery::filtered(FilterExpr::IdIn {
                    record_ids: ids.clone(),
                })
            }
            DeleteTarget::ByRange {
                view_id,
                range,
                projection,
                filter,
                order,
            } => {
                let table = self.tables.find_by_id(ctx, &request.table_id).await?;
                let view = resolve_view(&table, view_id.as_ref())?;
                let visible = table.visible_fields(view, projection.as_deref());
                let (filter, order) = merge_view_query(view, filter.clone(), order.clone());
                let base_query = RecordQuery {
                    filter,
                    order,
                    order_fallback_view: view.map(|v| v.id.clone()),
                    ..RecordQuery::default()
                };
                let normalized = normalize_range(
                    ctx,
                    self.queries.as_ref(),
                    &request.table_id,
                    range,
                    visible.len(),
                    &base_query,
                )
                .await?;
                RecordQuery {
                    skip: Some(normalized.start_row as u64),
                    take: Some(normalized.height() as u64),
                    ..base_query
                }
            }
        };

        let mut stream = self.queries.stream(ctx, &request.table_id, query).await?;
        let mut snapshots = Vec::new();
        while let Some(record) = stream.next().await {
            snapshots.push(record?);
        }
        Ok(snapshots)
    }
}
