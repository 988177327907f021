//! The clear command: null out every editable cell of a target range.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::StreamExt;

use gridbase_commons::{
    CellValue, DomainError, DomainResult, Field, FieldId, FilterExpr, RecordId, SortKey, TableId,
    TableRecord, ViewId,
};
use gridbase_specs::{CellValueSpec, ClearFieldValueSpec, RecordSpec};

use crate::commands::batch::{calculate_batch_size_with_limit, into_batches};
use crate::commands::merge_view_query;
use crate::commands::paste::resolve_view;
use crate::commands::range::{normalize_range, TargetRange};
use crate::context::RequestContext;
use crate::events::{FieldChange, RecordEvent};
use crate::ports::{
    EventBus, RecordQuery, TableRecordQueryRepository, TableRecordRepository, TableRepository,
    UndoRedoService, UnitOfWork,
};
use crate::results::{ClearResult, RecordUpdateResult};
use crate::undo_redo::{MutationCommand, UndoRedoEntry};

#[derive(Debug, Clone)]
pub struct ClearRequest {
    pub table_id: TableId,
    pub view_id: Option<ViewId>,
    pub range: TargetRange,
    pub projection: Option<Vec<FieldId>>,
    pub filter: Option<FilterExpr>,
    pub order: Vec<SortKey>,
    pub batch_size_limit: Option<usize>,
}

/// Paste specialized to null: same range pipeline, update-only, and rows
/// whose target fields are already entirely null are skipped outright
/// (they appear in no result and no event).
pub struct ClearCommandHandler {
    tables: Arc<dyn TableRepository>,
    records: Arc<dyn TableRecordRepository>,
    queries: Arc<dyn TableRecordQueryRepository>,
    unit_of_work: Arc<dyn UnitOfWork>,
    event_bus: Arc<dyn EventBus>,
    undo_redo: Arc<dyn UndoRedoService>,
}

impl ClearCommandHandler {
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
        request: ClearRequest,
    ) -> DomainResult<ClearResult> {
        // 1. Table, view, visible fields.
        let table = self.tables.find_by_id(ctx, &request.table_id).await?;
        let view = resolve_view(&table, request.view_id.as_ref())?;
        let visible: Vec<Field> = table
            .visible_fields(view, request.projection.as_deref())
            .into_iter()
            .cloned()
            .collect();

        // 2. Merged query and normalized range.
        let (filter, order) = merge_view_query(view, request.filter.clone(), request.order.clone());
        let base_query = RecordQuery {
            filter,
            order,
            order_fallback_view: view.map(|v| v.id.clone()),
            ..RecordQuery::default()
        };
        let range = normalize_range(
            ctx,
            self.queries.as_ref(),
            &request.table_id,
            &request.range,
            visible.len(),
            &base_query,
        )
        .await?;

        // 3. Editable target fields; a clear confined to computed columns
        // is a no-op, not an error.
        let targets: Vec<Field> = visible
            .get(range.start_col..=range.end_col.min(visible.len().saturating_sub(1)))
            .unwrap_or(&[])
            .iter()
            .filter(|field| !field.is_computed)
            .cloned()
            .collect();
        if targets.is_empty() {
            return Ok(ClearResult::default());
        }
        let spec = RecordSpec::from_value_specs(
            targets
                .iter()
                .map(|field| {
                    CellValueSpec::Clear(ClearFieldValueSpec {
                        field: field.clone(),
                    })
                })
                .collect(),
        )
        .ok_or_else(|| {
            DomainError::invariant("invariant.empty_clear_spec", "clear spec fold was empty")
        })?;

        // 4. Stream the range, skipping rows that are already all null.
        let stream_query = RecordQuery {
            skip: Some(range.start_row as u64),
            take: Some(range.height() as u64),
            ..base_query
        };
        let mut existing = self
            .queries
            .stream(ctx, &request.table_id, stream_query)
            .await?;
        let mut rows: Vec<ClearedRow> = Vec::new();
        while let Some(record) = existing.next().await {
            let record = record?;
            if targets.iter().all(|field| record.is_field_null(&field.id)) {
                continue;
            }
            rows.push(plan_row(record, &targets, &spec)?);
        }
        if rows.is_empty() {
            log::debug!("clear on table {} matched no non-null rows", request.table_id);
            return Ok(ClearResult::default());
        }

        // 5. Batched updates inside one transaction.
        let batch_size = calculate_batch_size_with_limit(targets.len(), request.batch_size_limit);
        self.unit_of_work.begin(ctx).await?;
        let outcome = self
            .update_batches(ctx, &request.table_id, &rows, batch_size)
            .await;
        if let Err(err) = outcome {
            if let Err(rollback_err) = self.unit_of_work.rollback(ctx).await {
                log::warn!("clear rollback failed: {}", rollback_err);
            }
            return Err(err);
        }
        self.unit_of_work.commit(ctx).await?;

        // 6. Post-commit events and one undo/redo entry.
        let mut events = Vec::with_capacity(rows.len());
        let mut undo = Vec::with_capacity(rows.len());
        let mut redo = Vec::with_capacity(rows.len());
        for row in &rows {
            events.push(RecordEvent::updated(
                request.table_id.clone(),
                row.record_id.clone(),
                row.old_version,
                row.changes.clone(),
            ));
            undo.push(MutationCommand::SetFieldValues {
                table_id: request.table_id.clone(),
                record_id: row.record_id.clone(),
                values: row.old_values.clone(),
            });
            redo.push(MutationCommand::SetFieldValues {
                table_id: request.table_id.clone(),
                record_id: row.record_id.clone(),
                values: row.null_values.clone(),
            });
        }
        self.event_bus.publish_many(ctx, events.clone()).await?;
        self.undo_redo
            .record_entry(ctx, &request.table_id, UndoRedoEntry::new(undo, redo))
            .await?;

        Ok(ClearResult {
            updated_count: rows.len() as u64,
            events,
        })
    }

    async fn update_batches(
        &self,
        ctx: &RequestContext,
        table_id: &TableId,
        rows: &[ClearedRow],
        batch_size: usize,
    ) -> DomainResult<()> {
        let updates: Vec<RecordUpdateResult> = rows
            .iter()
            .map(|row| RecordUpdateResult {
                record: row.cleared.clone(),
                old_version: row.old_version,
                spec: row.spec.clone(),
                field_key_mapping: BTreeMap::new(),
            })
            .collect();
        for batch in into_batches(updates, batch_size) {
            self.records.update_batch(ctx, table_id, batch).await?;
        }
        Ok(())
    }
}

struct ClearedRow {
    record_id: RecordId,
    old_version: i64,
    cleared: TableRecord,
    spec: RecordSpec,
    old_values: BTreeMap<FieldId, CellValue>,
    null_values: BTreeMap<FieldId, CellValue>,
    changes: Vec<FieldChange>,
}

fn plan_row(record: TableRecord, targets: &[Field], spec: &RecordSpec) -> DomainResult<ClearedRow> {
    let old_version = record.version;
    let old_values: BTreeMap<FieldId, CellValue> = targets
        .iter()
        .map(|field| (field.id.clone(), record.field_value(&field.id).clone()))
        .collect();
    let null_values: BTreeMap<FieldId, CellValue> = targets
        .iter()
        .map(|field| (field.id.clone(), CellValue::Null))
        .collect();
    let changes: Vec<FieldChange> = old_values
        .iter()
        .map(|(field_id, old_value)| FieldChange {
            field_id: field_id.clone(),
            old_value: old_value.clone(),
            new_value: CellValue::Null,
        })
        .collect();
    let record_id = record.id.clone();
    let cleared = spec.mutate(record)?.bump_version();
    Ok(ClearedRow {
        record_id,
        old_version,
        cleared,
        spec: spec.clone(),
        old_values,
        null_values,
        changes,
    })
}
