//! The paste command: bulk cell writes over a target range.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;

use gridbase_commons::{
    CellValue, DomainResult, Field, FieldId, FieldKind, FilterExpr, RecordId, SortKey, Table,
    TableId, TableRecord, ViewId,
};
use gridbase_specs::{FieldValidationMode, RecordMutationSpecBuilder, RecordSpec};

use crate::commands::batch::{calculate_batch_size_with_limit, into_batches};
use crate::commands::merge_view_query;
use crate::commands::range::{normalize_range, NormalizedRange, TargetRange};
use crate::context::RequestContext;
use crate::events::{FieldChange, RecordEvent};
use crate::ports::{
    EventBus, RecordQuery, TableRecordQueryRepository, TableRecordRepository, TableRepository,
    UndoRedoService, UnitOfWork,
};
use crate::resolvers::RecordMutationSpecResolverService;
use crate::results::{PasteResult, RecordCreateResult, RecordUpdateResult};
use crate::undo_redo::{MutationCommand, UndoRedoEntry};

/// Source column metadata, used to synthesize fields when the pasted
/// content is wider than the table.
#[derive(Debug, Clone)]
pub struct SourceFieldHeader {
    pub name: String,
    pub kind: FieldKind,
}

#[derive(Debug, Clone)]
pub struct PasteRequest {
    pub table_id: TableId,
    pub view_id: Option<ViewId>,
    pub range: TargetRange,
    /// Row-major raw values.
    pub content: Vec<Vec<Value>>,
    /// One header per content column; may be empty.
    pub headers: Vec<SourceFieldHeader>,
    /// Visible-field override; `None` uses the view's visibility.
    pub projection: Option<Vec<FieldId>>,
    pub filter: Option<FilterExpr>,
    pub order: Vec<SortKey>,
    /// In-memory predicate; existing rows it rejects are skipped but still
    /// consume their row of content.
    pub update_filter: Option<RecordSpec>,
    pub batch_size_limit: Option<usize>,
}

enum RowPlan {
    Update {
        record: TableRecord,
        spec: RecordSpec,
        field_key_mapping: BTreeMap<String, FieldId>,
    },
    Create {
        spec: RecordSpec,
        field_key_mapping: BTreeMap<String, FieldId>,
    },
}

pub struct PasteCommandHandler {
    tables: Arc<dyn TableRepository>,
    records: Arc<dyn TableRecordRepository>,
    queries: Arc<dyn TableRecordQueryRepository>,
    unit_of_work: Arc<dyn UnitOfWork>,
    event_bus: Arc<dyn EventBus>,
    undo_redo: Arc<dyn UndoRedoService>,
    resolver: Arc<RecordMutationSpecResolverService>,
}

impl PasteCommandHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tables: Arc<dyn TableRepository>,
        records: Arc<dyn TableRecordRepository>,
        queries: Arc<dyn TableRecordQueryRepository>,
        unit_of_work: Arc<dyn UnitOfWork>,
        event_bus: Arc<dyn EventBus>,
        undo_redo: Arc<dyn UndoRedoService>,
        resolver: Arc<RecordMutationSpecResolverService>,
    ) -> Self {
        Self {
            tables,
            records,
            queries,
            unit_of_work,
            event_bus,
            undo_redo,
            resolver,
        }
    }

    pub async fn execute(
        &self,
        ctx: &RequestContext,
        request: PasteRequest,
    ) -> DomainResult<PasteResult> {
        // 1. Resolve the table and the view's visible fields.
        let table = self.tables.find_by_id(ctx, &request.table_id).await?;
        let view = resolve_view(&table, request.view_id.as_ref())?;
        let mut visible: Vec<Field> = table
            .visible_fields(view, request.projection.as_deref())
            .into_iter()
            .cloned()
            .collect();

        // 2. Merge view defaults with request overrides.
        let (filter, order) = merge_view_query(view, request.filter.clone(), request.order.clone());
        let base_query = RecordQuery {
            filter: filter.clone(),
            order: order.clone(),
            order_fallback_view: view.map(|v| v.id.clone()),
            ..RecordQuery::default()
        };

        // 3. Normalize the target range.
        let range = normalize_range(
            ctx,
            self.queries.as_ref(),
            &request.table_id,
            &request.range,
            visible.len(),
            &base_query,
        )
        .await?;

        // 4. Tile the content when it evenly divides the range on both axes.
        let content = tile_content(request.content, &range);
        let content_width = content.iter().map(Vec::len).max().unwrap_or(0);
        if content_width == 0 {
            return Ok(PasteResult::default());
        }

        // 5. Synthesize fields when the paste is wider than the table.
        self.synthesize_overflow_fields(
            ctx,
            &request.table_id,
            &mut visible,
            range.start_col,
            content_width,
            &request.headers,
        )
        .await?;

        // 6. Target columns, with computed fields dropped (their content
        // columns still exist so indexes stay aligned).
        let columns: Vec<(usize, Field)> = (0..content_width)
            .filter_map(|col| {
                visible
                    .get(range.start_col + col)
                    .filter(|field| !field.is_computed)
                    .map(|field| (col, field.clone()))
            })
            .collect();
        if columns.is_empty() {
            return Ok(PasteResult::default());
        }

        // 7. Stream existing records in range and zip against content rows.
        let stream_query = RecordQuery {
            skip: Some(range.start_row as u64),
            take: Some(content.len() as u64),
            ..base_query
        };
        let mut existing = self
            .queries
            .stream(ctx, &request.table_id, stream_query)
            .await?;
        let mut plans: Vec<RowPlan> = Vec::with_capacity(content.len());
        for row in &content {
            let record = match existing.next().await {
                Some(record) => Some(record?),
                None => None,
            };
            match record {
                Some(record) => {
                    // An excluded row still consumes its content row.
                    if let Some(update_filter) = &request.update_filter {
                        if !update_filter.is_satisfied_by(&record) {
                            continue;
                        }
                    }
                    let built = build_row(&table, &columns, row)?;
                    plans.push(RowPlan::Update {
                        record,
                        spec: built.spec,
                        field_key_mapping: built.field_key_mapping,
                    });
                }
                None => {
                    let built = build_row(&table, &columns, row)?;
                    plans.push(RowPlan::Create {
                        spec: built.spec,
                        field_key_mapping: built.field_key_mapping,
                    });
                }
            }
        }
        if plans.is_empty() {
            return Ok(PasteResult::default());
        }

        // 8. Batch, resolve and mutate inside one transaction.
        let batch_size =
            calculate_batch_size_with_limit(columns.len(), request.batch_size_limit);
        log::info!(
            "paste into table {}: {} rows, {} columns, batch size {}",
            request.table_id,
            plans.len(),
            columns.len(),
            batch_size
        );
        self.unit_of_work.begin(ctx).await?;
        let applied = self
            .apply_batches(ctx, &request.table_id, &columns, plans, batch_size)
            .await;
        let applied = match applied {
            Ok(applied) => applied,
            Err(err) => {
                if let Err(rollback_err) = self.unit_of_work.rollback(ctx).await {
                    log::warn!("paste rollback failed: {}", rollback_err);
                }
                return Err(err);
            }
        };
        self.unit_of_work.commit(ctx).await?;

        // 9. Events and a single undo/redo entry, post-commit only.
        let result = self
            .publish_outcome(ctx, &request.table_id, applied)
            .await?;
        Ok(result)
    }

    async fn synthesize_overflow_fields(
        &self,
        ctx: &RequestContext,
        table_id: &TableId,
        visible: &mut Vec<Field>,
        start_col: usize,
        content_width: usize,
        headers: &[SourceFieldHeader],
    ) -> DomainResult<()> {
        let needed = start_col + content_width;
        while visible.len() < needed {
            let col = visible.len() - start_col;
            let field = match headers.get(col) {
                Some(header) => Field::new(
                    FieldId::generate(),
                    header.name.clone(),
                    header.kind.clone(),
                ),
                None => Field::new(
                    FieldId::generate(),
                    format!("Field {}", visible.len() + 1),
                    FieldKind::SingleLineText,
                ),
            };
            let created = self.tables.create_field(ctx, table_id, field).await?;
            log::debug!("synthesized field '{}' for paste overflow", created.name);
            visible.push(created);
        }
        Ok(())
    }

    async fn apply_batches(
        &self,
        ctx: &RequestContext,
        table_id: &TableId,
        columns: &[(usize, Field)],
        plans: Vec<RowPlan>,
        batch_size: usize,
    ) -> DomainResult<AppliedMutations> {
        let mut applied = AppliedMutations::default();
        for batch in into_batches(plans, batch_size) {
            // One dispatcher call per batch keeps lookups batched.
            let specs: Vec<RecordSpec> = batch
                .iter()
                .map(|plan| match plan {
                    RowPlan::Update { spec, .. } | RowPlan::Create { spec, .. } => spec.clone(),
                })
                .collect();
            let resolved = self.resolver.resolve_and_replace_many(ctx, specs).await?;

            let mut updates: Vec<RecordUpdateResult> = Vec::new();
            let mut creates: Vec<RecordCreateResult> = Vec::new();
            for (plan, spec) in batch.into_iter().zip(resolved) {
                match plan {
                    RowPlan::Update {
                        record,
                        field_key_mapping,
                        ..
                    } => {
                        let old_version = record.version;
                        let old_values: BTreeMap<FieldId, CellValue> = columns
                            .iter()
                            .map(|(_, field)| {
                                (field.id.clone(), record.field_value(&field.id).clone())
                            })
                            .collect();
                        let mutated = spec.mutate(record)?.bump_version();
                        let changes: Vec<FieldChange> = columns
                            .iter()
                            .map(|(_, field)| FieldChange {
                                field_id: field.id.clone(),
                                old_value: old_values
                                    .get(&field.id)
                                    .cloned()
                                    .unwrap_or(CellValue::Null),
                                new_value: mutated.field_value(&field.id).clone(),
                            })
                            .collect();
                        applied.updated.push(UpdatedRow {
                            record_id: mutated.id.clone(),
                            old_version,
                            old_values,
                            new_values: changes
                                .iter()
                                .map(|c| (c.field_id.clone(), c.new_value.clone()))
                                .collect(),
                            changes,
                        });
                        updates.push(RecordUpdateResult {
                            record: mutated,
                            old_version,
                            spec,
                            field_key_mapping,
                        });
                    }
                    RowPlan::Create {
                        field_key_mapping, ..
                    } => {
                        let record = spec.mutate(TableRecord::new(RecordId::generate()))?;
                        applied.created.push(record.clone());
                        creates.push(RecordCreateResult {
                            record,
                            spec: Some(spec),
                            field_key_mapping,
                        });
                    }
                }
            }
            if !updates.is_empty() {
                self.records.update_batch(ctx, table_id, updates).await?;
            }
            if !creates.is_empty() {
                self.records.insert_batch(ctx, table_id, creates).await?;
            }
        }
        Ok(applied)
    }

    async fn publish_outcome(
        &self,
        ctx: &RequestContext,
        table_id: &TableId,
        applied: AppliedMutations,
    ) -> DomainResult<PasteResult> {
        let mut events: Vec<RecordEvent> = Vec::new();
        let mut undo: Vec<MutationCommand> = Vec::new();
        let mut redo: Vec<MutationCommand> = Vec::new();

        for row in &applied.updated {
            events.push(RecordEvent::updated(
                table_id.clone(),
                row.record_id.clone(),
                row.old_version,
                row.changes.clone(),
            ));
            undo.push(MutationCommand::SetFieldValues {
                table_id: table_id.clone(),
                record_id: row.record_id.clone(),
                values: row.old_values.clone(),
            });
            redo.push(MutationCommand::SetFieldValues {
                table_id: table_id.clone(),
                record_id: row.record_id.clone(),
                values: row.new_values.clone(),
            });
        }
        let created_record_ids: Vec<RecordId> =
            applied.created.iter().map(|r| r.id.clone()).collect();
        for record in &applied.created {
            events.push(RecordEvent::Created {
                table_id: table_id.clone(),
                record: record.clone(),
            });
        }
        if !applied.created.is_empty() {
            undo.push(MutationCommand::DeleteRecords {
                table_id: table_id.clone(),
                record_ids: created_record_ids.clone(),
            });
            redo.push(MutationCommand::CreateRecords {
                table_id: table_id.clone(),
                records: applied.created.clone(),
            });
        }

        if !events.is_empty() {
            self.event_bus.publish_many(ctx, events.clone()).await?;
            self.undo_redo
                .record_entry(ctx, table_id, UndoRedoEntry::new(undo, redo))
                .await?;
        }

        Ok(PasteResult {
            updated_count: applied.updated.len() as u64,
            created_count: applied.created.len() as u64,
            created_record_ids,
            events,
        })
    }
}

struct UpdatedRow {
    record_id: RecordId,
    old_version: i64,
    old_values: BTreeMap<FieldId, CellValue>,
    new_values: BTreeMap<FieldId, CellValue>,
    changes: Vec<FieldChange>,
}

#[derive(Default)]
struct AppliedMutations {
    updated: Vec<UpdatedRow>,
    created: Vec<TableRecord>,
}

pub(crate) fn resolve_view<'a>(
    table: &'a Table,
    view_id: Option<&ViewId>,
) -> DomainResult<Option<&'a gridbase_commons::View>> {
    match view_id {
        Some(id) => table
            .view_by_id(id)
            .map(Some)
            .ok_or_else(|| {
                gridbase_commons::DomainError::not_found(
                    "not_found.view",
                    format!("table {} has no view {}", table.id, id),
                )
            }),
        None => Ok(table.default_view()),
    }
}

/// Repeats the content block across the range when its dimensions evenly
/// divide the range on both axes; anything else pastes unchanged.
fn tile_content(content: Vec<Vec<Value>>, range: &NormalizedRange) -> Vec<Vec<Value>> {
    let content_height = content.len();
    let content_width = content.iter().map(Vec::len).max().unwrap_or(0);
    if content_height == 0 || content_width == 0 {
        return content;
    }
    let target_height = range.height();
    let target_width = range.width();
    let divides = target_height % content_height == 0
        && target_width % content_width == 0
        && (target_height > content_height || target_width > content_width);
    if !divides {
        return content;
    }
    (0..target_height)
        .map(|row| {
            let source = &content[row % content_height];
            (0..target_width)
                .map(|col| source.get(col % content_width).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect()
}

/// Builds one row's mutation through the typecast builder.
fn build_row(
    table: &Table,
    columns: &[(usize, Field)],
    row: &[Value],
) -> DomainResult<gridbase_specs::BuiltMutation> {
    let mut builder = RecordMutationSpecBuilder::new(table, FieldValidationMode::Typecast);
    for (col, field) in columns {
        let raw = row.get(*col).cloned().unwrap_or(Value::Null);
        builder.set(&field.id, &raw);
    }
    builder.build()
}
