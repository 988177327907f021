//! The create-records-stream command: bulk creation through the builder.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use gridbase_commons::{
    DomainResult, Field, FieldId, RecordId, Table, TableId, TableRecord,
};
use gridbase_specs::{
    typecast, CellValueSpec, FieldValidationMode, RecordMutationSpecBuilder, RecordSpec,
};

use crate::commands::batch::{calculate_batch_size_with_limit, into_batches};
use crate::context::RequestContext;
use crate::events::RecordEvent;
use crate::ports::{EventBus, TableRecordRepository, TableRepository, UndoRedoService, UnitOfWork};
use crate::resolvers::RecordMutationSpecResolverService;
use crate::results::{CreateRecordsResult, RecordCreateResult};
use crate::undo_redo::{MutationCommand, UndoRedoEntry};

#[derive(Debug, Clone)]
pub struct CreateRecordsRequest {
    pub table_id: TableId,
    /// One field-key → raw-value map per record to create.
    pub records: Vec<BTreeMap<String, Value>>,
    pub mode: FieldValidationMode,
    pub batch_size_limit: Option<usize>,
}

/// Streams record payloads through the builder in calculated batches,
/// all inside one transaction. Events are published only after commit,
/// and a failure surfaces no partial created list.
pub struct CreateRecordsStreamHandler {
    tables: Arc<dyn TableRepository>,
    records: Arc<dyn TableRecordRepository>,
    unit_of_work: Arc<dyn UnitOfWork>,
    event_bus: Arc<dyn EventBus>,
    undo_redo: Arc<dyn UndoRedoService>,
    resolver: Arc<RecordMutationSpecResolverService>,
}

impl CreateRecordsStreamHandler {
    pub fn new(
        tables: Arc<dyn TableRepository>,
        records: Arc<dyn TableRecordRepository>,
        unit_of_work: Arc<dyn UnitOfWork>,
        event_bus: Arc<dyn EventBus>,
        undo_redo: Arc<dyn UndoRedoService>,
        resolver: Arc<RecordMutationSpecResolverService>,
    ) -> Self {
        Self {
            tables,
            records,
            unit_of_work,
            event_bus,
            undo_redo,
            resolver,
        }
    }

    pub async fn execute(
        &self,
        ctx: &RequestContext,
        request: CreateRecordsRequest,
    ) -> DomainResult<CreateRecordsResult> {
        if request.records.is_empty() {
            return Ok(CreateRecordsResult::default());
        }
        let table = self.tables.find_by_id(ctx, &request.table_id).await?;

        // 1. Build one plan per payload; the first invalid payload aborts
        // the whole operation before anything is written.
        let mut plans = Vec::with_capacity(request.records.len());
        for values in &request.records {
            plans.push(build_create_plan(&table, values, request.mode)?);
        }

        // 2. Batched inserts inside one transaction.
        let batch_size =
            calculate_batch_size_with_limit(table.fields.len(), request.batch_size_limit);
        log::info!(
            "creating {} records in table {} (batch size {})",
            plans.len(),
            request.table_id,
            batch_size
        );
        self.unit_of_work.begin(ctx).await?;
        let created = match self
            .insert_batches(ctx, &request.table_id, plans, batch_size)
            .await
        {
            Ok(created) => created,
            Err(err) => {
                if let Err(rollback_err) = self.unit_of_work.rollback(ctx).await {
                    log::warn!("create-records rollback failed: {}", rollback_err);
                }
                return Err(err);
            }
        };
        self.unit_of_work.commit(ctx).await?;

        // 3. Post-commit events and one undo/redo entry.
        let created_record_ids: Vec<RecordId> = created.iter().map(|r| r.id.clone()).collect();
        let events: Vec<RecordEvent> = created
            .iter()
            .map(|record| RecordEvent::Created {
                table_id: request.table_id.clone(),
                record: record.clone(),
            })
            .collect();
        self.event_bus.publish_many(ctx, events.clone()).await?;
        self.undo_redo
            .record_entry(
                ctx,
                &request.table_id,
                UndoRedoEntry::new(
                    vec![MutationCommand::DeleteRecords {
                        table_id: request.table_id.clone(),
                        record_ids: created_record_ids.clone(),
                    }],
                    vec![MutationCommand::CreateRecords {
                        table_id: request.table_id.clone(),
                        records: created.clone(),
                    }],
                ),
            )
            .await?;

        Ok(CreateRecordsResult {
            created_count: created.len() as u64,
            created_record_ids,
            events,
        })
    }

    async fn insert_batches(
        &self,
        ctx: &RequestContext,
        table_id: &TableId,
        plans: Vec<CreatePlan>,
        batch_size: usize,
    ) -> DomainResult<Vec<TableRecord>> {
        let mut created = Vec::with_capacity(plans.len());
        for batch in into_batches(plans, batch_size) {
            // Resolve the specs of this batch in one dispatcher call.
            let indexed: Vec<(usize, RecordSpec)> = batch
                .iter()
                .enumerate()
                .filter_map(|(i, plan)| plan.spec.clone().map(|spec| (i, spec)))
                .collect();
            let resolved = self
                .resolver
                .resolve_and_replace_many(
                    ctx,
                    indexed.iter().map(|(_, spec)| spec.clone()).collect(),
                )
                .await?;
            let mut resolved_by_index: BTreeMap<usize, RecordSpec> = indexed
                .into_iter()
                .map(|(i, _)| i)
                .zip(resolved)
                .collect();

            let mut inserts = Vec::with_capacity(batch.len());
            for (i, plan) in batch.into_iter().enumerate() {
                let spec = resolved_by_index.remove(&i);
                let record = match &spec {
                    Some(spec) => spec.mutate(TableRecord::new(RecordId::generate()))?,
                    None => TableRecord::new(RecordId::generate()),
                };
                created.push(record.clone());
                inserts.push(RecordCreateResult {
                    record,
                    spec,
                    field_key_mapping: plan.field_key_mapping,
                });
            }
            self.records.insert_batch(ctx, table_id, inserts).await?;
        }
        Ok(created)
    }
}

struct CreatePlan {
    spec: Option<RecordSpec>,
    field_key_mapping: BTreeMap<String, FieldId>,
}

/// Builds the creation spec for one payload: caller values in the
/// requested mode, plus configured defaults for fields the payload omits.
/// Defaults always convert with typecast semantics because they come from
/// table configuration, not untrusted input.
fn build_create_plan(
    table: &Table,
    values: &BTreeMap<String, Value>,
    mode: FieldValidationMode,
) -> DomainResult<CreatePlan> {
    let built = if values.is_empty() {
        None
    } else {
        let mut builder = RecordMutationSpecBuilder::new(table, mode);
        for (key, raw) in values {
            builder.set_by_key(key, raw);
        }
        Some(builder.build()?)
    };

    let mut default_specs: Vec<CellValueSpec> = Vec::new();
    for field in &table.fields {
        if field.is_computed || provided(table, values, field) {
            continue;
        }
        if let Some(default) = &field.default_value {
            default_specs.push(typecast::convert(
                field,
                default,
                FieldValidationMode::Typecast,
            )?);
        }
    }
    let defaults = RecordSpec::from_value_specs(default_specs);

    let (spec, field_key_mapping) = match built {
        Some(built) => {
            let spec = match defaults {
                Some(defaults) => RecordSpec::and(built.spec, defaults),
                None => built.spec,
            };
            (Some(spec), built.field_key_mapping)
        }
        None => (defaults, BTreeMap::new()),
    };
    Ok(CreatePlan {
        spec,
        field_key_mapping,
    })
}

fn provided(table: &Table, values: &BTreeMap<String, Value>, field: &Field) -> bool {
    values
        .keys()
        .any(|key| table.field_by_key(key).map(|f| &f.id) == Some(&field.id))
}
