//! In-memory port fakes for the test suites.
//!
//! Lookup fakes count their calls so tests can assert the one-lookup-per-
//! distinct-key-set guarantee; the record store can be told to fail so
//! transaction rollback paths are testable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;

use gridbase_commons::models::attachment::StoredAttachment;
use gridbase_commons::{
    AttachmentId, DomainError, DomainResult, Field, Table, TableId, TableRecord,
};
use gridbase_specs::RecordSpec;

use crate::context::RequestContext;
use crate::events::RecordEvent;
use crate::ports::{
    AttachmentLookupService, EventBus, LookupUser, RecordQuery, TableRecordQueryRepository,
    TableRecordRepository, TableRepository, UndoRedoService, UnitOfWork, UserLookupService,
};
use crate::results::{RecordCreateResult, RecordUpdateResult};
use crate::undo_redo::UndoRedoEntry;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Tables

#[derive(Default)]
pub struct InMemoryTableRepository {
    tables: Mutex<HashMap<TableId, Table>>,
    pub find_calls: AtomicUsize,
}

impl InMemoryTableRepository {
    pub fn with_tables(tables: Vec<Table>) -> Self {
        Self {
            tables: Mutex::new(tables.into_iter().map(|t| (t.id.clone(), t)).collect()),
            find_calls: AtomicUsize::new(0),
        }
    }

    pub fn table(&self, table_id: &TableId) -> Option<Table> {
        lock(&self.tables).get(table_id).cloned()
    }
}

#[async_trait]
impl TableRepository for InMemoryTableRepository {
    async fn find_by_id(&self, _ctx: &RequestContext, table_id: &TableId) -> DomainResult<Table> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.tables).get(table_id).cloned().ok_or_else(|| {
            DomainError::not_found("not_found.table", format!("no table {}", table_id))
        })
    }

    async fn create_field(
        &self,
        _ctx: &RequestContext,
        table_id: &TableId,
        field: Field,
    ) -> DomainResult<Field> {
        let mut tables = lock(&self.tables);
        let table = tables.get_mut(table_id).ok_or_else(|| {
            DomainError::not_found("not_found.table", format!("no table {}", table_id))
        })?;
        table.fields.push(field.clone());
        Ok(field)
    }
}

// ---------------------------------------------------------------------------
// Records

/// Record store backing both the mutation and the query repository port.
/// Records keep insertion order; the fake ignores sort keys.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<HashMap<TableId, Vec<TableRecord>>>,
    pub insert_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub count_calls: AtomicUsize,
    pub stream_calls: AtomicUsize,
    /// When set, the next update/insert batch fails with an
    /// infrastructure error (for rollback-path tests).
    pub fail_writes: AtomicBool,
}

impl InMemoryRecordStore {
    pub fn with_records(table_id: TableId, records: Vec<TableRecord>) -> Self {
        let store = Self::default();
        lock(&store.records).insert(table_id, records);
        store
    }

    pub fn records_in(&self, table_id: &TableId) -> Vec<TableRecord> {
        lock(&self.records).get(table_id).cloned().unwrap_or_default()
    }

    fn matching(&self, table_id: &TableId, query: &RecordQuery) -> Vec<TableRecord> {
        let records = self.records_in(table_id);
        let filtered = records
            .into_iter()
            .filter(|record| {
                query
                    .filter
                    .as_ref()
                    .map(|filter| filter.matches(record))
                    .unwrap_or(true)
            })
            .skip(query.skip.unwrap_or(0) as usize);
        match query.take {
            Some(take) => filtered.take(take as usize).collect(),
            None => filtered.collect(),
        }
    }

    fn check_write(&self) -> DomainResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::infrastructure(
                "infrastructure.write_failed",
                "record store was told to fail writes",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl TableRecordRepository for InMemoryRecordStore {
    async fn insert_batch(
        &self,
        _ctx: &RequestContext,
        table_id: &TableId,
        batch: Vec<RecordCreateResult>,
    ) -> DomainResult<()> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        let mut records = lock(&self.records);
        let table = records.entry(table_id.clone()).or_default();
        for create in batch {
            table.push(create.record);
        }
        Ok(())
    }

    async fn update_batch(
        &self,
        _ctx: &RequestContext,
        table_id: &TableId,
        batch: Vec<RecordUpdateResult>,
    ) -> DomainResult<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        let mut records = lock(&self.records);
        let table = records.entry(table_id.clone()).or_default();
        for update in batch {
            if let Some(slot) = table.iter_mut().find(|r| r.id == update.record.id) {
                *slot = update.record;
            }
        }
        Ok(())
    }

    async fn delete_by_spec(
        &self,
        _ctx: &RequestContext,
        table_id: &TableId,
        spec: &RecordSpec,
    ) -> DomainResult<u64> {
        self.check_write()?;
        let mut records = lock(&self.records);
        let table = records.entry(table_id.clone()).or_default();
        let before = table.len();
        table.retain(|record| !spec.is_satisfied_by(record));
        Ok((before - table.len()) as u64)
    }
}

#[async_trait]
impl TableRecordQueryRepository for InMemoryRecordStore {
    async fn count(
        &self,
        _ctx: &RequestContext,
        table_id: &TableId,
        query: &RecordQuery,
    ) -> DomainResult<u64> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        let unpaged = RecordQuery {
            skip: None,
            take: None,
            ..query.clone()
        };
        Ok(self.matching(table_id, &unpaged).len() as u64)
    }

    async fn stream(
        &self,
        _ctx: &RequestContext,
        table_id: &TableId,
        query: RecordQuery,
    ) -> DomainResult<BoxStream<'static, DomainResult<TableRecord>>> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        let matching = self.matching(table_id, &query);
        Ok(futures::stream::iter(matching.into_iter().map(Ok)).boxed())
    }
}

// ---------------------------------------------------------------------------
// Transactions, events, undo/redo

#[derive(Default)]
pub struct RecordingUnitOfWork {
    pub begun: AtomicUsize,
    pub committed: AtomicUsize,
    pub rolled_back: AtomicUsize,
}

#[async_trait]
impl UnitOfWork for RecordingUnitOfWork {
    async fn begin(&self, _ctx: &RequestContext) -> DomainResult<()> {
        self.begun.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn commit(&self, _ctx: &RequestContext) -> DomainResult<()> {
        self.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self, _ctx: &RequestContext) -> DomainResult<()> {
        self.rolled_back.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingEventBus {
    events: Mutex<Vec<RecordEvent>>,
}

impl RecordingEventBus {
    pub fn published(&self) -> Vec<RecordEvent> {
        lock(&self.events).clone()
    }
}

#[async_trait]
impl EventBus for RecordingEventBus {
    async fn publish_many(
        &self,
        _ctx: &RequestContext,
        events: Vec<RecordEvent>,
    ) -> DomainResult<()> {
        lock(&self.events).extend(events);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingUndoRedoService {
    entries: Mutex<Vec<(TableId, UndoRedoEntry)>>,
}

impl RecordingUndoRedoService {
    pub fn entries(&self) -> Vec<(TableId, UndoRedoEntry)> {
        lock(&self.entries).clone()
    }
}

#[async_trait]
impl UndoRedoService for RecordingUndoRedoService {
    async fn record_entry(
        &self,
        _ctx: &RequestContext,
        table_id: &TableId,
        entry: UndoRedoEntry,
    ) -> DomainResult<()> {
        lock(&self.entries).push((table_id.clone(), entry));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Lookups

#[derive(Default)]
pub struct InMemoryAttachmentLookup {
    stored: Vec<StoredAttachment>,
    pub token_calls: AtomicUsize,
    pub id_calls: AtomicUsize,
}

impl InMemoryAttachmentLookup {
    pub fn with_stored(stored: Vec<StoredAttachment>) -> Self {
        Self {
            stored,
            token_calls: AtomicUsize::new(0),
            id_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AttachmentLookupService for InMemoryAttachmentLookup {
    async fn find_by_tokens(
        &self,
        _ctx: &RequestContext,
        tokens: &[String],
    ) -> DomainResult<Vec<StoredAttachment>> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .stored
            .iter()
            .filter(|s| tokens.contains(&s.token))
            .cloned()
            .collect())
    }

    async fn find_by_ids(
        &self,
        _ctx: &RequestContext,
        ids: &[AttachmentId],
    ) -> DomainResult<Vec<StoredAttachment>> {
        self.id_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .stored
            .iter()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryUserLookup {
    users: Vec<LookupUser>,
    pub calls: AtomicUsize,
}

impl InMemoryUserLookup {
    pub fn with_users(users: Vec<LookupUser>) -> Self {
        Self {
            users,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl UserLookupService for InMemoryUserLookup {
    async fn find_by_identifiers(
        &self,
        _ctx: &RequestContext,
        identifiers: &[String],
    ) -> DomainResult<Vec<LookupUser>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .users
            .iter()
            .filter(|user| {
                identifiers.iter().any(|identifier| {
                    identifier == user.id.as_str()
                        || identifier == &user.name
                        || user.email.as_deref() == Some(identifier)
                })
            })
            .cloned()
            .collect())
    }
}
