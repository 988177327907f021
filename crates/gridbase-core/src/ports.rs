//! Async ports the mutation core consumes.
//!
//! All ports are object-safe and injected as `Arc<dyn …>` constructor
//! parameters. Storage adapters own SQL/native-filter generation; the core
//! hands them [`RecordSpec`] trees and [`FilterExpr`] values and never
//! sees a connection.

use async_trait::async_trait;
use futures::stream::BoxStream;

use gridbase_commons::models::attachment::StoredAttachment;
use gridbase_commons::{
    AttachmentId, DomainResult, Field, FieldId, FilterExpr, SortKey, Table, TableId, TableRecord,
    UserId, ViewId,
};
use gridbase_specs::RecordSpec;

use crate::context::RequestContext;
use crate::events::RecordEvent;
use crate::results::{RecordCreateResult, RecordUpdateResult};
use crate::undo_redo::UndoRedoEntry;

/// Query parameters for counting/streaming records.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    pub filter: Option<FilterExpr>,
    pub order: Vec<SortKey>,
    /// When set, the adapter appends the per-view row-order system column
    /// as the final, stable sort key.
    pub order_fallback_view: Option<ViewId>,
    pub skip: Option<u64>,
    pub take: Option<u64>,
    pub projection: Option<Vec<FieldId>>,
}

impl RecordQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filtered(filter: FilterExpr) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait TableRepository: Send + Sync {
    async fn find_by_id(&self, ctx: &RequestContext, table_id: &TableId) -> DomainResult<Table>;

    /// Persists a synthesized field (paste overflow) and returns it.
    async fn create_field(
        &self,
        ctx: &RequestContext,
        table_id: &TableId,
        field: Field,
    ) -> DomainResult<Field>;
}

#[async_trait]
pub trait TableRecordRepository: Send + Sync {
    async fn insert_batch(
        &self,
        ctx: &RequestContext,
        table_id: &TableId,
        batch: Vec<RecordCreateResult>,
    ) -> DomainResult<()>;

    async fn update_batch(
        &self,
        ctx: &RequestContext,
        table_id: &TableId,
        batch: Vec<RecordUpdateResult>,
    ) -> DomainResult<()>;

    /// Deletes every record the spec matches, returning the count actually
    /// removed (which may be lower than the caller expected; delete is
    /// idempotent).
    async fn delete_by_spec(
        &self,
        ctx: &RequestContext,
        table_id: &TableId,
        spec: &RecordSpec,
    ) -> DomainResult<u64>;
}

#[async_trait]
pub trait TableRecordQueryRepository: Send + Sync {
    async fn count(
        &self,
        ctx: &RequestContext,
        table_id: &TableId,
        query: &RecordQuery,
    ) -> DomainResult<u64>;

    async fn stream(
        &self,
        ctx: &RequestContext,
        table_id: &TableId,
        query: RecordQuery,
    ) -> DomainResult<BoxStream<'static, DomainResult<TableRecord>>>;
}

/// Transaction boundary, keyed by the request context.
///
/// Every command handler wraps all of its mutation in exactly one
/// begin/commit pair; any error in between rolls back, and nothing is
/// published for a rolled-back operation.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self, ctx: &RequestContext) -> DomainResult<()>;
    async fn commit(&self, ctx: &RequestContext) -> DomainResult<()>;
    async fn rollback(&self, ctx: &RequestContext) -> DomainResult<()>;
}

#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish_many(
        &self,
        ctx: &RequestContext,
        events: Vec<RecordEvent>,
    ) -> DomainResult<()>;
}

#[async_trait]
pub trait UndoRedoService: Send + Sync {
    async fn record_entry(
        &self,
        ctx: &RequestContext,
        table_id: &TableId,
        entry: UndoRedoEntry,
    ) -> DomainResult<()>;
}

#[async_trait]
pub trait AttachmentLookupService: Send + Sync {
    async fn find_by_tokens(
        &self,
        ctx: &RequestContext,
        tokens: &[String],
    ) -> DomainResult<Vec<StoredAttachment>>;

    async fn find_by_ids(
        &self,
        ctx: &RequestContext,
        ids: &[AttachmentId],
    ) -> DomainResult<Vec<StoredAttachment>>;
}

/// A collaborator as returned by the user lookup port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupUser {
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
}

#[async_trait]
pub trait UserLookupService: Send + Sync {
    /// Resolves a mixed batch of identifiers (ids, emails, names) in one
    /// call. Unknown identifiers are simply absent from the result.
    async fn find_by_identifiers(
        &self,
        ctx: &RequestContext,
        identifiers: &[String],
    ) -> DomainResult<Vec<LookupUser>>;
}
