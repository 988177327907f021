//! GridBase mutation core.
//!
//! Turns client-supplied field values into validated, transactionally
//! applied record changes:
//! - `resolvers` rewrite deferred references (attachment tokens, user
//!   identifiers, foreign link titles) with batched lookups
//! - `commands` orchestrate paste/clear/delete/create pipelines over the
//!   async `ports`, emitting `events` and `undo_redo` pairs after commit
//! - `test_helpers` ships the in-memory port fakes the test suites use
//!
//! Everything external is an injected `Arc<dyn …>` port; this crate owns
//! no storage, transport or transaction implementation.

pub mod commands;
pub mod context;
pub mod events;
pub mod ports;
pub mod resolvers;
pub mod results;
pub mod test_helpers;
pub mod undo_redo;

pub use commands::{
    ClearCommandHandler, ClearRequest, CreateRecordsRequest, CreateRecordsStreamHandler,
    DeleteCommandHandler, DeleteRequest, DeleteTarget, PasteCommandHandler, PasteRequest,
    SourceFieldHeader, TargetRange,
};
pub use context::RequestContext;
pub use events::{FieldChange, RecordEvent};
pub use resolvers::{
    AttachmentValueResolverService, LinkTitleResolverService,
    RecordMutationSpecResolverService, SpecResolver, UserValueResolverService,
};
pub use results::{
    ClearResult, CreateRecordsResult, DeleteResult, PasteResult, RecordCreateResult,
    RecordUpdateResult,
};
pub use undo_redo::{MutationCommand, UndoRedoEntry};
