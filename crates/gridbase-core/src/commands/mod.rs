//! Batch mutation command handlers.
//!
//! Paste is the full pipeline (range resolution, streamed zip, builder,
//! batching, resolution, transaction, events, undo/redo); clear, delete
//! and create-records-stream are restrictions of the same shape.

pub mod batch;
pub mod clear;
pub mod create_records;
pub mod delete;
pub mod paste;
pub mod range;

pub use batch::{calculate_batch_size, calculate_batch_size_with_limit};
pub use clear::{ClearCommandHandler, ClearRequest};
pub use create_records::{CreateRecordsRequest, CreateRecordsStreamHandler};
pub use delete::{DeleteCommandHandler, DeleteRequest, DeleteTarget};
pub use paste::{PasteCommandHandler, PasteRequest, SourceFieldHeader};
pub use range::{NormalizedRange, TargetRange};

use gridbase_commons::{FilterExpr, SortKey, View};

/// Merges a view's persisted filter/sort/group defaults with request
/// overrides; the request wins on conflict. The merged order is
/// group-then-sort, matching how grouped grids display rows.
pub(crate) fn merge_view_query(
    view: Option<&View>,
    filter_override: Option<FilterExpr>,
    order_override: Vec<SortKey>,
) -> (Option<FilterExpr>, Vec<SortKey>) {
    let filter = filter_override.or_else(|| view.and_then(|v| v.filter.clone()));
    let order = if order_override.is_empty() {
        match view {
            Some(v) => v.group.iter().chain(v.sort.iter()).cloned().collect(),
            None => Vec::new(),
        }
    } else {
        order_override
    };
    (filter, order)
}
