//! Shared building blocks for the GridBase mutation core.
//!
//! This crate holds the types every other crate agrees on:
//! - Typed identifiers (`ids`) so a `RecordId` can never be passed where a
//!   `FieldId` is expected
//! - The `DomainError` value-style error type (`errors`)
//! - Value-object models (`models`): fields, cell values, records, tables,
//!   views and the storage-facing filter expression tree

pub mod errors;
pub mod ids;
pub mod models;

pub use errors::{DomainError, DomainResult, ErrorKind};
pub use ids::{AttachmentId, FieldId, RecordId, TableId, UserId, ViewId};
pub use models::{
    AttachmentItem, CellValue, Field, FieldKind, FilterExpr, LinkItem, SelectOption, SortDirection,
    SortKey, Table, TableRecord, UserCellItem, View,
};
