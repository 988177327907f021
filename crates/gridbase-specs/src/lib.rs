//! Specification layer of the GridBase mutation core.
//!
//! A specification is three things at once:
//! - a boolean predicate over an in-memory [`TableRecord`](gridbase_commons::TableRecord)
//! - an in-memory mutator producing a new record
//! - a visitable tree from which a filter-capable visitor can build a
//!   storage-native [`FilterExpr`](gridbase_commons::FilterExpr)
//!
//! The typed cell-value specs (one per field kind) are assembled into trees
//! by [`RecordMutationSpecBuilder`], which validates or typecasts raw
//! caller input on the way in.

pub mod builder;
pub mod cell_specs;
pub mod filter;
pub mod spec;
pub mod typecast;
pub mod visitor;

pub use builder::{BuiltMutation, FieldValidationMode, RecordMutationSpecBuilder};
pub use cell_specs::{
    CellValueSpec, ClearFieldValueSpec, SelectValue, SetAttachmentValueSpec,
    SetCheckboxValueSpec, SetDateValueSpec, SetLinkValueByTitleSpec, SetLinkValueSpec,
    SetNumberValueSpec, SetRowOrderValueSpec, SetSelectValueSpec, SetTextValueSpec,
    SetUnresolvedAttachmentValueSpec, SetUserValueByIdentifierSpec, SetUserValueSpec,
    UserIdentifiers, UserSelection,
};
pub use filter::FilterExprVisitor;
pub use spec::{FieldValueEqualsSpec, PredicateSpec, RecordIdEqualsSpec, RecordSpec};
pub use visitor::{FilterSpecVisitor, SpecVisitor};
