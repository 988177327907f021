//! Value-object models shared across the mutation core.

pub mod attachment;
pub mod cell_value;
pub mod field;
pub mod filter;
pub mod record;
pub mod table;

pub use attachment::{AttachmentInput, AttachmentItem, StoredAttachment};
pub use cell_value::{CellValue, LinkItem, UserCellItem};
pub use field::{Field, FieldKind, SelectOption};
pub use filter::FilterExpr;
pub use record::TableRecord;
pub use table::{SortDirection, SortKey, Table, View};
