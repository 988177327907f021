//! Target-range normalization for the batch mutation commands.

use gridbase_commons::{DomainError, DomainResult, TableId};

use crate::context::RequestContext;
use crate::ports::{RecordQuery, TableRecordQueryRepository};

/// The caller's selection, in view coordinates (columns are positions
/// among the view's visible fields, rows are positions in the merged
/// sort order). All bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRange {
    Cells {
        start_col: usize,
        start_row: usize,
        end_col: usize,
        end_row: usize,
    },
    /// Whole rows; `end: None` selects through the last row.
    Rows { start: usize, end: Option<usize> },
    /// Whole columns; `end: None` selects through the last column.
    Columns { start: usize, end: Option<usize> },
}

/// A concrete rectangle after normalization, inclusive on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedRange {
    pub start_col: usize,
    pub end_col: usize,
    pub start_row: usize,
    pub end_row: usize,
}

impl NormalizedRange {
    pub fn width(&self) -> usize {
        self.end_col - self.start_col + 1
    }

    pub fn height(&self) -> usize {
        self.end_row - self.start_row + 1
    }
}

/// Normalizes a range against the table's actual dimensions.
///
/// Rows/Columns selections need the total row count, learned from a
/// count-only query (with the same filter the streaming query will use)
/// before clamping; an open-ended column selection becomes the known
/// column count. Cell ranges pass through after bound ordering only:
/// paste may legitimately extend past the last row (creates) and past
/// the last column (field synthesis).
pub async fn normalize_range(
    ctx: &RequestContext,
    queries: &dyn TableRecordQueryRepository,
    table_id: &TableId,
    range: &TargetRange,
    column_count: usize,
    count_query: &RecordQuery,
) -> DomainResult<NormalizedRange> {
    match range {
        TargetRange::Cells {
            start_col,
            start_row,
            end_col,
            end_row,
        } => {
            if start_col > end_col || start_row > end_row {
                return Err(invalid_range("cell range bounds are out of order"));
            }
            Ok(NormalizedRange {
                start_col: *start_col,
                end_col: *end_col,
                start_row: *start_row,
                end_row: *end_row,
            })
        }
        TargetRange::Rows { start, end } => {
            let total = queries.count(ctx, table_id, count_query).await? as usize;
            if total == 0 {
                return Err(invalid_range("row range selects from an empty table"));
            }
            let last = total - 1;
            let end_row = end.unwrap_or(last).min(last);
            if *start > end_row {
                return Err(invalid_range("row range starts beyond the last row"));
            }
            if column_count == 0 {
                return Err(invalid_range("row range selects from a table with no columns"));
            }
            Ok(NormalizedRange {
                start_col: 0,
                end_col: column_count - 1,
                start_row: *start,
                end_row,
            })
        }
        TargetRange::Columns { start, end } => {
            let total = queries.count(ctx, table_id, count_query).await? as usize;
            if total == 0 {
                return Err(invalid_range("column range selects from an empty table"));
            }
            if column_count == 0 {
                return Err(invalid_range("column range selects from a table with no columns"));
            }
            let last_col = column_count - 1;
            let end_col = end.unwrap_or(last_col).min(last_col);
            if *start > end_col {
                return Err(invalid_range("column range starts beyond the last column"));
            }
            Ok(NormalizedRange {
                start_col: *start,
                end_col,
                start_row: 0,
                end_row: total - 1,
            })
        }
    }
}

fn invalid_range(message: &str) -> DomainError {
    DomainError::validation("validation.range.invalid", message)
}
