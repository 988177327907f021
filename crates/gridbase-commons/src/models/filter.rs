//! Storage-facing filter expressions.
//!
//! `FilterExpr` is the condition currency between the specification layer
//! and the storage adapters: filter-capable spec visitors build these trees
//! and repositories translate them into native filters (a WHERE clause,
//! an index scan plan). The core also evaluates them in memory for
//! update-filter checks and for the in-memory fakes.

use serde::{Deserialize, Serialize};

use crate::ids::{FieldId, RecordId};
use crate::models::cell_value::CellValue;
use crate::models::record::TableRecord;

/// A composable filter condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FilterExpr {
    IdEq { record_id: RecordId },
    IdIn { record_ids: Vec<RecordId> },
    FieldEq { field_id: FieldId, value: CellValue },
    And { conds: Vec<FilterExpr> },
    Or { conds: Vec<FilterExpr> },
    Not { cond: Box<FilterExpr> },
}

impl FilterExpr {
    pub fn and(a: FilterExpr, b: FilterExpr) -> FilterExpr {
        FilterExpr::And { conds: vec![a, b] }
    }

    pub fn or(a: FilterExpr, b: FilterExpr) -> FilterExpr {
        FilterExpr::Or { conds: vec![a, b] }
    }

    pub fn negate(cond: FilterExpr) -> FilterExpr {
        FilterExpr::Not {
            cond: Box::new(cond),
        }
    }

    /// Evaluates the condition against an in-memory record.
    pub fn matches(&self, record: &TableRecord) -> bool {
        match self {
            FilterExpr::IdEq { record_id } => &record.id == record_id,
            FilterExpr::IdIn { record_ids } => record_ids.contains(&record.id),
            FilterExpr::FieldEq { field_id, value } => record.field_value(field_id) == value,
            FilterExpr::And { conds } => conds.iter().all(|c| c.matches(record)),
            FilterExpr::Or { conds } => conds.iter().any(|c| c.matches(record)),
            FilterExpr::Not { cond } => !cond.matches(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TableRecord {
        TableRecord::new(RecordId::new("rec1"))
            .set_field_value(FieldId::new("fld1"), CellValue::Number(42.0))
    }

    #[test]
    fn test_id_eq() {
        let r = record();
        assert!(FilterExpr::IdEq {
            record_id: RecordId::new("rec1")
        }
        .matches(&r));
        assert!(!FilterExpr::IdEq {
            record_id: RecordId::new("rec2")
        }
        .matches(&r));
    }

    #[test]
    fn test_field_eq_null_vs_absent() {
        let r = record();
        // A field that was never set compares equal to Null.
        assert!(FilterExpr::FieldEq {
            field_id: FieldId::new("missing"),
            value: CellValue::Null
        }
        .matches(&r));
    }

    #[test]
    fn test_boolean_combinators() {
        let r = record();
        let id_ok = FilterExpr::IdEq {
            record_id: RecordId::new("rec1"),
        };
        let field_bad = FilterExpr::FieldEq {
            field_id: FieldId::new("fld1"),
            value: CellValue::Number(0.0),
        };
        assert!(!FilterExpr::and(id_ok.clone(), field_bad.clone()).matches(&r));
        assert!(FilterExpr::or(id_ok.clone(), field_bad.clone()).matches(&r));
        assert!(FilterExpr::negate(field_bad).matches(&r));
    }
}
