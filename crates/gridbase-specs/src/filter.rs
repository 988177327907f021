//! Filter-capable visitor building [`FilterExpr`] trees.
//!
//! This is the in-tree implementation of the filter protocol; storage
//! adapters translate the resulting expression into their native filter.
//! Predicate leaves contribute conditions; mutate-only cell-value leaves
//! contribute nothing.

use gridbase_commons::{DomainError, DomainResult, FilterExpr};

use crate::spec::{FieldValueEqualsSpec, RecordIdEqualsSpec};
use crate::visitor::{FilterSpecVisitor, SpecVisitor};

/// Accumulates filter conditions while visiting a spec tree.
#[derive(Debug, Default)]
pub struct FilterExprVisitor {
    conds: Vec<FilterExpr>,
}

impl FilterExprVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn fold(mut conds: Vec<FilterExpr>) -> Option<FilterExpr> {
        match conds.len() {
            0 => None,
            1 => conds.pop(),
            _ => Some(FilterExpr::And { conds }),
        }
    }
}

impl SpecVisitor for FilterExprVisitor {
    fn visit_record_id_equals(&mut self, spec: &RecordIdEqualsSpec) -> DomainResult<()> {
        self.conds.push(FilterExpr::IdEq {
            record_id: spec.record_id.clone(),
        });
        Ok(())
    }

    fn visit_field_value_equals(&mut self, spec: &FieldValueEqualsSpec) -> DomainResult<()> {
        self.conds.push(FilterExpr::FieldEq {
            field_id: spec.field_id.clone(),
            value: spec.value.clone(),
        });
        Ok(())
    }

    fn filter_builder(&mut self) -> Option<&mut dyn FilterSpecVisitor> {
        Some(self)
    }
}

impl FilterSpecVisitor for FilterExprVisitor {
    fn clone_empty(&self) -> Box<dyn FilterSpecVisitor> {
        Box::new(FilterExprVisitor::new())
    }

    fn as_spec_visitor(&mut self) -> &mut dyn SpecVisitor {
        self
    }

    fn and(&mut self, a: FilterExpr, b: FilterExpr) -> FilterExpr {
        FilterExpr::and(a, b)
    }

    fn or(&mut self, a: FilterExpr, b: FilterExpr) -> FilterExpr {
        FilterExpr::or(a, b)
    }

    fn not(&mut self, cond: FilterExpr) -> FilterExpr {
        FilterExpr::negate(cond)
    }

    fn add_cond(&mut self, cond: FilterExpr) {
        self.conds.push(cond);
    }

    fn take_cond(&mut self) -> Option<FilterExpr> {
        Self::fold(std::mem::take(&mut self.conds))
    }

    fn build_where(&mut self) -> DomainResult<FilterExpr> {
        Self::fold(std::mem::take(&mut self.conds)).ok_or_else(|| {
            DomainError::validation(
                "validation.filter.empty",
                "filter visitor accumulated no conditions; refusing to build a match-all filter",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell_specs::{CellValueSpec, SetTextValueSpec};
    use crate::spec::{PredicateSpec, RecordSpec};
    use gridbase_commons::{FieldId, RecordId, TableRecord};

    fn id_pred(id: &str) -> RecordSpec {
        RecordSpec::Predicate(PredicateSpec::record_id_equals(RecordId::new(id)))
    }

    fn build(spec: &RecordSpec) -> FilterExpr {
        let mut visitor = FilterExprVisitor::new();
        spec.accept(&mut visitor).unwrap();
        visitor.build_where().unwrap()
    }

    #[test]
    fn test_leaf_builds_id_eq() {
        let expr = build(&id_pred("rec1"));
        assert_eq!(
            expr,
            FilterExpr::IdEq {
                record_id: RecordId::new("rec1")
            }
        );
    }

    #[test]
    fn test_or_of_ids_builds_or() {
        let expr = build(&RecordSpec::or(id_pred("rec1"), id_pred("rec2")));
        match expr {
            FilterExpr::Or { conds } => assert_eq!(conds.len(), 2),
            other => panic!("expected Or, got {:?}", other),
        }
    }

    #[test]
    fn test_de_morgan() {
        // Not(Or(a, b)) and And(Not(a), Not(b)) must match the same records.
        let not_or = build(&RecordSpec::negate(RecordSpec::or(
            id_pred("rec1"),
            id_pred("rec2"),
        )));
        let and_nots = build(&RecordSpec::and(
            RecordSpec::negate(id_pred("rec1")),
            RecordSpec::negate(id_pred("rec2")),
        ));

        for id in ["rec1", "rec2", "rec3"] {
            let record = TableRecord::new(RecordId::new(id));
            assert_eq!(
                not_or.matches(&record),
                and_nots.matches(&record),
                "disagreement on {}",
                id
            );
        }
    }

    #[test]
    fn test_empty_where_is_validation_error() {
        let mut visitor = FilterExprVisitor::new();
        let err = visitor.build_where().unwrap_err();
        assert_eq!(err.code, "validation.filter.empty");
    }

    #[test]
    fn test_mutate_only_leaves_contribute_nothing() {
        let spec = RecordSpec::Value(CellValueSpec::Text(SetTextValueSpec {
            field_id: FieldId::new("fld1"),
            value: Some("x".to_string()),
        }));
        let mut visitor = FilterExprVisitor::new();
        spec.accept(&mut visitor).unwrap();
        assert!(visitor.build_where().is_err());
    }

    #[test]
    fn test_mixed_tree_keeps_predicate_condition() {
        // And(value-leaf, predicate) builds just the predicate condition.
        let spec = RecordSpec::and(
            RecordSpec::Value(CellValueSpec::Text(SetTextValueSpec {
                field_id: FieldId::new("fld1"),
                value: None,
            })),
            id_pred("rec9"),
        );
        let expr = build(&spec);
        assert_eq!(
            expr,
            FilterExpr::IdEq {
                record_id: RecordId::new("rec9")
            }
        );
    }
}
