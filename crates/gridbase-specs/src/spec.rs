//! The specification tree and its combinator algebra.

use gridbase_commons::{CellValue, DomainResult, FieldId, RecordId, TableRecord};

use crate::cell_specs::CellValueSpec;
use crate::visitor::SpecVisitor;

/// Predicate-only leaf: satisfied when the record has the given id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordIdEqualsSpec {
    pub record_id: RecordId,
}

/// Predicate-only leaf: satisfied when the field holds the given value
/// (absent fields compare as null).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValueEqualsSpec {
    pub field_id: FieldId,
    pub value: CellValue,
}

/// Closed union over the predicate leaves.
#[derive(Debug, Clone, PartialEq)]
pub enum PredicateSpec {
    RecordIdEquals(RecordIdEqualsSpec),
    FieldValueEquals(FieldValueEqualsSpec),
}

impl PredicateSpec {
    pub fn record_id_equals(record_id: RecordId) -> Self {
        PredicateSpec::RecordIdEquals(RecordIdEqualsSpec { record_id })
    }

    pub fn field_value_equals(field_id: FieldId, value: CellValue) -> Self {
        PredicateSpec::FieldValueEquals(FieldValueEqualsSpec { field_id, value })
    }

    fn is_satisfied_by(&self, record: &TableRecord) -> bool {
        match self {
            PredicateSpec::RecordIdEquals(s) => record.id == s.record_id,
            PredicateSpec::FieldValueEquals(s) => record.field_value(&s.field_id) == &s.value,
        }
    }

    fn accept(&self, visitor: &mut dyn SpecVisitor) -> DomainResult<()> {
        match self {
            PredicateSpec::RecordIdEquals(s) => visitor.visit_record_id_equals(s),
            PredicateSpec::FieldValueEquals(s) => visitor.visit_field_value_equals(s),
        }
    }
}

/// A specification tree over table records.
///
/// Invariants:
/// - `is_satisfied_by` is pure
/// - `mutate` is total and returns a Result, never panics
/// - `accept` visits every node exactly once, left to right for And/Or
#[derive(Debug, Clone, PartialEq)]
pub enum RecordSpec {
    And(Box<RecordSpec>, Box<RecordSpec>),
    Or(Box<RecordSpec>, Box<RecordSpec>),
    Not(Box<RecordSpec>),
    Value(CellValueSpec),
    Predicate(PredicateSpec),
}

impl RecordSpec {
    pub fn and(a: RecordSpec, b: RecordSpec) -> RecordSpec {
        RecordSpec::And(Box::new(a), Box::new(b))
    }

    pub fn or(a: RecordSpec, b: RecordSpec) -> RecordSpec {
        RecordSpec::Or(Box::new(a), Box::new(b))
    }

    pub fn negate(a: RecordSpec) -> RecordSpec {
        RecordSpec::Not(Box::new(a))
    }

    /// Left-folds specs into a single And tree. A singleton passes through
    /// unwrapped; an empty list yields `None`.
    pub fn from_value_specs(specs: Vec<CellValueSpec>) -> Option<RecordSpec> {
        let mut iter = specs.into_iter().map(RecordSpec::Value);
        let first = iter.next()?;
        Some(iter.fold(first, RecordSpec::and))
    }

    /// Left-folds predicate trees into a single Or tree (used for
    /// delete-by-id sets). Empty input yields `None`.
    pub fn any_of(specs: Vec<RecordSpec>) -> Option<RecordSpec> {
        let mut iter = specs.into_iter();
        let first = iter.next()?;
        Some(iter.fold(first, RecordSpec::or))
    }

    /// Pure boolean evaluation against an in-memory record. Cell-value
    /// leaves are mutate-only and always satisfied.
    pub fn is_satisfied_by(&self, record: &TableRecord) -> bool {
        match self {
            RecordSpec::And(a, b) => a.is_satisfied_by(record) && b.is_satisfied_by(record),
            RecordSpec::Or(a, b) => a.is_satisfied_by(record) || b.is_satisfied_by(record),
            RecordSpec::Not(a) => !a.is_satisfied_by(record),
            RecordSpec::Value(_) => true,
            RecordSpec::Predicate(p) => p.is_satisfied_by(record),
        }
    }

    /// Applies the tree's mutations to a record.
    ///
    /// - `And` applies left then right, short-circuiting on the first error
    /// - `Or` applies whichever child is satisfied, preferring the left,
    ///   and passes the record through unchanged when neither matches
    ///   (asymmetric by design; downstream typecast paths rely on the
    ///   left preference)
    /// - `Not` is identity: negations are predicate-only
    pub fn mutate(&self, record: TableRecord) -> DomainResult<TableRecord> {
        match self {
            RecordSpec::And(a, b) => {
                let record = a.mutate(record)?;
                b.mutate(record)
            }
            RecordSpec::Or(a, b) => {
                if a.is_satisfied_by(&record) {
                    a.mutate(record)
                } else if b.is_satisfied_by(&record) {
                    b.mutate(record)
                } else {
                    Ok(record)
                }
            }
            RecordSpec::Not(_) => Ok(record),
            RecordSpec::Value(spec) => spec.mutate(record),
            RecordSpec::Predicate(_) => Ok(record),
        }
    }

    /// Visits the tree.
    ///
    /// With a plain visitor, combinators visit self then children left to
    /// right. With a filter-capable visitor, each child is visited with an
    /// independently cloned empty visitor and the children's conditions
    /// are combined with the visitor's own `and`/`or`/`not`.
    pub fn accept(&self, visitor: &mut dyn SpecVisitor) -> DomainResult<()> {
        match self {
            RecordSpec::And(a, b) => {
                let clones = visitor
                    .filter_builder()
                    .map(|fb| (fb.clone_empty(), fb.clone_empty()));
                match clones {
                    Some((mut left, mut right)) => {
                        a.accept(left.as_spec_visitor())?;
                        b.accept(right.as_spec_visitor())?;
                        let lc = left.take_cond();
                        let rc = right.take_cond();
                        if let Some(fb) = visitor.filter_builder() {
                            match (lc, rc) {
                                (Some(l), Some(r)) => {
                                    let cond = fb.and(l, r);
                                    fb.add_cond(cond);
                                }
                                (Some(l), None) => fb.add_cond(l),
                                (None, Some(r)) => fb.add_cond(r),
                                (None, None) => {}
                            }
                        }
                        Ok(())
                    }
                    None => {
                        visitor.visit_and()?;
                        a.accept(visitor)?;
                        b.accept(visitor)
                    }
                }
            }
            RecordSpec::Or(a, b) => {
                let clones = visitor
                    .filter_builder()
                    .map(|fb| (fb.clone_empty(), fb.clone_empty()));
                match clones {
                    Some((mut left, mut right)) => {
                        a.accept(left.as_spec_visitor())?;
                        b.accept(right.as_spec_visitor())?;
                        let lc = left.take_cond();
                        let rc = right.take_cond();
                        if let Some(fb) = visitor.filter_builder() {
                            match (lc, rc) {
                                (Some(l), Some(r)) => {
                                    let cond = fb.or(l, r);
                                    fb.add_cond(cond);
                                }
                                (Some(l), None) => fb.add_cond(l),
                                (None, Some(r)) => fb.add_cond(r),
                                (None, None) => {}
                            }
                        }
                        Ok(())
                    }
                    None => {
                        visitor.visit_or()?;
                        a.accept(visitor)?;
                        b.accept(visitor)
                    }
                }
            }
            RecordSpec::Not(a) => {
                let clone = visitor.filter_builder().map(|fb| fb.clone_empty());
                match clone {
                    Some(mut inner) => {
                        a.accept(inner.as_spec_visitor())?;
                        let cond = inner.take_cond();
                        if let Some(fb) = visitor.filter_builder() {
                            if let Some(c) = cond {
                                let negated = fb.not(c);
                                fb.add_cond(negated);
                            }
                        }
                        Ok(())
                    }
                    None => {
                        visitor.visit_not()?;
                        a.accept(visitor)
                    }
                }
            }
            RecordSpec::Value(spec) => spec.accept(visitor),
            RecordSpec::Predicate(p) => p.accept(visitor),
        }
    }

    /// Collects references to all cell-value leaves, left to right.
    pub fn value_leaves(&self) -> Vec<&CellValueSpec> {
        let mut out = Vec::new();
        self.collect_value_leaves(&mut out);
        out
    }

    fn collect_value_leaves<'a>(&'a self, out: &mut Vec<&'a CellValueSpec>) {
        match self {
            RecordSpec::And(a, b) | RecordSpec::Or(a, b) => {
                a.collect_value_leaves(out);
                b.collect_value_leaves(out);
            }
            RecordSpec::Not(a) => a.collect_value_leaves(out),
            RecordSpec::Value(spec) => out.push(spec),
            RecordSpec::Predicate(_) => {}
        }
    }

    /// Rebuilds the tree with each cell-value leaf replaced by
    /// `replace(leaf)`, preserving shape and leaf order. Used by the
    /// resolver dispatcher to substitute resolved leaves back in.
    pub fn map_value_leaves(self, replace: &mut impl FnMut(CellValueSpec) -> CellValueSpec) -> Self {
        match self {
            RecordSpec::And(a, b) => RecordSpec::And(
                Box::new(a.map_value_leaves(replace)),
                Box::new(b.map_value_leaves(replace)),
            ),
            RecordSpec::Or(a, b) => RecordSpec::Or(
                Box::new(a.map_value_leaves(replace)),
                Box::new(b.map_value_leaves(replace)),
            ),
            RecordSpec::Not(a) => RecordSpec::Not(Box::new(a.map_value_leaves(replace))),
            RecordSpec::Value(spec) => RecordSpec::Value(replace(spec)),
            RecordSpec::Predicate(p) => RecordSpec::Predicate(p),
        }
    }
}
