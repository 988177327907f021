//! Visitor protocols for specification trees.
//!
//! `SpecVisitor` has one method per concrete spec variant (closed set, so
//! a `match` in `accept` keeps dispatch exhaustive). The optional filter
//! capability is surfaced through `filter_builder()` rather than
//! inheritance: plain visitors (collectors, counters) cost one defaulted
//! method, while filter-capable visitors opt in and get the clone/combine
//! protocol used by `And`/`Or`/`Not` nodes.

use gridbase_commons::{DomainResult, FilterExpr};

use crate::cell_specs::{
    ClearFieldValueSpec, SetAttachmentValueSpec, SetCheckboxValueSpec, SetDateValueSpec,
    SetLinkValueByTitleSpec, SetLinkValueSpec, SetNumberValueSpec, SetRowOrderValueSpec,
    SetSelectValueSpec, SetTextValueSpec, SetUnresolvedAttachmentValueSpec,
    SetUserValueByIdentifierSpec, SetUserValueSpec,
};
use crate::spec::{FieldValueEqualsSpec, RecordIdEqualsSpec};

/// Visitor over every concrete spec variant.
///
/// Default bodies are no-ops so a visitor only spells out the variants it
/// cares about; the dispatch itself stays exhaustive in `accept`.
#[allow(unused_variables)]
pub trait SpecVisitor {
    fn visit_text(&mut self, spec: &SetTextValueSpec) -> DomainResult<()> {
        Ok(())
    }
    fn visit_number(&mut self, spec: &SetNumberValueSpec) -> DomainResult<()> {
        Ok(())
    }
    fn visit_select(&mut self, spec: &SetSelectValueSpec) -> DomainResult<()> {
        Ok(())
    }
    fn visit_checkbox(&mut self, spec: &SetCheckboxValueSpec) -> DomainResult<()> {
        Ok(())
    }
    fn visit_date(&mut self, spec: &SetDateValueSpec) -> DomainResult<()> {
        Ok(())
    }
    fn visit_attachment(&mut self, spec: &SetAttachmentValueSpec) -> DomainResult<()> {
        Ok(())
    }
    fn visit_unresolved_attachment(
        &mut self,
        spec: &SetUnresolvedAttachmentValueSpec,
    ) -> DomainResult<()> {
        Ok(())
    }
    fn visit_user(&mut self, spec: &SetUserValueSpec) -> DomainResult<()> {
        Ok(())
    }
    fn visit_user_by_identifier(
        &mut self,
        spec: &SetUserValueByIdentifierSpec,
    ) -> DomainResult<()> {
        Ok(())
    }
    fn visit_link(&mut self, spec: &SetLinkValueSpec) -> DomainResult<()> {
        Ok(())
    }
    fn visit_link_by_title(&mut self, spec: &SetLinkValueByTitleSpec) -> DomainResult<()> {
        Ok(())
    }
    fn visit_clear(&mut self, spec: &ClearFieldValueSpec) -> DomainResult<()> {
        Ok(())
    }
    fn visit_row_order(&mut self, spec: &SetRowOrderValueSpec) -> DomainResult<()> {
        Ok(())
    }
    fn visit_record_id_equals(&mut self, spec: &RecordIdEqualsSpec) -> DomainResult<()> {
        Ok(())
    }
    fn visit_field_value_equals(&mut self, spec: &FieldValueEqualsSpec) -> DomainResult<()> {
        Ok(())
    }

    /// Combinator hooks, visited before the children.
    fn visit_and(&mut self) -> DomainResult<()> {
        Ok(())
    }
    fn visit_or(&mut self) -> DomainResult<()> {
        Ok(())
    }
    fn visit_not(&mut self) -> DomainResult<()> {
        Ok(())
    }

    /// Capability check: filter-capable visitors return themselves here.
    fn filter_builder(&mut self) -> Option<&mut dyn FilterSpecVisitor> {
        None
    }
}

/// The filter-builder capability.
///
/// `And`/`Or`/`Not` nodes visit each child with an independently cloned
/// empty visitor (`clone_empty`) so sibling subtrees build their partial
/// conditions in isolation, then combine the children's conditions with
/// the visitor's own `and`/`or`/`not`. That isolation is what keeps
/// operator precedence correct when `Or`/`Not` nest.
pub trait FilterSpecVisitor: SpecVisitor {
    /// Produces an empty visitor of the same concrete type.
    fn clone_empty(&self) -> Box<dyn FilterSpecVisitor>;

    /// Upcast used by `accept` to feed children the cloned visitor.
    fn as_spec_visitor(&mut self) -> &mut dyn SpecVisitor;

    fn and(&mut self, a: FilterExpr, b: FilterExpr) -> FilterExpr;
    fn or(&mut self, a: FilterExpr, b: FilterExpr) -> FilterExpr;
    fn not(&mut self, cond: FilterExpr) -> FilterExpr;

    /// Pushes a condition into the accumulator.
    fn add_cond(&mut self, cond: FilterExpr);

    /// Drains the accumulator into a single condition, AND-folding when
    /// more than one was accumulated; `None` when empty (e.g. the subtree
    /// held only mutate-only leaves).
    fn take_cond(&mut self) -> Option<FilterExpr>;

    /// Finishes the build. An empty accumulator is a validation error, not
    /// a silent match-all filter.
    fn build_where(&mut self) -> DomainResult<FilterExpr>;
}
