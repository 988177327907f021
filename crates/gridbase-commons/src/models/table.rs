//! Table and view metadata.

use serde::{Deserialize, Serialize};

use crate::ids::{FieldId, TableId, ViewId};
use crate::models::field::Field;
use crate::models::filter::FilterExpr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// One sort (or group) key of a view or request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field_id: FieldId,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn ascending(field_id: FieldId) -> Self {
        Self {
            field_id,
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field_id: FieldId) -> Self {
        Self {
            field_id,
            direction: SortDirection::Descending,
        }
    }
}

/// A view over a table: field visibility/ordering plus persisted
/// filter/sort/group defaults that requests may override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub id: ViewId,
    pub name: String,
    /// Ordered visible field ids. `None` means all fields in table order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_field_ids: Option<Vec<FieldId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterExpr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group: Vec<SortKey>,
}

impl View {
    pub fn new(id: ViewId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            visible_field_ids: None,
            filter: None,
            sort: Vec::new(),
            group: Vec::new(),
        }
    }
}

/// Table metadata: identity, schema and views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    pub fields: Vec<Field>,
    pub views: Vec<View>,
    /// The primary field carries the record title used by link cells.
    pub primary_field_id: FieldId,
}

impl Table {
    pub fn new(
        id: TableId,
        name: impl Into<String>,
        fields: Vec<Field>,
        primary_field_id: FieldId,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            fields,
            views: Vec::new(),
            primary_field_id,
        }
    }

    pub fn with_views(mut self, views: Vec<View>) -> Self {
        self.views = views;
        self
    }

    pub fn field_by_id(&self, id: &FieldId) -> Option<&Field> {
        self.fields.iter().find(|f| &f.id == id)
    }

    /// Resolves a caller-supplied field key: field id first, then name.
    pub fn field_by_key(&self, key: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.id.as_str() == key)
            .or_else(|| self.fields.iter().find(|f| f.name == key))
    }

    pub fn primary_field(&self) -> Option<&Field> {
        self.field_by_id(&self.primary_field_id)
    }

    pub fn view_by_id(&self, id: &ViewId) -> Option<&View> {
        self.views.iter().find(|v| &v.id == id)
    }

    /// The first view is the default.
    pub fn default_view(&self) -> Option<&View> {
        self.views.first()
    }

    /// Ordered visible fields of a view, honoring an explicit projection
    /// override. Unknown projected ids are dropped.
    pub fn visible_fields<'a>(
        &'a self,
        view: Option<&View>,
        projection: Option<&[FieldId]>,
    ) -> Vec<&'a Field> {
        if let Some(projection) = projection {
            return projection
                .iter()
                .filter_map(|id| self.field_by_id(id))
                .collect();
        }
        match view.and_then(|v| v.visible_field_ids.as_ref()) {
            Some(ids) => ids.iter().filter_map(|id| self.field_by_id(id)).collect(),
            None => self.fields.iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::field::FieldKind;

    fn table() -> Table {
        let fields = vec![
            Field::new(FieldId::new("fld1"), "Name", FieldKind::SingleLineText),
            Field::new(FieldId::new("fld2"), "Score", FieldKind::Number),
        ];
        Table::new(
            TableId::new("tbl1"),
            "Tasks",
            fields,
            FieldId::new("fld1"),
        )
    }

    #[test]
    fn test_field_by_key_prefers_id() {
        let t = table();
        assert_eq!(t.field_by_key("fld2").unwrap().name, "Score");
        assert_eq!(t.field_by_key("Score").unwrap().id.as_str(), "fld2");
        assert!(t.field_by_key("nope").is_none());
    }

    #[test]
    fn test_visible_fields_projection_override() {
        let t = table();
        let visible = t.visible_fields(None, Some(&[FieldId::new("fld2")]));
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "Score");
    }

    #[test]
    fn test_visible_fields_from_view() {
        let mut t = table();
        let mut view = View::new(ViewId::new("viw1"), "Grid");
        view.visible_field_ids = Some(vec![FieldId::new("fld2"), FieldId::new("fld1")]);
        t = t.with_views(vec![view]);

        let view = t.default_view().unwrap().clone();
        let visible = t.visible_fields(Some(&view), None);
        assert_eq!(visible[0].name, "Score");
        assert_eq!(visible[1].name, "Name");
    }

    #[test]
    fn test_primary_field() {
        let t = table();
        assert_eq!(t.primary_field().unwrap().name, "Name");
    }
}
