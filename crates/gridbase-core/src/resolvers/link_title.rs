//! Link-title resolution: pasted foreign titles into record links.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;

use gridbase_commons::{
    CellValue, DomainError, DomainResult, FieldKind, LinkItem, RecordId, TableId,
};
use gridbase_specs::{CellValueSpec, SetLinkValueSpec};

use crate::context::RequestContext;
use crate::ports::{RecordQuery, TableRecordQueryRepository, TableRepository};
use crate::resolvers::SpecResolver;

/// Resolves `SetLinkValueByTitleSpec` leaves.
///
/// Requests are grouped by foreign table; each foreign table is loaded
/// once and all of its records are streamed once, building a title→id map
/// client-side (no server-side filter is assumed). Duplicate titles keep
/// the first match; unmatched titles are silently dropped, matching the
/// typecast semantics of the paste path that produces these specs.
pub struct LinkTitleResolverService {
    tables: Arc<dyn TableRepository>,
    queries: Arc<dyn TableRecordQueryRepository>,
}

impl LinkTitleResolverService {
    pub fn new(
        tables: Arc<dyn TableRepository>,
        queries: Arc<dyn TableRecordQueryRepository>,
    ) -> Self {
        Self { tables, queries }
    }

    /// Builds the title→id map for one foreign table.
    async fn title_map(
        &self,
        ctx: &RequestContext,
        table_id: &TableId,
    ) -> DomainResult<HashMap<String, RecordId>> {
        let table = self.tables.find_by_id(ctx, table_id).await?;
        let primary = table.primary_field().ok_or_else(|| {
            DomainError::invariant(
                "invariant.missing_primary_field",
                format!("table {} has no primary field", table_id),
            )
        })?;
        if !matches!(primary.kind, FieldKind::SingleLineText) {
            return Err(DomainError::validation(
                "validation.link.title_field_not_text",
                format!(
                    "primary field '{}' of table {} is {}; title matching needs single-line text",
                    primary.name,
                    table_id,
                    primary.kind.kind_name()
                ),
            ));
        }

        let query = RecordQuery {
            projection: Some(vec![primary.id.clone()]),
            ..RecordQuery::all()
        };
        let mut stream = self.queries.stream(ctx, table_id, query).await?;
        let mut map: HashMap<String, RecordId> = HashMap::new();
        while let Some(record) = stream.next().await {
            let record = record?;
            if let CellValue::Text(title) = record.field_value(&primary.id) {
                // First match wins on duplicate titles.
                map.entry(title.clone()).or_insert_with(|| record.id.clone());
            }
        }
        log::debug!("built title map for table {} ({} titles)", table_id, map.len());
        Ok(map)
    }
}

#[async_trait]
impl SpecResolver for LinkTitleResolverService {
    fn supports(&self, spec: &CellValueSpec) -> bool {
        matches!(spec, CellValueSpec::LinkByTitle(_))
    }

    async fn resolve_specs(
        &self,
        ctx: &RequestContext,
        specs: Vec<CellValueSpec>,
    ) -> DomainResult<Vec<CellValueSpec>> {
        // One title map per distinct foreign table.
        let mut maps: HashMap<TableId, HashMap<String, RecordId>> = HashMap::new();
        for spec in &specs {
            let CellValueSpec::LinkByTitle(unresolved) = spec else {
                continue;
            };
            if unresolved.titles.is_none() {
                continue;
            }
            if !maps.contains_key(&unresolved.foreign_table_id) {
                let map = self.title_map(ctx, &unresolved.foreign_table_id).await?;
                maps.insert(unresolved.foreign_table_id.clone(), map);
            }
        }

        let mut out = Vec::with_capacity(specs.len());
        for spec in specs {
            let unresolved = match spec {
                CellValueSpec::LinkByTitle(unresolved) => unresolved,
                other => {
                    out.push(other);
                    continue;
                }
            };
            let value = match &unresolved.titles {
                None => None,
                Some(titles) => {
                    let map = maps.get(&unresolved.foreign_table_id);
                    let mut items: Vec<LinkItem> = titles
                        .iter()
                        .filter_map(|title| {
                            map.and_then(|m| m.get(title))
                                .map(|id| LinkItem::titled(id.clone(), title.clone()))
                        })
                        .collect();
                    if !unresolved.multiple {
                        items.truncate(1);
                    }
                    Some(items)
                }
            };
            out.push(CellValueSpec::Link(SetLinkValueSpec {
                field_id: unresolved.field_id,
                value,
            }));
        }
        Ok(out)
    }
}
