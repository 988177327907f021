//! Attachment resolution: raw token/id references into stored items.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use gridbase_commons::models::attachment::{AttachmentInput, StoredAttachment};
use gridbase_commons::{AttachmentId, AttachmentItem, DomainError, DomainResult, FieldId};
use gridbase_specs::{CellValueSpec, SetAttachmentValueSpec};

use crate::context::RequestContext;
use crate::ports::AttachmentLookupService;
use crate::resolvers::SpecResolver;

/// Resolves `SetUnresolvedAttachmentValueSpec` leaves.
///
/// Tokens are the preferred reference; a business id is the fallback. All
/// tokens across all input specs go into one lookup, likewise all ids.
/// Token-matched items get a fresh generated id (unique within one resolve
/// call); id-matched items keep the id the caller supplied.
pub struct AttachmentValueResolverService {
    lookup: Arc<dyn AttachmentLookupService>,
}

impl AttachmentValueResolverService {
    pub fn new(lookup: Arc<dyn AttachmentLookupService>) -> Self {
        Self { lookup }
    }

    fn fresh_id(used: &mut HashSet<AttachmentId>) -> AttachmentId {
        loop {
            let id = AttachmentId::generate();
            if used.insert(id.clone()) {
                return id;
            }
        }
    }

    fn resolve_item(
        item: &AttachmentInput,
        field_id: &FieldId,
        by_token: &HashMap<String, StoredAttachment>,
        by_id: &HashMap<AttachmentId, StoredAttachment>,
        used_ids: &mut HashSet<AttachmentId>,
    ) -> DomainResult<AttachmentItem> {
        if let Some(token) = &item.token {
            let stored = by_token
                .get(token)
                .ok_or_else(|| not_found(field_id, token))?;
            let id = Self::fresh_id(used_ids);
            return Ok(stored.clone().into_item(id, item.name.clone()));
        }
        if let Some(id) = &item.id {
            let stored = by_id
                .get(id)
                .ok_or_else(|| not_found(field_id, id.as_str()))?;
            return Ok(stored.clone().into_item(id.clone(), item.name.clone()));
        }
        Err(DomainError::validation(
            "validation.field.invalid_attachment_format",
            format!(
                "attachment item for field {} carries neither a token nor an id",
                field_id
            ),
        ))
    }
}

fn not_found(field_id: &FieldId, reference: &str) -> DomainError {
    DomainError::validation(
        "validation.field.attachment_not_found",
        format!(
            "no stored attachment matches '{}' for field {}",
            reference, field_id
        ),
    )
}

#[async_trait]
impl SpecResolver for AttachmentValueResolverService {
    fn supports(&self, spec: &CellValueSpec) -> bool {
        matches!(spec, CellValueSpec::UnresolvedAttachment(_))
    }

    async fn resolve_specs(
        &self,
        ctx: &RequestContext,
        specs: Vec<CellValueSpec>,
    ) -> DomainResult<Vec<CellValueSpec>> {
        // Collect the distinct token and id sets across every input spec.
        let mut tokens: Vec<String> = Vec::new();
        let mut ids: Vec<AttachmentId> = Vec::new();
        let mut seen_tokens: HashSet<&str> = HashSet::new();
        let mut seen_ids: HashSet<&str> = HashSet::new();
        for spec in &specs {
            let CellValueSpec::UnresolvedAttachment(unresolved) = spec else {
                continue;
            };
            for item in unresolved.value.iter().flatten() {
                if let Some(token) = &item.token {
                    if seen_tokens.insert(token) {
                        tokens.push(token.clone());
                    }
                } else if let Some(id) = &item.id {
                    if seen_ids.insert(id.as_str()) {
                        ids.push(id.clone());
                    }
                }
            }
        }

        // One lookup per non-empty key set.
        let by_token: HashMap<String, StoredAttachment> = if tokens.is_empty() {
            HashMap::new()
        } else {
            self.lookup
                .find_by_tokens(ctx, &tokens)
                .await?
                .into_iter()
                .map(|stored| (stored.token.clone(), stored))
                .collect()
        };
        let by_id: HashMap<AttachmentId, StoredAttachment> = if ids.is_empty() {
            HashMap::new()
        } else {
            self.lookup
                .find_by_ids(ctx, &ids)
                .await?
                .into_iter()
                .map(|stored| (stored.id.clone(), stored))
                .collect()
        };

        let mut used_ids: HashSet<AttachmentId> = HashSet::new();
        let mut out = Vec::with_capacity(specs.len());
        for spec in specs {
            let unresolved = match spec {
                CellValueSpec::UnresolvedAttachment(unresolved) => unresolved,
                other => {
                    out.push(other);
                    continue;
                }
            };
            let value = match &unresolved.value {
                None => None,
                Some(items) => {
                    let mut resolved = Vec::with_capacity(items.len());
                    for item in items {
                        resolved.push(Self::resolve_item(
                            item,
                            &unresolved.field_id,
                            &by_token,
                            &by_id,
                            &mut used_ids,
                        )?);
                    }
                    Some(resolved)
                }
            };
            out.push(CellValueSpec::Attachment(SetAttachmentValueSpec {
                field_id: unresolved.field_id,
                value,
            }));
        }
        log::debug!(
            "resolved {} attachment specs ({} tokens, {} ids)",
            out.len(),
            tokens.len(),
            ids.len()
        );
        Ok(out)
    }
}
