//! User resolution: raw identifiers into collaborator cell items.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use gridbase_commons::{DomainError, DomainResult, FieldId, UserCellItem};
use gridbase_specs::{CellValueSpec, SetUserValueSpec, UserIdentifiers, UserSelection};

use crate::context::RequestContext;
use crate::ports::{LookupUser, UserLookupService};
use crate::resolvers::SpecResolver;

/// The reserved identifier resolving to the context actor.
const ME: &str = "me";

/// Resolves `SetUserValueByIdentifierSpec` leaves; pre-structured user
/// specs pass through unchanged.
///
/// All identifiers (ids, emails, names) across all input specs are merged
/// into one lookup call and the results indexed by id, email and name.
/// `"me"` resolves to the request actor before the lookup.
pub struct UserValueResolverService {
    lookup: Arc<dyn UserLookupService>,
}

impl UserValueResolverService {
    pub fn new(lookup: Arc<dyn UserLookupService>) -> Self {
        Self { lookup }
    }

    fn actor_identifier(ctx: &RequestContext, identifier: &str) -> DomainResult<String> {
        if identifier != ME {
            return Ok(identifier.to_string());
        }
        ctx.actor
            .as_ref()
            .map(|actor| actor.as_str().to_string())
            .ok_or_else(|| {
                DomainError::unauthorized(
                    "unauthorized.missing_actor",
                    "identifier 'me' requires an authenticated actor on the request",
                )
            })
    }

    fn resolve_one(
        index: &HashMap<String, UserCellItem>,
        field_id: &FieldId,
        identifier: &str,
    ) -> DomainResult<UserCellItem> {
        index.get(identifier).cloned().ok_or_else(|| {
            DomainError::validation(
                "validation.field.user_not_found",
                format!("no user matches '{}' for field {}", identifier, field_id),
            )
        })
    }
}

fn index_users(users: Vec<LookupUser>) -> HashMap<String, UserCellItem> {
    let mut index = HashMap::new();
    for user in users {
        let item = UserCellItem {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        };
        index.insert(user.id.as_str().to_string(), item.clone());
        index.entry(user.name).or_insert_with(|| item.clone());
        if let Some(email) = user.email {
            index.entry(email).or_insert(item);
        }
    }
    index
}

#[async_trait]
impl SpecResolver for UserValueResolverService {
    fn supports(&self, spec: &CellValueSpec) -> bool {
        matches!(
            spec,
            CellValueSpec::UserByIdentifier(_) | CellValueSpec::User(_)
        )
    }

    async fn resolve_specs(
        &self,
        ctx: &RequestContext,
        specs: Vec<CellValueSpec>,
    ) -> DomainResult<Vec<CellValueSpec>> {
        // Substitute "me" up front so the lookup only sees real identifiers,
        // then merge every identifier into one distinct set.
        let mut identifiers: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for spec in &specs {
            let CellValueSpec::UserByIdentifier(unresolved) = spec else {
                continue;
            };
            let raw: Vec<&String> = match &unresolved.identifiers {
                None => Vec::new(),
                Some(UserIdentifiers::Single(one)) => vec![one],
                Some(UserIdentifiers::Multiple(many)) => many.iter().collect(),
            };
            for identifier in raw {
                let substituted = Self::actor_identifier(ctx, identifier)?;
                if seen.insert(substituted.clone()) {
                    identifiers.push(substituted);
                }
            }
        }

        let index = if identifiers.is_empty() {
            HashMap::new()
        } else {
            index_users(self.lookup.find_by_identifiers(ctx, &identifiers).await?)
        };

        let mut out = Vec::with_capacity(specs.len());
        for spec in specs {
            let unresolved = match spec {
                CellValueSpec::UserByIdentifier(unresolved) => unresolved,
                other => {
                    out.push(other);
                    continue;
                }
            };
            let value = match &unresolved.identifiers {
                None => None,
                Some(UserIdentifiers::Single(one)) => {
                    let substituted = Self::actor_identifier(ctx, one)?;
                    Some(UserSelection::Single(Self::resolve_one(
                        &index,
                        &unresolved.field_id,
                        &substituted,
                    )?))
                }
                Some(UserIdentifiers::Multiple(many)) => {
                    let mut items = Vec::with_capacity(many.len());
                    for identifier in many {
                        let substituted = Self::actor_identifier(ctx, identifier)?;
                        items.push(Self::resolve_one(
                            &index,
                            &unresolved.field_id,
                            &substituted,
                        )?);
                    }
                    Some(UserSelection::Multiple(items))
                }
            };
            out.push(CellValueSpec::User(SetUserValueSpec {
                field_id: unresolved.field_id,
                value,
            }));
        }
        Ok(out)
    }
}
