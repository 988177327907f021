//! Resolver dispatcher: fans spec trees out to resolvers and back in.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;

use gridbase_commons::{DomainError, DomainResult};
use gridbase_specs::{CellValueSpec, RecordSpec};

use crate::context::RequestContext;
use crate::resolvers::SpecResolver;

/// Dispatches unresolved specs to whichever registered resolver claims
/// them.
///
/// Batching happens here: when many trees are resolved together, every
/// supported leaf across all of them goes to its resolver in a single
/// call, so the per-distinct-key-set lookup guarantee of each resolver
/// holds for the whole batch, not per record.
pub struct RecordMutationSpecResolverService {
    resolvers: Vec<Arc<dyn SpecResolver>>,
}

impl RecordMutationSpecResolverService {
    pub fn new(resolvers: Vec<Arc<dyn SpecResolver>>) -> Self {
        Self { resolvers }
    }

    /// Resolves one tree, substituting resolved leaves in place.
    pub async fn resolve_and_replace(
        &self,
        ctx: &RequestContext,
        tree: RecordSpec,
    ) -> DomainResult<RecordSpec> {
        let mut trees = self.resolve_and_replace_many(ctx, vec![tree]).await?;
        trees.pop().ok_or_else(|| {
            DomainError::unexpected(
                "unexpected.resolver_output",
                "dispatcher returned no tree for a single-tree resolve",
            )
        })
    }

    /// Resolves many trees at once. Tree shape, leaf order and
    /// non-participating leaves are preserved exactly.
    pub async fn resolve_and_replace_many(
        &self,
        ctx: &RequestContext,
        trees: Vec<RecordSpec>,
    ) -> DomainResult<Vec<RecordSpec>> {
        let leaves: Vec<CellValueSpec> = trees
            .iter()
            .flat_map(|tree| tree.value_leaves().into_iter().cloned())
            .collect();
        if !leaves.iter().any(|leaf| self.supports(leaf)) {
            return Ok(trees);
        }
        let resolved = self.resolve_specs(ctx, leaves).await?;

        // map_value_leaves walks leaves in the same left-to-right order
        // value_leaves produced them, so a queue lines the two up.
        let mut queue: VecDeque<CellValueSpec> = resolved.into();
        Ok(trees
            .into_iter()
            .map(|tree| tree.map_value_leaves(&mut |leaf| queue.pop_front().unwrap_or(leaf)))
            .collect())
    }
}

#[async_trait]
impl SpecResolver for RecordMutationSpecResolverService {
    fn supports(&self, spec: &CellValueSpec) -> bool {
        self.resolvers.iter().any(|r| r.supports(spec))
    }

    async fn resolve_specs(
        &self,
        ctx: &RequestContext,
        mut specs: Vec<CellValueSpec>,
    ) -> DomainResult<Vec<CellValueSpec>> {
        for resolver in &self.resolvers {
            let indices: Vec<usize> = specs
                .iter()
                .enumerate()
                .filter(|(_, spec)| resolver.supports(spec))
                .map(|(i, _)| i)
                .collect();
            if indices.is_empty() {
                continue;
            }
            let subset: Vec<CellValueSpec> =
                indices.iter().map(|&i| specs[i].clone()).collect();
            let resolved = resolver.resolve_specs(ctx, subset).await?;
            if resolved.len() != indices.len() {
                return Err(DomainError::invariant(
                    "invariant.resolver_arity",
                    format!(
                        "resolver returned {} specs for {} inputs",
                        resolved.len(),
                        indices.len()
                    ),
                ));
            }
            for (i, spec) in indices.into_iter().zip(resolved) {
                specs[i] = spec;
            }
        }
        Ok(specs)
    }
}
