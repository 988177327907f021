//! Deferred cross-entity resolvers.
//!
//! Builder output may contain unresolved specs (attachments by token,
//! users by raw identifier, links by foreign title). Each resolver rewrites
//! the specs it `supports()` into resolved ones, 1:1 and order-preserving,
//! issuing exactly one external lookup per distinct key set no matter how
//! many specs reference those keys. The dispatcher fans whole spec trees
//! out to the resolvers and substitutes results back in place.

mod attachment;
mod dispatcher;
mod link_title;
mod user;

pub use attachment::AttachmentValueResolverService;
pub use dispatcher::RecordMutationSpecResolverService;
pub use link_title::LinkTitleResolverService;
pub use user::UserValueResolverService;

use async_trait::async_trait;

use gridbase_commons::DomainResult;
use gridbase_specs::CellValueSpec;

use crate::context::RequestContext;

/// One resolver: type discrimination plus batched resolution.
#[async_trait]
pub trait SpecResolver: Send + Sync {
    fn supports(&self, spec: &CellValueSpec) -> bool;

    /// Rewrites the given specs, returning them in the same order, 1:1.
    /// Callers only pass specs this resolver `supports`.
    async fn resolve_specs(
        &self,
        ctx: &RequestContext,
        specs: Vec<CellValueSpec>,
    ) -> DomainResult<Vec<CellValueSpec>>;
}
