//! Per-request execution context.

use gridbase_commons::UserId;

/// Carried through every port call of one request.
///
/// The actor is the authenticated caller; the `"me"` user identifier
/// resolves against it. Transactional state lives behind the unit-of-work
/// port keyed by this context, not inside it.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub actor: Option<UserId>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self { actor: None }
    }

    pub fn for_actor(actor: UserId) -> Self {
        Self { actor: Some(actor) }
    }
}
