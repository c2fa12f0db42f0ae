// Per-request execution context. Resolvers reach identity and storage only
// through it.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::{AuthenticatedUser, Identity, IdentityResolver};
use crate::database::DataStore;
use crate::services::ResolverError;
use crate::session::Session;

pub struct ExecutionContext {
    identity: Identity,
    models: Arc<dyn DataStore>,
}

impl ExecutionContext {
    pub fn new(identity: Identity, models: Arc<dyn DataStore>) -> Self {
        Self { identity, models }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn models(&self) -> &dyn DataStore {
        self.models.as_ref()
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.identity.user_id()
    }

    /// The signed-in user, or [`ResolverError::Unauthenticated`].
    pub fn require_user(&self) -> Result<&AuthenticatedUser, ResolverError> {
        self.identity.user().ok_or(ResolverError::Unauthenticated)
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Builds an [`ExecutionContext`] from the request's session.
#[derive(Clone)]
pub struct ContextBuilder {
    models: Arc<dyn DataStore>,
    identities: IdentityResolver,
}

impl ContextBuilder {
    pub fn new(models: Arc<dyn DataStore>) -> Self {
        Self {
            identities: IdentityResolver::new(Arc::clone(&models)),
            models,
        }
    }

    pub async fn build(&self, session: &Session) -> ExecutionContext {
        let identity = self.identities.resolve(session).await;
        tracing::debug!(
            user = ?identity.user_id(),
            "Built execution context"
        );
        ExecutionContext::new(identity, Arc::clone(&self.models))
    }
}
