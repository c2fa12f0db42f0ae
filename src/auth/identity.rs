use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::database::{DataStore, User};
use crate::session::Session;

/// Who is calling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identity {
    Anonymous,
    Authenticated(AuthenticatedUser),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            avatar: user.avatar,
        }
    }
}

impl Identity {
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            Identity::Authenticated(user) => Some(user),
            Identity::Anonymous => None,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user().map(|user| user.id)
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }
}

/// Turns a session into an [`Identity`].
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn DataStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Anonymous when the session carries no user, when the user no longer
    /// exists, or when the lookup fails. Never errors.
    pub async fn resolve(&self, session: &Session) -> Identity {
        let Some(user_id) = session.user_id else {
            return Identity::Anonymous;
        };

        match self.store.find_user(user_id).await {
            Ok(Some(user)) => Identity::Authenticated(user.into()),
            Ok(None) => {
                tracing::warn!("Session references missing user {}; treating as anonymous", user_id);
                Identity::Anonymous
            }
            Err(e) => {
                tracing::error!("Failed to load session user {}: {}", user_id, e);
                Identity::Anonymous
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryStore, NewUser};
    use chrono::Duration;

    #[tokio::test]
    async fn session_without_user_is_anonymous() {
        let resolver = IdentityResolver::new(Arc::new(MemoryStore::new()));
        let session = Session::new(Duration::days(1));
        assert_eq!(resolver.resolve(&session).await, Identity::Anonymous);
    }

    #[tokio::test]
    async fn session_with_user_is_authenticated() {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_user(NewUser { name: Some("ada".into()), avatar: Some("ada.png".into()) })
            .await
            .unwrap();
        let resolver = IdentityResolver::new(store);

        let mut session = Session::new(Duration::days(1));
        session.user_id = Some(user.id);

        let identity = resolver.resolve(&session).await;
        assert_eq!(identity.user_id(), Some(user.id));
        assert_eq!(identity.user().and_then(|u| u.avatar.as_deref()), Some("ada.png"));
    }

    #[tokio::test]
    async fn dangling_session_user_is_anonymous() {
        let resolver = IdentityResolver::new(Arc::new(MemoryStore::new()));
        let mut session = Session::new(Duration::days(1));
        session.user_id = Some(Uuid::new_v4());

        assert!(resolver.resolve(&session).await.is_anonymous());
    }
}
