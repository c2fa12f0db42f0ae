// session/mod.rs - server-side sessions keyed by an opaque cookie id

pub mod memory;
pub mod postgres;

pub use memory::MemorySessionStore;
pub use postgres::PgSessionStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub user_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Fresh anonymous session with a new random id.
    pub fn new(ttl: Duration) -> Self {
        Self {
            id: new_session_id(),
            user_id: None,
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Binds the session to `user_id` under a new id so a pre-login id can
    /// never be reused after sign-in.
    pub fn sign_in(&mut self, user_id: Uuid) {
        self.id = new_session_id();
        self.user_id = Some(user_id);
    }

    pub fn sign_out(&mut self) {
        self.user_id = None;
    }
}

/// Session changes requested by a handler, applied by the session middleware
/// after the handler has produced its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    SignIn(Uuid),
    SignOut,
}

fn new_session_id() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Key-value store for sessions with expiry. Expired sessions are never
/// returned by `get`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Session>, SessionError>;

    /// Inserts or replaces the session.
    async fn set(&self, session: &Session) -> Result<(), SessionError>;

    /// Extends a live session. Returns false when it no longer exists.
    async fn touch(&self, id: &str, expires_at: DateTime<Utc>) -> Result<bool, SessionError>;

    async fn destroy(&self, id: &str) -> Result<(), SessionError>;

    /// Drops expired sessions, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64, SessionError>;
}

/// Periodically drops expired sessions until the process exits.
pub fn spawn_purge_task(store: Arc<dyn SessionStore>, every: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!("Purged {} expired sessions", purged),
                Err(e) => tracing::warn!("Session purge failed: {}", e),
            }
        }
    })
}
