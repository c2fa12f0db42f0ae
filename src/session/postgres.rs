// session/postgres.rs - PostgreSQL session store
//
// Rows are keyed by the SHA-256 of the session id:
//
// CREATE TABLE sessions (
//     id_hash    text PRIMARY KEY,
//     user_id    uuid,
//     expires_at timestamptz NOT NULL
// );

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Session, SessionError, SessionStore};

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn storage_key(id: &str) -> String {
        let hash = Sha256::digest(id.as_bytes());
        format!("{:x}", hash)
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get(&self, id: &str) -> Result<Option<Session>, SessionError> {
        let row: Option<(Option<Uuid>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT user_id, expires_at FROM sessions WHERE id_hash = $1 AND expires_at > now()",
        )
        .bind(Self::storage_key(id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(user_id, expires_at)| Session {
            id: id.to_string(),
            user_id,
            expires_at,
        }))
    }

    async fn set(&self, session: &Session) -> Result<(), SessionError> {
        sqlx::query(
            "INSERT INTO sessions (id_hash, user_id, expires_at) VALUES ($1, $2, $3) \
             ON CONFLICT (id_hash) DO UPDATE \
             SET user_id = EXCLUDED.user_id, expires_at = EXCLUDED.expires_at",
        )
        .bind(Self::storage_key(&session.id))
        .bind(session.user_id)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn touch(&self, id: &str, expires_at: DateTime<Utc>) -> Result<bool, SessionError> {
        let result = sqlx::query(
            "UPDATE sessions SET expires_at = $2 WHERE id_hash = $1 AND expires_at > now()",
        )
        .bind(Self::storage_key(id))
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn destroy(&self, id: &str) -> Result<(), SessionError> {
        sqlx::query("DELETE FROM sessions WHERE id_hash = $1")
            .bind(Self::storage_key(id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, SessionError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_is_stable_hex_digest() {
        let key = PgSessionStore::storage_key("abc");
        assert_eq!(key, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
        assert_ne!(PgSessionStore::storage_key("abd"), key);
    }
}
