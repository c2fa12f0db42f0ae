use std::sync::Arc;
use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::database::memory::MemoryStore;
use crate::database::postgres::PgStore;
use crate::database::store::{DataStore, StoreError};
use crate::session::{MemorySessionStore, PgSessionStore, SessionStore};

/// Data and session backends chosen for this process.
#[derive(Clone)]
pub struct Backends {
    pub store: Arc<dyn DataStore>,
    pub sessions: Arc<dyn SessionStore>,
}

/// Connects the configured backends
pub struct DatabaseManager;

impl DatabaseManager {
    /// PostgreSQL when `DATABASE_URL` is configured, in-memory otherwise.
    pub async fn connect(config: &DatabaseConfig) -> Result<Backends, StoreError> {
        match config.url.as_deref() {
            Some(url) => {
                let pool = Self::pool(url, config).await?;
                info!("Using PostgreSQL for notes, users and sessions");
                Ok(Backends {
                    store: Arc::new(PgStore::new(pool.clone())),
                    sessions: Arc::new(PgSessionStore::new(pool)),
                })
            }
            None => {
                warn!("DATABASE_URL not set; notes and sessions are kept in memory and lost on restart");
                Ok(Self::in_memory())
            }
        }
    }

    pub fn in_memory() -> Backends {
        Backends {
            store: Arc::new(MemoryStore::new()),
            sessions: Arc::new(MemorySessionStore::new()),
        }
    }

    async fn pool(url: &str, config: &DatabaseConfig) -> Result<PgPool, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool (max {} connections)", config.max_connections);
        Ok(pool)
    }
}
