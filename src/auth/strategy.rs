use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::database::{DataStore, NewUser, StoreError, User};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Unknown sign-in strategy '{0}'")]
    UnknownStrategy(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A way of proving who the caller is (password, OAuth callback, ...).
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    /// Path segment under `/auth/login/`.
    fn name(&self) -> &'static str;

    async fn authenticate(&self, credentials: Value, store: &dyn DataStore) -> Result<User, AuthError>;
}

#[derive(Default, Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<&'static str, Arc<dyn AuthStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, strategy: Arc<dyn AuthStrategy>) {
        tracing::info!("Registered sign-in strategy '{}'", strategy.name());
        self.strategies.insert(strategy.name(), strategy);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn AuthStrategy>, AuthError> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| AuthError::UnknownStrategy(name.to_string()))
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.strategies.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[derive(Debug, Deserialize)]
struct DevelopmentCredentials {
    name: String,
    avatar: Option<String>,
}

/// Trusts the supplied display name and signs in as that user, creating it
/// on first use. Development only.
pub struct DevelopmentStrategy;

#[async_trait]
impl AuthStrategy for DevelopmentStrategy {
    fn name(&self) -> &'static str {
        "dev"
    }

    async fn authenticate(&self, credentials: Value, store: &dyn DataStore) -> Result<User, AuthError> {
        let credentials: DevelopmentCredentials = serde_json::from_value(credentials)
            .map_err(|e| AuthError::InvalidCredentials(e.to_string()))?;

        let name = credentials.name.trim();
        if name.is_empty() {
            return Err(AuthError::InvalidCredentials("name must not be empty".to_string()));
        }

        if let Some(user) = store.find_user_by_name(name).await? {
            return Ok(user);
        }

        let user = store
            .insert_user(NewUser {
                name: Some(name.to_string()),
                avatar: credentials.avatar,
            })
            .await?;
        tracing::info!("Created development user '{}' ({})", name, user.id);
        Ok(user)
    }
}
