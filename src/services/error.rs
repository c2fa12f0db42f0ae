use async_graphql::ErrorExtensions;
use thiserror::Error;

use crate::database::StoreError;

/// Outcome of a resolver that did not produce a value
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} '{id}' references missing {target} '{target_id}'")]
    DanglingReference {
        entity: &'static str,
        id: String,
        target: &'static str,
        target_id: String,
    },

    #[error("You must be signed in")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResolverError {
    pub fn note_not_found(id: impl Into<String>) -> Self {
        ResolverError::NotFound {
            entity: "Note",
            id: id.into(),
        }
    }

    /// Stable code for clients, sent as `extensions.code`.
    pub fn code(&self) -> &'static str {
        match self {
            ResolverError::NotFound { .. } => "NOT_FOUND",
            ResolverError::DanglingReference { .. } => "DANGLING_REFERENCE",
            ResolverError::Unauthenticated => "UNAUTHENTICATED",
            ResolverError::Forbidden(_) => "FORBIDDEN",
            ResolverError::InvalidArgument(_) => "BAD_USER_INPUT",
            ResolverError::Store(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Client-safe message. Internal failures are logged, not exposed.
    pub fn client_message(&self) -> String {
        match self {
            ResolverError::Store(e) => {
                tracing::error!("Data store error: {}", e);
                "An error occurred while processing your request".to_string()
            }
            ResolverError::DanglingReference { .. } => {
                tracing::error!("Unexpected dangling reference: {}", self);
                self.to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl ErrorExtensions for ResolverError {
    fn extend(&self) -> async_graphql::Error {
        let code = self.code();
        async_graphql::Error::new(self.client_message()).extend_with(|_, e| e.set("code", code))
    }
}
