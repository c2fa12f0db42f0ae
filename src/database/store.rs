use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{NewUser, Note, User};
use crate::render::RenderedContent;

/// Errors from a data store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Data-access capability handed to resolvers through the execution context.
///
/// Note lists come back newest first (descending `created_at`). Absence is
/// reported as `None`/`false`, never as an error; errors mean the backend
/// itself failed.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn find_note(&self, id: Uuid) -> Result<Option<Note>, StoreError>;

    async fn list_notes(&self) -> Result<Vec<Note>, StoreError>;

    async fn notes_by_author(&self, author_id: Uuid) -> Result<Vec<Note>, StoreError>;

    async fn notes_favorited_by(&self, user_id: Uuid) -> Result<Vec<Note>, StoreError>;

    /// Creates a note with a fresh id, no favorites and both timestamps set to now.
    async fn insert_note(&self, author_id: Uuid, content: RenderedContent) -> Result<Note, StoreError>;

    /// Replaces content and html together and bumps `updated_at`.
    async fn update_note_content(
        &self,
        id: Uuid,
        content: RenderedContent,
    ) -> Result<Option<Note>, StoreError>;

    async fn delete_note(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Atomically adds `user_id` to the note's favorites, or removes it when
    /// already present, and bumps `updated_at`.
    async fn toggle_favorite(&self, note_id: Uuid, user_id: Uuid) -> Result<Option<Note>, StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Users for the given ids; unknown ids are skipped.
    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError>;

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>, StoreError>;

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
