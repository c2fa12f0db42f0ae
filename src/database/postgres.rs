// database/postgres.rs - PostgreSQL data store
//
// Expects these tables to exist:
//
// CREATE TABLE users (
//     id         uuid PRIMARY KEY,
//     name       text UNIQUE,
//     avatar     text,
//     created_at timestamptz NOT NULL DEFAULT now()
// );
//
// CREATE TABLE notes (
//     id           uuid PRIMARY KEY,
//     content      text NOT NULL,
//     html_content text NOT NULL,
//     author_id    uuid NOT NULL REFERENCES users (id),
//     favorited_by uuid[] NOT NULL DEFAULT '{}',
//     created_at   timestamptz NOT NULL,
//     updated_at   timestamptz NOT NULL
// );

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{NewUser, Note, User};
use crate::database::store::{DataStore, StoreError};
use crate::render::RenderedContent;

const NOTE_COLUMNS: &str = "id, content, html_content, author_id, favorited_by, created_at, updated_at";
const USER_COLUMNS: &str = "id, name, avatar, created_at";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn select_notes(&self, filter: &str, bind: Option<Uuid>) -> Result<Vec<Note>, StoreError> {
        let sql = format!(
            "SELECT {} FROM notes {} ORDER BY created_at DESC, id",
            NOTE_COLUMNS, filter
        );
        let mut query = sqlx::query_as::<_, Note>(&sql);
        if let Some(id) = bind {
            query = query.bind(id);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl DataStore for PgStore {
    async fn find_note(&self, id: Uuid) -> Result<Option<Note>, StoreError> {
        let sql = format!("SELECT {} FROM notes WHERE id = $1", NOTE_COLUMNS);
        Ok(sqlx::query_as::<_, Note>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_notes(&self) -> Result<Vec<Note>, StoreError> {
        self.select_notes("", None).await
    }

    async fn notes_by_author(&self, author_id: Uuid) -> Result<Vec<Note>, StoreError> {
        self.select_notes("WHERE author_id = $1", Some(author_id)).await
    }

    async fn notes_favorited_by(&self, user_id: Uuid) -> Result<Vec<Note>, StoreError> {
        self.select_notes("WHERE $1 = ANY(favorited_by)", Some(user_id)).await
    }

    async fn insert_note(&self, author_id: Uuid, content: RenderedContent) -> Result<Note, StoreError> {
        let (content, html_content) = content.into_parts();
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO notes ({}) VALUES ($1, $2, $3, $4, '{{}}', $5, $5) RETURNING {}",
            NOTE_COLUMNS, NOTE_COLUMNS
        );

        Ok(sqlx::query_as::<_, Note>(&sql)
            .bind(Uuid::new_v4())
            .bind(content)
            .bind(html_content)
            .bind(author_id)
            .bind(now)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_note_content(
        &self,
        id: Uuid,
        content: RenderedContent,
    ) -> Result<Option<Note>, StoreError> {
        let (content, html_content) = content.into_parts();
        let sql = format!(
            "UPDATE notes SET content = $2, html_content = $3, updated_at = now() \
             WHERE id = $1 RETURNING {}",
            NOTE_COLUMNS
        );

        Ok(sqlx::query_as::<_, Note>(&sql)
            .bind(id)
            .bind(content)
            .bind(html_content)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_note(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn toggle_favorite(&self, note_id: Uuid, user_id: Uuid) -> Result<Option<Note>, StoreError> {
        // Single statement: the row lock taken by UPDATE serializes concurrent toggles.
        let sql = format!(
            "UPDATE notes SET \
                favorited_by = CASE WHEN $2 = ANY(favorited_by) \
                    THEN array_remove(favorited_by, $2) \
                    ELSE array_append(favorited_by, $2) END, \
                updated_at = now() \
             WHERE id = $1 RETURNING {}",
            NOTE_COLUMNS
        );

        Ok(sqlx::query_as::<_, Note>(&sql)
            .bind(note_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!("SELECT {} FROM users WHERE id = ANY($1)", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE name = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, now()) RETURNING {}",
            USER_COLUMNS, USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(user.name)
            .bind(user.avatar)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
