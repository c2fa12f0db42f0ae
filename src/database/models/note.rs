use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Note {
    pub id: Uuid,
    /// Author-supplied markdown.
    pub content: String,
    /// Sanitized render of `content`; written only together with it.
    pub html_content: String,
    pub author_id: Uuid,
    /// Users who favorited the note. Treated as a set: no duplicates, order irrelevant.
    pub favorited_by: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn favorite_count(&self) -> usize {
        self.favorited_by.len()
    }

    pub fn is_favorited_by(&self, user_id: Uuid) -> bool {
        self.favorited_by.contains(&user_id)
    }

    /// Adds `user_id` when absent, removes it when present. Returns whether
    /// the user now favorites the note.
    pub(crate) fn toggle_favorite(&mut self, user_id: Uuid) -> bool {
        if let Some(pos) = self.favorited_by.iter().position(|id| *id == user_id) {
            self.favorited_by.swap_remove(pos);
            false
        } else {
            self.favorited_by.push(user_id);
            true
        }
    }
}
