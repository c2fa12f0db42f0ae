use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::models::{NewUser, Note, User};
use crate::database::store::{DataStore, StoreError};
use crate::render::RenderedContent;

/// In-process data store used for development and tests.
///
/// Every mutation happens under the write lock, which makes the lock the
/// serialization point for concurrent writes to the same note.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    notes: HashMap<Uuid, Note>,
    users: HashMap<Uuid, User>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn note_count(&self) -> usize {
        self.state.read().await.notes.len()
    }

    fn newest_first(mut notes: Vec<Note>) -> Vec<Note> {
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        notes
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn find_note(&self, id: Uuid) -> Result<Option<Note>, StoreError> {
        Ok(self.state.read().await.notes.get(&id).cloned())
    }

    async fn list_notes(&self) -> Result<Vec<Note>, StoreError> {
        let notes = self.state.read().await.notes.values().cloned().collect();
        Ok(Self::newest_first(notes))
    }

    async fn notes_by_author(&self, author_id: Uuid) -> Result<Vec<Note>, StoreError> {
        let notes = self
            .state
            .read()
            .await
            .notes
            .values()
            .filter(|note| note.author_id == author_id)
            .cloned()
            .collect();
        Ok(Self::newest_first(notes))
    }

    async fn notes_favorited_by(&self, user_id: Uuid) -> Result<Vec<Note>, StoreError> {
        let notes = self
            .state
            .read()
            .await
            .notes
            .values()
            .filter(|note| note.is_favorited_by(user_id))
            .cloned()
            .collect();
        Ok(Self::newest_first(notes))
    }

    async fn insert_note(&self, author_id: Uuid, content: RenderedContent) -> Result<Note, StoreError> {
        let (content, html_content) = content.into_parts();
        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4(),
            content,
            html_content,
            author_id,
            favorited_by: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.state.write().await.notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn update_note_content(
        &self,
        id: Uuid,
        content: RenderedContent,
    ) -> Result<Option<Note>, StoreError> {
        let mut state = self.state.write().await;
        let Some(note) = state.notes.get_mut(&id) else {
            return Ok(None);
        };

        let (content, html_content) = content.into_parts();
        note.content = content;
        note.html_content = html_content;
        note.updated_at = Utc::now();
        Ok(Some(note.clone()))
    }

    async fn delete_note(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.state.write().await.notes.remove(&id).is_some())
    }

    async fn toggle_favorite(&self, note_id: Uuid, user_id: Uuid) -> Result<Option<Note>, StoreError> {
        let mut state = self.state.write().await;
        let Some(note) = state.notes.get_mut(&note_id) else {
            return Ok(None);
        };

        note.toggle_favorite(user_id);
        note.updated_at = Utc::now();
        Ok(Some(note.clone()))
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.users.get(id).cloned()).collect())
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|user| user.name.as_deref() == Some(name))
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            avatar: user.avatar,
            created_at: Utc::now(),
        };

        self.state.write().await.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::SanitizingRenderer;
    use std::sync::Arc;

    fn content(markdown: &str) -> RenderedContent {
        RenderedContent::new(&SanitizingRenderer::new(), markdown)
    }

    async fn user(store: &MemoryStore, name: &str) -> User {
        store
            .insert_user(NewUser { name: Some(name.to_string()), avatar: None })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn insert_and_find_note() {
        let store = MemoryStore::new();
        let author = user(&store, "ada").await;

        let note = store.insert_note(author.id, content("# Hi")).await.unwrap();
        assert_eq!(note.author_id, author.id);
        assert!(note.favorited_by.is_empty());
        assert_eq!(note.created_at, note.updated_at);

        let found = store.find_note(note.id).await.unwrap();
        assert_eq!(found, Some(note));
    }

    #[tokio::test]
    async fn list_notes_newest_first() {
        let store = MemoryStore::new();
        let author = user(&store, "ada").await;

        let first = store.insert_note(author.id, content("one")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = store.insert_note(author.id, content("two")).await.unwrap();

        let ids: Vec<Uuid> = store.list_notes().await.unwrap().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn update_missing_note_returns_none() {
        let store = MemoryStore::new();
        let updated = store.update_note_content(Uuid::new_v4(), content("x")).await.unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = MemoryStore::new();
        let author = user(&store, "ada").await;
        let note = store.insert_note(author.id, content("bye")).await.unwrap();

        assert!(store.delete_note(note.id).await.unwrap());
        assert!(!store.delete_note(note.id).await.unwrap());
        assert_eq!(store.note_count().await, 0);
    }

    #[tokio::test]
    async fn concurrent_toggles_do_not_lose_updates() {
        let store = Arc::new(MemoryStore::new());
        let author = user(&store, "ada").await;
        let note_id = store.insert_note(author.id, content("popular")).await.unwrap().id;

        let mut fans = Vec::new();
        for i in 0..32 {
            fans.push(user(&store, &format!("fan-{}", i)).await.id);
        }

        let toggles = fans.iter().map(|fan| {
            let store = Arc::clone(&store);
            let fan = *fan;
            tokio::spawn(async move { store.toggle_favorite(note_id, fan).await })
        });
        for handle in futures::future::join_all(toggles).await {
            handle.unwrap().unwrap();
        }

        let note = store.find_note(note_id).await.unwrap().unwrap();
        assert_eq!(note.favorite_count(), fans.len());
        assert!(fans.iter().all(|fan| note.is_favorited_by(*fan)));
    }

    #[tokio::test]
    async fn find_users_skips_unknown_ids() {
        let store = MemoryStore::new();
        let ada = user(&store, "ada").await;

        let users = store.find_users(&[ada.id, Uuid::new_v4()]).await.unwrap();
        assert_eq!(users, vec![ada.clone()]);
        assert_eq!(store.find_user_by_name("ada").await.unwrap(), Some(ada));
    }
}
