// Test helpers: a store that counts accesses and a gateway wired to it

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_graphql::Response;
use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

use crate::config::{AppConfig, NotesConfig};
use crate::database::{DataStore, MemoryStore, NewUser, Note, StoreError, User};
use crate::graphql::Gateway;
use crate::render::{RenderedContent, SanitizingRenderer};
use crate::session::Session;

/// Nests six levels deep.
pub const DEEP_QUERY: &str =
    r#"{ singleNote(id: "x") { author { notes { author { notes { author { id } } } } } } }"#;

/// Shallow enough but fans out to 10^5.
pub const FAN_OUT_QUERY: &str =
    "{ allNotes { favoritedBy { favorites { favoritedBy { favorites { id } } } } } }";

/// Wraps a [`MemoryStore`] and counts every call made through the
/// [`DataStore`] trait. Writes can be slowed down to simulate a stalled
/// backend.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    accesses: AtomicUsize,
    write_delay: Option<std::time::Duration>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_write_delay(delay: std::time::Duration) -> Self {
        Self {
            write_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Direct access for fixtures; not counted.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn access_count(&self) -> usize {
        self.accesses.load(Ordering::SeqCst)
    }

    fn hit(&self) -> &MemoryStore {
        self.accesses.fetch_add(1, Ordering::SeqCst);
        &self.inner
    }

    async fn write(&self) -> &MemoryStore {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        self.hit()
    }
}

#[async_trait]
impl DataStore for CountingStore {
    async fn find_note(&self, id: Uuid) -> Result<Option<Note>, StoreError> {
        self.hit().find_note(id).await
    }

    async fn list_notes(&self) -> Result<Vec<Note>, StoreError> {
        self.hit().list_notes().await
    }

    async fn notes_by_author(&self, author_id: Uuid) -> Result<Vec<Note>, StoreError> {
        self.hit().notes_by_author(author_id).await
    }

    async fn notes_favorited_by(&self, user_id: Uuid) -> Result<Vec<Note>, StoreError> {
        self.hit().notes_favorited_by(user_id).await
    }

    async fn insert_note(&self, author_id: Uuid, content: RenderedContent) -> Result<Note, StoreError> {
        self.write().await.insert_note(author_id, content).await
    }

    async fn update_note_content(
        &self,
        id: Uuid,
        content: RenderedContent,
    ) -> Result<Option<Note>, StoreError> {
        self.write().await.update_note_content(id, content).await
    }

    async fn delete_note(&self, id: Uuid) -> Result<bool, StoreError> {
        self.write().await.delete_note(id).await
    }

    async fn toggle_favorite(&self, note_id: Uuid, user_id: Uuid) -> Result<Option<Note>, StoreError> {
        self.write().await.toggle_favorite(note_id, user_id).await
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.hit().find_user(id).await
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        self.hit().find_users(ids).await
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        self.hit().find_user_by_name(name).await
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.hit().insert_user(user).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.hit().ping().await
    }
}

/// A gateway over a counting in-memory store with two users, alice and bob.
pub struct TestGateway {
    pub gateway: Gateway,
    pub store: Arc<CountingStore>,
    pub alice: User,
    pub bob: User,
}

impl TestGateway {
    pub async fn new() -> Self {
        Self::with_notes(|_| {}).await
    }

    pub async fn with_notes(configure: impl FnOnce(&mut NotesConfig)) -> Self {
        let mut config = AppConfig::development();
        configure(&mut config.notes);

        let store = Arc::new(CountingStore::new());
        let gateway = Gateway::from_config(&config, store.clone(), Arc::new(SanitizingRenderer::new()))
            .expect("schema SDL parses");

        let alice = store.inner().insert_user(user("alice")).await.unwrap();
        let bob = store.inner().insert_user(user("bob")).await.unwrap();

        Self {
            gateway,
            store,
            alice,
            bob,
        }
    }

    pub async fn run_as(&self, user_id: Uuid, query: &str) -> Response {
        let mut session = Session::new(Duration::days(1));
        session.sign_in(user_id);
        self.gateway.execute(async_graphql::Request::new(query), &session).await
    }

    pub async fn run_anonymous(&self, query: &str) -> Response {
        let session = Session::new(Duration::days(1));
        self.gateway.execute(async_graphql::Request::new(query), &session).await
    }

    pub async fn json_as(&self, user_id: Uuid, query: &str) -> serde_json::Value {
        into_json(self.run_as(user_id, query).await)
    }

    pub async fn json_anonymous(&self, query: &str) -> serde_json::Value {
        into_json(self.run_anonymous(query).await)
    }

    /// `extensions.code` of the first error.
    pub fn error_code(&self, response: &Response) -> Option<String> {
        let extensions = response.errors.first()?.extensions.as_ref()?;
        match extensions.get("code")? {
            async_graphql::Value::String(code) => Some(code.clone()),
            _ => None,
        }
    }

    /// Inserts a note directly, bypassing the access counter.
    pub async fn note_by(&self, author_id: Uuid, content: &str) -> Uuid {
        let content = RenderedContent::new(&SanitizingRenderer::new(), content);
        self.store.inner().insert_note(author_id, content).await.unwrap().id
    }
}

fn user(name: &str) -> NewUser {
    NewUser {
        name: Some(name.to_string()),
        avatar: None,
    }
}

fn into_json(response: Response) -> serde_json::Value {
    let response = response
        .into_result()
        .unwrap_or_else(|errors| panic!("operation failed: {:?}", errors));
    response.data.into_json().unwrap()
}
