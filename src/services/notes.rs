use std::sync::Arc;

use uuid::Uuid;

use crate::config::{MutationPolicy, NotesConfig};
use crate::context::ExecutionContext;
use crate::database::{Note, User};
use crate::render::{MarkdownRenderer, RenderedContent};
use crate::services::ResolverError;

/// Note queries and mutations, independent of the GraphQL layer.
///
/// Every operation takes the caller's [`ExecutionContext`]; nothing here
/// reads request state from anywhere else.
pub struct NoteService {
    renderer: Arc<dyn MarkdownRenderer>,
    policy: MutationPolicy,
    strict_auth_errors: bool,
    max_content_length: usize,
}

impl NoteService {
    pub fn new(renderer: Arc<dyn MarkdownRenderer>, config: &NotesConfig) -> Self {
        Self {
            renderer,
            policy: config.mutation_policy,
            strict_auth_errors: config.strict_auth_errors,
            max_content_length: config.max_content_length,
        }
    }

    /// Whether anonymous callers get an explicit error instead of null.
    pub fn strict_auth_errors(&self) -> bool {
        self.strict_auth_errors
    }

    // === Queries ===

    pub async fn single_note(&self, ctx: &ExecutionContext, id: &str) -> Result<Option<Note>, ResolverError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        Ok(ctx.models().find_note(id).await?)
    }

    pub async fn all_notes(&self, ctx: &ExecutionContext) -> Result<Vec<Note>, ResolverError> {
        Ok(ctx.models().list_notes().await?)
    }

    pub async fn my_notes(&self, ctx: &ExecutionContext) -> Result<Vec<Note>, ResolverError> {
        let user = ctx.require_user()?;
        Ok(ctx.models().notes_by_author(user.id).await?)
    }

    // === Mutations ===

    pub async fn new_note(&self, ctx: &ExecutionContext, content: String) -> Result<Note, ResolverError> {
        let author_id = ctx.require_user()?.id;
        let content = self.render(content)?;

        let note = ctx.models().insert_note(author_id, content).await?;
        tracing::info!(note = %note.id, author = %author_id, "Created note");
        Ok(note)
    }

    pub async fn update_note(
        &self,
        ctx: &ExecutionContext,
        id: &str,
        content: String,
    ) -> Result<Note, ResolverError> {
        let note_id = parse_id(id).ok_or_else(|| ResolverError::note_not_found(id))?;
        let content = self.render(content)?;

        if self.policy == MutationPolicy::OwnerOnly {
            let note = ctx
                .models()
                .find_note(note_id)
                .await?
                .ok_or_else(|| ResolverError::note_not_found(id))?;
            self.authorize_change(ctx, &note)?;
        }

        let note = ctx
            .models()
            .update_note_content(note_id, content)
            .await?
            .ok_or_else(|| ResolverError::note_not_found(id))?;
        tracing::info!(note = %note.id, user = ?ctx.user_id(), "Updated note");
        Ok(note)
    }

    pub async fn delete_note(&self, ctx: &ExecutionContext, id: &str) -> Result<bool, ResolverError> {
        let Some(note_id) = parse_id(id) else {
            return Ok(false);
        };

        if self.policy == MutationPolicy::OwnerOnly {
            let Some(note) = ctx.models().find_note(note_id).await? else {
                return Ok(false);
            };
            self.authorize_change(ctx, &note)?;
        }

        let deleted = ctx.models().delete_note(note_id).await?;
        if deleted {
            tracing::info!(note = %note_id, user = ?ctx.user_id(), "Deleted note");
        }
        Ok(deleted)
    }

    pub async fn toggle_reaction(&self, ctx: &ExecutionContext, note_id: &str) -> Result<Note, ResolverError> {
        let user_id = ctx.require_user()?.id;
        let id = parse_id(note_id).ok_or_else(|| ResolverError::note_not_found(note_id))?;

        let note = ctx
            .models()
            .toggle_favorite(id, user_id)
            .await?
            .ok_or_else(|| ResolverError::note_not_found(note_id))?;
        tracing::debug!(
            note = %note.id,
            user = %user_id,
            favorited = note.is_favorited_by(user_id),
            "Toggled favorite"
        );
        Ok(note)
    }

    // === Relations ===

    pub async fn note_author(&self, ctx: &ExecutionContext, note: &Note) -> Result<User, ResolverError> {
        ctx.models()
            .find_user(note.author_id)
            .await?
            .ok_or_else(|| ResolverError::DanglingReference {
                entity: "Note",
                id: note.id.to_string(),
                target: "User",
                target_id: note.author_id.to_string(),
            })
    }

    pub async fn note_favorited_by(&self, ctx: &ExecutionContext, note: &Note) -> Result<Vec<User>, ResolverError> {
        let users = ctx.models().find_users(&note.favorited_by).await?;
        if users.len() < note.favorited_by.len() {
            tracing::warn!(
                note = %note.id,
                missing = note.favorited_by.len() - users.len(),
                "Note is favorited by users that no longer exist"
            );
        }
        Ok(users)
    }

    pub async fn user_notes(&self, ctx: &ExecutionContext, user: &User) -> Result<Vec<Note>, ResolverError> {
        Ok(ctx.models().notes_by_author(user.id).await?)
    }

    pub async fn user_favorites(&self, ctx: &ExecutionContext, user: &User) -> Result<Vec<Note>, ResolverError> {
        Ok(ctx.models().notes_favorited_by(user.id).await?)
    }

    // === Helpers ===

    fn render(&self, content: String) -> Result<RenderedContent, ResolverError> {
        if content.len() > self.max_content_length {
            return Err(ResolverError::InvalidArgument(format!(
                "Note content exceeds {} bytes",
                self.max_content_length
            )));
        }
        Ok(RenderedContent::new(self.renderer.as_ref(), content))
    }

    fn authorize_change(&self, ctx: &ExecutionContext, note: &Note) -> Result<(), ResolverError> {
        match self.policy {
            MutationPolicy::Permissive => Ok(()),
            MutationPolicy::OwnerOnly => {
                let user = ctx.require_user()?;
                if user.id == note.author_id {
                    Ok(())
                } else {
                    tracing::warn!(note = %note.id, user = %user.id, "Rejected change to another user's note");
                    Err(ResolverError::Forbidden("You can only change your own notes".to_string()))
                }
            }
        }
    }
}

/// Ids that do not parse cannot name an existing entity.
fn parse_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::config::AppConfig;
    use crate::database::{DataStore, MemoryStore, NewUser};
    use crate::render::SanitizingRenderer;

    struct Fixture {
        store: Arc<MemoryStore>,
        service: NoteService,
        renderer: SanitizingRenderer,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_policy(MutationPolicy::Permissive)
        }

        fn with_policy(policy: MutationPolicy) -> Self {
            let mut config = AppConfig::development().notes;
            config.mutation_policy = policy;
            config.max_content_length = 64;
            Self {
                store: Arc::new(MemoryStore::new()),
                service: NoteService::new(Arc::new(SanitizingRenderer::new()), &config),
                renderer: SanitizingRenderer::new(),
            }
        }

        async fn user(&self, name: &str) -> ExecutionContext {
            let user = self
                .store
                .insert_user(NewUser { name: Some(name.to_string()), avatar: None })
                .await
                .unwrap();
            ExecutionContext::new(Identity::Authenticated(user.into()), self.store.clone())
        }

        fn anonymous(&self) -> ExecutionContext {
            ExecutionContext::new(Identity::Anonymous, self.store.clone())
        }
    }

    #[tokio::test]
    async fn new_note_renders_and_assigns_author() {
        let fx = Fixture::new();
        let ctx = fx.user("u").await;

        let note = fx.service.new_note(&ctx, "# Hi".to_string()).await.unwrap();
        assert!(note.html_content.contains("<h1"));
        assert!(note.html_content.contains("Hi</h1>"));
        assert_eq!(Some(note.author_id), ctx.user_id());
        assert_eq!(note.favorite_count(), 0);
        assert_eq!(note.created_at, note.updated_at);
    }

    #[tokio::test]
    async fn anonymous_new_note_is_refused_without_writing() {
        let fx = Fixture::new();
        let result = fx.service.new_note(&fx.anonymous(), "hello".to_string()).await;

        assert!(matches!(result, Err(ResolverError::Unauthenticated)));
        assert_eq!(fx.store.note_count().await, 0);
    }

    #[tokio::test]
    async fn my_notes_only_lists_own_notes() {
        let fx = Fixture::new();
        let u = fx.user("u").await;
        let v = fx.user("v").await;

        let note = fx.service.new_note(&u, "# Hi".to_string()).await.unwrap();

        let mine = fx.service.my_notes(&u).await.unwrap();
        assert!(mine.iter().any(|n| n.id == note.id));
        let theirs = fx.service.my_notes(&v).await.unwrap();
        assert!(theirs.iter().all(|n| n.id != note.id));
        assert!(matches!(
            fx.service.my_notes(&fx.anonymous()).await,
            Err(ResolverError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn update_rerenders_html_and_bumps_timestamp() {
        let fx = Fixture::new();
        let ctx = fx.user("u").await;
        let note = fx.service.new_note(&ctx, "first".to_string()).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let updated = fx
            .service
            .update_note(&ctx, &note.id.to_string(), "## Second".to_string())
            .await
            .unwrap();

        assert_eq!(updated.content, "## Second");
        assert_eq!(updated.html_content, fx.renderer.render("## Second"));
        assert!(updated.updated_at > note.updated_at);
        assert_eq!(updated.created_at, note.created_at);
    }

    #[tokio::test]
    async fn update_missing_note_is_not_found() {
        let fx = Fixture::new();
        let ctx = fx.user("u").await;

        let err = fx
            .service
            .update_note(&ctx, &Uuid::new_v4().to_string(), "x".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::NotFound { .. }));

        let err = fx.service.update_note(&ctx, "not-an-id", "x".to_string()).await.unwrap_err();
        assert!(matches!(err, ResolverError::NotFound { .. }));
    }

    #[tokio::test]
    async fn oversized_content_is_rejected() {
        let fx = Fixture::new();
        let ctx = fx.user("u").await;

        let err = fx.service.new_note(&ctx, "x".repeat(65)).await.unwrap_err();
        assert!(matches!(err, ResolverError::InvalidArgument(_)));
        assert_eq!(fx.store.note_count().await, 0);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let fx = Fixture::new();
        let ctx = fx.user("u").await;
        let note = fx.service.new_note(&ctx, "bye".to_string()).await.unwrap();
        let id = note.id.to_string();

        assert!(!fx.service.delete_note(&ctx, &Uuid::new_v4().to_string()).await.unwrap());
        assert!(!fx.service.delete_note(&ctx, "garbage").await.unwrap());
        assert_eq!(fx.store.note_count().await, 1);

        assert!(fx.service.delete_note(&ctx, &id).await.unwrap());
        assert_eq!(fx.service.single_note(&ctx, &id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn permissive_policy_lets_anyone_change_notes() {
        let fx = Fixture::new();
        let owner = fx.user("owner").await;
        let note = fx.service.new_note(&owner, "mine".to_string()).await.unwrap();
        let id = note.id.to_string();

        let updated = fx
            .service
            .update_note(&fx.anonymous(), &id, "not yours".to_string())
            .await
            .unwrap();
        assert_eq!(updated.content, "not yours");
        assert!(fx.service.delete_note(&fx.anonymous(), &id).await.unwrap());
    }

    #[tokio::test]
    async fn owner_only_policy_protects_notes() {
        let fx = Fixture::with_policy(MutationPolicy::OwnerOnly);
        let owner = fx.user("owner").await;
        let other = fx.user("other").await;
        let note = fx.service.new_note(&owner, "mine".to_string()).await.unwrap();
        let id = note.id.to_string();

        let err = fx.service.update_note(&other, &id, "x".to_string()).await.unwrap_err();
        assert!(matches!(err, ResolverError::Forbidden(_)));
        let err = fx.service.delete_note(&fx.anonymous(), &id).await.unwrap_err();
        assert!(matches!(err, ResolverError::Unauthenticated));
        assert!(!fx.service.delete_note(&other, &Uuid::new_v4().to_string()).await.unwrap());

        fx.service.update_note(&owner, &id, "still mine".to_string()).await.unwrap();
        assert!(fx.service.delete_note(&owner, &id).await.unwrap());
    }

    #[tokio::test]
    async fn toggle_reaction_twice_restores_membership() {
        let fx = Fixture::new();
        let author = fx.user("author").await;
        let fan = fx.user("fan").await;
        let note = fx.service.new_note(&author, "like me".to_string()).await.unwrap();
        let id = note.id.to_string();

        let liked = fx.service.toggle_reaction(&fan, &id).await.unwrap();
        assert_eq!(liked.favorite_count(), 1);
        assert!(liked.is_favorited_by(fan.user_id().unwrap()));
        assert!(liked.updated_at >= note.updated_at);

        let fan_user = fx.store.find_user(fan.user_id().unwrap()).await.unwrap().unwrap();
        let favorites = fx.service.user_favorites(&fan, &fan_user).await.unwrap();
        assert_eq!(favorites.len(), 1);

        let unliked = fx.service.toggle_reaction(&fan, &id).await.unwrap();
        assert_eq!(unliked.favorite_count(), note.favorite_count());
        assert_eq!(unliked.favorited_by, note.favorited_by);
    }

    #[tokio::test]
    async fn toggle_reaction_requires_user_and_note() {
        let fx = Fixture::new();
        let ctx = fx.user("u").await;

        let err = fx
            .service
            .toggle_reaction(&ctx, &Uuid::new_v4().to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::NotFound { .. }));

        let note = fx.service.new_note(&ctx, "x".to_string()).await.unwrap();
        let err = fx
            .service
            .toggle_reaction(&fx.anonymous(), &note.id.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::Unauthenticated));
    }

    #[tokio::test]
    async fn author_of_orphaned_note_is_dangling() {
        let fx = Fixture::new();
        let ghost = ExecutionContext::new(
            Identity::Authenticated(crate::auth::AuthenticatedUser {
                id: Uuid::new_v4(),
                name: None,
                avatar: None,
            }),
            fx.store.clone(),
        );
        let note = fx.service.new_note(&ghost, "orphan".to_string()).await.unwrap();

        let err = fx.service.note_author(&ghost, &note).await.unwrap_err();
        assert!(matches!(err, ResolverError::DanglingReference { .. }));
    }

    #[tokio::test]
    async fn all_notes_and_relations() {
        let fx = Fixture::new();
        let u = fx.user("u").await;
        let v = fx.user("v").await;
        let a = fx.service.new_note(&u, "a".to_string()).await.unwrap();
        fx.service.new_note(&v, "b".to_string()).await.unwrap();
        fx.service.toggle_reaction(&v, &a.id.to_string()).await.unwrap();

        assert_eq!(fx.service.all_notes(&fx.anonymous()).await.unwrap().len(), 2);

        let a = fx.service.single_note(&u, &a.id.to_string()).await.unwrap().unwrap();
        let author = fx.service.note_author(&u, &a).await.unwrap();
        assert_eq!(Some(author.id), u.user_id());

        let fans = fx.service.note_favorited_by(&u, &a).await.unwrap();
        assert_eq!(fans.iter().map(|f| f.id).collect::<Vec<_>>(), vec![v.user_id().unwrap()]);

        let notes = fx.service.user_notes(&u, &author).await.unwrap();
        assert_eq!(notes.len(), 1);
    }
}
