use async_graphql::{Context, ErrorExtensions, Object, Result, ID};
use chrono::{DateTime, Utc};

use crate::context::ExecutionContext;
use crate::database::{Note, User};
use crate::services::{NoteService, ResolverError};

/// The note service and the caller's context, both injected per operation.
pub(crate) fn request_parts<'a>(ctx: &Context<'a>) -> Result<(&'a NoteService, &'a ExecutionContext)> {
    Ok((ctx.data::<NoteService>()?, ctx.data::<ExecutionContext>()?))
}

pub(crate) fn field_error(err: ResolverError) -> async_graphql::Error {
    err.extend()
}

/// Anonymous callers get null from the auth-only operations unless the
/// service is configured to report them.
pub(crate) fn anonymous_as_null<T>(service: &NoteService, result: Result<T, ResolverError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ResolverError::Unauthenticated) if !service.strict_auth_errors() => Ok(None),
        Err(err) => Err(field_error(err)),
    }
}

#[Object]
impl Note {
    async fn id(&self) -> ID {
        ID(self.id.to_string())
    }

    async fn content(&self) -> &str {
        &self.content
    }

    async fn html_content(&self) -> &str {
        &self.html_content
    }

    async fn author(&self, ctx: &Context<'_>) -> Result<User> {
        let (notes, request) = request_parts(ctx)?;
        notes.note_author(request, self).await.map_err(field_error)
    }

    #[graphql(name = "favoriteCount")]
    async fn resolve_favorite_count(&self) -> i32 {
        i32::try_from(self.favorite_count()).unwrap_or(i32::MAX)
    }

    async fn favorited_by(&self, ctx: &Context<'_>) -> Result<Vec<User>> {
        let (notes, request) = request_parts(ctx)?;
        notes.note_favorited_by(request, self).await.map_err(field_error)
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[Object]
impl User {
    async fn id(&self) -> ID {
        ID(self.id.to_string())
    }

    async fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    async fn avatar(&self) -> Option<&str> {
        self.avatar.as_deref()
    }

    async fn notes(&self, ctx: &Context<'_>) -> Result<Vec<Note>> {
        let (notes, request) = request_parts(ctx)?;
        notes.user_notes(request, self).await.map_err(field_error)
    }

    async fn favorites(&self, ctx: &Context<'_>) -> Result<Vec<Note>> {
        let (notes, request) = request_parts(ctx)?;
        notes.user_favorites(request, self).await.map_err(field_error)
    }
}
