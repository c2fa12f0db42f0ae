use async_graphql::{Context, Object, Result, ID};

use crate::database::Note;
use crate::graphql::types::{anonymous_as_null, field_error, request_parts};

#[derive(Debug, Default)]
pub struct Query;

#[Object]
impl Query {
    /// A note by id, or null when no such note exists.
    async fn single_note(&self, ctx: &Context<'_>, id: ID) -> Result<Option<Note>> {
        let (notes, request) = request_parts(ctx)?;
        notes.single_note(request, &id).await.map_err(field_error)
    }

    /// Every note, newest first.
    async fn all_notes(&self, ctx: &Context<'_>) -> Result<Vec<Note>> {
        let (notes, request) = request_parts(ctx)?;
        notes.all_notes(request).await.map_err(field_error)
    }

    /// Notes written by the signed-in user; null for anonymous callers.
    async fn my_notes(&self, ctx: &Context<'_>) -> Result<Option<Vec<Note>>> {
        let (notes, request) = request_parts(ctx)?;
        anonymous_as_null(notes, notes.my_notes(request).await)
    }
}
