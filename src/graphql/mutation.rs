use async_graphql::{Context, Object, Result, ID};

use crate::database::Note;
use crate::graphql::types::{anonymous_as_null, field_error, request_parts};

#[derive(Debug, Default)]
pub struct Mutation;

#[Object]
impl Mutation {
    /// Creates a note owned by the signed-in user. Null when anonymous.
    async fn new_note(&self, ctx: &Context<'_>, content: String) -> Result<Option<Note>> {
        let (notes, request) = request_parts(ctx)?;
        anonymous_as_null(notes, notes.new_note(request, content).await)
    }

    async fn update_note(&self, ctx: &Context<'_>, id: ID, content: String) -> Result<Note> {
        let (notes, request) = request_parts(ctx)?;
        notes.update_note(request, &id, content).await.map_err(field_error)
    }

    /// False when the note did not exist.
    async fn delete_note(&self, ctx: &Context<'_>, id: ID) -> Result<bool> {
        let (notes, request) = request_parts(ctx)?;
        notes.delete_note(request, &id).await.map_err(field_error)
    }

    /// Adds or removes the signed-in user's favorite. Null when anonymous.
    async fn toggle_reaction(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "noteID")] note_id: ID,
    ) -> Result<Option<Note>> {
        let (notes, request) = request_parts(ctx)?;
        anonymous_as_null(notes, notes.toggle_reaction(request, &note_id).await)
    }
}
