use async_graphql::{EmptySubscription, Schema};

use crate::graphql::{Mutation, Query};
use crate::services::NoteService;

pub type NoteSchema = Schema<Query, Mutation, EmptySubscription>;

pub fn build_schema(service: NoteService, enable_introspection: bool) -> NoteSchema {
    let mut builder = Schema::build(Query, Mutation, EmptySubscription).data(service);
    if !enable_introspection {
        builder = builder.disable_introspection();
    }
    builder.finish()
}

/// SDL of the public schema. Needs no data, so the CLI can print it offline.
pub fn schema_sdl() -> String {
    Schema::build(Query, Mutation, EmptySubscription).finish().sdl()
}
