use std::sync::Arc;

use async_graphql::{Request, Response};

use crate::config::AppConfig;
use crate::context::ContextBuilder;
use crate::database::DataStore;
use crate::graphql::guard::{QueryGuard, SchemaShape};
use crate::graphql::schema::{build_schema, NoteSchema};
use crate::render::MarkdownRenderer;
use crate::services::NoteService;
use crate::session::Session;

/// Runs one GraphQL operation: guard, context, dispatch.
#[derive(Clone)]
pub struct Gateway {
    schema: NoteSchema,
    guard: Arc<QueryGuard>,
    contexts: ContextBuilder,
}

impl Gateway {
    pub fn new(schema: NoteSchema, guard: QueryGuard, contexts: ContextBuilder) -> Self {
        Self {
            schema,
            guard: Arc::new(guard),
            contexts,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn DataStore>,
        renderer: Arc<dyn MarkdownRenderer>,
    ) -> Result<Self, async_graphql::parser::Error> {
        let service = NoteService::new(renderer, &config.notes);
        let schema = build_schema(service, config.guard.enable_introspection);
        let shape = SchemaShape::from_sdl(&schema.sdl())?;
        let guard = QueryGuard::from_config(&config.guard, shape);

        Ok(Self::new(schema, guard, ContextBuilder::new(store)))
    }

    /// Rejected operations return before the context is built, so they never
    /// reach the data store.
    pub async fn execute(&self, request: Request, session: &Session) -> Response {
        if let Err(error) = self
            .guard
            .check_query(&request.query, request.operation_name.as_deref())
        {
            tracing::warn!(
                operation = ?request.operation_name,
                reason = %error.message,
                "Rejected GraphQL operation"
            );
            return Response::from_errors(vec![error]);
        }

        let context = self.contexts.build(session).await;
        self.schema.execute(request.data(context)).await
    }
}
