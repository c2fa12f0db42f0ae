// handlers/graphql.rs - the GraphQL endpoint (POST executes, GET serves GraphiQL)

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{Html, Json},
    Extension,
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::session::Session;

/// POST /api - execute one GraphQL operation
///
/// Body: `{"query": "...", "variables": {...}, "operationName": "..."}`.
/// The operation runs on its own task, so a client that disconnects does not
/// cancel store writes that are already under way.
pub async fn graphql_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<async_graphql::Request>, JsonRejection>,
) -> Result<Json<async_graphql::Response>, ApiError> {
    let Json(request) = payload?;
    let gateway = state.gateway.clone();

    let response = tokio::spawn(async move { gateway.execute(request, &session).await })
        .await
        .map_err(|e| {
            tracing::error!("GraphQL execution task failed: {}", e);
            ApiError::internal_server_error("An error occurred while processing your request")
        })?;

    Ok(Json(response))
}

/// GET /api - GraphiQL explorer, only while introspection is enabled
pub async fn graphiql(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    if !state.config.guard.enable_introspection {
        return Err(ApiError::not_found("GraphiQL is disabled"));
    }

    Ok(Html(
        async_graphql::http::GraphiQLSource::build()
            .endpoint(&state.config.server.graphql_path)
            .finish(),
    ))
}
