// handlers/health.rs - service descriptor and liveness

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET / - what this service is and where its endpoints live
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let graphql = &state.config.server.graphql_path;

    Json(json!({
        "success": true,
        "data": {
            "name": "Notedly API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "GraphQL API for notes, favorites and sessions",
            "endpoints": {
                "graphql": format!("POST {}", graphql),
                "graphiql": format!("GET {} (when introspection is enabled)", graphql),
                "login": "POST /auth/login/:strategy",
                "logout": "POST /auth/logout",
                "whoami": "GET /auth/whoami",
                "health": "GET /health",
            },
            "strategies": state.strategies.names(),
        }
    }))
}

/// GET /health - 200 when the data store answers, 503 otherwise
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
