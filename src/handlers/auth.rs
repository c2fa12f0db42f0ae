// handlers/auth.rs - session sign-in, sign-out and whoami

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::{AuthenticatedUser, Identity, IdentityResolver};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::session::{Session, SessionChange};

/// POST /auth/login/:strategy - prove identity with a registered strategy
///
/// The body is passed to the strategy unchanged. On success the session is
/// bound to the user and its id is regenerated.
///
/// ```json
/// { "success": true, "data": { "id": "...", "name": "ada", "avatar": null } }
/// ```
pub async fn login(
    State(state): State<AppState>,
    Path(strategy): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(credentials) = payload?;
    let strategy = state.strategies.get(&strategy)?;

    let user = strategy.authenticate(credentials, state.store.as_ref()).await?;
    let user_id = user.id;

    let mut response = ApiResponse::success(AuthenticatedUser::from(user)).into_response();
    response.extensions_mut().insert(SessionChange::SignIn(user_id));
    Ok(response)
}

/// POST /auth/logout - drop the user from the current session
pub async fn logout() -> Response {
    let mut response = ApiResponse::success(json!({ "signed_out": true })).into_response();
    response.extensions_mut().insert(SessionChange::SignOut);
    response
}

/// GET /auth/whoami - the identity the current session resolves to
pub async fn whoami(State(state): State<AppState>, Extension(session): Extension<Session>) -> ApiResult<Identity> {
    let identity = IdentityResolver::new(state.store.clone()).resolve(&session).await;
    Ok(ApiResponse::success(identity))
}
