use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use cookie::{Cookie, CookieJar, Key, SameSite};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::app::AppState;
use crate::config::SessionConfig;
use crate::error::ApiError;
use crate::session::{Session, SessionChange};

/// Reads and writes the signed session cookie.
#[derive(Clone)]
pub struct SessionCookies {
    key: Key,
    name: String,
    max_age_secs: i64,
    secure: bool,
}

impl SessionCookies {
    pub fn from_config(config: &SessionConfig) -> Self {
        let secret = match &config.secret {
            Some(secret) => secret.clone(),
            None => {
                tracing::warn!("SESSION_SECRET not set; sessions will not survive a restart");
                format!("{}{}", Uuid::new_v4(), Uuid::new_v4())
            }
        };
        Self::new(&secret, config)
    }

    pub fn new(secret: &str, config: &SessionConfig) -> Self {
        // Key derivation needs at least 256 bits of input.
        let digest = Sha256::digest(secret.as_bytes());
        Self {
            key: Key::derive_from(&digest),
            name: config.cookie_name.clone(),
            max_age_secs: config.max_age_secs,
            secure: config.secure_cookie,
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::seconds(self.max_age_secs)
    }

    /// Session id from a cookie whose signature verifies, if any.
    pub fn read(&self, headers: &HeaderMap) -> Option<String> {
        let mut jar = CookieJar::new();
        for value in headers.get_all(header::COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            for cookie in Cookie::split_parse(value).flatten() {
                if cookie.name() == self.name {
                    jar.add_original(cookie.into_owned());
                }
            }
        }
        jar.signed(&self.key)
            .get(&self.name)
            .map(|cookie| cookie.value().to_string())
    }

    pub fn write(&self, session_id: &str) -> Option<HeaderValue> {
        let cookie = Cookie::build((self.name.clone(), session_id.to_string()))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .secure(self.secure)
            .max_age(cookie::time::Duration::seconds(self.max_age_secs))
            .build();

        let mut jar = CookieJar::new();
        jar.signed_mut(&self.key).add(cookie);
        let signed = jar.get(&self.name)?;
        HeaderValue::from_str(&signed.to_string()).ok()
    }
}

/// Loads the caller's session (or starts a new one) and exposes it to
/// handlers as a request extension. After the handler runs, applies any
/// [`SessionChange`] it returned, persists the session with a renewed expiry
/// and sends the cookie back.
pub async fn session_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let cookies = &state.cookies;
    let sessions = &state.sessions;

    let loaded = match cookies.read(request.headers()) {
        Some(id) => match sessions.get(&id).await {
            Ok(session) => session,
            Err(e) => return ApiError::from(e).into_response(),
        },
        None => None,
    };
    let existed = loaded.is_some();
    let mut session = loaded.unwrap_or_else(|| Session::new(cookies.ttl()));

    request.extensions_mut().insert(session.clone());
    let mut response = next.run(request).await;

    let change = response.extensions_mut().remove::<SessionChange>();
    let previous_id = session.id.clone();
    match change {
        Some(SessionChange::SignIn(user_id)) => {
            session.sign_in(user_id);
            tracing::info!(user = %user_id, "Signed in");
        }
        Some(SessionChange::SignOut) => {
            session.sign_out();
            tracing::info!("Signed out");
        }
        None => {}
    }
    session.expires_at = Utc::now() + cookies.ttl();

    if let Err(e) = persist(&state, &session, existed, &previous_id, change.is_some()).await {
        if change.is_some() {
            return ApiError::from(e).into_response();
        }
        tracing::warn!("Failed to renew session: {}", e);
    }

    match cookies.write(&session.id) {
        Some(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        None => tracing::error!("Could not encode session cookie"),
    }
    response
}

async fn persist(
    state: &AppState,
    session: &Session,
    existed: bool,
    previous_id: &str,
    changed: bool,
) -> Result<(), crate::session::SessionError> {
    let sessions = &state.sessions;

    if existed && !changed && sessions.touch(&session.id, session.expires_at).await? {
        return Ok(());
    }
    sessions.set(session).await?;

    if existed && previous_id != session.id {
        sessions.destroy(previous_id).await?;
    }
    Ok(())
}
