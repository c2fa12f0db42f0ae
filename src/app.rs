use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::{DevelopmentStrategy, StrategyRegistry};
use crate::config::{AppConfig, SecurityConfig};
use crate::database::{Backends, DataStore};
use crate::graphql::Gateway;
use crate::handlers::{auth, graphql, health};
use crate::middleware::{security_headers_middleware, session_middleware, SessionCookies};
use crate::render::SanitizingRenderer;
use crate::session::SessionStore;

/// Everything a request handler may reach. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub gateway: Gateway,
    pub store: Arc<dyn DataStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub strategies: StrategyRegistry,
    pub cookies: SessionCookies,
}

impl AppState {
    pub fn new(config: AppConfig, backends: Backends) -> anyhow::Result<Self> {
        let gateway = Gateway::from_config(&config, backends.store.clone(), Arc::new(SanitizingRenderer::new()))?;

        let mut strategies = StrategyRegistry::new();
        if config.auth.enable_dev_login {
            strategies.register(Arc::new(DevelopmentStrategy));
        }

        Ok(Self {
            cookies: SessionCookies::from_config(&config.session),
            config: Arc::new(config),
            gateway,
            store: backends.store,
            sessions: backends.sessions,
            strategies,
        })
    }
}

/// The HTTP surface. From the outside in: tracing, body limit, security
/// headers, request timeout, CORS, then sessions for the routes that use them.
pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    let public = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health));

    let session_routes = Router::new()
        .route(
            &config.server.graphql_path,
            post(graphql::graphql_post).get(graphql::graphiql),
        )
        .route("/auth/login/:strategy", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/whoami", get(auth::whoami))
        .layer(from_fn_with_state(state.clone(), session_middleware));

    let mut app = public.merge(session_routes);
    if config.security.enable_cors {
        app = app.layer(cors_layer(&config.security));
    }

    app.layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(from_fn(security_headers_middleware))
        .layer(DefaultBodyLimit::max(config.server.max_request_size_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// With no configured origins any origin may call, without credentials.
/// Credentials are allowed only for an explicit origin list.
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if security.cors_origins.is_empty() {
        return layer.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins)).allow_credentials(true)
}
