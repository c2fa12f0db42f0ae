use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub guard: GuardConfig,
    pub security: SecurityConfig,
    pub notes: NotesConfig,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub graphql_path: String,
    pub request_timeout_secs: u64,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub max_age_secs: i64,
    #[serde(skip_serializing)]
    pub secret: Option<String>,
    pub secure_cookie: bool,
    pub purge_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    pub max_depth: usize,
    pub max_complexity: u64,
    pub max_introspection_depth: usize,
    pub list_factor: u64,
    pub enable_introspection: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    /// Empty means any origin, without credentials.
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesConfig {
    pub mutation_policy: MutationPolicy,
    pub strict_auth_errors: bool,
    pub max_content_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub enable_dev_login: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

/// Who may run `updateNote` and `deleteNote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationPolicy {
    /// Any caller, including anonymous ones, may change any note.
    Permissive,
    /// Only the note's author may change it.
    OwnerOnly,
}

impl FromStr for MutationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(MutationPolicy::Permissive),
            "owner" | "owner_only" | "owner-only" => Ok(MutationPolicy::OwnerOnly),
            other => Err(format!("unknown mutation policy '{}'", other)),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SERVER_GRAPHQL_PATH") {
            self.server.graphql_path = v;
        }
        if let Ok(v) = env::var("SERVER_REQUEST_TIMEOUT_SECS") {
            self.server.request_timeout_secs = v.parse().unwrap_or(self.server.request_timeout_secs);
        }
        if let Ok(v) = env::var("SERVER_MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }

        // Session overrides
        if let Ok(v) = env::var("SESSION_COOKIE_NAME") {
            self.session.cookie_name = v;
        }
        if let Ok(v) = env::var("SESSION_MAX_AGE_SECS") {
            self.session.max_age_secs = v.parse().unwrap_or(self.session.max_age_secs);
        }
        if let Ok(v) = env::var("SESSION_SECRET") {
            self.session.secret = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("SESSION_SECURE_COOKIE") {
            self.session.secure_cookie = v.parse().unwrap_or(self.session.secure_cookie);
        }
        if let Ok(v) = env::var("SESSION_PURGE_INTERVAL_SECS") {
            self.session.purge_interval_secs = v.parse().unwrap_or(self.session.purge_interval_secs);
        }

        // Guard overrides
        if let Ok(v) = env::var("GUARD_MAX_DEPTH") {
            self.guard.max_depth = v.parse().unwrap_or(self.guard.max_depth);
        }
        if let Ok(v) = env::var("GUARD_MAX_COMPLEXITY") {
            self.guard.max_complexity = v.parse().unwrap_or(self.guard.max_complexity);
        }
        if let Ok(v) = env::var("GUARD_MAX_INTROSPECTION_DEPTH") {
            self.guard.max_introspection_depth = v.parse().unwrap_or(self.guard.max_introspection_depth);
        }
        if let Ok(v) = env::var("GUARD_LIST_FACTOR") {
            self.guard.list_factor = v.parse().unwrap_or(self.guard.list_factor);
        }
        if let Ok(v) = env::var("GUARD_ENABLE_INTROSPECTION") {
            self.guard.enable_introspection = v.parse().unwrap_or(self.guard.enable_introspection);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Notes overrides
        if let Ok(v) = env::var("NOTES_MUTATION_POLICY") {
            match v.parse() {
                Ok(policy) => self.notes.mutation_policy = policy,
                Err(e) => tracing::warn!("Ignoring NOTES_MUTATION_POLICY: {}", e),
            }
        }
        if let Ok(v) = env::var("NOTES_STRICT_AUTH_ERRORS") {
            self.notes.strict_auth_errors = v.parse().unwrap_or(self.notes.strict_auth_errors);
        }
        if let Ok(v) = env::var("NOTES_MAX_CONTENT_LENGTH") {
            self.notes.max_content_length = v.parse().unwrap_or(self.notes.max_content_length);
        }

        // Auth overrides
        if let Ok(v) = env::var("AUTH_ENABLE_DEV_LOGIN") {
            self.auth.enable_dev_login = v.parse().unwrap_or(self.auth.enable_dev_login);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 4000,
                graphql_path: "/api".to_string(),
                request_timeout_secs: 5,
                max_request_size_bytes: 1024 * 1024, // 1MB
            },
            session: SessionConfig {
                cookie_name: "notedly.sid".to_string(),
                max_age_secs: 14 * 24 * 60 * 60, // two weeks
                secret: None,
                secure_cookie: false,
                purge_interval_secs: 10 * 60,
            },
            guard: GuardConfig {
                max_depth: 5,
                max_complexity: 1000,
                max_introspection_depth: 15,
                list_factor: 10,
                enable_introspection: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: Vec::new(),
            },
            notes: NotesConfig {
                mutation_policy: MutationPolicy::Permissive,
                strict_auth_errors: false,
                max_content_length: 64 * 1024,
            },
            auth: AuthConfig {
                enable_dev_login: true,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
        }
    }

    pub fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.session.secure_cookie = true;
        config.auth.enable_dev_login = false;
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config
    }

    pub fn production() -> Self {
        let mut config = Self::staging();
        config.environment = Environment::Production;
        config.guard.enable_introspection = false;
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
