use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    pub jwt_secret: String,
    /// Upstream student/attendance service; `None` runs against the in-memory store.
    pub backend_url: Option<String>,
    pub api_prefix: String,
    pub request_timeout_secs: u64,

    // Session store
    pub session_ttl_secs: u64,
    pub session_capacity: u64,

    // Rate limiting
    pub rate_session_per_min: u32,

    pub allow_auto_seed: bool,
    pub vocabulary_path: Option<PathBuf>,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            jwt_secret: required("JWT_SECRET")?,
            backend_url: optional("BACKEND_URL"),
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            request_timeout_secs: parsed("REQUEST_TIMEOUT_SECS", 15)?,

            session_ttl_secs: parsed("SESSION_TTL_SECS", 3600)?,
            session_capacity: parsed("SESSION_CAPACITY", 10_000)?,

            rate_session_per_min: parsed("RATE_SESSION_PER_MIN", 600)?,

            allow_auto_seed: parsed("ALLOW_AUTO_SEED", false)?,
            vocabulary_path: optional("VOCABULARY_PATH").map(PathBuf::from),
        })
    }

    /// Defaults for everything but the two required values.
    pub fn with_defaults(server_addr: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            jwt_secret: jwt_secret.into(),
            backend_url: None,
            api_prefix: "/api".to_string(),
            request_timeout_secs: 15,
            session_ttl_secs: 3600,
            session_capacity: 10_000,
            rate_session_per_min: 600,
            allow_auto_seed: false,
            vocabulary_path: None,
        }
    }
}
