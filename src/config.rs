//! Configuration loader for the `building-reports` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Handlers never call `env::var` themselves; they
//! receive what they need from the [`Config`] snapshot built here.
//!
use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use sqlx::postgres::PgConnectOptions;

/// Parse an optional environment variable into `$ty` with a default value.
macro_rules! parse_env {
    ($lookup:expr, $var_name:expr, $ty:ty, $default:expr) => {
        $lookup($var_name)
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable with a default value.
macro_rules! env_or {
    ($lookup:expr, $var_name:expr, $default:expr) => {
        $lookup($var_name).unwrap_or_else(|| $default.to_string())
    };
}

/// Where the database lives.
///
/// `DATABASE_URL` wins when present; otherwise the connection is assembled
/// from the individual `DB_*` variables.
#[derive(Debug, Clone)]
pub enum DbTarget {
    // ---
    Url(String),
    Parts {
        host: String,
        port: u16,
        name: String,
        user: String,
        password: String,
    },
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection target.
    pub db: DbTarget,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Port the HTTP server listens on.
    pub server_port: u16,

    /// Completion service credential. `None` selects stub or strict mode.
    pub anthropic_api_key: Option<String>,

    /// Completion service base URL (without the `/v1/messages` suffix).
    pub anthropic_api_url: String,

    /// Model identifier sent with every completion request.
    pub anthropic_model: String,

    /// Fail `/api/llm` with a configuration error instead of answering from the stub.
    pub llm_require_api_key: bool,

    /// Mount `POST /api/query`, which executes caller-supplied SQL.
    pub enable_raw_query: bool,
}

/// Load configuration from the process environment.
///
/// Optional (all of them):
/// - `DATABASE_URL` – full PostgreSQL URL, overrides the `DB_*` parts
/// - `DB_HOST` / `DB_PORT` / `DB_NAME` / `DB_USER` / `DB_PASSWORD`
///   (defaults: `db`, `5432`, `mydatabase`, `user`, `password`)
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `SERVER_PORT` – listen port (default: 8000)
/// - `ANTHROPIC_API_KEY` – completion credential (default: unset, stub mode)
/// - `ANTHROPIC_API_URL` – completion base URL (default: `https://api.anthropic.com`)
/// - `ANTHROPIC_MODEL` – model identifier (default: `claude-opus-4-1`)
/// - `LLM_REQUIRE_API_KEY` – strict mode for a missing key (default: false)
/// - `ENABLE_RAW_QUERY` – expose the arbitrary SQL endpoint (default: false)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    load_with(|key| env::var(key).ok())
}

/// Load configuration through an arbitrary key lookup.
///
/// Empty values are treated the same as unset ones.
pub fn load_with<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let db = match lookup("DATABASE_URL") {
        Some(url) => DbTarget::Url(url),
        None => DbTarget::Parts {
            host: env_or!(lookup, "DB_HOST", "db"),
            port: parse_env!(lookup, "DB_PORT", u16, 5432),
            name: env_or!(lookup, "DB_NAME", "mydatabase"),
            user: env_or!(lookup, "DB_USER", "user"),
            password: env_or!(lookup, "DB_PASSWORD", "password"),
        },
    };

    Ok(Config {
        db,
        db_pool_max: parse_env!(lookup, "DB_POOL_MAX", u32, 5),
        server_port: parse_env!(lookup, "SERVER_PORT", u16, 8000),
        anthropic_api_key: lookup("ANTHROPIC_API_KEY"),
        anthropic_api_url: env_or!(lookup, "ANTHROPIC_API_URL", "https://api.anthropic.com")
            .trim_end_matches('/')
            .to_string(),
        anthropic_model: env_or!(lookup, "ANTHROPIC_MODEL", "claude-opus-4-1"),
        llm_require_api_key: parse_env!(lookup, "LLM_REQUIRE_API_KEY", bool, false),
        enable_raw_query: parse_env!(lookup, "ENABLE_RAW_QUERY", bool, false),
    })
}

impl Config {
    /// Build sqlx connection options from the configured target.
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        // ---
        match &self.db {
            DbTarget::Url(url) => PgConnectOptions::from_str(url)
                .map_err(|e| anyhow!("Invalid DATABASE_URL: {}", e)),
            DbTarget::Parts {
                host,
                port,
                name,
                user,
                password,
            } => Ok(PgConnectOptions::new()
                .host(host)
                .port(*port)
                .database(name)
                .username(user)
                .password(password)),
        }
    }

    /// Human-readable database location with the password masked.
    pub fn masked_db_target(&self) -> String {
        // ---
        match &self.db {
            DbTarget::Url(url) => mask_url_password(url),
            DbTarget::Parts {
                host,
                port,
                name,
                user,
                ..
            } => format!("postgres://{}:****@{}:{}/{}", user, host, port, name),
        }
    }

    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information like database passwords and the API key
    /// while showing all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        let api_key = match &self.anthropic_api_key {
            Some(_) => "**** (provider mode)",
            None if self.llm_require_api_key => "<unset> (strict, /api/llm will fail)",
            None => "<unset> (stub mode)",
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE            : {}", self.masked_db_target());
        tracing::info!("  DB_POOL_MAX         : {}", self.db_pool_max);
        tracing::info!("  SERVER_PORT         : {}", self.server_port);
        tracing::info!("  ANTHROPIC_API_KEY   : {}", api_key);
        tracing::info!("  ANTHROPIC_API_URL   : {}", self.anthropic_api_url);
        tracing::info!("  ANTHROPIC_MODEL     : {}", self.anthropic_model);
        tracing::info!("  ENABLE_RAW_QUERY    : {}", self.enable_raw_query);

        if self.enable_raw_query {
            tracing::warn!("POST /api/query is enabled: callers can run arbitrary SQL");
        }
    }
}

fn mask_url_password(url: &str) -> String {
    // ---
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            // A colon right after the scheme means there is no password.
            if !url[..=colon_pos].ends_with("://") && url[..colon_pos].contains("://") {
                return format!("{}:****{}", &url[..colon_pos], &url[at_pos..]);
            }
        }
    }
    url.to_string()
}
