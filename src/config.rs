use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Care Relay";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default listen address for the HTTP service.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8787";

/// Hosted generative model used for OCR, triage and extraction.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Outbound deadlines.
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_PUSH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

/// Maximum number of push sends in flight for one fan-out.
pub const DEFAULT_FANOUT_CONCURRENCY: usize = 16;

// Environment variable names
pub const ENV_BIND: &str = "CARE_RELAY_BIND";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";
pub const ENV_GEMINI_BASE_URL: &str = "GEMINI_BASE_URL";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_DATABASE_SERVICE_KEY: &str = "DATABASE_SERVICE_KEY";
pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_SERVICE_ROLE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";
pub const ENV_FIREBASE_SERVICE_ACCOUNT: &str = "FIREBASE_SERVICE_ACCOUNT";
pub const ENV_MODEL_TIMEOUT: &str = "CARE_RELAY_MODEL_TIMEOUT_SECS";
pub const ENV_PUSH_TIMEOUT: &str = "CARE_RELAY_PUSH_TIMEOUT_SECS";
pub const ENV_FANOUT_CONCURRENCY: &str = "CARE_RELAY_FANOUT_CONCURRENCY";

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,care_relay=debug"
    } else {
        "info"
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Where medical events and donor profiles live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// `sqlite::memory:`
    SqliteMemory,
    /// `sqlite://<path>`
    SqliteFile(String),
    /// PostgREST endpoint of the managed database.
    Rest(String),
}

impl DatabaseTarget {
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let url = url.trim();
        if url == "sqlite::memory:" {
            return Ok(Self::SqliteMemory);
        }
        if let Some(path) = url.strip_prefix("sqlite://") {
            if path.is_empty() {
                return Err(ConfigError::Invalid {
                    key: ENV_DATABASE_URL,
                    reason: "sqlite URL has no path".into(),
                });
            }
            return Ok(Self::SqliteFile(path.to_string()));
        }
        if url.starts_with("https://") || url.starts_with("http://") {
            return Ok(Self::Rest(url.trim_end_matches('/').to_string()));
        }
        Err(ConfigError::Invalid {
            key: ENV_DATABASE_URL,
            reason: "expected sqlite://, sqlite::memory: or an http(s) URL".into(),
        })
    }
}

/// Process configuration, read once at startup.
///
/// Secrets are optional here: a missing secret leaves the matching
/// collaborator unconfigured and every request that needs it fails with
/// a configuration error.
#[derive(Clone)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub database: Option<DatabaseTarget>,
    pub database_service_key: Option<String>,
    pub firebase_service_account: Option<String>,
    pub model_timeout: Duration,
    pub push_timeout: Duration,
    pub store_timeout: Duration,
    pub fanout_concurrency: usize,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_addr = get(ENV_BIND)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: ENV_BIND,
                reason: e.to_string(),
            })?;

        let database = get(ENV_DATABASE_URL)
            .or_else(|| get(ENV_SUPABASE_URL))
            .map(|url| DatabaseTarget::parse(&url))
            .transpose()?;

        Ok(Self {
            bind_addr,
            gemini_api_key: get(ENV_GEMINI_API_KEY),
            gemini_model: get(ENV_GEMINI_MODEL).unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
            gemini_base_url: get(ENV_GEMINI_BASE_URL)
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.into()),
            database,
            database_service_key: get(ENV_DATABASE_SERVICE_KEY)
                .or_else(|| get(ENV_SUPABASE_SERVICE_ROLE_KEY)),
            firebase_service_account: get(ENV_FIREBASE_SERVICE_ACCOUNT),
            model_timeout: parse_secs(get(ENV_MODEL_TIMEOUT), ENV_MODEL_TIMEOUT, DEFAULT_MODEL_TIMEOUT_SECS)?,
            push_timeout: parse_secs(get(ENV_PUSH_TIMEOUT), ENV_PUSH_TIMEOUT, DEFAULT_PUSH_TIMEOUT_SECS)?,
            store_timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
            fanout_concurrency: parse_positive(
                get(ENV_FANOUT_CONCURRENCY),
                ENV_FANOUT_CONCURRENCY,
                DEFAULT_FANOUT_CONCURRENCY as u64,
            )? as usize,
        })
    }

    /// Settings with every secret absent. Used as a base in tests.
    pub fn unconfigured() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.into(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.into(),
            database: None,
            database_service_key: None,
            firebase_service_account: None,
            model_timeout: Duration::from_secs(DEFAULT_MODEL_TIMEOUT_SECS),
            push_timeout: Duration::from_secs(DEFAULT_PUSH_TIMEOUT_SECS),
            store_timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
            fanout_concurrency: DEFAULT_FANOUT_CONCURRENCY,
        }
    }
}

fn parse_secs(value: Option<String>, key: &'static str, default: u64) -> Result<Duration, ConfigError> {
    parse_positive(value, key, default).map(Duration::from_secs)
}

fn parse_positive(value: Option<String>, key: &'static str, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = value else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            key,
            reason: "must be greater than zero".into(),
        }),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}

/// Secrets never reach logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(v: &Option<String>) -> &'static str {
            if v.is_some() {
                "<set>"
            } else {
                "<unset>"
            }
        }
        f.debug_struct("Settings")
            .field("bind_addr", &self.bind_addr)
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("database", &self.database.as_ref().map(|d| match d {
                DatabaseTarget::SqliteMemory => "sqlite (memory)",
                DatabaseTarget::SqliteFile(_) => "sqlite (file)",
                DatabaseTarget::Rest(_) => "rest",
            }))
            .field("database_service_key", &redact(&self.database_service_key))
            .field("firebase_service_account", &redact(&self.firebase_service_account))
            .field("model_timeout", &self.model_timeout)
            .field("push_timeout", &self.push_timeout)
            .field("fanout_concurrency", &self.fanout_concurrency)
            .finish()
    }
}
