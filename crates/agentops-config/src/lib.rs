// crates/agentops-config/src/lib.rs
// ============================================================================
// Crate: agentops-config
// Description: Environment-sourced, fail-closed configuration for AgentOps.
// Purpose: One validated settings struct shared by the API and worker binaries.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Configuration is sourced entirely from environment variables (see the
//! recognized key list below), not from a file. Every field is validated at
//! load time; a missing or malformed value fails closed rather than falling
//! back to a silently wrong default. This mirrors the strict,
//! validate()-before-use posture used elsewhere in this workspace, adapted
//! from a TOML-file source to an env-var source.

use std::env;

use thiserror::Error;

/// Minimum accepted length for `app_ingest_secret`, once set, to avoid a
/// trivially guessable header check. An empty secret disables the check
/// entirely, which is a deliberate opt-out, not a weak secret.
pub const MIN_INGEST_SECRET_LEN: usize = 8;

/// Default RQ-compatible queue name when `rq_queue_name` is unset.
pub const DEFAULT_QUEUE_NAME: &str = "rca";

/// Default SQLite database URL when `database_url` is unset.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://agentops.db";

/// Errors that can occur while loading or validating [`AppConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Deployment environment label, free-form but recorded for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEnv {
    Prod,
    Staging,
    Dev,
}

impl AppEnv {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }
}

/// Fully validated application configuration.
///
/// # Invariants
/// - `cors_origins` is never `None`; an unset env var yields an empty list
///   (no origins allowed), never a wildcard by default.
/// - `app_ingest_secret`, if non-empty, is at least [`MIN_INGEST_SECRET_LEN`]
///   characters.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub app_env: AppEnv,
    pub app_ingest_secret: Option<String>,
    pub log_level: String,
    pub openai_api_key: Option<String>,
    pub rq_queue_name: String,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    /// Loads configuration from the process environment and validates it.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if a recognized variable is present but
    /// malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("database_url").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned());
        let redis_url = non_empty(env::var("redis_url").ok());
        let app_env = AppEnv::parse(&env::var("app_env").unwrap_or_else(|_| "dev".to_owned()));
        let app_ingest_secret = non_empty(env::var("app_ingest_secret").ok());
        let log_level = env::var("log_level").unwrap_or_else(|_| "info".to_owned());
        let openai_api_key = non_empty(env::var("openai_api_key").ok());
        let rq_queue_name = {
            let v = env::var("rq_queue_name").unwrap_or_else(|_| DEFAULT_QUEUE_NAME.to_owned());
            if v.trim().is_empty() {
                DEFAULT_QUEUE_NAME.to_owned()
            } else {
                v
            }
        };
        let cors_origins = env::var("cors_origins")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        let config = Self {
            database_url,
            redis_url,
            app_env,
            app_ingest_secret,
            log_level,
            openai_api_key,
            rq_queue_name,
            cors_origins,
        };
        config.validate()?;
        Ok(config)
    }

    /// Re-validates an in-memory configuration, used both after
    /// [`Self::from_env`] and by tests constructing configs directly.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] when a field violates its bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "database_url",
                reason: "must not be empty".to_owned(),
            });
        }
        if let Some(secret) = &self.app_ingest_secret {
            if secret.len() < MIN_INGEST_SECRET_LEN {
                return Err(ConfigError::Invalid {
                    field: "app_ingest_secret",
                    reason: format!("must be at least {MIN_INGEST_SECRET_LEN} characters once set"),
                });
            }
        }
        if self.rq_queue_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "rq_queue_name",
                reason: "must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            redis_url: None,
            app_env: AppEnv::Dev,
            app_ingest_secret: None,
            log_level: "info".to_owned(),
            openai_api_key: None,
            rq_queue_name: DEFAULT_QUEUE_NAME.to_owned(),
            cors_origins: Vec::new(),
        }
    }

    #[test]
    fn empty_ingest_secret_is_allowed_opt_out() {
        let config = base_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn short_ingest_secret_is_rejected() {
        let mut config = base_config();
        config.app_ingest_secret = Some("short".to_owned());
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_database_url_is_rejected() {
        let mut config = base_config();
        config.database_url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn app_env_defaults_to_dev_on_unrecognized_value() {
        assert_eq!(AppEnv::parse("banana"), AppEnv::Dev);
        assert_eq!(AppEnv::parse("PROD"), AppEnv::Prod);
    }
}
