//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use learning_assistant_core::{GenerationParams, PipelineSettings};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where plans, lectures and accounts are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres { database_url: String },
    Memory,
}

/// Which generation backend the pipeline talks to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationBackend {
    /// A chat-completion API. `api_base` overrides the client's default URL.
    Chat { api_base: Option<String> },
    /// A hosted text-generation endpoint.
    Inference { endpoint: String },
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub storage: StorageBackend,
    pub log_level: Level,
    pub cors_origin: String,
    pub generation_backend: GenerationBackend,
    pub generation_api_key: Option<String>,
    pub generation_timeout: Duration,
    pub pipeline: PipelineSettings,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Load Server and Storage Settings ---
        let bind_address =
            parse_or(&lookup, "BIND_ADDRESS", "0.0.0.0:5000".parse::<SocketAddr>())?;

        let storage = match lookup("STORAGE_BACKEND")
            .unwrap_or_else(|| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" => StorageBackend::Postgres {
                database_url: lookup("DATABASE_URL")
                    .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?,
            },
            "memory" => StorageBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue(
                    "STORAGE_BACKEND".to_string(),
                    format!("'{}' is not one of postgres, memory", other),
                ))
            }
        };

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Load Generation Backend Settings ---
        let endpoint = lookup("GENERATION_ENDPOINT");
        let generation_backend = match lookup("GENERATION_BACKEND")
            .unwrap_or_else(|| "chat".to_string())
            .to_lowercase()
            .as_str()
        {
            "chat" => GenerationBackend::Chat { api_base: endpoint },
            "inference" => GenerationBackend::Inference {
                endpoint: endpoint
                    .ok_or_else(|| ConfigError::MissingVar("GENERATION_ENDPOINT".to_string()))?,
            },
            other => {
                return Err(ConfigError::InvalidValue(
                    "GENERATION_BACKEND".to_string(),
                    format!("'{}' is not one of chat, inference", other),
                ))
            }
        };

        let generation_api_key =
            lookup("GENERATION_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        let generation_timeout =
            Duration::from_secs(parse_or(&lookup, "GENERATION_TIMEOUT_SECS", Ok(60u64))?);

        // --- Load Per-Call-Site Parameters ---
        let model = lookup("GENERATION_MODEL")
            .unwrap_or_else(|| GenerationParams::DEFAULT_MODEL.to_string());
        let call_site = |prefix: &str, defaults: GenerationParams| {
            Ok::<_, ConfigError>(GenerationParams {
                model: model.clone(),
                max_tokens: parse_or(
                    &lookup,
                    &format!("{prefix}_MAX_TOKENS"),
                    Ok(defaults.max_tokens),
                )?,
                temperature: parse_or(
                    &lookup,
                    &format!("{prefix}_TEMPERATURE"),
                    Ok(defaults.temperature),
                )?,
            })
        };
        let pipeline = PipelineSettings {
            plan: call_site("PLAN", GenerationParams::plan_defaults())?,
            lecture: call_site("LECTURE", GenerationParams::lecture_defaults())?,
            answer: call_site("ANSWER", GenerationParams::answer_defaults())?,
        };

        Ok(Self {
            bind_address,
            storage,
            log_level,
            cors_origin,
            generation_backend,
            generation_api_key,
            generation_timeout,
            pipeline,
        })
    }
}

/// Parses `key` when it is set, otherwise returns `default`.
fn parse_or<F, T>(lookup: &F, key: &str, default: Result<T, T::Err>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => default.map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
    }
}
