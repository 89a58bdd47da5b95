//! Environment-driven configuration.
//!
//! Values come from the process environment after an optional `.env` file
//! is loaded. Unset or blank variables fall back to defaults; values that
//! are set but unparsable are errors.

use crate::agent::adapters::http::DEFAULT_BASE_URL;
use crate::orchestration::domain::{
    DEFAULT_LEASE_TTL, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_CONCURRENCY, DEFAULT_POLL_INTERVAL,
    DEFAULT_RETRY_DELAY,
    OrchestrationPolicy,
};
use crate::planner::adapters::openai::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Default HTTP listen address.
pub const DEFAULT_BIND_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000);

/// Errors raised while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable is set to a value that cannot be used.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Parse failure.
        reason: String,
    },
}

/// Plan generator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerSettings {
    /// API key; planning fails without one.
    pub api_key: Option<String>,
    /// Model name.
    pub model: String,
    /// Chat completions endpoint.
    pub endpoint: String,
}

/// Execution agent settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    /// API key; launches fail without one.
    pub api_key: Option<String>,
    /// Base URL of the agent API.
    pub base_url: String,
}

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConductorConfig {
    /// HTTP listen address.
    pub bind_addr: SocketAddr,
    /// `PostgreSQL` URL; the in-memory store is used when absent.
    pub database_url: Option<String>,
    /// Loop timing, ceiling and attempt defaults.
    pub policy: OrchestrationPolicy,
    /// Plan generator settings.
    pub planner: PlannerSettings,
    /// Execution agent settings.
    pub agent: AgentSettings,
    /// GitHub token; source control is disabled when absent.
    pub github_token: Option<String>,
}

impl ConductorConfig {
    /// Loads `.env` if present, then reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unparsable values.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                warn!(error = %err, "failed to load .env file");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = parse_or(
            "CONDUCTOR_BIND_ADDR",
            read("CONDUCTOR_BIND_ADDR"),
            DEFAULT_BIND_ADDR,
        )?;
        let policy = OrchestrationPolicy::default()
            .with_poll_interval(millis_or(
                "CONDUCTOR_POLL_INTERVAL_MS",
                read("CONDUCTOR_POLL_INTERVAL_MS"),
                DEFAULT_POLL_INTERVAL,
            )?)
            .with_retry_delay(millis_or(
                "CONDUCTOR_RETRY_DELAY_MS",
                read("CONDUCTOR_RETRY_DELAY_MS"),
                DEFAULT_RETRY_DELAY,
            )?)
            .with_max_concurrency(positive_or(
                "CONDUCTOR_MAX_CONCURRENCY",
                read("CONDUCTOR_MAX_CONCURRENCY"),
                DEFAULT_MAX_CONCURRENCY,
            )?)
            .with_default_max_attempts(positive_or(
                "CONDUCTOR_MAX_ATTEMPTS",
                read("CONDUCTOR_MAX_ATTEMPTS"),
                DEFAULT_MAX_ATTEMPTS,
            )?)
            .with_lease_ttl(millis_or(
                "CONDUCTOR_LEASE_TTL_MS",
                read("CONDUCTOR_LEASE_TTL_MS"),
                DEFAULT_LEASE_TTL,
            )?);
        if policy.lease_ttl() <= policy.poll_interval() {
            return Err(invalid(
                "CONDUCTOR_LEASE_TTL_MS",
                &policy.lease_ttl().as_millis().to_string(),
                &"must exceed the poll interval",
            ));
        }

        Ok(Self {
            bind_addr,
            database_url: read("DATABASE_URL"),
            policy,
            planner: PlannerSettings {
                api_key: read("OPENAI_API_KEY"),
                model: read("CONDUCTOR_PLANNER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
                endpoint: read("CONDUCTOR_PLANNER_URL")
                    .unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned()),
            },
            agent: AgentSettings {
                api_key: read("CURSOR_API_KEY"),
                base_url: read("CONDUCTOR_AGENT_URL")
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            },
            github_token: read("GITHUB_TOKEN"),
        })
    }
}

fn invalid(key: &'static str, value: &str, reason: &impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_owned(),
        reason: reason.to_string(),
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map_or(Ok(default), |value| {
        value.parse().map_err(|err| invalid(key, &value, &err))
    })
}

fn millis_or(
    key: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let fallback = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parse_or(key, raw, fallback).map(Duration::from_millis)
}

fn positive_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialEq + std::fmt::Display + Copy,
    T::Err: std::fmt::Display,
{
    let value = parse_or(key, raw, default)?;
    if value == T::default() {
        return Err(invalid(key, &value.to_string(), &"must be at least 1"));
    }
    Ok(value)
}
