//! Process configuration, read once at startup from the environment

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_FORECAST_URL: &str = "https://my-earth-access.onrender.com";
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_FIXTURE_PATH: &str = "data/mock_predictions.json";
pub const DEFAULT_OBSERVATIONS_PATH: &str = "data/observations.jsonl";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// What to do when the forecasting service cannot be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Answer from fixtures or the synthetic default
    #[default]
    Enabled,
    /// Fail the request with a 500
    Disabled,
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enabled" | "on" | "true" => Ok(FallbackPolicy::Enabled),
            "disabled" | "off" | "false" => Ok(FallbackPolicy::Disabled),
            other => Err(format!("expected enabled or disabled, got {}", other)),
        }
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackPolicy::Enabled => write!(f, "enabled"),
            FallbackPolicy::Disabled => write!(f, "disabled"),
        }
    }
}

/// How a fixture forecast point is picked when no date matches exactly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateMatch {
    /// First point of the series
    #[default]
    First,
    /// Point with the smallest day distance to the requested date
    Nearest,
}

impl FromStr for DateMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(DateMatch::First),
            "nearest" => Ok(DateMatch::Nearest),
            other => Err(format!("expected first or nearest, got {}", other)),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Base URL of the forecasting service, without trailing slash
    pub forecast_url: String,
    /// Origin allowed by CORS
    pub frontend_url: String,
    pub timeout: Duration,
    pub fixture_path: PathBuf,
    pub observations_path: PathBuf,
    pub fallback: FallbackPolicy,
    pub date_match: DateMatch,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            fixture_path: PathBuf::from(DEFAULT_FIXTURE_PATH),
            observations_path: PathBuf::from(DEFAULT_OBSERVATIONS_PATH),
            fallback: FallbackPolicy::default(),
            date_match: DateMatch::default(),
        }
    }
}

impl AppConfig {
    /// Load from the process environment, reading `.env` first if present
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout_ms = match get("PREDICT_TIMEOUT_MS") {
            Some(v) => parse_value("PREDICT_TIMEOUT_MS", &v)?,
            None => DEFAULT_TIMEOUT_MS,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: match get("PORT") {
                Some(v) => parse_value("PORT", &v)?,
                None => defaults.port,
            },
            forecast_url: get("PYTHON_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.forecast_url),
            frontend_url: get("FRONTEND_URL").unwrap_or(defaults.frontend_url),
            timeout: Duration::from_millis(timeout_ms),
            fixture_path: get("MOCK_PREDICTIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.fixture_path),
            observations_path: get("OBSERVATIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.observations_path),
            fallback: match get("PREDICT_FALLBACK") {
                Some(v) => parse_value("PREDICT_FALLBACK", &v)?,
                None => defaults.fallback,
            },
            date_match: match get("FIXTURE_DATE_MATCH") {
                Some(v) => parse_value("FIXTURE_DATE_MATCH", &v)?,
                None => defaults.date_match,
            },
        })
    }

    /// Address to bind the HTTP server to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_value<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: e.to_string(),
        })
}
