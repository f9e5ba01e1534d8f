use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::DEFAULT_EVENTS_TABLE;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Errors that can occur during configuration loading
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variables: {0}")]
    MissingVariables(String),

    #[error("Environment variable {name} has invalid value {value:?}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// When the store probe runs relative to binding the listener.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartupProbe {
    /// Bind first, then probe in a background task
    #[default]
    Background,
    /// Probe first, then bind regardless of the outcome
    Blocking,
}

impl FromStr for StartupProbe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "background" => Ok(StartupProbe::Background),
            "blocking" => Ok(StartupProbe::Blocking),
            other => Err(format!("expected \"background\" or \"blocking\", got {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected \"pretty\" or \"json\", got {:?}", other)),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    pub environment: String,
    pub port: u16,
    pub supabase_url: String,
    pub supabase_key: String,
    pub events_table: String,
    pub startup_probe: StartupProbe,
    pub log_format: LogFormat,
}

// The access key is a service-role secret; keep it out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("environment", &self.environment)
            .field("port", &self.port)
            .field("supabase_url", &self.supabase_url)
            .field("supabase_key", &"<redacted>")
            .field("events_table", &self.events_table)
            .field("startup_probe", &self.startup_probe)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let supabase_url = var("SUPABASE_URL");
        let supabase_key = var("SUPABASE_KEY");
        let (supabase_url, supabase_key) = match (supabase_url, supabase_key) {
            (Some(url), Some(key)) => (url, key),
            (url, key) => {
                let missing: Vec<&str> = [("SUPABASE_URL", url.is_none()), ("SUPABASE_KEY", key.is_none())]
                    .into_iter()
                    .filter_map(|(name, absent)| absent.then_some(name))
                    .collect();
                return Err(ConfigError::MissingVariables(missing.join(" and ")));
            }
        };

        Ok(Config {
            environment: var("ENVIRONMENT")
                .or_else(|| var("NODE_ENV"))
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            port: parse_or("PORT", var("PORT"), DEFAULT_PORT)?,
            supabase_url,
            supabase_key,
            events_table: var("SUPABASE_TABLE").unwrap_or_else(|| DEFAULT_EVENTS_TABLE.to_string()),
            startup_probe: parse_or("STARTUP_PROBE", var("STARTUP_PROBE"), StartupProbe::default())?,
            log_format: parse_or("LOG_FORMAT", var("LOG_FORMAT"), LogFormat::default())?,
        })
    }
}

fn parse_or<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match value {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}
