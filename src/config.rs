use crate::adapters::tracing_notifier::OVERDUE_SUBJECT;
use crate::application::loan::{DEFAULT_OVERDUE_MESSAGE, OverdueSettings};
use crate::domain::loan::DEFAULT_OVERDUE_THRESHOLD_DAYS;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SCAN_INTERVAL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_MAIL_SENDER: &str = "library@localhost";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Absent means the in-memory stores are used
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub port: u16,
    pub overdue_threshold_days: u32,
    pub overdue_scan_interval: Duration,
    pub overdue_message: String,
    pub mail_default_sender: String,
    pub mail_overdue_subject: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Self {
            database_url: var("DATABASE_URL"),
            db_max_connections: parse_or(
                "DB_MAX_CONNECTIONS",
                var("DB_MAX_CONNECTIONS"),
                DEFAULT_DB_MAX_CONNECTIONS,
            )?,
            port: parse_or("PORT", var("PORT"), DEFAULT_PORT)?,
            overdue_threshold_days: parse_or(
                "OVERDUE_THRESHOLD_DAYS",
                var("OVERDUE_THRESHOLD_DAYS"),
                DEFAULT_OVERDUE_THRESHOLD_DAYS,
            )?,
            overdue_scan_interval: Duration::from_secs(parse_positive(
                "OVERDUE_SCAN_INTERVAL_SECS",
                var("OVERDUE_SCAN_INTERVAL_SECS"),
                DEFAULT_SCAN_INTERVAL_SECS,
            )?),
            overdue_message: var("OVERDUE_MESSAGE")
                .unwrap_or_else(|| DEFAULT_OVERDUE_MESSAGE.to_string()),
            mail_default_sender: var("MAIL_DEFAULT_SENDER")
                .unwrap_or_else(|| DEFAULT_MAIL_SENDER.to_string()),
            mail_overdue_subject: var("MAIL_OVERDUE_SUBJECT")
                .unwrap_or_else(|| OVERDUE_SUBJECT.to_string()),
        })
    }

    pub fn overdue_settings(&self) -> OverdueSettings {
        OverdueSettings {
            threshold_days: self.overdue_threshold_days,
            message: self.overdue_message.clone(),
        }
    }
}

fn parse_or<T: FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

// a zero interval would make tokio::time::interval panic
fn parse_positive(
    key: &'static str,
    raw: Option<String>,
    default: u64,
) -> Result<u64, ConfigError> {
    let original = raw.clone();
    match parse_or(key, raw, default)? {
        0 => Err(ConfigError::Invalid {
            key,
            value: original.unwrap_or_default(),
        }),
        secs => Ok(secs),
    }
}
