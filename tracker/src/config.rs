use std::{env, net::SocketAddr, str::FromStr};

use crate::error::ConfigError;
use crate::models::PositionOptions;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Server settings read from `TRACKER_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub addr: SocketAddr,
    pub position: PositionOptions,
}

impl TrackerConfig {
    /// # Errors
    /// Returns ConfigError if a variable is set but cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = PositionOptions::default();
        let addr = match lookup("TRACKER_ADDR") {
            Some(value) => parse("TRACKER_ADDR", value)?,
            None => DEFAULT_ADDR
                .parse()
                .map_err(|_| invalid("TRACKER_ADDR", DEFAULT_ADDR.to_string()))?,
        };

        Ok(Self {
            addr,
            position: PositionOptions {
                high_accuracy: parse_or("TRACKER_HIGH_ACCURACY", &lookup, defaults.high_accuracy)?,
                max_fix_age_ms: parse_or(
                    "TRACKER_MAX_FIX_AGE_MS",
                    &lookup,
                    defaults.max_fix_age_ms,
                )?,
                timeout_ms: parse_or("TRACKER_TIMEOUT_MS", &lookup, defaults.timeout_ms)?,
            },
        })
    }
}

fn parse_or<T, F>(key: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map_or(Ok(default), |value| parse(key, value))
}

fn parse<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn invalid(key: &'static str, value: String) -> ConfigError {
    ConfigError::InvalidValue { key, value }
}
