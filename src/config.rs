// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honoured for local runs.

use crate::cache::CacheTtls;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// ISO 4217 code passed to the payment gateway
    pub currency: String,
    /// Seed data for the in-memory store
    pub fleet_fixture_path: String,
    pub cache_ttls: CacheTtls,
    /// How often expired cache entries are swept
    pub cache_sweep_interval: Duration,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            port: 8080,
            currency: "COP".to_string(),
            fleet_fixture_path: "data/fleet.json".to_string(),
            cache_ttls: CacheTtls::default(),
            cache_sweep_interval: Duration::from_secs(30),
        }
    }
}

/// Read `name`, falling back to `default` when unset.
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::Invalid {
            name,
            value: "<non-unicode>".to_string(),
        }),
    }
}

fn parse_secs(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    let secs: u64 = parse_var(name, default)?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            name,
            value: "0".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Self::default();
        let currency = env::var("CURRENCY")
            .map(|v| v.trim().to_uppercase())
            .unwrap_or(defaults.currency);
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::Invalid {
                name: "CURRENCY",
                value: currency,
            });
        }

        Ok(Self {
            port: parse_var("PORT", defaults.port)?,
            currency,
            fleet_fixture_path: env::var("FLEET_FIXTURE_PATH")
                .unwrap_or(defaults.fleet_fixture_path),
            cache_ttls: CacheTtls {
                entity: parse_secs("CACHE_ENTITY_TTL_SECS", 300)?,
                list: parse_secs("CACHE_LIST_TTL_SECS", 60)?,
                availability: parse_secs("CACHE_AVAILABILITY_TTL_SECS", 15)?,
            },
            cache_sweep_interval: parse_secs("CACHE_SWEEP_INTERVAL_SECS", 30)?,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
