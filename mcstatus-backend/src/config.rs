use std::env::var;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use mcstatus_cache::{CacheSettings, ShapingPolicy};
use thiserror::Error;

use crate::RateLimitConfig;
use crate::validation::{self, ValidationError};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} has invalid value '{value}' (expected {expected})")]
    Unparsable {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Application configuration with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream Minecraft server host
    /// Env: MC_HOST (default: "basic-6.alstore.space")
    pub mc_host: String,

    /// Upstream Minecraft server port
    /// Env: MC_PORT (default: 25710)
    pub mc_port: u16,

    /// Upstream status query timeout
    /// Env: MC_TIMEOUT in milliseconds (default: 5000)
    pub query_timeout: Duration,

    /// How long a status snapshot is served from cache
    /// Env: CACHE_TIME in milliseconds (default: 30000)
    pub cache_ttl: Duration,

    /// HTTP listen port
    /// Env: PORT (default: 3000)
    pub port: u16,

    /// Request timeout in seconds
    /// Env: REQUEST_TIMEOUT_SECS (default: 30)
    pub request_timeout: Duration,

    /// Requests per minute allowed per client IP
    /// Env: RATE_LIMIT_PER_MIN (default: 30)
    pub rate_limit_per_min: u64,

    /// Burst size per client IP
    /// Env: RATE_LIMIT_BURST (default: 30)
    pub rate_limit_burst: u32,

    /// Env: STATUS_INCLUDE_FAVICON (default: true)
    pub include_favicon: bool,

    /// Env: STATUS_INCLUDE_PLAYERS (default: true)
    pub include_player_list: bool,

    /// Forward protocol number and secure chat flag
    /// Env: STATUS_INCLUDE_DEBUG (default: true)
    pub include_debug: bool,
}

impl Config {
    /// Load configuration from environment variables with defaults.
    ///
    /// A variable that is set but cannot be parsed is an error rather than a
    /// silent fallback to the default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv(); //for debugging mostly
        Self::from_lookup(|key| var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let query_timeout_ms: u64 = parse_or(&lookup, "MC_TIMEOUT", 5000)?;
        let cache_ttl_ms: u64 = parse_or(&lookup, "CACHE_TIME", 30_000)?;
        let request_timeout_secs: u64 = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;

        let config = Self {
            mc_host: lookup("MC_HOST").unwrap_or(defaults.mc_host),
            mc_port: parse_or(&lookup, "MC_PORT", defaults.mc_port)?,
            query_timeout: Duration::from_millis(query_timeout_ms),
            cache_ttl: Duration::from_millis(cache_ttl_ms),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            request_timeout: Duration::from_secs(request_timeout_secs),
            rate_limit_per_min: parse_or(&lookup, "RATE_LIMIT_PER_MIN", defaults.rate_limit_per_min)?,
            rate_limit_burst: parse_or(&lookup, "RATE_LIMIT_BURST", defaults.rate_limit_burst)?,
            include_favicon: flag_or(&lookup, "STATUS_INCLUDE_FAVICON", true)?,
            include_player_list: flag_or(&lookup, "STATUS_INCLUDE_PLAYERS", true)?,
            include_debug: flag_or(&lookup, "STATUS_INCLUDE_DEBUG", true)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_host(&self.mc_host)?;
        validation::validate_port(self.mc_port)?;
        validation::validate_query_timeout(self.query_timeout.as_millis() as u64)?;
        validation::validate_rate_limit(self.rate_limit_per_min, self.rate_limit_burst)?;
        validation::validate_request_timeout(
            self.request_timeout.as_millis() as u64,
            self.query_timeout.as_millis() as u64,
        )
    }

    /// Settings for the status cache
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            host: self.mc_host.clone(),
            port: self.mc_port,
            query_timeout: self.query_timeout,
            ttl: self.cache_ttl,
            policy: ShapingPolicy {
                include_favicon: self.include_favicon,
                include_player_list: self.include_player_list,
                include_debug: self.include_debug,
            },
        }
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            per_min: self.rate_limit_per_min,
            burst: self.rate_limit_burst,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mc_host: "basic-6.alstore.space".to_string(),
            mc_port: 25710,
            query_timeout: Duration::from_millis(5000),
            cache_ttl: Duration::from_millis(30_000),
            port: 3000,
            request_timeout: Duration::from_secs(30),
            rate_limit_per_min: 30,
            rate_limit_burst: 30,
            include_favicon: true,
            include_player_list: true,
            include_debug: true,
        }
    }
}

/// Parse a variable if present, or return the default value
fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Unparsable {
            key,
            value,
            expected: std::any::type_name::<T>(),
        }),
        None => Ok(default),
    }
}

/// Parse a boolean switch, accepting true/false, 1/0, yes/no and on/off
fn flag_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Unparsable {
            key,
            value,
            expected: "boolean",
        }),
    }
}
