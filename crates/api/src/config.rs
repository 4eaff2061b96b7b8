//! Gate configuration, read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use bizgate_auth::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL, MAX_TTL};

pub const BIND_ADDR_VAR: &str = "BIZGATE_BIND_ADDR";
pub const PUBLIC_ORIGIN_VAR: &str = "BIZGATE_PUBLIC_ORIGIN";
pub const CACHE_TTL_VAR: &str = "BIZGATE_CACHE_TTL_SECS";
pub const CACHE_MAX_ENTRIES_VAR: &str = "BIZGATE_CACHE_MAX_ENTRIES";
pub const SECURE_COOKIES_VAR: &str = "BIZGATE_SECURE_COOKIES";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: '{value}' is not a socket address")]
    BindAddr { var: &'static str, value: String },

    #[error("{var}: '{value}' is not an http(s) origin")]
    Origin { var: &'static str, value: String },

    #[error("{var}: '{value}' is not a non-negative integer")]
    Integer { var: &'static str, value: String },

    #[error("{var}: '{value}' exceeds the maximum of {max}")]
    OutOfRange {
        var: &'static str,
        value: String,
        max: u64,
    },

    #[error("{var}: '{value}' is not a boolean")]
    Boolean { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    pub bind_addr: SocketAddr,
    /// Origin callback URLs must stay on.
    pub public_origin: Url,
    pub cache_ttl: Duration,
    /// `0` disables the validation cache.
    pub cache_max_entries: u64,
    /// Mark cookie-clearing headers `Secure`.
    pub secure_cookies: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            public_origin: default_origin(),
            cache_ttl: DEFAULT_TTL,
            cache_max_entries: DEFAULT_MAX_ENTRIES,
            secure_cookies: false,
        }
    }
}

fn default_origin() -> Url {
    Url::parse("http://localhost:8080").unwrap_or_else(|_| unreachable!("static origin parses"))
}

impl GateConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(value) = var(BIND_ADDR_VAR) {
            config.bind_addr = value.trim().parse().map_err(|_| ConfigError::BindAddr {
                var: BIND_ADDR_VAR,
                value,
            })?;
        }
        if let Some(value) = var(PUBLIC_ORIGIN_VAR) {
            config.public_origin = parse_origin(&value)?;
        }
        if let Some(value) = var(CACHE_TTL_VAR) {
            let secs = parse_u64(CACHE_TTL_VAR, value.clone())?;
            if secs > MAX_TTL.as_secs() {
                return Err(ConfigError::OutOfRange {
                    var: CACHE_TTL_VAR,
                    value,
                    max: MAX_TTL.as_secs(),
                });
            }
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(value) = var(CACHE_MAX_ENTRIES_VAR) {
            config.cache_max_entries = parse_u64(CACHE_MAX_ENTRIES_VAR, value)?;
        }
        if let Some(value) = var(SECURE_COOKIES_VAR) {
            config.secure_cookies = parse_bool(SECURE_COOKIES_VAR, value)?;
        }

        if !config.secure_cookies && config.public_origin.scheme() == "https" {
            tracing::warn!("public origin is https but {SECURE_COOKIES_VAR} is off");
        }
        Ok(config)
    }

    /// Whether validation outcomes are memoized at all.
    pub fn cache_enabled(&self) -> bool {
        self.cache_max_entries > 0 && !self.cache_ttl.is_zero()
    }
}

/// Parse and reduce to scheme://host[:port]/.
fn parse_origin(value: &str) -> Result<Url, ConfigError> {
    let err = || ConfigError::Origin {
        var: PUBLIC_ORIGIN_VAR,
        value: value.to_string(),
    };
    let url = Url::parse(value.trim()).map_err(|_| err())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(err());
    }
    Url::parse(&url.origin().ascii_serialization()).map_err(|_| err())
}

fn parse_u64(var: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Integer { var, value })
}

fn parse_bool(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Boolean { var, value }),
    }
}
