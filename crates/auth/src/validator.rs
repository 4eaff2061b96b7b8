//! Token validation with memoized outcomes.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::cache::{CacheEntry, DEFAULT_TTL, ValidationCache};
use crate::claims::decode;

/// How far in the future `iat` may lie before a token is rejected, in seconds.
pub const CLOCK_SKEW_TOLERANCE_SECS: i64 = 300;

/// Why a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasonCode {
    NoToken,
    DecodeError,
    MalformedToken,
    TokenExpired,
    TokenFuture,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoToken => "no-token",
            Self::DecodeError => "decode-error",
            Self::MalformedToken => "malformed-token",
            Self::TokenExpired => "token-expired",
            Self::TokenFuture => "token-future",
        }
    }
}

impl core::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of validating one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,
}

impl Validation {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: ReasonCode) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason),
        }
    }
}

/// Validates bearer tokens at a given instant. Never fails; rejection is an outcome.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Validation;
}

/// Uncached check. Also returns the token's expiry when it got that far.
pub fn check_token(token: &str, now: DateTime<Utc>) -> (Validation, Option<DateTime<Utc>>) {
    if token.trim().is_empty() {
        return (Validation::invalid(ReasonCode::NoToken), None);
    }

    let claims = match decode(token) {
        Ok(claims) => claims,
        Err(err) => {
            debug!(error = %err, "token could not be decoded");
            return (Validation::invalid(err.reason()), None);
        }
    };

    let expires_at = Some(claims.expires_at);
    if claims.is_expired(now) {
        return (Validation::invalid(ReasonCode::TokenExpired), expires_at);
    }
    if claims.is_from_future(now, TimeDelta::seconds(CLOCK_SKEW_TOLERANCE_SECS)) {
        return (Validation::invalid(ReasonCode::TokenFuture), expires_at);
    }
    (Validation::valid(), expires_at)
}

/// [`TokenValidator`] memoizing every outcome in a [`ValidationCache`].
#[derive(Debug, Clone)]
pub struct CachingTokenValidator<C> {
    cache: C,
    ttl: TimeDelta,
}

impl<C: ValidationCache> CachingTokenValidator<C> {
    pub fn new(cache: C) -> Self {
        Self::with_ttl(cache, DEFAULT_TTL)
    }

    pub fn with_ttl(cache: C, ttl: std::time::Duration) -> Self {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        Self { cache, ttl }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }
}

impl<C: ValidationCache> TokenValidator for CachingTokenValidator<C> {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Validation {
        if token.trim().is_empty() {
            return Validation::invalid(ReasonCode::NoToken);
        }

        if let Some(entry) = self.cache.get(token) {
            if entry.is_fresh(now, self.ttl) {
                trace!("validation cache hit");
                return entry.validation();
            }
            self.cache.remove(token);
        }

        let (validation, expires_at) = check_token(token, now);
        if validation.reason == Some(ReasonCode::TokenExpired) {
            self.cache.remove(token);
        }
        self.cache
            .put(token, CacheEntry::new(validation, now, expires_at));
        validation
    }
}
