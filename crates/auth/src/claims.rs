use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use bizgate_core::{LicenseId, OrganisationRef, UserId};

use crate::features::FeatureGrant;
use crate::validator::ReasonCode;

/// base64url, padding optional (issuers disagree on it).
const JWT_SEGMENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Claims of an access token, decoded from its payload segment.
///
/// Signature verification is the backend's concern; the gate only decides
/// whether the payload is well formed and inside its validity window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// `sub`
    pub subject: Option<String>,
    /// `uid`
    pub user_id: Option<UserId>,
    /// Raw `role`; normalized by the permission layer.
    pub role: Option<String>,
    pub organisation_ref: Option<OrganisationRef>,
    pub license_id: Option<LicenseId>,
    pub license_plan: Option<String>,
    pub features: FeatureGrant,
    /// `iat`
    pub issued_at: DateTime<Utc>,
    /// `exp`
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("token must have three dot-separated segments")]
    Segments,

    #[error("payload is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("missing claim '{0}'")]
    MissingClaim(&'static str),

    #[error("claim '{0}' is not a valid timestamp")]
    InvalidTimestamp(&'static str),
}

impl DecodeError {
    /// Validation reason this failure is reported as.
    pub fn reason(&self) -> ReasonCode {
        match self {
            Self::Segments | Self::Base64(_) | Self::Json(_) => ReasonCode::DecodeError,
            Self::NotAnObject | Self::MissingClaim(_) | Self::InvalidTimestamp(_) => {
                ReasonCode::MalformedToken
            }
        }
    }
}

/// Decode the payload of a compact JWT without verifying its signature.
pub fn decode(token: &str) -> Result<TokenClaims, DecodeError> {
    let mut segments = token.trim().split('.');
    let (Some(header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(DecodeError::Segments);
    };
    if header.is_empty() || payload.is_empty() {
        return Err(DecodeError::Segments);
    }

    let bytes = JWT_SEGMENT.decode(payload)?;
    match serde_json::from_slice::<Value>(&bytes)? {
        Value::Object(map) => TokenClaims::from_payload(&map),
        _ => Err(DecodeError::NotAnObject),
    }
}

impl TokenClaims {
    fn from_payload(map: &Map<String, Value>) -> Result<Self, DecodeError> {
        let issued_at = timestamp_claim(map, "iat")?;
        let expires_at = timestamp_claim(map, "exp")?;

        Ok(Self {
            subject: text_claim(map, "sub"),
            user_id: text_claim(map, "uid").and_then(|v| UserId::new(v).ok()),
            role: text_claim(map, "role"),
            organisation_ref: text_claim(map, "organisationRef")
                .and_then(|v| OrganisationRef::new(v).ok()),
            license_id: text_claim(map, "licenseId").and_then(|v| LicenseId::new(v).ok()),
            license_plan: text_claim(map, "licensePlan"),
            features: FeatureGrant::from_claim(map.get("features")),
            issued_at,
            expires_at,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Issued further in the future than `skew` allows.
    pub fn is_from_future(&self, now: DateTime<Utc>, skew: TimeDelta) -> bool {
        self.issued_at > now + skew
    }
}

fn timestamp_claim(map: &Map<String, Value>, name: &'static str) -> Result<DateTime<Utc>, DecodeError> {
    let value = match map.get(name) {
        None | Some(Value::Null) => return Err(DecodeError::MissingClaim(name)),
        Some(value) => value,
    };
    let secs = value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64))
        .ok_or(DecodeError::InvalidTimestamp(name))?;
    DateTime::from_timestamp(secs, 0).ok_or(DecodeError::InvalidTimestamp(name))
}

/// Strings (trimmed, non-blank) and numbers are accepted; anything else is absent.
fn text_claim(map: &Map<String, Value>, name: &str) -> Option<String> {
    match map.get(name)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
