//! Strongly-typed identifiers carried in access tokens.
//!
//! The backend issues these as opaque strings; the gate never interprets them,
//! it only forwards them to downstream handlers.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("{0} must not be blank")]
    Blank(&'static str),
}

/// Identifier of the authenticated user (`uid` claim).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

/// Reference to the organisation the user acts within (`organisationRef` claim).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganisationRef(String);

/// Identifier of the license backing the organisation (`licenseId` claim).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseId(String);

macro_rules! impl_string_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Build the identifier, rejecting blank input.
            pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
                let value = value.into();
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(IdError::Blank($name));
                }
                if trimmed.len() == value.len() {
                    Ok(Self(value))
                } else {
                    Ok(Self(trimmed.to_string()))
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $t {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

impl_string_newtype!(UserId, "UserId");
impl_string_newtype!(OrganisationRef, "OrganisationRef");
impl_string_newtype!(LicenseId, "LicenseId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_ids_are_rejected() {
        assert_eq!(UserId::new("   "), Err(IdError::Blank("UserId")));
        assert_eq!(LicenseId::new(""), Err(IdError::Blank("LicenseId")));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let org: OrganisationRef = " org-42 ".parse().unwrap();
        assert_eq!(org.as_str(), "org-42");
        assert_eq!(org.to_string(), "org-42");
    }
}
