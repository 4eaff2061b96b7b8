//! `bizgate-auth`: pure token validation and route authorization.
//!
//! This crate is intentionally decoupled from HTTP: callers hand it a raw
//! token, a path and the current time, and get decisions back.

pub mod authorize;
pub mod cache;
pub mod claims;
pub mod features;
pub mod permissions;
pub mod roles;
pub mod validator;

pub use authorize::{AccessExplanation, explain_route_access};
pub use cache::{BoundedValidationCache, CacheEntry, NoValidationCache, ValidationCache};
pub use claims::{DecodeError, TokenClaims, decode};
pub use features::{FeatureGrant, first_required_feature, has_feature_access};
pub use permissions::{RouteDecision, has_route_permission, resolve_route_access};
pub use roles::{Role, RolePolicy};
pub use validator::{CachingTokenValidator, ReasonCode, TokenValidator, Validation};
