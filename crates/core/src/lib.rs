//! `bizgate-core`: shared building blocks for the access gate.
//!
//! This crate contains **pure** primitives (no HTTP, no I/O).

pub mod id;
pub mod route;

pub use id::{IdError, LicenseId, OrganisationRef, UserId};
pub use route::{has_route_prefix, is_under_any, longest_matching_prefix};
