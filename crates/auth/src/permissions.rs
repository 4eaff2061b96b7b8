//! Route permission checks: role table combined with the license check.
//!
//! - No IO
//! - No panics
//! - Fail-closed: anything unrecognized denies

use serde::Serialize;

use bizgate_core::has_route_prefix;

use crate::features::{FeatureGrant, has_feature_access};
use crate::roles::Role;

/// Dashboard routes are open to every role, subject to the license check.
pub const DASHBOARD_PREFIX: &str = "/dashboard";

/// Why access was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "basis", content = "route")]
pub enum GrantBasis {
    Dashboard,
    ElevatedRole,
    WildcardRoute,
    RoutePrefix(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    MissingRole,
    UnknownRole,
    RouteNotAllowed,
    MissingFeature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Granted(GrantBasis),
    Denied(DenialKind),
}

impl RouteDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, RouteDecision::Granted(_))
    }
}

/// Decide whether `role` may open `path` under `grant`.
pub fn resolve_route_access(path: &str, role: Option<&str>, grant: &FeatureGrant) -> RouteDecision {
    let Some(raw_role) = role.filter(|r| !r.trim().is_empty()) else {
        return RouteDecision::Denied(DenialKind::MissingRole);
    };

    let licensed = |basis: GrantBasis| {
        if has_feature_access(path, grant) {
            RouteDecision::Granted(basis)
        } else {
            RouteDecision::Denied(DenialKind::MissingFeature)
        }
    };

    if has_route_prefix(path, DASHBOARD_PREFIX) {
        return licensed(GrantBasis::Dashboard);
    }

    let Some(role) = Role::parse(raw_role) else {
        return RouteDecision::Denied(DenialKind::UnknownRole);
    };

    if role.is_elevated() {
        return licensed(GrantBasis::ElevatedRole);
    }

    let policy = role.policy();
    if policy.allows_all_routes() {
        return licensed(GrantBasis::WildcardRoute);
    }

    match policy.matching_route(path) {
        Some(prefix) => licensed(GrantBasis::RoutePrefix(prefix)),
        None => RouteDecision::Denied(DenialKind::RouteNotAllowed),
    }
}

/// Boolean form of [`resolve_route_access`].
pub fn has_route_permission(path: &str, role: Option<&str>, grant: &FeatureGrant) -> bool {
    resolve_route_access(path, role, grant).is_granted()
}
