use serde::Serialize;

use crate::features::{FeatureGrant, required_features};
use crate::permissions::{DenialKind, GrantBasis, RouteDecision, resolve_route_access};
use crate::roles::Role;

// ─────────────────────────────────────────────────────────────────────────────
// Access Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of a route access decision.
///
/// This structure provides transparent, debuggable information about why
/// a request was allowed or denied. It is logged by the gate on denial.
#[derive(Debug, Clone, Serialize)]
pub struct AccessExplanation {
    /// The path that was checked.
    pub path: String,

    /// Whether access was granted.
    pub granted: bool,

    /// Human-readable reason for the decision.
    pub reason: String,

    /// Details about the caller's role and license.
    pub principal: PrincipalState,

    /// Route-feature entry covering the path, if any.
    pub route_features: Option<RouteFeatures>,

    /// Why access was granted, when it was.
    pub basis: Option<GrantBasis>,

    /// If denied, this explains what was missing.
    pub denial_reason: Option<DenialReason>,
}

/// Role and license state of the caller.
#[derive(Debug, Clone, Serialize)]
pub struct PrincipalState {
    /// Role as carried in the token.
    pub raw_role: Option<String>,
    /// Role after normalization, when recognized.
    pub role: Option<Role>,
    pub elevated: bool,
    /// Features the role's table entry lists (informational).
    pub role_features: Vec<String>,
    pub granted_features: Vec<String>,
    pub license_recognized: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteFeatures {
    pub prefix: &'static str,
    pub alternatives: Vec<&'static str>,
}

/// Detailed reason why access was denied.
#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

impl AccessExplanation {
    /// Feature to report back to the client for a denial.
    pub fn denied_feature(&self) -> Option<&'static str> {
        self.route_features
            .as_ref()
            .and_then(|rf| rf.alternatives.first().copied())
    }
}

/// Explain why a route access decision was made (or would be made).
///
/// The decision itself is [`resolve_route_access`]; this wraps it with the
/// state needed to answer "why was this request allowed/denied?".
pub fn explain_route_access(
    path: &str,
    raw_role: Option<&str>,
    grant: &FeatureGrant,
) -> AccessExplanation {
    let decision = resolve_route_access(path, raw_role, grant);
    let role = raw_role.and_then(Role::parse);
    let route_features = required_features(path).map(|(prefix, alternatives)| RouteFeatures {
        prefix,
        alternatives: alternatives.to_vec(),
    });

    let principal = PrincipalState {
        raw_role: raw_role.map(str::to_string),
        role,
        elevated: role.is_some_and(|r| r.is_elevated()),
        role_features: role
            .map(|r| r.policy().features.iter().map(|f| f.to_string()).collect())
            .unwrap_or_default(),
        granted_features: grant.granted().into_iter().map(str::to_string).collect(),
        license_recognized: grant.is_recognized(),
    };

    match decision {
        RouteDecision::Granted(basis) => AccessExplanation {
            path: path.to_string(),
            granted: true,
            reason: granted_reason(basis, route_features.as_ref()),
            principal,
            route_features,
            basis: Some(basis),
            denial_reason: None,
        },
        RouteDecision::Denied(kind) => {
            let denial = denial_reason(kind, path, &principal, route_features.as_ref());
            AccessExplanation {
                path: path.to_string(),
                granted: false,
                reason: denial.message.clone(),
                principal,
                route_features,
                basis: None,
                denial_reason: Some(denial),
            }
        }
    }
}

fn granted_reason(basis: GrantBasis, route: Option<&RouteFeatures>) -> String {
    let license = match route {
        Some(rf) => format!("license grants one of {:?}", rf.alternatives),
        None => "route is not license-restricted".to_string(),
    };
    match basis {
        GrantBasis::Dashboard => format!("Dashboard is open to every role; {license}"),
        GrantBasis::ElevatedRole => format!("Elevated role bypasses the route table; {license}"),
        GrantBasis::WildcardRoute => format!("Role allows all routes; {license}"),
        GrantBasis::RoutePrefix(prefix) => format!("Role allows '{prefix}'; {license}"),
    }
}

fn denial_reason(
    kind: DenialKind,
    path: &str,
    principal: &PrincipalState,
    route: Option<&RouteFeatures>,
) -> DenialReason {
    match kind {
        DenialKind::MissingRole => DenialReason {
            kind,
            message: "Token carries no role".to_string(),
            suggestions: vec!["Issue the token with a 'role' claim".to_string()],
        },
        DenialKind::UnknownRole => DenialReason {
            kind,
            message: format!(
                "Role {:?} is not recognized",
                principal.raw_role.as_deref().unwrap_or_default()
            ),
            suggestions: vec![format!(
                "Use one of: {}",
                Role::ALL.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(", ")
            )],
        },
        DenialKind::RouteNotAllowed => DenialReason {
            kind,
            message: format!(
                "Role '{}' may not open '{path}'",
                principal.role.map(|r| r.as_str()).unwrap_or_default()
            ),
            suggestions: vec![
                "Assign a role whose route list covers this path".to_string(),
                "Assign an elevated role (owner, admin, manager, developer, executive)".to_string(),
            ],
        },
        DenialKind::MissingFeature => {
            let wanted = route.map(|rf| rf.alternatives.clone()).unwrap_or_default();
            let message = if !principal.license_recognized {
                "License features claim has an unrecognized shape".to_string()
            } else if principal.granted_features.is_empty() {
                "License grants no features".to_string()
            } else {
                format!(
                    "License grants none of {:?}. Current features: {:?}",
                    wanted, principal.granted_features
                )
            };
            DenialReason {
                kind,
                message,
                suggestions: wanted
                    .iter()
                    .map(|f| format!("Enable the '{f}' feature (or a '{f}.*' tier) on the license"))
                    .collect(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denial_names_first_required_feature() {
        let explanation = explain_route_access("/map/live", Some("sales"), &FeatureGrant::from_names(["leads"]));
        assert!(!explanation.granted);
        assert_eq!(explanation.denied_feature(), Some("mapping"));
        let denial = explanation.denial_reason.unwrap();
        assert_eq!(denial.kind, DenialKind::MissingFeature);
        assert_eq!(denial.suggestions.len(), 2);
    }

    #[test]
    fn route_denial_has_no_feature_for_unmapped_paths() {
        let explanation = explain_route_access("/profile", Some("user"), &FeatureGrant::from_names(["claims"]));
        assert!(!explanation.granted);
        assert_eq!(explanation.denied_feature(), None);
        assert_eq!(explanation.denial_reason.map(|d| d.kind), Some(DenialKind::RouteNotAllowed));
    }

    #[test]
    fn grant_records_basis_and_principal_state() {
        let grant = FeatureGrant::from_flags([("staff", true), ("claims", false)]);
        let explanation = explain_route_access("/staff", Some("Admin"), &grant);
        assert!(explanation.granted);
        assert_eq!(explanation.basis, Some(GrantBasis::ElevatedRole));
        assert_eq!(explanation.principal.role, Some(Role::Admin));
        assert!(explanation.principal.elevated);
        assert_eq!(explanation.principal.granted_features, vec!["staff".to_string()]);
    }

    #[test]
    fn explanation_serializes_for_audit_logs() {
        let explanation = explain_route_access("/claims", None, &FeatureGrant::default());
        let json = serde_json::to_value(&explanation).unwrap();
        assert_eq!(json["granted"], false);
        assert_eq!(json["denial_reason"]["kind"], "missing_role");
        assert_eq!(json["route_features"]["prefix"], "/claims");
    }
}
