use bizgate_auth::{Role, TokenClaims};
use bizgate_core::{LicenseId, OrganisationRef, UserId};

/// Organisation context for an authorized request.
///
/// Present only when the token names an organisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganisationContext {
    organisation_ref: OrganisationRef,
    license_id: Option<LicenseId>,
    license_plan: Option<String>,
}

impl OrganisationContext {
    pub fn from_claims(claims: &TokenClaims) -> Option<Self> {
        Some(Self {
            organisation_ref: claims.organisation_ref.clone()?,
            license_id: claims.license_id.clone(),
            license_plan: claims.license_plan.clone(),
        })
    }

    pub fn organisation_ref(&self) -> &OrganisationRef {
        &self.organisation_ref
    }

    pub fn license_id(&self) -> Option<&LicenseId> {
        self.license_id.as_ref()
    }

    pub fn license_plan(&self) -> Option<&str> {
        self.license_plan.as_deref()
    }
}

/// Principal context for an authorized request (identity, role, granted features).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: Option<UserId>,
    subject: Option<String>,
    role: Option<Role>,
    features: Vec<String>,
}

impl PrincipalContext {
    pub fn from_claims(claims: &TokenClaims) -> Self {
        Self {
            user_id: claims.user_id.clone(),
            subject: claims.subject.clone(),
            role: claims.role.as_deref().and_then(Role::parse),
            features: claims
                .features
                .granted()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use bizgate_auth::FeatureGrant;

    use super::*;

    fn claims() -> TokenClaims {
        TokenClaims {
            subject: Some("jane@example.com".to_string()),
            user_id: Some(UserId::new("u-1").unwrap()),
            role: Some("Supervisor".to_string()),
            organisation_ref: None,
            license_id: None,
            license_plan: Some("growth".to_string()),
            features: FeatureGrant::from_names(["tasks", "claims"]),
            issued_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            expires_at: Utc.timestamp_opt(1_700_003_600, 0).unwrap(),
        }
    }

    #[test]
    fn principal_normalizes_role() {
        let principal = PrincipalContext::from_claims(&claims());
        assert_eq!(principal.role(), Some(Role::Supervisor));
        assert_eq!(principal.user_id().map(UserId::as_str), Some("u-1"));
        assert_eq!(principal.features(), ["claims".to_string(), "tasks".to_string()]);
    }

    #[test]
    fn organisation_requires_reference() {
        let mut claims = claims();
        assert!(OrganisationContext::from_claims(&claims).is_none());

        claims.organisation_ref = Some(OrganisationRef::new("org-9").unwrap());
        let org = OrganisationContext::from_claims(&claims).unwrap();
        assert_eq!(org.organisation_ref().as_str(), "org-9");
        assert_eq!(org.license_plan(), Some("growth"));
        assert!(org.license_id().is_none());
    }
}
