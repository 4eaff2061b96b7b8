use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role carried in the token's `role` claim.
///
/// The set is closed: adding a variant forces an entry in [`Role::policy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Manager,
    Developer,
    Executive,
    Supervisor,
    Hr,
    Accountant,
    Sales,
    User,
}

/// Routes and features a role may reach. `"*"` means all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolePolicy {
    pub routes: &'static [&'static str],
    pub features: &'static [&'static str],
}

pub const WILDCARD: &str = "*";

const UNRESTRICTED: RolePolicy = RolePolicy {
    routes: &[WILDCARD],
    features: &[WILDCARD],
};

impl Role {
    pub const ALL: [Role; 10] = [
        Role::Owner,
        Role::Admin,
        Role::Manager,
        Role::Developer,
        Role::Executive,
        Role::Supervisor,
        Role::Hr,
        Role::Accountant,
        Role::Sales,
        Role::User,
    ];

    /// Case-insensitive parse of a raw role claim.
    pub fn parse(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Developer => "developer",
            Role::Executive => "executive",
            Role::Supervisor => "supervisor",
            Role::Hr => "hr",
            Role::Accountant => "accountant",
            Role::Sales => "sales",
            Role::User => "user",
        }
    }

    /// Elevated roles skip the route table; only the license check applies.
    pub fn is_elevated(&self) -> bool {
        matches!(
            self,
            Role::Owner | Role::Admin | Role::Manager | Role::Developer | Role::Executive
        )
    }

    /// Where an authenticated user of this role lands.
    pub fn default_path(&self) -> &'static str {
        "/dashboard"
    }

    pub fn policy(&self) -> RolePolicy {
        match self {
            Role::Owner | Role::Admin | Role::Manager | Role::Developer | Role::Executive => UNRESTRICTED,
            Role::Supervisor => RolePolicy {
                routes: &[
                    "/dashboard",
                    "/tasks",
                    "/leads",
                    "/quotations",
                    "/clients",
                    "/staff",
                    "/claims",
                    "/map",
                    "/my-reports",
                ],
                features: &[
                    "tasks", "leads", "quotations", "clients", "staff", "claims", "mapping",
                    "location", "reports",
                ],
            },
            Role::Hr => RolePolicy {
                routes: &["/dashboard", "/staff", "/claims", "/my-reports", "/settings"],
                features: &["staff", "claims", "reports", "settings"],
            },
            Role::Accountant => RolePolicy {
                routes: &[
                    "/dashboard",
                    "/claims",
                    "/journals",
                    "/suppliers",
                    "/quotations",
                    "/inventory",
                    "/my-reports",
                ],
                features: &[
                    "claims",
                    "journals",
                    "suppliers",
                    "quotations",
                    "inventory",
                    "reports",
                ],
            },
            Role::Sales => RolePolicy {
                routes: &[
                    "/dashboard",
                    "/leads",
                    "/quotations",
                    "/clients",
                    "/tasks",
                    "/map",
                    "/my-reports",
                ],
                features: &[
                    "leads",
                    "quotations",
                    "clients",
                    "tasks",
                    "mapping",
                    "location",
                    "reports",
                ],
            },
            Role::User => RolePolicy {
                routes: &["/dashboard", "/claims", "/tasks", "/my-reports"],
                features: &["claims", "tasks", "reports"],
            },
        }
    }
}

impl RolePolicy {
    pub fn allows_all_routes(&self) -> bool {
        self.routes.contains(&WILDCARD)
    }

    /// First listed route prefix covering `path`.
    pub fn matching_route(&self, path: &str) -> Option<&'static str> {
        self.routes
            .iter()
            .copied()
            .find(|prefix| *prefix != WILDCARD && bizgate_core::has_route_prefix(path, prefix))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsing_is_case_insensitive() {
        assert_eq!(Role::parse("Manager"), Some(Role::Manager));
        assert_eq!(Role::parse("  HR "), Some(Role::Hr));
        assert_eq!(Role::parse("intern"), None);
        assert_eq!("root".parse::<Role>(), Err(UnknownRole("root".to_string())));
    }

    #[test]
    fn every_role_round_trips_through_its_name() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
            assert_eq!(serde_json::to_value(role).unwrap(), serde_json::json!(role.as_str()));
        }
    }

    #[test]
    fn elevated_roles_have_wildcard_policy() {
        for role in Role::ALL {
            assert_eq!(role.is_elevated(), role.policy().allows_all_routes(), "{role}");
        }
    }

    #[test]
    fn every_role_can_reach_the_dashboard_route() {
        for role in Role::ALL.into_iter().filter(|r| !r.is_elevated()) {
            assert_eq!(role.policy().matching_route("/dashboard/overview"), Some("/dashboard"));
        }
    }

    #[test]
    fn user_routes_exclude_settings() {
        let policy = Role::User.policy();
        assert_eq!(policy.matching_route("/claims/new"), Some("/claims"));
        assert_eq!(policy.matching_route("/settings"), None);
    }
}
