//! License features and the route-feature map.
//!
//! A token's `features` claim arrives either as a list of names or as a map of
//! name → bool. Both shapes are normalized into [`FeatureGrant`] at decode time
//! so nothing downstream branches on the wire shape.

use std::collections::BTreeMap;

use bizgate_core::longest_matching_prefix;
use serde_json::Value;

/// Route prefix → alternative features, any one of which unlocks the route.
///
/// The first alternative is the one reported back to the client on denial.
pub const ROUTE_FEATURES: &[(&str, &[&str])] = &[
    ("/dashboard", &["dashboard"]),
    ("/claims", &["claims"]),
    ("/tasks", &["tasks"]),
    ("/leads", &["leads"]),
    ("/quotations", &["quotations"]),
    ("/clients", &["clients"]),
    ("/staff", &["staff"]),
    ("/inventory", &["inventory"]),
    ("/journals", &["journals"]),
    ("/suppliers", &["suppliers"]),
    ("/my-reports", &["reports"]),
    ("/settings", &["settings"]),
    ("/map", &["mapping", "location"]),
];

/// Canonical license grant carried by a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureGrant {
    /// Feature path → enabled. Dotted keys (`dashboard.premium`) are sub-tiers.
    Flags(BTreeMap<String, bool>),
    /// The claim had a shape we do not understand; grants nothing.
    Unrecognized,
}

impl Default for FeatureGrant {
    fn default() -> Self {
        Self::Flags(BTreeMap::new())
    }
}

impl FeatureGrant {
    /// Every listed name is granted.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Flags(names.into_iter().map(|n| (n.into(), true)).collect())
    }

    pub fn from_flags<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        Self::Flags(flags.into_iter().map(|(n, on)| (n.into(), on)).collect())
    }

    /// Normalize the raw `features` claim.
    ///
    /// Absent or `null` is an empty grant. A map whose values are not all
    /// booleans, a list containing anything but strings, or a scalar is
    /// [`FeatureGrant::Unrecognized`].
    pub fn from_claim(claim: Option<&Value>) -> Self {
        match claim {
            None | Some(Value::Null) => Self::default(),
            Some(Value::Array(items)) => {
                let mut flags = BTreeMap::new();
                for item in items {
                    match item {
                        Value::String(name) => {
                            flags.insert(name.clone(), true);
                        }
                        _ => return Self::Unrecognized,
                    }
                }
                Self::Flags(flags)
            }
            Some(Value::Object(map)) => {
                let mut flags = BTreeMap::new();
                for (name, value) in map {
                    match value {
                        Value::Bool(enabled) => {
                            flags.insert(name.clone(), *enabled);
                        }
                        _ => return Self::Unrecognized,
                    }
                }
                Self::Flags(flags)
            }
            Some(_) => Self::Unrecognized,
        }
    }

    pub fn is_recognized(&self) -> bool {
        matches!(self, Self::Flags(_))
    }

    /// No feature entries at all (an unrecognized grant is not "empty", it is unusable).
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Flags(flags) => flags.is_empty(),
            Self::Unrecognized => false,
        }
    }

    /// `feature` is granted directly, or through any enabled `feature.<tier>` key.
    pub fn grants(&self, feature: &str) -> bool {
        let Self::Flags(flags) = self else {
            return false;
        };
        if flags.get(feature).copied().unwrap_or(false) {
            return true;
        }
        flags.iter().any(|(key, enabled)| {
            *enabled
                && key
                    .strip_prefix(feature)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    /// Names of all enabled entries, in key order.
    pub fn granted(&self) -> Vec<&str> {
        match self {
            Self::Flags(flags) => flags
                .iter()
                .filter(|(_, enabled)| **enabled)
                .map(|(name, _)| name.as_str())
                .collect(),
            Self::Unrecognized => Vec::new(),
        }
    }
}

/// Route-feature entry covering `path` (longest prefix), if any.
pub fn required_features(path: &str) -> Option<(&'static str, &'static [&'static str])> {
    longest_matching_prefix(path, ROUTE_FEATURES).map(|(prefix, features)| (*prefix, *features))
}

/// Feature reported to the client when `path` is denied.
pub fn first_required_feature(path: &str) -> Option<&'static str> {
    required_features(path).and_then(|(_, features)| features.first().copied())
}

/// Whether `grant` satisfies any of `alternatives`. Fail-closed on empty or
/// unrecognized grants.
pub fn satisfies_any(grant: &FeatureGrant, alternatives: &[&str]) -> bool {
    if !grant.is_recognized() || grant.is_empty() {
        return false;
    }
    alternatives.iter().any(|feature| grant.grants(feature))
}

/// License check for `path`.
///
/// Paths outside the route-feature map are unrestricted, whatever the grant.
pub fn has_feature_access(path: &str, grant: &FeatureGrant) -> bool {
    match required_features(path) {
        Some((_, alternatives)) => satisfies_any(grant, alternatives),
        None => true,
    }
}
