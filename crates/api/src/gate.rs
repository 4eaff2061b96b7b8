//! The request gate: classify, authenticate, authorize, decide.
//!
//! Evaluation is synchronous and infallible. Every outcome is a
//! [`RedirectDecision`]; failures to decode or validate a token surface as
//! an unauthenticated session, never as an error.

use std::borrow::Cow;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use url::Url;
use url::form_urlencoded;

use bizgate_auth::permissions::DASHBOARD_PREFIX;
use bizgate_auth::{
    BoundedValidationCache, CachingTokenValidator, NoValidationCache, ReasonCode, Role,
    TokenClaims, TokenValidator, decode, explain_route_access,
};
use bizgate_core::has_route_prefix;

use crate::config::GateConfig;
use crate::paths::{LANDING_PATH, PathClass, classify};
use crate::redirect::{
    CALLBACK_URL_PARAM, DENIED_FEATURE_PARAM, GateReason, MIDDLEWARE_REDIRECT_PARAM,
    RedirectDecision, TOKEN_STATUS_PARAM, TokenStatus, build_location, sanitize_callback,
};

/// Query parameters the gate itself writes; never echoed into a callback.
const GATE_PARAMS: [&str; 4] = [
    CALLBACK_URL_PARAM,
    MIDDLEWARE_REDIRECT_PARAM,
    TOKEN_STATUS_PARAM,
    DENIED_FEATURE_PARAM,
];

/// The parts of an HTTP request the gate looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateRequest<'a> {
    pub path: &'a str,
    /// Raw query string, without the leading `?`.
    pub query: Option<&'a str>,
    /// Value of the `accessToken` cookie.
    pub access_token: Option<&'a str>,
    /// Any of the auth cookies was sent, even without an access token.
    pub has_auth_cookies: bool,
}

impl<'a> GateRequest<'a> {
    pub fn new(path: &'a str) -> Self {
        Self {
            path,
            query: None,
            access_token: None,
            has_auth_cookies: false,
        }
    }

    pub fn with_query(mut self, query: &'a str) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_token(mut self, token: &'a str) -> Self {
        self.access_token = Some(token);
        self.has_auth_cookies = true;
        self
    }

    /// Mark leftover auth cookies (e.g. `refreshToken`) on the request.
    pub fn with_auth_cookies(mut self) -> Self {
        self.has_auth_cookies = true;
        self
    }

    /// First value of `name` in the query string, decoded.
    pub fn query_param(&self, name: &str) -> Option<Cow<'a, str>> {
        let query = self.query?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Current path plus any query params the gate does not own.
    fn current_location(&self) -> String {
        let kept: Vec<(Cow<'_, str>, Cow<'_, str>)> = self
            .query
            .map(|q| {
                form_urlencoded::parse(q.as_bytes())
                    .filter(|(key, _)| !GATE_PARAMS.contains(&&**key))
                    .collect()
            })
            .unwrap_or_default();
        if kept.is_empty() {
            return self.path.to_string();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(kept)
            .finish();
        format!("{}?{query}", self.path)
    }
}

/// Authentication state derived from the access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    /// No token presented.
    Anonymous,
    /// A token was presented and refused.
    Rejected(ReasonCode),
    Authenticated(TokenClaims),
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated(_))
    }
}

/// Outcome of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub class: PathClass,
    pub decision: RedirectDecision,
    /// Claims of the authorized caller; set only when a protected request passes.
    pub claims: Option<TokenClaims>,
}

impl Verdict {
    fn new(class: PathClass, decision: RedirectDecision) -> Self {
        Self {
            class,
            decision,
            claims: None,
        }
    }
}

#[derive(Clone)]
pub struct Gate {
    validator: Arc<dyn TokenValidator>,
    public_origin: Url,
}

impl core::fmt::Debug for Gate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Gate")
            .field("public_origin", &self.public_origin.as_str())
            .finish_non_exhaustive()
    }
}

impl Gate {
    pub fn new(validator: Arc<dyn TokenValidator>, public_origin: Url) -> Self {
        Self {
            validator,
            public_origin,
        }
    }

    /// Gate with the validation cache `config` asks for.
    pub fn from_config(config: &GateConfig) -> Self {
        let validator: Arc<dyn TokenValidator> = if config.cache_enabled() {
            Arc::new(CachingTokenValidator::with_ttl(
                BoundedValidationCache::new(config.cache_max_entries, config.cache_ttl),
                config.cache_ttl,
            ))
        } else {
            Arc::new(CachingTokenValidator::new(NoValidationCache))
        };
        Self::new(validator, config.public_origin.clone())
    }

    pub fn public_origin(&self) -> &Url {
        &self.public_origin
    }

    /// Resolve the session behind `token`.
    pub fn session(&self, token: Option<&str>, now: DateTime<Utc>) -> Session {
        let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
            return Session::Anonymous;
        };

        let validation = self.validator.validate(token, now);
        if !validation.is_valid {
            let reason = validation.reason.unwrap_or(ReasonCode::DecodeError);
            warn!(reason = %reason, "access token rejected");
            return Session::Rejected(reason);
        }

        match decode(token) {
            Ok(claims) => Session::Authenticated(claims),
            Err(err) => {
                warn!(reason = %err.reason(), error = %err, "access token rejected");
                Session::Rejected(err.reason())
            }
        }
    }

    pub fn evaluate(&self, request: &GateRequest<'_>, now: DateTime<Utc>) -> Verdict {
        let class = classify(request.path);
        let verdict = match class {
            PathClass::StaticAsset => {
                Verdict::new(class, RedirectDecision::pass(GateReason::StaticAsset))
            }
            PathClass::PublicInfo => {
                Verdict::new(class, RedirectDecision::pass(GateReason::PublicInfo))
            }
            PathClass::Landing => {
                let session = self.session(request.access_token, now);
                Verdict::new(class, landing(request, &session))
            }
            PathClass::AuthOnly => {
                let session = self.session(request.access_token, now);
                Verdict::new(class, auth_only(&session))
            }
            PathClass::Protected => {
                let session = self.session(request.access_token, now);
                self.protected(request, session)
            }
        };

        debug!(
            path = request.path,
            class = class.as_str(),
            reason = %verdict.decision.reason,
            location = verdict.decision.location().unwrap_or_default(),
            "gate decision"
        );
        verdict
    }

    fn protected(&self, request: &GateRequest<'_>, session: Session) -> Verdict {
        let class = PathClass::Protected;
        let claims = match session {
            Session::Anonymous => {
                let callback = self.callback_for(request);
                let location = build_location(
                    LANDING_PATH,
                    &[
                        (CALLBACK_URL_PARAM, callback.as_str()),
                        (MIDDLEWARE_REDIRECT_PARAM, GateReason::Unauthenticated.as_str()),
                    ],
                );
                let decision = RedirectDecision::redirect(location, GateReason::Unauthenticated);
                let decision = if request.has_auth_cookies {
                    decision.with_cookie_clearing()
                } else {
                    decision
                };
                return Verdict::new(class, decision);
            }
            Session::Rejected(reason) => {
                let (gate_reason, status) = match reason {
                    ReasonCode::TokenExpired => (GateReason::TokenExpired, TokenStatus::Expired),
                    _ => (GateReason::Unauthenticated, TokenStatus::Invalid),
                };
                let callback = self.callback_for(request);
                let location = build_location(
                    LANDING_PATH,
                    &[
                        (CALLBACK_URL_PARAM, callback.as_str()),
                        (MIDDLEWARE_REDIRECT_PARAM, gate_reason.as_str()),
                        (TOKEN_STATUS_PARAM, status.as_str()),
                    ],
                );
                return Verdict::new(
                    class,
                    RedirectDecision::redirect(location, gate_reason).with_cookie_clearing(),
                );
            }
            Session::Authenticated(claims) => claims,
        };

        let explanation = explain_route_access(request.path, claims.role.as_deref(), &claims.features);
        if explanation.granted {
            return Verdict {
                class,
                decision: RedirectDecision::pass(GateReason::Authorized),
                claims: Some(claims),
            };
        }

        info!(
            path = request.path,
            explanation = %serde_json::to_string(&explanation).unwrap_or_default(),
            "access denied"
        );

        let unauthorized = GateReason::Unauthorized.as_str();
        let location = if has_route_prefix(request.path, DASHBOARD_PREFIX) {
            build_location(LANDING_PATH, &[(MIDDLEWARE_REDIRECT_PARAM, unauthorized)])
        } else {
            match explanation.denied_feature() {
                Some(feature) => build_location(
                    DASHBOARD_PREFIX,
                    &[
                        (MIDDLEWARE_REDIRECT_PARAM, unauthorized),
                        (DENIED_FEATURE_PARAM, feature),
                    ],
                ),
                None => build_location(DASHBOARD_PREFIX, &[(MIDDLEWARE_REDIRECT_PARAM, unauthorized)]),
            }
        };
        Verdict::new(
            class,
            RedirectDecision::redirect(location, GateReason::Unauthorized),
        )
    }

    /// `callbackUrl` from the request when safe, else the current location.
    fn callback_for(&self, request: &GateRequest<'_>) -> String {
        request
            .query_param(CALLBACK_URL_PARAM)
            .and_then(|candidate| sanitize_callback(&candidate, &self.public_origin))
            .unwrap_or_else(|| request.current_location())
    }
}

fn landing(request: &GateRequest<'_>, session: &Session) -> RedirectDecision {
    let Session::Authenticated(claims) = session else {
        return RedirectDecision::pass(GateReason::Anonymous);
    };
    if request.query_param(MIDDLEWARE_REDIRECT_PARAM).as_deref()
        == Some(GateReason::Unauthorized.as_str())
    {
        return RedirectDecision::pass(GateReason::LoopGuard);
    }

    let target = claims
        .role
        .as_deref()
        .and_then(Role::parse)
        .map(|role| role.default_path())
        .unwrap_or(DASHBOARD_PREFIX);
    if target == request.path {
        return RedirectDecision::pass(GateReason::LoopGuard);
    }

    let location = if target == DASHBOARD_PREFIX {
        target.to_string()
    } else {
        build_location(
            target,
            &[(MIDDLEWARE_REDIRECT_PARAM, GateReason::AuthenticatedUser.as_str())],
        )
    };
    RedirectDecision::redirect(location, GateReason::AuthenticatedUser)
}

fn auth_only(session: &Session) -> RedirectDecision {
    if !session.is_authenticated() {
        return RedirectDecision::pass(GateReason::Anonymous);
    }
    let location = build_location(
        DASHBOARD_PREFIX,
        &[(MIDDLEWARE_REDIRECT_PARAM, GateReason::AuthenticatedUser.as_str())],
    );
    RedirectDecision::redirect(location, GateReason::AuthenticatedUser)
}
