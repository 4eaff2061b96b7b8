use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::context::{OrganisationContext, PrincipalContext};
use crate::gate::{Gate, GateRequest};
use crate::redirect::{
    ACCESS_TOKEN_COOKIE, AUTH_COOKIES, Action, CookiePolicy, REASON_HEADER, redirect_response,
};

#[derive(Debug, Clone)]
pub struct GateState {
    pub gate: Arc<Gate>,
    pub cookies: CookiePolicy,
}

impl GateState {
    pub fn new(gate: Gate, cookies: CookiePolicy) -> Self {
        Self {
            gate: Arc::new(gate),
            cookies,
        }
    }
}

pub async fn gate_middleware(
    State(state): State<GateState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let verdict = {
        let token = access_token(req.headers());
        let request = GateRequest {
            path: req.uri().path(),
            query: req.uri().query(),
            access_token: token,
            has_auth_cookies: has_auth_cookies(req.headers()),
        };
        state.gate.evaluate(&request, Utc::now())
    };

    match verdict.decision.action {
        Action::Redirect(location) => redirect_response(
            &location,
            verdict.decision.cookie_clearing,
            verdict.decision.reason,
            state.cookies,
        ),
        Action::Pass => {
            if let Some(claims) = verdict.claims {
                if let Some(org) = OrganisationContext::from_claims(&claims) {
                    req.extensions_mut().insert(org);
                }
                req.extensions_mut()
                    .insert(PrincipalContext::from_claims(&claims));
            }
            let mut response = next.run(req).await;
            response.headers_mut().insert(
                REASON_HEADER,
                HeaderValue::from_static(verdict.decision.reason.as_str()),
            );
            response
        }
    }
}

fn cookies(headers: &HeaderMap) -> impl Iterator<Item = (&str, &str)> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|line| line.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .map(|(name, value)| (name.trim(), value.trim().trim_matches('"')))
}

/// Value of the `accessToken` cookie, if any.
fn access_token(headers: &HeaderMap) -> Option<&str> {
    cookies(headers)
        .find(|(name, _)| *name == ACCESS_TOKEN_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Whether any auth cookie carries a value.
fn has_auth_cookies(headers: &HeaderMap) -> bool {
    cookies(headers).any(|(name, value)| !value.is_empty() && AUTH_COOKIES.contains(&name))
}
