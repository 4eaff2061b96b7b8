//! Redirect decisions and their HTTP rendering.
//!
//! Decisions are plain values; only [`redirect_response`] touches HTTP types,
//! so the policy can be tested without a server.

use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use url::Url;
use url::form_urlencoded;

/// Query flag naming why the gate redirected.
pub const MIDDLEWARE_REDIRECT_PARAM: &str = "middleware_redirect";
pub const CALLBACK_URL_PARAM: &str = "callbackUrl";
pub const TOKEN_STATUS_PARAM: &str = "token_status";
pub const DENIED_FEATURE_PARAM: &str = "denied_feature";

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
/// Cookies expired whenever a presented token is rejected.
pub const AUTH_COOKIES: [&str; 4] = [ACCESS_TOKEN_COOKIE, "refreshToken", "auth", "session"];

/// Tells the client to wipe local and session storage.
pub const CLEAR_STORAGE_HEADER: &str = "x-clear-client-storage";
pub const REASON_HEADER: &str = "x-gate-reason";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GateReason {
    StaticAsset,
    PublicInfo,
    /// Unauthenticated visitor on a page that allows it.
    Anonymous,
    Authorized,
    /// Redirect skipped because it would lead back here.
    LoopGuard,
    AuthenticatedUser,
    Unauthorized,
    Unauthenticated,
    TokenExpired,
}

impl GateReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateReason::StaticAsset => "static-asset",
            GateReason::PublicInfo => "public-info",
            GateReason::Anonymous => "anonymous",
            GateReason::Authorized => "authorized",
            GateReason::LoopGuard => "loop-guard",
            GateReason::AuthenticatedUser => "authenticated-user",
            GateReason::Unauthorized => "unauthorized",
            GateReason::Unauthenticated => "unauthenticated",
            GateReason::TokenExpired => "token-expired",
        }
    }
}

impl core::fmt::Display for GateReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `token_status` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Expired,
    Invalid,
}

impl TokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStatus::Expired => "expired",
            TokenStatus::Invalid => "invalid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Pass,
    /// Location: path plus encoded query.
    Redirect(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectDecision {
    pub action: Action,
    pub cookie_clearing: bool,
    pub reason: GateReason,
}

impl RedirectDecision {
    pub fn pass(reason: GateReason) -> Self {
        Self {
            action: Action::Pass,
            cookie_clearing: false,
            reason,
        }
    }

    pub fn redirect(location: String, reason: GateReason) -> Self {
        Self {
            action: Action::Redirect(location),
            cookie_clearing: false,
            reason,
        }
    }

    pub fn with_cookie_clearing(mut self) -> Self {
        self.cookie_clearing = true;
        self
    }

    pub fn is_pass(&self) -> bool {
        self.action == Action::Pass
    }

    pub fn location(&self) -> Option<&str> {
        match &self.action {
            Action::Pass => None,
            Action::Redirect(location) => Some(location),
        }
    }
}

/// `path` plus form-encoded `params` (`/` becomes `%2F`).
pub fn build_location(path: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return path.to_string();
    }
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    format!("{path}?{query}")
}

/// Accept `candidate` as a post-login destination only if it stays on `origin`.
///
/// Rooted paths and absolute URLs on the same origin are accepted and reduced
/// to path + query. Protocol-relative URLs, backslashes, control characters,
/// relative paths and foreign origins are refused.
pub fn sanitize_callback(candidate: &str, origin: &Url) -> Option<String> {
    if candidate.is_empty()
        || candidate.starts_with("//")
        || candidate.contains('\\')
        || candidate.chars().any(char::is_control)
    {
        return None;
    }
    if !candidate.starts_with('/') && Url::parse(candidate).is_err() {
        return None;
    }

    let resolved = origin.join(candidate).ok()?;
    if resolved.origin() != origin.origin() {
        return None;
    }

    // Dot segments can normalize "/.//host" into a protocol-relative path.
    let path = resolved.path();
    if path.starts_with("//") {
        return None;
    }

    let mut safe = path.to_string();
    if let Some(query) = resolved.query() {
        safe.push('?');
        safe.push_str(query);
    }
    Some(safe)
}

/// Cookie attributes used when expiring auth cookies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CookiePolicy {
    pub secure: bool,
}

impl CookiePolicy {
    fn expired_cookie(&self, name: &str) -> String {
        let secure = if self.secure { "; Secure" } else { "" };
        format!("{name}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; SameSite=Lax{secure}")
    }
}

/// Render a redirect as `307 Temporary Redirect`.
pub fn redirect_response(
    location: &str,
    cookie_clearing: bool,
    reason: GateReason,
    cookies: CookiePolicy,
) -> Response {
    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(location).unwrap_or(HeaderValue::from_static("/"));
    headers.insert(header::LOCATION, location);
    headers.insert(REASON_HEADER, HeaderValue::from_static(reason.as_str()));

    if cookie_clearing {
        for name in AUTH_COOKIES {
            if let Ok(value) = HeaderValue::from_str(&cookies.expired_cookie(name)) {
                headers.append(header::SET_COOKIE, value);
            }
        }
        headers.insert(CLEAR_STORAGE_HEADER, HeaderValue::from_static("local,session"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }

    (StatusCode::TEMPORARY_REDIRECT, headers).into_response()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn origin() -> Url {
        Url::parse("https://app.example.com").unwrap()
    }

    #[test]
    fn locations_are_form_encoded() {
        assert_eq!(build_location("/dashboard", &[]), "/dashboard");
        assert_eq!(
            build_location("/", &[(CALLBACK_URL_PARAM, "/tasks"), (MIDDLEWARE_REDIRECT_PARAM, "unauthenticated")]),
            "/?callbackUrl=%2Ftasks&middleware_redirect=unauthenticated"
        );
        assert_eq!(
            build_location("/", &[(CALLBACK_URL_PARAM, "/tasks?page=2&q=a b")]),
            "/?callbackUrl=%2Ftasks%3Fpage%3D2%26q%3Da+b"
        );
    }

    #[test]
    fn same_origin_callbacks_are_kept() {
        assert_eq!(sanitize_callback("/tasks/7?tab=notes", &origin()).as_deref(), Some("/tasks/7?tab=notes"));
        assert_eq!(
            sanitize_callback("https://app.example.com/claims", &origin()).as_deref(),
            Some("/claims")
        );
    }

    #[test]
    fn foreign_or_odd_callbacks_are_refused() {
        for candidate in [
            "https://evil.example.net/phish",
            "//evil.example.net/phish",
            "/\\evil.example.net",
            "http://app.example.com/claims",
            "javascript:alert(1)",
            "tasks",
            "/tasks\n",
            "/.//evil.example.net",
            "",
        ] {
            assert_eq!(sanitize_callback(candidate, &origin()), None, "{candidate:?}");
        }
    }

    #[test]
    fn clearing_redirect_expires_auth_cookies() {
        let response = redirect_response(
            "/?middleware_redirect=token-expired",
            true,
            GateReason::TokenExpired,
            CookiePolicy { secure: true },
        );
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        let headers = response.headers();
        assert_eq!(headers[header::LOCATION], "/?middleware_redirect=token-expired");
        assert_eq!(headers[REASON_HEADER], "token-expired");
        assert_eq!(headers[CLEAR_STORAGE_HEADER], "local,session");

        let cookies: Vec<&str> = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(cookies.len(), AUTH_COOKIES.len());
        for name in AUTH_COOKIES {
            assert!(cookies.iter().any(|c| c.starts_with(&format!("{name}=;")) && c.contains("Max-Age=0") && c.ends_with("Secure")));
        }
    }

    #[test]
    fn plain_redirect_sets_no_cookies() {
        let response = redirect_response("/dashboard", false, GateReason::AuthenticatedUser, CookiePolicy::default());
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert!(response.headers().get(CLEAR_STORAGE_HEADER).is_none());
    }

    proptest! {
        #[test]
        fn sanitized_callbacks_are_always_rooted(candidate in "\\PC{0,40}") {
            if let Some(safe) = sanitize_callback(&candidate, &origin()) {
                prop_assert!(safe.starts_with('/'));
                prop_assert!(!safe.starts_with("//"));
            }
        }
    }
}
