//! Request path classification.

use serde::Serialize;

use bizgate_core::is_under_any;

pub const LANDING_PATH: &str = "/";

/// Framework internals, API routes and well-known static files.
pub const STATIC_PREFIXES: &[&str] = &[
    "/_next",
    "/api",
    "/static",
    "/images",
    "/fonts",
    "/favicon.ico",
    "/robots.txt",
    "/sitemap.xml",
    "/manifest.json",
];

pub const STATIC_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "css", "js", "map", "woff", "woff2", "ttf",
    "txt", "xml", "json",
];

/// Sign-in and account-recovery pages; pointless once authenticated.
pub const AUTH_ONLY_PREFIXES: &[&str] = &[
    "/sign-in",
    "/sign-up",
    "/forgot-password",
    "/reset-password",
    "/otp",
    "/verify-email",
];

/// Pages reached by external parties through emailed links.
pub const PUBLIC_INFO_PREFIXES: &[&str] = &["/feedback", "/quotation-review"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathClass {
    StaticAsset,
    Landing,
    AuthOnly,
    PublicInfo,
    Protected,
}

impl PathClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathClass::StaticAsset => "static-asset",
            PathClass::Landing => "landing",
            PathClass::AuthOnly => "auth-only",
            PathClass::PublicInfo => "public-info",
            PathClass::Protected => "protected",
        }
    }
}

/// Classify `path`; the first matching class wins.
pub fn classify(path: &str) -> PathClass {
    if is_static_asset(path) {
        PathClass::StaticAsset
    } else if path == LANDING_PATH || path.is_empty() {
        PathClass::Landing
    } else if is_under_any(path, AUTH_ONLY_PREFIXES) {
        PathClass::AuthOnly
    } else if is_under_any(path, PUBLIC_INFO_PREFIXES) {
        PathClass::PublicInfo
    } else {
        PathClass::Protected
    }
}

fn is_static_asset(path: &str) -> bool {
    if is_under_any(path, STATIC_PREFIXES) {
        return true;
    }
    let last = path.rsplit('/').next().unwrap_or_default();
    match last.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => STATIC_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext)),
        _ => false,
    }
}
