use axum::{
    Json, Router,
    extract::Extension,
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::get,
};
use tower::ServiceBuilder;

use crate::config::GateConfig;
use crate::context::{OrganisationContext, PrincipalContext};
use crate::gate::Gate;
use crate::middleware::{GateState, gate_middleware};
use crate::redirect::CookiePolicy;

/// Put `pages` behind the gate and add the health check.
pub fn build_app(config: &GateConfig, pages: Router) -> Router {
    let state = GateState::new(
        Gate::from_config(config),
        CookiePolicy {
            secure: config.secure_cookies,
        },
    );

    tracing::info!(
        public_origin = %config.public_origin,
        cache_enabled = config.cache_enabled(),
        cache_ttl_secs = config.cache_ttl.as_secs(),
        "gate configured"
    );

    Router::new()
        .route("/api/health", get(health))
        .merge(pages)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(state, gate_middleware)),
        )
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// Stand-in for the page application: every path echoes who asked for it.
pub fn placeholder_pages() -> Router {
    Router::new().fallback(page)
}

async fn page(
    uri: Uri,
    principal: Option<Extension<PrincipalContext>>,
    organisation: Option<Extension<OrganisationContext>>,
) -> impl IntoResponse {
    let principal = principal.map(|Extension(p)| {
        serde_json::json!({
            "user_id": p.user_id().map(|id| id.to_string()),
            "subject": p.subject(),
            "role": p.role().map(|r| r.as_str()),
            "features": p.features(),
        })
    });
    let organisation = organisation.map(|Extension(o)| {
        serde_json::json!({
            "organisation_ref": o.organisation_ref().to_string(),
            "license_plan": o.license_plan(),
        })
    });

    Json(serde_json::json!({
        "path": uri.path(),
        "principal": principal,
        "organisation": organisation,
    }))
}
