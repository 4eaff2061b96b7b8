use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use reqwest::header::{LOCATION, SET_COOKIE};
use serde_json::{Value, json};

use bizgate_api::GateConfig;
use bizgate_api::app::{build_app, placeholder_pages};

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, bound to an ephemeral port.
        let config = GateConfig::default();
        let app = build_app(&config, placeholder_pages());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            base_url,
            client,
            handle,
        }
    }

    async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(format!("{}{}", self.base_url, path));
        if let Some(token) = token {
            request = request.header(reqwest::header::COOKIE, format!("accessToken={token}"));
        }
        request.send().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(role: &str, features: Value, lifetime: ChronoDuration) -> String {
    let now = Utc::now();
    let claims = json!({
        "sub": "ops@example.com",
        "uid": "u-100",
        "role": role,
        "organisationRef": "org-7",
        "features": features,
        "iat": (now - ChronoDuration::minutes(1)).timestamp(),
        "exp": (now + lifetime).timestamp(),
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"issuer-secret"),
    )
    .expect("failed to encode jwt")
}

fn location(res: &reqwest::Response) -> &str {
    res.headers()
        .get(LOCATION)
        .expect("missing Location header")
        .to_str()
        .unwrap()
}

#[tokio::test]
async fn anonymous_visitor_is_sent_to_landing_with_callback() {
    let server = TestServer::spawn().await;

    let res = server.get("/tasks", None).await;
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&res),
        "/?callbackUrl=%2Ftasks&middleware_redirect=unauthenticated"
    );

    let res = server.get("/", None).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn foreign_callback_is_not_forwarded() {
    let server = TestServer::spawn().await;

    let res = server
        .get("/tasks?callbackUrl=https%3A%2F%2Fevil.example.net%2Fsteal", None)
        .await;
    assert_eq!(
        location(&res),
        "/?callbackUrl=%2Ftasks&middleware_redirect=unauthenticated"
    );
}

#[tokio::test]
async fn signed_in_user_skips_auth_pages() {
    let server = TestServer::spawn().await;
    let token = mint_jwt("user", json!(["dashboard", "claims"]), ChronoDuration::minutes(10));

    let res = server.get("/sign-in", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&res),
        "/dashboard?middleware_redirect=authenticated-user"
    );

    let res = server.get("/", Some(&token)).await;
    assert_eq!(location(&res), "/dashboard");

    let res = server.get("/dashboard", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn public_info_pages_ignore_tokens() {
    let server = TestServer::spawn().await;

    let res = server.get("/feedback/thank-you", None).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.get("/quotation-review/q-1", Some("garbage")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(SET_COOKIE).is_none());
}

#[tokio::test]
async fn expired_token_is_cleared() {
    let server = TestServer::spawn().await;
    let token = mint_jwt("admin", json!(["claims"]), ChronoDuration::seconds(-30));

    let res = server.get("/claims", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&res),
        "/?callbackUrl=%2Fclaims&middleware_redirect=token-expired&token_status=expired"
    );

    let cleared: Vec<String> = res
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    for name in ["accessToken", "refreshToken", "auth", "session"] {
        assert!(
            cleared.iter().any(|c| c.starts_with(&format!("{name}=;"))),
            "{name} not cleared: {cleared:?}"
        );
    }
    assert_eq!(
        res.headers().get("x-clear-client-storage").unwrap(),
        "local,session"
    );
}

#[tokio::test]
async fn role_and_license_checks_redirect_to_dashboard() {
    let server = TestServer::spawn().await;

    let user = mint_jwt("user", json!({"claims": true}), ChronoDuration::minutes(10));
    let res = server.get("/claims", Some(&user)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["principal"]["role"], "user");
    assert_eq!(body["organisation"]["organisation_ref"], "org-7");

    let res = server.get("/settings", Some(&user)).await;
    assert_eq!(
        location(&res),
        "/dashboard?middleware_redirect=unauthorized&denied_feature=settings"
    );

    let manager = mint_jwt("manager", json!([]), ChronoDuration::minutes(10));
    let res = server.get("/staff", Some(&manager)).await;
    assert_eq!(
        location(&res),
        "/dashboard?middleware_redirect=unauthorized&denied_feature=staff"
    );
}

#[tokio::test]
async fn dashboard_denial_settles_on_landing() {
    let server = TestServer::spawn().await;
    let token = mint_jwt("sales", json!(["leads"]), ChronoDuration::minutes(10));

    let res = server.get("/dashboard", Some(&token)).await;
    assert_eq!(location(&res), "/?middleware_redirect=unauthorized");

    let res = server.get(location(&res).to_string().as_str(), Some(&token)).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn assets_and_health_pass_through() {
    let server = TestServer::spawn().await;

    let res = server.get("/api/health", None).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.get("/images/logo.png", Some("garbage")).await;
    assert_eq!(res.status(), StatusCode::OK);
}
