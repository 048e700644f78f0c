//! End-to-end tests driving the built router against a mock provider.
//!
//! Memory database, memory cache, wiremock for the provider's token and
//! profile endpoints.

use axum::body::Body;
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, header as header_matcher, method, path},
};

use crate::{
    AppState,
    auth::{SessionStore as _, SessionUser},
    build_router,
    config::GatewayConfig,
};

async fn test_state(server: &MockServer, extra: &str) -> AppState {
    let toml = format!(
        r#"
        [server]
        public_base_url = "http://app.example.com"

        [database]
        type = "memory"

        [cache]
        type = "memory"

        [auth.oauth2]
        authorize_url = "{uri}/authorize"
        token_url = "{uri}/oauth/token"
        profile_url = "{uri}/userinfo"
        client_id = "portcullis"
        client_secret = "shh"

        [auth.session]
        secure = false

        [[auth.session_paths]]
        pattern = "^/public/.*"
        whitelist = true

        [[auth.session_paths]]
        pattern = "^/secure/.*"
        fail_fast = true

        [[auth.session_paths]]
        pattern = "^/.*"

        [[auth.bearer_paths]]
        pattern = "^/api/public/.*"
        whitelist = true

        [[auth.bearer_paths]]
        pattern = "^/api/.*"

        {extra}
        "#,
        uri = server.uri(),
        extra = extra,
    );
    let config = GatewayConfig::from_toml_str(&toml).expect("test config is valid");
    AppState::new(config).await.expect("state builds")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get_with_headers(uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).unwrap()
}

fn location(response: &http::Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect carries a Location header")
        .to_str()
        .unwrap()
        .to_string()
}

fn session_cookie(response: &http::Response<Body>) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("response sets the session cookie")
        .to_str()
        .unwrap();
    set_cookie
        .split(';')
        .next()
        .expect("cookie has a name=value part")
        .to_string()
}

fn state_key_from(authorize_url: &str) -> String {
    let url = url::Url::parse(authorize_url).unwrap();
    url.query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .expect("authorize URL carries a state key")
}

async fn body_json(response: http::Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn token_endpoint() -> wiremock::MockBuilder {
    Mock::given(method("POST")).and(path("/oauth/token"))
}

fn profile_endpoint() -> wiremock::MockBuilder {
    Mock::given(method("GET")).and(path("/userinfo"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Session flow
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn whitelisted_path_passes_without_a_session() {
    let server = MockServer::start().await;
    let app = build_router(test_state(&server, "").await);

    let response = app.oneshot(get("/public/landing")).await.unwrap();

    // Passed through to the (404) fallback: no redirect, no rejection.
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn fail_fast_path_rejects_with_401_and_no_redirect() {
    let server = MockServer::start().await;
    let app = build_router(test_state(&server, "").await);

    let response = app.oneshot(get("/secure/data")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::LOCATION).is_none());
}

#[tokio::test]
async fn unmatched_path_is_a_loud_configuration_error() {
    let server = MockServer::start().await;
    // A policy that only covers /app leaves everything else unmatched.
    let toml = format!(
        r#"
        [database]
        type = "memory"

        [auth.oauth2]
        authorize_url = "{uri}/authorize"
        token_url = "{uri}/oauth/token"
        profile_url = "{uri}/userinfo"
        client_id = "portcullis"
        client_secret = "shh"

        [[auth.session_paths]]
        pattern = "^/app/.*"
        "#,
        uri = server.uri(),
    );
    let state = AppState::new(GatewayConfig::from_toml_str(&toml).unwrap())
        .await
        .unwrap();
    let app = build_router(state);

    let response = app.oneshot(get("/elsewhere")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn unauthenticated_request_redirects_to_the_provider() {
    let server = MockServer::start().await;
    let app = build_router(test_state(&server, "").await);

    let response = app.oneshot(get("/dashboard")).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    let authorize_url = location(&response);
    assert!(authorize_url.starts_with(&format!("{}/authorize", server.uri())));
    assert!(authorize_url.contains("response_type=code"));
    assert!(authorize_url.contains("client_id=portcullis"));
    assert!(authorize_url.contains("redirect_uri=http%3A%2F%2Fapp.example.com%2Foauth2%2Fcallback"));
    assert!(authorize_url.contains("state="));

    // The redirect also starts a session to hold the pending state.
    let cookie = session_cookie(&response);
    assert!(cookie.starts_with("portcullis_session="));
}

#[tokio::test]
async fn ui_locales_is_passed_through_to_the_provider() {
    let server = MockServer::start().await;
    let app = build_router(test_state(&server, "").await);

    let response = app
        .oneshot(get("/dashboard?ui_locales=de-AT"))
        .await
        .unwrap();

    assert!(location(&response).contains("ui_locales=de-AT"));
}

#[tokio::test]
async fn full_login_flow_writes_the_session_and_redirects_back() {
    let server = MockServer::start().await;
    token_endpoint()
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "T1",
            "refresh_token": "R1",
            "expires_in": 3600,
            "token_type": "Bearer",
        })))
        .expect(1)
        .mount(&server)
        .await;
    profile_endpoint()
        .and(header_matcher("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sub": "p1",
            "email": "u@x.com",
            "name": "Test User",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state = test_state(&server, "").await;
    let app = build_router(state.clone());

    // 1. The gate redirects and stores the pending state.
    let response = app
        .clone()
        .oneshot(get("/dashboard"))
        .await
        .unwrap();
    let state_key = state_key_from(&location(&response));
    let cookie = session_cookie(&response);

    // 2. The provider calls back with a code bound to that state.
    let response = app
        .clone()
        .oneshot(get_with_headers(
            &format!("/oauth2/callback?code=abc&state={}", state_key),
            &[("cookie", cookie.as_str())],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "http://app.example.com/dashboard");

    // 3. The session now carries the identity record with the fresh tokens.
    let session_id = cookie
        .strip_prefix("portcullis_session=")
        .unwrap()
        .parse()
        .unwrap();
    let session = state
        .sessions
        .get_session(session_id)
        .await
        .unwrap()
        .expect("session persisted");
    let user = session.user.expect("identity record written");
    assert_eq!(user.access_token.as_deref(), Some("T1"));
    assert_eq!(user.refresh_token.as_deref(), Some("R1"));
    let expires_in = (user.expires_at.unwrap() - chrono::Utc::now()).num_seconds();
    assert!((3500..=3600).contains(&expires_in));

    // 4. Subsequent requests are authenticated.
    let response = app
        .oneshot(get_with_headers("/whoami", &[("cookie", cookie.as_str())]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user_id"].as_str(), Some(user.user_id.to_string().as_str()));
}

#[tokio::test]
async fn unknown_state_fails_before_any_provider_call() {
    let server = MockServer::start().await;
    token_endpoint()
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "T1"})),
        )
        .expect(0)
        .mount(&server)
        .await;

    let state = test_state(&server, "").await;
    let app = build_router(state);

    let response = app
        .oneshot(get("/oauth2/callback?code=abc&state=UNKNOWN"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn replayed_callback_is_rejected_as_stale() {
    let server = MockServer::start().await;
    token_endpoint()
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "T1",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;
    profile_endpoint()
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"sub": "p1", "email": "u@x.com"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let state = test_state(&server, "").await;
    let app = build_router(state);

    let response = app.clone().oneshot(get("/dashboard")).await.unwrap();
    let state_key = state_key_from(&location(&response));
    let cookie = session_cookie(&response);
    let callback_uri = format!("/oauth2/callback?code=abc&state={}", state_key);

    let response = app
        .clone()
        .oneshot(get_with_headers(&callback_uri, &[("cookie", cookie.as_str())]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    // Second delivery of the same callback: the state was consumed.
    let response = app
        .oneshot(get_with_headers(&callback_uri, &[("cookie", cookie.as_str())]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn provider_error_on_callback_is_a_400() {
    let server = MockServer::start().await;
    let app = build_router(test_state(&server, "").await);

    let response = app
        .oneshot(get("/oauth2/callback?error=access_denied&state=S"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_access_token_in_exchange_is_a_400() {
    let server = MockServer::start().await;
    token_endpoint()
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"error": "invalid_grant"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let state = test_state(&server, "").await;
    let app = build_router(state);

    let response = app.clone().oneshot(get("/dashboard")).await.unwrap();
    let state_key = state_key_from(&location(&response));
    let cookie = session_cookie(&response);

    let response = app
        .oneshot(get_with_headers(
            &format!("/oauth2/callback?code=bad&state={}", state_key),
            &[("cookie", cookie.as_str())],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cache_backed_state_survives_a_cookie_less_callback() {
    let server = MockServer::start().await;
    token_endpoint()
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "T1",
            "expires_in": 3600,
        })))
        .mount(&server)
        .await;
    profile_endpoint()
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"sub": "p1", "email": "u@x.com"})),
        )
        .mount(&server)
        .await;

    let state = test_state(&server, "[auth.state_store]\nbackend = \"cache\"\n").await;
    let app = build_router(state);

    let response = app.clone().oneshot(get("/dashboard")).await.unwrap();
    let state_key = state_key_from(&location(&response));

    // No cookie on the callback: the pending state lives in the cache.
    let response = app
        .oneshot(get(&format!("/oauth2/callback?code=abc&state={}", state_key)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "http://app.example.com/dashboard");
}

#[tokio::test]
async fn access_token_refreshes_on_demand_and_overwrites_the_session() {
    let server = MockServer::start().await;
    token_endpoint()
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=R1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "T2",
            "expires_in": 600,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state = test_state(&server, "").await;

    // Seed a session whose token is gone but refreshable.
    let user_id = uuid::Uuid::new_v4();
    let mut session = crate::auth::Session::new(3600);
    session.user = Some(SessionUser {
        user_id,
        access_token: None,
        refresh_token: Some("R1".into()),
        expires_at: None,
    });
    let identity = crate::auth::RequestIdentity::for_session(
        &session,
        state.sessions.clone(),
        state.provider.clone(),
    );
    let session_id = session.id;
    state.sessions.create_session(session).await.unwrap();

    assert_eq!(identity.access_token().await.unwrap().as_deref(), Some("T2"));

    // The record was overwritten whole, not merged.
    let stored = state
        .sessions
        .get_session(session_id)
        .await
        .unwrap()
        .unwrap();
    let user = stored.user.unwrap();
    assert_eq!(user.user_id, user_id);
    assert_eq!(user.access_token.as_deref(), Some("T2"));
    let expires_in = (user.expires_at.unwrap() - chrono::Utc::now()).num_seconds();
    assert!((500..=600).contains(&expires_in));
}

#[tokio::test]
async fn refresh_failures_propagate_to_the_caller() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let state = test_state(&server, "").await;

    let mut session = crate::auth::Session::new(3600);
    session.user = Some(SessionUser {
        user_id: uuid::Uuid::new_v4(),
        access_token: None,
        refresh_token: Some("R1".into()),
        expires_at: None,
    });
    let identity = crate::auth::RequestIdentity::for_session(
        &session,
        state.sessions.clone(),
        state.provider.clone(),
    );
    state.sessions.create_session(session).await.unwrap();

    assert!(identity.access_token().await.is_err());
}

// ─────────────────────────────────────────────────────────────────────────────
// Bearer flow
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn bearer_without_token_is_rejected_before_any_provider_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = build_router(test_state(&server, "").await);

    let response = app.clone().oneshot(get("/api/whoami")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // An empty token after the Bearer prefix is the same as no token.
    let response = app
        .oneshot(get_with_headers("/api/whoami", &[("authorization", "Bearer")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bearer_token_resolves_the_user_on_every_request() {
    let server = MockServer::start().await;
    profile_endpoint()
        .and(header_matcher("authorization", "Bearer TOKEN1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"sub": "p1", "email": "u@x.com"})),
        )
        .expect(2)
        .mount(&server)
        .await;

    let app = build_router(test_state(&server, "").await);

    let response = app
        .clone()
        .oneshot(get_with_headers(
            "/api/whoami",
            &[("authorization", "Bearer TOKEN1")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let first = body_json(response).await;
    let user_id = first["user_id"].as_str().unwrap().to_string();

    // No caching of the validation result: the second request hits the
    // provider again and lands on the same local user.
    let response = app
        .oneshot(get_with_headers(
            "/api/whoami",
            &[("authorization", "Bearer TOKEN1")],
        ))
        .await
        .unwrap();
    let second = body_json(response).await;
    assert_eq!(second["user_id"].as_str(), Some(user_id.as_str()));
}

#[tokio::test]
async fn bearer_whitelisted_path_passes_without_a_token() {
    let server = MockServer::start().await;
    let app = build_router(test_state(&server, "").await);

    // /api/public/* is whitelisted but unrouted: passing the gate means 404.
    let response = app.oneshot(get("/api/public/ping")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bearer_profile_failure_routes_to_the_auth_error_handler() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let app = build_router(test_state(&server, "").await);

    let response = app
        .oneshot(get_with_headers(
            "/api/whoami",
            &[("authorization", "Bearer TOKEN1")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
