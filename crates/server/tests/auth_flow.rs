use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use migration::{Migrator, MigratorTrait};
use serde_json::{json, Value};
use tower::ServiceExt;

use configs::AuthSettings;
use server::routes::{self, auth::ServerState};
use server::startup::build_cors;

const FRONTEND_ORIGIN: &str = "http://localhost:5173";

async fn build_app() -> anyhow::Result<Router> {
    let db = models::db::connect_in_memory().await?;
    Migrator::up(&db, None).await?;
    let settings = AuthSettings {
        jwt_secret: "test-secret".into(),
        argon2_memory_kib: 1024,
        argon2_iterations: 1,
        ..Default::default()
    };
    let state = ServerState::new(db, &settings)?;
    Ok(routes::build_router(state, build_cors(&[FRONTEND_ORIGIN.to_string()])?))
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> axum::http::request::Builder {
    Request::builder().method("GET").uri(uri)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, headers, body)
}

fn ivan() -> Value {
    json!({
        "name": "Ivan",
        "email": "ivan@example.com",
        "nickname": "DragonSlayer",
        "password": "Secret123",
        "password_confirmation": "Secret123"
    })
}

fn set_cookie(headers: &HeaderMap) -> String {
    headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn register_login_and_fetch_current_user() -> anyhow::Result<()> {
    let app = build_app().await?;

    let (status, headers, body) = send(&app, post_json("/api/register", &ivan())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let user_id = body["user"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["user"]["email"], "ivan@example.com");
    assert!(body["user"].get("password_hash").is_none());
    let character = &body["user"]["character"];
    assert_eq!(character["nickname"], "DragonSlayer");
    assert_eq!(character["level"], 1);
    assert_eq!(character["cultivation_realm"], 1);
    assert_eq!((character["current_qi"].as_i64(), character["max_qi"].as_i64()), (Some(0), Some(100)));
    for attr in ["strength", "agility", "vitality", "spirit"] {
        assert_eq!(character[attr], 5, "{attr}");
    }
    let cookie = set_cookie(&headers);
    assert!(cookie.starts_with("auth_token="));
    assert!(cookie.contains("HttpOnly"));

    let login = json!({"email": "ivan@example.com", "password": "Secret123"});
    let (status, _, body) = send(&app, post_json("/api/login", &login)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["id"], user_id.as_str());
    assert_eq!(body["user"]["character"]["nickname"], "DragonSlayer");
    let token = body["token"].as_str().unwrap().to_string();

    let req = get("/api/me").header(header::AUTHORIZATION, format!("Bearer {token}")).body(Body::empty())?;
    let (status, _, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["id"], user_id.as_str());
    assert_eq!(body["data"]["character"]["nickname"], "DragonSlayer");
    Ok(())
}

#[tokio::test]
async fn session_cookie_authenticates_current_user() -> anyhow::Result<()> {
    let app = build_app().await?;
    let (_, headers, body) = send(&app, post_json("/api/register", &ivan())).await;
    let cookie = set_cookie(&headers);
    let pair = cookie.split(';').next().unwrap().to_string();

    let req = get("/api/me").header(header::COOKIE, pair).body(Body::empty())?;
    let (status, _, me) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["id"], body["user"]["id"]);
    Ok(())
}

#[tokio::test]
async fn current_user_requires_a_valid_session() -> anyhow::Result<()> {
    let app = build_app().await?;

    let (status, _, body) = send(&app, get("/api/me").body(Body::empty())?).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthenticated.");

    let req = get("/api/me").header(header::AUTHORIZATION, "Bearer not.a.jwt").body(Body::empty())?;
    let (status, _, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn wrong_password_and_unknown_email_get_the_same_response() -> anyhow::Result<()> {
    let app = build_app().await?;
    send(&app, post_json("/api/register", &ivan())).await;

    let wrong = json!({"email": "ivan@example.com", "password": "wrong-password"});
    let unknown = json!({"email": "ghost@example.com", "password": "Secret123"});
    let (s1, _, b1) = send(&app, post_json("/api/login", &wrong)).await;
    let (s2, _, b2) = send(&app, post_json("/api/login", &unknown)).await;

    assert_eq!(s1, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!((s1, &b1), (s2, &b2));
    assert_eq!(b1["errors"]["email"][0], "These credentials do not match our records.");
    Ok(())
}

#[tokio::test]
async fn duplicate_email_and_nickname_are_field_errors() -> anyhow::Result<()> {
    let app = build_app().await?;
    let (status, _, _) = send(&app, post_json("/api/register", &ivan())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, body) = send(&app, post_json("/api/register", &ivan())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["email"][0], "The email has already been taken.");

    let mut same_nick = ivan();
    same_nick["email"] = json!("petr@example.com");
    let (status, _, body) = send(&app, post_json("/api/register", &same_nick)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["nickname"][0], "The nickname has already been taken.");

    // the failed attempt left no account behind
    let login = json!({"email": "petr@example.com", "password": "Secret123"});
    let (status, _, _) = send(&app, post_json("/api/login", &login)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn invalid_input_is_rejected_before_registration() -> anyhow::Result<()> {
    let app = build_app().await?;
    let bad = json!({
        "name": "",
        "email": "not-an-email",
        "nickname": "DragonSlayer",
        "password": "short",
        "password_confirmation": "different"
    });
    let (status, _, body) = send(&app, post_json("/api/register", &bad)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["name"].is_array());
    assert!(body["errors"]["email"].is_array());
    assert_eq!(body["errors"]["password"].as_array().map(Vec::len), Some(2));
    assert!(body["errors"].get("nickname").is_none());

    // nothing was stored, so the nickname is still free
    let (status, _, _) = send(&app, post_json("/api/register", &ivan())).await;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_a_client_error() -> anyhow::Result<()> {
    let app = build_app().await?;
    let req = Request::builder()
        .method("POST")
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{"))?;
    let (status, _, body) = send(&app, req).await;
    assert!(status.is_client_error());
    assert!(body["message"].is_string());
    Ok(())
}

#[tokio::test]
async fn logout_clears_the_session_cookie() -> anyhow::Result<()> {
    let app = build_app().await?;
    let req = Request::builder().method("POST").uri("/api/logout").body(Body::empty())?;
    let (status, headers, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(set_cookie(&headers).starts_with("auth_token="));
    Ok(())
}

#[tokio::test]
async fn health_and_openapi_are_public() -> anyhow::Result<()> {
    let app = build_app().await?;
    let (status, _, body) = send(&app, get("/health").body(Body::empty())?).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));

    let (status, _, doc) = send(&app, get("/api-docs/openapi.json").body(Body::empty())?).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/register"].is_object());
    Ok(())
}

#[tokio::test]
async fn bearer_scheme_is_case_insensitive() -> anyhow::Result<()> {
    let app = build_app().await?;
    let (_, _, body) = send(&app, post_json("/api/register", &ivan())).await;
    let token = body["token"].as_str().unwrap().to_string();

    let req = get("/api/me").header(header::AUTHORIZATION, format!("bearer {token}")).body(Body::empty())?;
    let (status, _, me) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "{me}");
    assert_eq!(me["data"]["id"], body["user"]["id"]);
    Ok(())
}

#[tokio::test]
async fn sixth_rapid_login_is_throttled() -> anyhow::Result<()> {
    let app = build_app().await?;
    let attempt = json!({"email": "ivan@example.com", "password": "wrong-password"});

    for n in 1..=5 {
        let (status, _, _) = send(&app, post_json("/api/login", &attempt)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "attempt {n}");
    }

    let (status, headers, body) = send(&app, post_json("/api/login", &attempt)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["message"], "Too Many Attempts.");
    let retry_after: u64 = headers[header::RETRY_AFTER].to_str()?.parse()?;
    assert!((1..=60).contains(&retry_after), "{retry_after}");

    // registration draws on the same budget
    let (status, _, _) = send(&app, post_json("/api/register", &ivan())).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // other clients keep their own budget
    let mut req = post_json("/api/login", &attempt);
    req.extensions_mut().insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 2], 4000))));
    let (status, _, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // routes outside the credential group are unaffected
    let (status, _, _) = send(&app, get("/health").body(Body::empty())?).await;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn cors_allows_only_configured_origins() -> anyhow::Result<()> {
    let app = build_app().await?;

    let req = get("/health").header(header::ORIGIN, FRONTEND_ORIGIN).body(Body::empty())?;
    let (_, headers, _) = send(&app, req).await;
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], FRONTEND_ORIGIN);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");

    let req = get("/health").header(header::ORIGIN, "https://evil.example").body(Body::empty())?;
    let (status, headers, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    Ok(())
}

#[test]
fn cors_without_origins_builds_and_bad_origin_fails() {
    assert!(build_cors(&[]).is_ok());
    assert!(build_cors(&["http://bad\norigin".to_string()]).is_err());
}
