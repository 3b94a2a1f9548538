use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use configs::AuthSettings;
use service::auth::domain::{AuthSession, AuthUser, LoginInput, RegisterInput};
use service::auth::errors::AuthError;
use service::auth::repo::seaorm::SeaOrmAuthRepository;
use service::auth::token::TokenKeys;
use service::auth::{AuthConfig, AuthService};

use crate::errors::ApiError;
use crate::throttle::{Throttle, AUTH_ATTEMPTS_PER_MINUTE};

pub const SESSION_COOKIE: &str = "auth_token";

#[derive(Clone)]
pub struct ServerState {
    pub auth: Arc<AuthService<SeaOrmAuthRepository>>,
    pub tokens: TokenKeys,
    /// Shared by register and login.
    pub throttle: Arc<Throttle>,
}

impl ServerState {
    pub fn new(db: DatabaseConnection, settings: &AuthSettings) -> Result<Self, AuthError> {
        let repo = Arc::new(SeaOrmAuthRepository::new(db));
        let auth = AuthService::new(repo, AuthConfig::from(settings))?;
        Ok(Self {
            auth: Arc::new(auth),
            tokens: TokenKeys::new(&settings.jwt_secret, settings.token_ttl_secs),
            throttle: Arc::new(Throttle::per_minute(AUTH_ATTEMPTS_PER_MINUTE)),
        })
    }
}

/// Authenticated caller, resolved from the session credential by
/// [`require_session`].
#[derive(Debug, Clone, Copy)]
pub struct SessionUser(pub Uuid);

#[derive(Serialize)]
pub struct MeResponse {
    pub data: AuthUser,
}

fn session_cookie(token: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie
}

fn start_session(state: &ServerState, jar: CookieJar, user: AuthUser) -> Result<(CookieJar, AuthSession), ApiError> {
    let token = state.tokens.issue(&user)?;
    let jar = jar.add(session_cookie(token.clone()));
    Ok((jar, AuthSession { user, token }))
}

#[utoipa::path(
    post, path = "/api/register", tag = "auth",
    request_body = crate::openapi::RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = crate::openapi::SessionDoc),
        (status = 422, description = "Invalid input or email/nickname taken", body = crate::openapi::ErrorDoc),
        (status = 429, description = "Too many attempts from this client", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn register(
    State(state): State<ServerState>,
    jar: CookieJar,
    input: Result<Json<RegisterInput>, JsonRejection>,
) -> Result<(StatusCode, CookieJar, Json<AuthSession>), ApiError> {
    let Json(input) = input?;
    input.validate()?;

    let user = state.auth.register(input).await?;
    let (jar, session) = start_session(&state, jar, user)?;
    Ok((StatusCode::CREATED, jar, Json(session)))
}

#[utoipa::path(
    post, path = "/api/login", tag = "auth",
    request_body = crate::openapi::LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = crate::openapi::SessionDoc),
        (status = 422, description = "Invalid credentials", body = crate::openapi::ErrorDoc),
        (status = 429, description = "Too many attempts from this client", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn login(
    State(state): State<ServerState>,
    jar: CookieJar,
    input: Result<Json<LoginInput>, JsonRejection>,
) -> Result<(CookieJar, Json<AuthSession>), ApiError> {
    let Json(input) = input?;
    input.validate()?;

    let user = state.auth.login(input).await?;
    let user = state.auth.with_character(user).await?;
    let (jar, session) = start_session(&state, jar, user)?;
    Ok((jar, Json(session)))
}

/// Tokens are stateless, so logging out only expires the cookie.
#[utoipa::path(post, path = "/api/logout", tag = "auth", responses((status = 204, description = "Session cookie cleared")))]
pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let mut cookie = session_cookie(String::new());
    cookie.make_removal();
    (jar.add(cookie), StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get, path = "/api/me", tag = "auth",
    responses(
        (status = 200, description = "Current user with character", body = crate::openapi::MeDoc),
        (status = 401, description = "No valid session", body = crate::openapi::ErrorDoc)
    ),
    security(("bearer" = []))
)]
pub async fn me(
    State(state): State<ServerState>,
    Extension(SessionUser(user_id)): Extension<SessionUser>,
) -> Result<Json<MeResponse>, ApiError> {
    let user = state.auth.profile(user_id).await?;
    Ok(Json(MeResponse { data: user }))
}

/// Credentials of a `Bearer` authorization header. The scheme name is
/// case-insensitive.
fn bearer_credentials(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Bearer header first, then the session cookie.
fn session_token(req: &Request) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_credentials);
    if let Some(token) = bearer {
        return Some(token.to_string());
    }
    CookieJar::from_headers(req.headers())
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

/// Resolve the session credential into a [`SessionUser`] extension, or
/// answer 401.
pub async fn require_session(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = session_token(&req) else {
        debug!(path = %req.uri().path(), "request without session credential");
        return Err(AuthError::Unauthenticated.into());
    };
    let user_id = state.tokens.verify(&token)?;
    req.extensions_mut().insert(SessionUser(user_id));
    Ok(next.run(req).await)
}
