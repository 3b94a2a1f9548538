use std::collections::BTreeMap;

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "Ivan", max_length = 128)]
    pub name: String,
    #[schema(example = "ivan@example.com", max_length = 255)]
    pub email: String,
    #[schema(example = "DragonSlayer", max_length = 32)]
    pub nickname: String,
    #[schema(example = "Secret123", min_length = 8)]
    pub password: String,
    #[schema(example = "Secret123")]
    pub password_confirmation: String,
}

#[derive(ToSchema)]
pub struct LoginRequest {
    #[schema(example = "ivan@example.com")]
    pub email: String,
    #[schema(example = "Secret123")]
    pub password: String,
}

#[derive(ToSchema)]
pub struct CharacterDoc {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "DragonSlayer")]
    pub nickname: String,
    #[schema(example = 1)]
    pub level: i32,
    pub exp: i64,
    #[schema(example = 1)]
    pub cultivation_realm: i16,
    pub current_qi: i64,
    #[schema(example = 100)]
    pub max_qi: i64,
    #[schema(example = 5)]
    pub strength: i32,
    #[schema(example = 5)]
    pub agility: i32,
    #[schema(example = 5)]
    pub vitality: i32,
    #[schema(example = 5)]
    pub spirit: i32,
    #[schema(example = 1)]
    pub location_id: i32,
    #[schema(example = "2026-01-31T12:00:00Z")]
    pub created_at: String,
    #[schema(example = "2026-01-31T12:00:00Z")]
    pub updated_at: String,
}

#[derive(ToSchema)]
pub struct UserDoc {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[schema(example = "2026-01-31T12:00:00Z")]
    pub created_at: String,
    pub character: Option<CharacterDoc>,
}

#[derive(ToSchema)]
pub struct SessionDoc {
    pub user: UserDoc,
    /// HS256 bearer token, also set as the `auth_token` cookie.
    pub token: String,
}

#[derive(ToSchema)]
pub struct MeDoc {
    pub data: UserDoc,
}

#[derive(ToSchema)]
pub struct ErrorDoc {
    pub message: String,
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::me,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            CharacterDoc,
            UserDoc,
            SessionDoc,
            MeDoc,
            ErrorDoc,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health"),
        (name = "auth")
    )
)]
pub struct ApiDoc;
