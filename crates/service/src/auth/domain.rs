use std::fmt;

use chrono::{DateTime, Utc};
use models::character::starting;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registration input. Deserialize only: raw passwords never go back out.
#[derive(Clone, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub nickname: String,
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

impl fmt::Debug for RegisterInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterInput")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("nickname", &self.nickname)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Login input
#[derive(Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginInput")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Game profile owned 1:1 by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: Uuid,
    pub user_id: Uuid,
    pub nickname: String,
    pub level: i32,
    pub exp: i64,
    pub cultivation_realm: i16,
    pub current_qi: i64,
    pub max_qi: i64,
    pub strength: i32,
    pub agility: i32,
    pub vitality: i32,
    pub spirit: i32,
    pub location_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Character {
    /// A brand-new character with the fixed starting stats.
    pub fn starting(user_id: Uuid, nickname: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            nickname: nickname.trim().to_string(),
            level: starting::LEVEL,
            exp: starting::EXP,
            cultivation_realm: starting::CULTIVATION_REALM,
            current_qi: starting::CURRENT_QI,
            max_qi: starting::MAX_QI,
            strength: starting::ATTRIBUTE,
            agility: starting::ATTRIBUTE,
            vitality: starting::ATTRIBUTE,
            spirit: starting::ATTRIBUTE,
            location_id: starting::LOCATION_ID,
            created_at: now,
            updated_at: now,
        }
    }

    /// Level at least 1 and no negative stat.
    pub fn holds_invariants(&self) -> bool {
        self.level >= 1
            && self.cultivation_realm >= 1
            && self.exp >= 0
            && self.current_qi >= 0
            && self.max_qi >= 0
            && [self.strength, self.agility, self.vitality, self.spirit].iter().all(|s| *s >= 0)
    }
}

/// Domain user (business view). Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character: Option<Character>,
}

impl AuthUser {
    pub fn with_character(self, character: Character) -> Self {
        Self { character: Some(character), ..self }
    }
}

/// A stored user together with its password hash, only used for
/// credential checks.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: AuthUser,
    pub password_hash: String,
}

/// Everything the store needs to create an account in one go.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub nickname: String,
}

/// Login/registration result (session)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: AuthUser,
    pub token: String,
}
