use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::user;

pub const NICKNAME_MAX_LEN: usize = 32;

/// Values every freshly registered character starts with.
pub mod starting {
    pub const LEVEL: i32 = 1;
    pub const EXP: i64 = 0;
    pub const CULTIVATION_REALM: i16 = 1;
    pub const CURRENT_QI: i64 = 0;
    pub const MAX_QI: i64 = 100;
    pub const ATTRIBUTE: i32 = 5;
    pub const LOCATION_ID: i32 = 1;
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "characters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_id: Uuid,
    #[sea_orm(unique)]
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
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { User }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .on_delete(ForeignKeyAction::Cascade)
                .into(),
        }
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_nickname(nickname: &str) -> Result<(), ModelError> {
    if nickname.trim().is_empty() {
        return Err(ModelError::Validation("nickname required".into()));
    }
    if nickname.chars().count() > NICKNAME_MAX_LEN {
        return Err(ModelError::Validation(format!("nickname must not exceed {NICKNAME_MAX_LEN} characters")));
    }
    Ok(())
}

/// Insert the character owned by `user_id` with the starting stats.
pub async fn insert_starting<C: ConnectionTrait>(conn: &C, user_id: Uuid, nickname: &str) -> Result<Model, ModelError> {
    validate_nickname(nickname)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        nickname: Set(nickname.trim().to_string()),
        level: Set(starting::LEVEL),
        exp: Set(starting::EXP),
        cultivation_realm: Set(starting::CULTIVATION_REALM),
        current_qi: Set(starting::CURRENT_QI),
        max_qi: Set(starting::MAX_QI),
        strength: Set(starting::ATTRIBUTE),
        agility: Set(starting::ATTRIBUTE),
        vitality: Set(starting::ATTRIBUTE),
        spirit: Set(starting::ATTRIBUTE),
        location_id: Set(starting::LOCATION_ID),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(conn).await.map_err(ModelError::from_db)
}

pub async fn find_by_user<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> Result<Option<Model>, ModelError> {
    Entity::find()
        .filter(Column::UserId.eq(user_id))
        .one(conn)
        .await
        .map_err(ModelError::from_db)
}

#[cfg(test)]
pub(crate) async fn find_by_nickname<C: ConnectionTrait>(conn: &C, nickname: &str) -> Result<Option<Model>, ModelError> {
    Entity::find()
        .filter(Column::Nickname.eq(nickname.trim()))
        .one(conn)
        .await
        .map_err(ModelError::from_db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nickname_rules() {
        assert!(validate_nickname("DragonSlayer").is_ok());
        assert!(validate_nickname("  ").is_err());
        assert!(validate_nickname(&"n".repeat(NICKNAME_MAX_LEN + 1)).is_err());
    }
}
