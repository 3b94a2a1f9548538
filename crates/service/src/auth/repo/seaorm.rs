use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use tracing::debug;
use uuid::Uuid;

use models::errors::ModelError;
use models::{character, user};

use crate::auth::domain::{AuthUser, Character, NewAccount, UserRecord};
use crate::auth::errors::{AccountField, AuthError};
use crate::auth::repository::AuthRepository;

pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmAuthRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_user(u: user::Model) -> AuthUser {
    AuthUser { id: u.id, name: u.name, email: u.email, created_at: u.created_at.with_timezone(&Utc), character: None }
}

fn to_character(c: character::Model) -> Character {
    Character {
        id: c.id,
        user_id: c.user_id,
        nickname: c.nickname,
        level: c.level,
        exp: c.exp,
        cultivation_realm: c.cultivation_realm,
        current_qi: c.current_qi,
        max_qi: c.max_qi,
        strength: c.strength,
        agility: c.agility,
        vitality: c.vitality,
        spirit: c.spirit,
        location_id: c.location_id,
        created_at: c.created_at.with_timezone(&Utc),
        updated_at: c.updated_at.with_timezone(&Utc),
    }
}

fn storage(e: impl std::fmt::Display) -> AuthError {
    AuthError::Storage(e.to_string())
}

/// Unique violations on an insert belong to the field that insert owns.
fn insert_error(e: ModelError, field: AccountField) -> AuthError {
    match e {
        ModelError::Conflict(msg) => {
            debug!(%field, constraint = %msg, "unique constraint rejected registration");
            AuthError::DuplicateAccount(field)
        }
        other => other.into(),
    }
}

/// Insert the user row then its starting character. When a concurrent
/// registration commits the same email after the pre-check, the unique key
/// rejects the user insert here.
async fn insert_account_rows<C: ConnectionTrait>(conn: &C, account: &NewAccount) -> Result<AuthUser, AuthError> {
    let created = user::insert(conn, &account.name, &account.email, &account.password_hash)
        .await
        .map_err(|e| insert_error(e, AccountField::Email))?;
    let owned = character::insert_starting(conn, created.id, &account.nickname)
        .await
        .map_err(|e| insert_error(e, AccountField::Nickname))?;
    Ok(to_user(created).with_character(to_character(owned)))
}

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        let res = user::find_by_email(&self.db, email).await.map_err(storage)?;
        Ok(res.map(|u| {
            let password_hash = u.password_hash.clone();
            UserRecord { user: to_user(u), password_hash }
        }))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError> {
        let res = user::find_by_id(&self.db, id).await.map_err(storage)?;
        Ok(res.map(to_user))
    }

    /// Both inserts share one transaction. Every early return drops `txn`
    /// uncommitted, which rolls the user row back.
    async fn create_user_with_character(&self, account: NewAccount) -> Result<AuthUser, AuthError> {
        let txn = self.db.begin().await.map_err(storage)?;

        if user::find_by_email(&txn, &account.email).await.map_err(storage)?.is_some() {
            return Err(AuthError::DuplicateAccount(AccountField::Email));
        }

        let created = insert_account_rows(&txn, &account).await?;

        txn.commit().await.map_err(storage)?;
        Ok(created)
    }

    async fn load_character(&self, user: &AuthUser) -> Result<Character, AuthError> {
        character::find_by_user(&self.db, user.id)
            .await
            .map_err(storage)?
            .map(to_character)
            .ok_or_else(|| AuthError::Storage(format!("character missing for user {}", user.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{EntityTrait, PaginatorTrait};

    use crate::test_support::get_db;

    fn account(email: &str, nickname: &str) -> NewAccount {
        NewAccount {
            name: "Ivan".into(),
            email: email.into(),
            password_hash: "$argon2id$v=19$m=1024,t=1,p=1$c2FsdHNhbHQ$aGFzaGhhc2g".into(),
            nickname: nickname.into(),
        }
    }

    #[tokio::test]
    async fn creates_user_and_character_together() -> anyhow::Result<()> {
        let repo = SeaOrmAuthRepository::new(get_db().await?);

        let created = repo.create_user_with_character(account("Ivan@Example.com", "DragonSlayer")).await?;
        assert_eq!(created.email, "ivan@example.com");
        let character = created.character.clone().expect("character attached");
        assert_eq!(character.nickname, "DragonSlayer");
        assert_eq!(character.level, 1);
        assert!(character.holds_invariants());

        let record = repo.find_user_by_email("IVAN@example.com").await?.expect("user stored");
        assert_eq!(record.user.id, created.id);
        assert!(record.password_hash.starts_with("$argon2id$"));
        assert_eq!(repo.load_character(&record.user).await?, character);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() -> anyhow::Result<()> {
        let repo = SeaOrmAuthRepository::new(get_db().await?);

        let first = repo.create_user_with_character(account("ivan@example.com", "DragonSlayer")).await?;
        let err = repo.create_user_with_character(account("IVAN@example.com", "Other")).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateAccount(AccountField::Email)), "got {err:?}");

        // first account is untouched
        let still = repo.find_user_by_id(first.id).await?.expect("first user kept");
        assert_eq!(repo.load_character(&still).await?.nickname, "DragonSlayer");
        Ok(())
    }

    #[tokio::test]
    async fn unique_key_decides_email_race_after_precheck() -> anyhow::Result<()> {
        let db = get_db().await?;
        let repo = SeaOrmAuthRepository::new(db.clone());
        repo.create_user_with_character(account("ivan@example.com", "DragonSlayer")).await?;

        // the other registration committed between our pre-check and insert
        let txn = db.begin().await?;
        let err = insert_account_rows(&txn, &account("Ivan@example.com", "LateComer")).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateAccount(AccountField::Email)), "got {err:?}");
        txn.rollback().await?;

        assert_eq!(user::Entity::find().count(&db).await?, 1);
        assert_eq!(character::Entity::find().count(&db).await?, 1);
        assert!(repo.find_user_by_email("ivan@example.com").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_nickname_rolls_back_the_user_row() -> anyhow::Result<()> {
        let db = get_db().await?;
        let repo = SeaOrmAuthRepository::new(db.clone());

        repo.create_user_with_character(account("ivan@example.com", "DragonSlayer")).await?;
        let err = repo.create_user_with_character(account("petr@example.com", "DragonSlayer")).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateAccount(AccountField::Nickname)), "got {err:?}");

        assert!(repo.find_user_by_email("petr@example.com").await?.is_none());
        assert_eq!(user::Entity::find().count(&db).await?, 1);
        assert_eq!(character::Entity::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_registrations_have_one_winner() -> anyhow::Result<()> {
        let db = get_db().await?;
        let repo = std::sync::Arc::new(SeaOrmAuthRepository::new(db.clone()));

        let a = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.create_user_with_character(account("race@example.com", "RacerOne")).await })
        };
        let b = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.create_user_with_character(account("race@example.com", "RacerTwo")).await })
        };
        let results = [a.await?, b.await?];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AuthError::DuplicateAccount(AccountField::Email)))));
        assert_eq!(user::Entity::find().count(&db).await?, 1);
        assert_eq!(character::Entity::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_lookups_are_empty() -> anyhow::Result<()> {
        let repo = SeaOrmAuthRepository::new(get_db().await?);
        assert!(repo.find_user_by_email("ghost@example.com").await?.is_none());
        assert!(repo.find_user_by_id(Uuid::new_v4()).await?.is_none());
        Ok(())
    }
}
