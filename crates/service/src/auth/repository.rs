use async_trait::async_trait;
use uuid::Uuid;

use super::domain::{AuthUser, Character, NewAccount, UserRecord};
use super::errors::AuthError;

/// Repository abstraction for account persistence (the credential store).
///
/// Implementations must treat `create_user_with_character` as one atomic
/// unit: either both rows exist afterwards or neither does.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    /// Case-insensitive lookup by email; no side effects.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError>;

    /// Fails with `DuplicateAccount` when the email or the nickname is taken.
    async fn create_user_with_character(&self, account: NewAccount) -> Result<AuthUser, AuthError>;
    async fn load_character(&self, user: &AuthUser) -> Result<Character, AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Mutex, MutexGuard};

    use chrono::Utc;
    use models::user::normalize_email;

    use crate::auth::errors::AccountField;

    #[derive(Default)]
    struct State {
        users: HashMap<Uuid, UserRecord>,
        emails: HashMap<String, Uuid>,     // key: normalized email
        characters: HashMap<Uuid, Character>, // key: user_id
        nicknames: HashMap<String, Uuid>,  // key: nickname
    }

    #[derive(Default)]
    pub struct MockAuthRepository {
        state: Mutex<State>,
    }

    impl MockAuthRepository {
        fn state(&self) -> Result<MutexGuard<'_, State>, AuthError> {
            self.state.lock().map_err(|_| AuthError::Storage("mock repository poisoned".into()))
        }

        pub fn user_count(&self) -> usize {
            self.state().map(|s| s.users.len()).unwrap_or_default()
        }

        pub fn character_count(&self) -> usize {
            self.state().map(|s| s.characters.len()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl AuthRepository for MockAuthRepository {
        async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
            let state = self.state()?;
            Ok(state.emails.get(&normalize_email(email)).and_then(|id| state.users.get(id)).cloned())
        }

        async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError> {
            let state = self.state()?;
            Ok(state.users.get(&id).map(|r| r.user.clone()))
        }

        async fn create_user_with_character(&self, account: NewAccount) -> Result<AuthUser, AuthError> {
            // one lock for both checks and both inserts keeps it all-or-nothing
            let mut state = self.state()?;
            let email = normalize_email(&account.email);
            let nickname = account.nickname.trim().to_string();
            if state.emails.contains_key(&email) {
                return Err(AuthError::DuplicateAccount(AccountField::Email));
            }
            if state.nicknames.contains_key(&nickname) {
                return Err(AuthError::DuplicateAccount(AccountField::Nickname));
            }

            let now = Utc::now();
            let user = AuthUser { id: Uuid::new_v4(), name: account.name.trim().to_string(), email: email.clone(), created_at: now, character: None };
            let character = Character::starting(user.id, &nickname, now);

            state.emails.insert(email, user.id);
            state.nicknames.insert(nickname, user.id);
            state.characters.insert(user.id, character.clone());
            state.users.insert(user.id, UserRecord { user: user.clone(), password_hash: account.password_hash });
            Ok(user.with_character(character))
        }

        async fn load_character(&self, user: &AuthUser) -> Result<Character, AuthError> {
            let state = self.state()?;
            state
                .characters
                .get(&user.id)
                .cloned()
                .ok_or_else(|| AuthError::Storage(format!("character missing for user {}", user.id)))
        }
    }
}
