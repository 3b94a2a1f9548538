use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::domain::{AuthUser, LoginInput, NewAccount, RegisterInput};
use super::errors::AuthError;
use super::password::{Argon2Hasher, HashCost};
use super::repository::AuthRepository;

/// Auth service configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthConfig {
    pub hash_cost: HashCost,
}

impl From<&configs::AuthSettings> for AuthConfig {
    fn from(s: &configs::AuthSettings) -> Self {
        Self {
            hash_cost: HashCost {
                memory_kib: s.argon2_memory_kib,
                iterations: s.argon2_iterations,
                parallelism: s.argon2_parallelism,
            },
        }
    }
}

/// Auth business service independent of web framework.
///
/// Stateless apart from the repository it delegates to; the caller always
/// passes the user or credentials in explicitly.
pub struct AuthService<R: AuthRepository> {
    repo: Arc<R>,
    hasher: Arc<Argon2Hasher>,
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Result<Self, AuthError> {
        let hasher = Argon2Hasher::new(cfg.hash_cost)?;
        Ok(Self { repo, hasher: Arc::new(hasher) })
    }

    /// Register a new user together with its starting character.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::RegisterInput;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo, AuthConfig::default()).unwrap();
    /// let input = RegisterInput {
    ///     name: "Ivan".into(),
    ///     email: "ivan@example.com".into(),
    ///     nickname: "DragonSlayer".into(),
    ///     password: "Secret123".into(),
    ///     password_confirmation: "Secret123".into(),
    /// };
    /// let user = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(user.character.unwrap().level, 1);
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email, nickname = %input.nickname))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthUser, AuthError> {
        let RegisterInput { name, email, nickname, password, .. } = input;
        let password_hash = self.hash_blocking(password).await?;

        let account = NewAccount { name, email, password_hash, nickname };
        let user = self.repo.create_user_with_character(account).await.map_err(|e| {
            match &e {
                AuthError::DuplicateAccount(field) => debug!(%field, "registration rejected"),
                other => warn!(error = %other, code = other.code(), "registration failed"),
            }
            e
        })?;

        info!(user_id = %user.id, "user_registered");
        Ok(user)
    }

    /// Authenticate a user by email and password.
    ///
    /// Unknown email and wrong password produce the same error after the
    /// same amount of hashing work.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::{RegisterInput, LoginInput};
    /// use service::auth::errors::AuthError;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo, AuthConfig::default()).unwrap();
    /// let _ = tokio_test::block_on(svc.register(RegisterInput {
    ///     name: "N".into(), email: "u@e.com".into(), nickname: "Nick".into(),
    ///     password: "Passw0rd".into(), password_confirmation: "Passw0rd".into(),
    /// }));
    /// let user = tokio_test::block_on(svc.login(LoginInput { email: "u@e.com".into(), password: "Passw0rd".into() })).unwrap();
    /// assert_eq!(user.email, "u@e.com");
    /// let err = tokio_test::block_on(svc.login(LoginInput { email: "u@e.com".into(), password: "nope".into() })).unwrap_err();
    /// assert!(matches!(err, AuthError::InvalidCredentials));
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthUser, AuthError> {
        let LoginInput { email, password } = input;
        let record = self.repo.find_user_by_email(&email).await?;

        let hasher = Arc::clone(&self.hasher);
        let (record, verified) = tokio::task::spawn_blocking(move || match record {
            Some(r) => {
                let ok = hasher.verify(&password, &r.password_hash);
                (Some(r), ok)
            }
            None => (None, hasher.verify_decoy(&password)),
        })
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))?;

        match record {
            Some(r) if verified => {
                info!(user_id = %r.user.id, "user_logged_in");
                Ok(r.user)
            }
            _ => {
                info!("login_rejected");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Current-user query: the user resolved from the caller's session,
    /// with its character attached.
    #[instrument(skip(self))]
    pub async fn profile(&self, user_id: Uuid) -> Result<AuthUser, AuthError> {
        let user = self.repo.find_user_by_id(user_id).await?.ok_or(AuthError::Unauthenticated)?;
        self.with_character(user).await
    }

    /// Attach the owned character for response assembly.
    pub async fn with_character(&self, user: AuthUser) -> Result<AuthUser, AuthError> {
        if user.character.is_some() {
            return Ok(user);
        }
        let character = self.repo.load_character(&user).await?;
        Ok(user.with_character(character))
    }

    async fn hash_blocking(&self, password: String) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Hash(e.to_string()))?
    }
}
