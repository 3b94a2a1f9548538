use std::fmt;

use thiserror::Error;

/// Which unique account attribute collided during registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountField {
    Email,
    Nickname,
}

impl AccountField {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountField::Email => "email",
            AccountField::Nickname => "nickname",
        }
    }
}

impl fmt::Display for AccountField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business errors for auth workflows
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{0} already taken")]
    DuplicateAccount(AccountField),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("authentication required")]
    Unauthenticated,
    #[error("hashing error: {0}")]
    Hash(String),
    #[error("token error: {0}")]
    Token(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 1001,
            AuthError::DuplicateAccount(_) => 1002,
            AuthError::InvalidCredentials => 1004,
            AuthError::Unauthenticated => 1005,
            AuthError::Hash(_) => 1101,
            AuthError::Token(_) => 1102,
            AuthError::Storage(_) => 1200,
        }
    }

    /// Infrastructure faults that must reach the caller as an opaque
    /// server failure.
    pub fn is_internal(&self) -> bool {
        matches!(self, AuthError::Hash(_) | AuthError::Token(_) | AuthError::Storage(_))
    }
}

impl From<models::errors::ModelError> for AuthError {
    fn from(e: models::errors::ModelError) -> Self {
        match e {
            models::errors::ModelError::Validation(msg) => AuthError::Validation(msg),
            models::errors::ModelError::Conflict(msg) | models::errors::ModelError::Db(msg) => AuthError::Storage(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(AuthError::DuplicateAccount(AccountField::Email).code(), 1002);
        assert_eq!(AuthError::InvalidCredentials.code(), 1004);
        assert_eq!(AuthError::Storage("x".into()).code(), 1200);
    }

    #[test]
    fn only_infrastructure_faults_are_internal() {
        assert!(AuthError::Storage("boom".into()).is_internal());
        assert!(AuthError::Hash("boom".into()).is_internal());
        assert!(!AuthError::InvalidCredentials.is_internal());
        assert!(!AuthError::DuplicateAccount(AccountField::Nickname).is_internal());
    }

    #[test]
    fn duplicate_message_names_the_field() {
        assert_eq!(AuthError::DuplicateAccount(AccountField::Nickname).to_string(), "nickname already taken");
    }
}
