//! Field-level input checks applied at the HTTP boundary before a request
//! reaches [`AuthService`](super::AuthService).

use std::collections::BTreeMap;

use models::{character, user};
use serde::Serialize;

use super::domain::{LoginInput, RegisterInput};

pub const PASSWORD_MIN_LEN: usize = 8;

/// Messages keyed by the offending field, e.g. `{"email": ["..."]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors with a single message on one field.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First message in field order, used as the summary line of a response.
    pub fn first_message(&self) -> Option<&str> {
        self.fields.values().flat_map(|m| m.iter()).next().map(String::as_str)
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl RegisterInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.name.trim().is_empty() {
            errors.add("name", "The name field is required.");
        } else if user::validate_name(&self.name).is_err() {
            errors.add("name", format!("The name field must not be greater than {} characters.", user::NAME_MAX_LEN));
        }

        if self.email.trim().is_empty() {
            errors.add("email", "The email field is required.");
        } else if user::validate_email(&self.email).is_err() {
            errors.add("email", "The email field must be a valid email address.");
        }

        if self.nickname.trim().is_empty() {
            errors.add("nickname", "The nickname field is required.");
        } else if character::validate_nickname(&self.nickname).is_err() {
            errors.add(
                "nickname",
                format!("The nickname field must not be greater than {} characters.", character::NICKNAME_MAX_LEN),
            );
        }

        if self.password.is_empty() {
            errors.add("password", "The password field is required.");
        } else {
            if self.password.chars().count() < PASSWORD_MIN_LEN {
                errors.add("password", format!("The password field must be at least {PASSWORD_MIN_LEN} characters."));
            }
            if self.password != self.password_confirmation {
                errors.add("password", "The password field confirmation does not match.");
            }
        }

        errors.into_result()
    }
}

impl LoginInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.email.trim().is_empty() {
            errors.add("email", "The email field is required.");
        }
        if self.password.is_empty() {
            errors.add("password", "The password field is required.");
        }
        errors.into_result()
    }
}
