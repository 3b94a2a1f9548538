//! Service layer for game accounts.
//! - Registration creates a user and its character in one transaction.
//! - Login verifies credentials without revealing whether the account exists.
//! - Web framework independent: the server crate adapts it to HTTP.

pub mod auth;
#[cfg(test)]
pub mod test_support;
