//! Auth module: three-layer architecture (domain, repository, service).
//!
//! This module centralizes registration, login and profile lookup under the
//! service crate. Password hashing, session tokens and input validation are
//! split into their own files so the HTTP layer can reuse them.

pub mod domain;
pub mod errors;
pub mod password;
pub mod repository;
pub mod repo;
pub mod service;
pub mod token;
pub mod validation;

pub use service::{AuthConfig, AuthService};
