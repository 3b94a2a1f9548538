//! SeaORM entities for accounts and their game characters, plus the
//! connection helpers shared by the service and server crates.

pub mod errors;
pub mod db;
pub mod user;
pub mod character;

#[cfg(test)]
mod tests;
