#![cfg(test)]
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use migration::MigratorTrait;
use models::db::connect_in_memory;

use crate::auth::repository::mock::MockAuthRepository;
use crate::auth::{AuthConfig, AuthService};
use crate::auth::password::HashCost;

/// Fresh, fully migrated in-memory database; every test gets its own.
pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    let db = connect_in_memory().await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Argon2 settings cheap enough for debug-build tests.
pub fn test_config() -> AuthConfig {
    AuthConfig { hash_cost: HashCost { memory_kib: 1024, iterations: 1, parallelism: 1 } }
}

pub fn mock_service() -> (Arc<MockAuthRepository>, AuthService<MockAuthRepository>) {
    let repo = Arc::new(MockAuthRepository::default());
    let svc = AuthService::new(repo.clone(), test_config()).expect("valid test config");
    (repo, svc)
}
