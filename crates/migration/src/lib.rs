//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20260131_000001_create_users;
mod m20260131_000002_create_characters;
mod m20260131_000003_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260131_000001_create_users::Migration),
            Box::new(m20260131_000002_create_characters::Migration),
            // Indexes should always be applied last
            Box::new(m20260131_000003_add_indexes::Migration),
        ]
    }
}
