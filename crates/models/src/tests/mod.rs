use migration::MigratorTrait;
use sea_orm::DatabaseConnection;

use crate::db::connect_in_memory;



/// Fresh in-memory database with the full schema applied
pub(crate) async fn setup_test_db() -> anyhow::Result<DatabaseConnection> {
    let db = connect_in_memory().await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}
