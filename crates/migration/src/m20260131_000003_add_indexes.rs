use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Characters: gameplay systems look characters up by location
        manager
            .create_index(
                Index::create()
                    .name("idx_characters_location")
                    .table(Characters::Table)
                    .col(Characters::LocationId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_characters_location").table(Characters::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Characters { Table, LocationId }
