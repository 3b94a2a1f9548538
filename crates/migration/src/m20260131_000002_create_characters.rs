//! Create `characters` table with a one-to-one FK to `users`.
//!
//! Deleting a user cascades to its character. Stat columns carry CHECK
//! constraints so no writer can push a level below 1 or a stat below 0.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Characters::Table)
                    .if_not_exists()
                    .col(uuid(Characters::Id).primary_key())
                    .col(uuid(Characters::UserId).unique_key().not_null())
                    .col(string_len(Characters::Nickname, 32).unique_key().not_null())
                    .col(integer(Characters::Level).default(1).check(Expr::col(Characters::Level).gte(1)))
                    .col(big_integer(Characters::Exp).default(0).check(Expr::col(Characters::Exp).gte(0)))
                    .col(
                        small_integer(Characters::CultivationRealm)
                            .default(1)
                            .check(Expr::col(Characters::CultivationRealm).gte(1)),
                    )
                    .col(big_integer(Characters::CurrentQi).default(0).check(Expr::col(Characters::CurrentQi).gte(0)))
                    .col(big_integer(Characters::MaxQi).default(100).check(Expr::col(Characters::MaxQi).gte(0)))
                    .col(integer(Characters::Strength).default(5).check(Expr::col(Characters::Strength).gte(0)))
                    .col(integer(Characters::Agility).default(5).check(Expr::col(Characters::Agility).gte(0)))
                    .col(integer(Characters::Vitality).default(5).check(Expr::col(Characters::Vitality).gte(0)))
                    .col(integer(Characters::Spirit).default(5).check(Expr::col(Characters::Spirit).gte(0)))
                    .col(integer(Characters::LocationId).default(1))
                    .col(timestamp_with_time_zone(Characters::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Characters::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_characters_user")
                            .from(Characters::Table, Characters::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Characters::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Characters {
    Table,
    Id,
    UserId,
    Nickname,
    Level,
    Exp,
    CultivationRealm,
    CurrentQi,
    MaxQi,
    Strength,
    Agility,
    Vitality,
    Spirit,
    LocationId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users { Table, Id }
