use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Subscription::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subscription::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Subscription::ProviderId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Subscription::CustomerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscription::OrderId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Subscription::Name).string().not_null())
                    .col(ColumnDef::new(Subscription::Email).string().not_null())
                    .col(ColumnDef::new(Subscription::Status).string().not_null())
                    .col(ColumnDef::new(Subscription::RenewsAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Subscription::EndsAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Subscription::TrialEndsAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Subscription::UserId).uuid().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Subscription::Table, Subscription::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Subscription::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Subscription {
    #[sea_orm(iden = "subscriptions")]
    Table,
    Id,
    ProviderId,
    CustomerId,
    OrderId,
    Name,
    Email,
    Status,
    RenewsAt,
    EndsAt,
    TrialEndsAt,
    UserId,
}

#[derive(DeriveIden)]
enum User {
    #[sea_orm(iden = "users")]
    Table,
    Id,
}
