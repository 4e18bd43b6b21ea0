use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Contact::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Contact::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Contact::UserId).uuid().not_null())
                    .col(ColumnDef::new(Contact::FirstName).string().not_null())
                    .col(ColumnDef::new(Contact::LastName).string().not_null())
                    .col(ColumnDef::new(Contact::MiddleName).string())
                    .col(ColumnDef::new(Contact::Suffix).string())
                    .col(ColumnDef::new(Contact::Salutation).string())
                    .col(ColumnDef::new(Contact::WorkEmail).string())
                    .col(ColumnDef::new(Contact::PersonalEmail).string())
                    .col(ColumnDef::new(Contact::WorkPhone).string())
                    .col(ColumnDef::new(Contact::PersonalPhone).string())
                    .col(ColumnDef::new(Contact::WorkAddress).string())
                    .col(ColumnDef::new(Contact::PersonalAddress).string())
                    .col(ColumnDef::new(Contact::JobTitle).string())
                    .col(ColumnDef::new(Contact::BackgroundInfo).string())
                    .col(ColumnDef::new(Contact::Birthday).date())
                    .col(
                        ColumnDef::new(Contact::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Contact::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Contact::Table, Contact::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_contacts_user_id")
                    .table(Contact::Table)
                    .col(Contact::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Contact::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Contact {
    #[sea_orm(iden = "contacts")]
    Table,
    Id,
    UserId,
    FirstName,
    LastName,
    MiddleName,
    Suffix,
    Salutation,
    WorkEmail,
    PersonalEmail,
    WorkPhone,
    PersonalPhone,
    WorkAddress,
    PersonalAddress,
    JobTitle,
    BackgroundInfo,
    Birthday,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User {
    #[sea_orm(iden = "users")]
    Table,
    Id,
}
