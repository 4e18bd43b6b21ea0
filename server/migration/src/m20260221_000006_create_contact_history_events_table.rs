use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ContactHistoryEvent::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContactHistoryEvent::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ContactHistoryEvent::ContactId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ContactHistoryEvent::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(ContactHistoryEvent::EventType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ContactHistoryEvent::Note).string())
                    .col(
                        ColumnDef::new(ContactHistoryEvent::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ContactHistoryEvent::Table, ContactHistoryEvent::ContactId)
                            .to(Contact::Table, Contact::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ContactHistoryEvent::Table, ContactHistoryEvent::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_contact_history_events_contact_id_created_at")
                    .table(ContactHistoryEvent::Table)
                    .col(ContactHistoryEvent::ContactId)
                    .col(ContactHistoryEvent::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ContactHistoryEvent::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ContactHistoryEvent {
    #[sea_orm(iden = "contact_history_events")]
    Table,
    Id,
    ContactId,
    UserId,
    EventType,
    Note,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Contact {
    #[sea_orm(iden = "contacts")]
    Table,
    Id,
}

#[derive(DeriveIden)]
enum User {
    #[sea_orm(iden = "users")]
    Table,
    Id,
}
