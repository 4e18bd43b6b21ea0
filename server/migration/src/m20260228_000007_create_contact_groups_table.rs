use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ContactGroup::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContactGroup::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ContactGroup::UserId).uuid().not_null())
                    .col(ColumnDef::new(ContactGroup::Name).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(ContactGroup::Table, ContactGroup::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ContactGroupMembership::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContactGroupMembership::ContactId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContactGroupMembership::GroupId)
                            .uuid()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(ContactGroupMembership::ContactId)
                            .col(ContactGroupMembership::GroupId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                ContactGroupMembership::Table,
                                ContactGroupMembership::ContactId,
                            )
                            .to(Contact::Table, Contact::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                ContactGroupMembership::Table,
                                ContactGroupMembership::GroupId,
                            )
                            .to(ContactGroup::Table, ContactGroup::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ContactGroupMembership::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ContactGroup::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ContactGroup {
    #[sea_orm(iden = "contact_groups")]
    Table,
    Id,
    UserId,
    Name,
}

#[derive(DeriveIden)]
enum ContactGroupMembership {
    #[sea_orm(iden = "contact_group_memberships")]
    Table,
    ContactId,
    GroupId,
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
