use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "contacts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub suffix: Option<String>,
    pub salutation: Option<String>,
    pub work_email: Option<String>,
    pub personal_email: Option<String>,
    pub work_phone: Option<String>,
    pub personal_phone: Option<String>,
    pub work_address: Option<String>,
    pub personal_address: Option<String>,
    pub job_title: Option<String>,
    pub background_info: Option<String>,
    pub birthday: Option<Date>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(has_many = "super::contact_task::Entity")]
    ContactTask,
    #[sea_orm(has_many = "super::contact_history_event::Entity")]
    ContactHistoryEvent,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::contact_task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ContactTask.def()
    }
}

impl Related<super::contact_history_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ContactHistoryEvent.def()
    }
}

impl Related<super::contact_group::Entity> for Entity {
    fn to() -> RelationDef {
        super::contact_group_membership::Relation::ContactGroup.def()
    }

    fn via() -> Option<RelationDef> {
        Some(
            super::contact_group_membership::Relation::Contact
                .def()
                .rev(),
        )
    }
}

impl ActiveModelBehavior for ActiveModel {}
