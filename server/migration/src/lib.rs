pub use sea_orm_migration::prelude::*;

mod m20260214_000001_create_users_table;
mod m20260214_000002_create_user_profiles_table;
mod m20260214_000003_create_password_reset_requests_table;
mod m20260221_000004_create_contacts_table;
mod m20260221_000005_create_contact_tasks_table;
mod m20260221_000006_create_contact_history_events_table;
mod m20260228_000007_create_contact_groups_table;
mod m20260307_000008_create_subscriptions_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260214_000001_create_users_table::Migration),
            Box::new(m20260214_000002_create_user_profiles_table::Migration),
            Box::new(m20260214_000003_create_password_reset_requests_table::Migration),
            Box::new(m20260221_000004_create_contacts_table::Migration),
            Box::new(m20260221_000005_create_contact_tasks_table::Migration),
            Box::new(m20260221_000006_create_contact_history_events_table::Migration),
            Box::new(m20260228_000007_create_contact_groups_table::Migration),
            Box::new(m20260307_000008_create_subscriptions_table::Migration),
        ]
    }
}
