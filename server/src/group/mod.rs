use crate::entities::*;
use sea_orm::*;
use std::sync::Arc;
use uuid::Uuid;

pub mod api;

/// Shared state for group routers.
#[derive(Clone)]
pub struct GroupState {
    pub db: Arc<sea_orm::DatabaseConnection>,
}

/// Error type for GroupService operations.
#[derive(Debug, thiserror::Error)]
pub enum GroupServiceError {
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

pub struct GroupService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl GroupService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> GroupService {
        GroupService { db }
    }

    /// Retrieves the user's groups ordered by name.
    #[tracing::instrument(skip(self))]
    pub async fn list_groups(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<contact_group::Model>, GroupServiceError> {
        let groups = contact_group::Entity::find()
            .filter(contact_group::Column::UserId.eq(user_id))
            .order_by_asc(contact_group::Column::Name)
            .all(self.db)
            .await?;
        Ok(groups)
    }

    /// Creates a group owned by the user.
    #[tracing::instrument(skip(self))]
    pub async fn create_group(
        &self,
        user_id: Uuid,
        name: String,
    ) -> Result<contact_group::Model, GroupServiceError> {
        let group = contact_group::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            user_id: ActiveValue::Set(user_id),
            name: ActiveValue::Set(name),
            ..Default::default()
        }
        .insert(self.db)
        .await?;
        Ok(group)
    }
}
