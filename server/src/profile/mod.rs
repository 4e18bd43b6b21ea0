use crate::entities::*;
use sea_orm::*;
use std::sync::Arc;
use uuid::Uuid;

pub mod api;

/// Shared state for profile routers.
#[derive(Clone)]
pub struct ProfileState {
    pub db: Arc<sea_orm::DatabaseConnection>,
}

/// Error type for ProfileService operations.
#[derive(Debug, thiserror::Error)]
pub enum ProfileServiceError {
    /// Represents a profile lookup that found nothing for the user.
    #[error("Profile not found")]
    ProfileNotFound,
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

pub struct ProfileService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl ProfileService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> ProfileService {
        ProfileService { db }
    }

    /// Retrieves the user's profile.
    #[tracing::instrument(skip(self))]
    pub async fn get_profile(
        &self,
        user_id: Uuid,
    ) -> Result<user_profile::Model, ProfileServiceError> {
        let profile = user_profile::Entity::find()
            .filter(user_profile::Column::UserId.eq(user_id))
            .one(self.db)
            .await?
            .ok_or(ProfileServiceError::ProfileNotFound)?;
        Ok(profile)
    }

    /// Updates the user's profile, creating the row if registration did not.
    /// Absent fields are left as they are.
    #[tracing::instrument(skip(self))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        name: Option<String>,
        bio: Option<String>,
    ) -> Result<user_profile::Model, ProfileServiceError> {
        let existing = user_profile::Entity::find()
            .filter(user_profile::Column::UserId.eq(user_id))
            .one(self.db)
            .await?;

        let profile = match existing {
            Some(profile) => {
                let mut active_model: user_profile::ActiveModel = profile.into();
                if let Some(name) = name {
                    active_model.name = ActiveValue::Set(Some(name));
                }
                if let Some(bio) = bio {
                    active_model.bio = ActiveValue::Set(Some(bio));
                }
                active_model.update(self.db).await?
            }
            None => {
                user_profile::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4()),
                    user_id: ActiveValue::Set(user_id),
                    name: ActiveValue::Set(name),
                    bio: ActiveValue::Set(bio),
                }
                .insert(self.db)
                .await?
            }
        };
        Ok(profile)
    }
}
