use crate::auth::CurrentUser;
use crate::entities::user_profile;
use crate::profile::{ProfileService, ProfileServiceError, ProfileState};
use crate::web::api::ErrorResponse;
use axum::{
    Json, Router,
    extract::{Extension, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// JSON representation of a user profile.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileJson {
    pub id: Uuid,
    pub name: Option<String>,
    pub bio: Option<String>,
}

impl From<user_profile::Model> for ProfileJson {
    fn from(model: user_profile::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            bio: model.bio,
        }
    }
}

/// JSON request payload for a partial profile update.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Creates the profile router. Every route here requires a session.
pub fn create_profile_router(state: Arc<ProfileState>) -> Router {
    Router::new()
        .route("/profiles", get(get_profile_handler).post(update_profile_handler))
        .with_state(state)
}

fn profile_error_response(err: ProfileServiceError) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        ProfileServiceError::ProfileNotFound => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("PROFILE_NOT_FOUND", "Profile not found")),
        ),
        err => {
            tracing::error!("Profile operation failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "INTERNAL_ERROR",
                    "An unexpected error occurred while processing your request. Please try again later.",
                )),
            )
        }
    }
}

/// Handler for GET /api/v1/profiles.
#[tracing::instrument(skip(state, current_user))]
#[utoipa::path(
    get,
    path = "/api/v1/profiles",
    responses(
        (status = 200, description = "The user's profile", body = ProfileJson),
        (status = 404, description = "Profile not found", body = ErrorResponse)
    ),
    tag = "Profiles"
)]
pub async fn get_profile_handler(
    State(state): State<Arc<ProfileState>>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<ProfileJson>, (StatusCode, Json<ErrorResponse>)> {
    let service = ProfileService::new(&state.db);
    let profile = service
        .get_profile(current_user.id)
        .await
        .map_err(profile_error_response)?;
    Ok(Json(ProfileJson::from(profile)))
}

/// Handler for POST /api/v1/profiles.
#[tracing::instrument(skip(state, current_user, payload))]
#[utoipa::path(
    post,
    path = "/api/v1/profiles",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileJson),
        (status = 401, description = "No valid session", body = ErrorResponse)
    ),
    tag = "Profiles"
)]
pub async fn update_profile_handler(
    State(state): State<Arc<ProfileState>>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileJson>, (StatusCode, Json<ErrorResponse>)> {
    let service = ProfileService::new(&state.db);
    let profile = service
        .update_profile(current_user.id, payload.name, payload.bio)
        .await
        .map_err(profile_error_response)?;
    Ok(Json(ProfileJson::from(profile)))
}
