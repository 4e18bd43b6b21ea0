use crate::auth::CurrentUser;
use crate::entities::contact_group;
use crate::group::{GroupService, GroupServiceError, GroupState};
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

/// JSON representation of a contact group.
#[derive(Debug, Serialize, ToSchema)]
pub struct GroupJson {
    pub id: Uuid,
    pub name: String,
}

impl From<contact_group::Model> for GroupJson {
    fn from(model: contact_group::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

/// JSON request payload for creating a group.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateGroupRequest {
    pub name: String,
}

/// Creates the group router. Every route here requires a session.
pub fn create_group_router(state: Arc<GroupState>) -> Router {
    Router::new()
        .route("/groups", get(list_groups_handler).post(create_group_handler))
        .with_state(state)
}

fn group_error_response(err: GroupServiceError) -> (StatusCode, Json<ErrorResponse>) {
    tracing::error!("Group operation failed: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(
            "INTERNAL_ERROR",
            "An unexpected error occurred while processing your request. Please try again later.",
        )),
    )
}

/// Handler for GET /api/v1/groups.
#[tracing::instrument(skip(state, current_user))]
#[utoipa::path(
    get,
    path = "/api/v1/groups",
    responses(
        (status = 200, description = "The user's groups, ordered by name", body = [GroupJson]),
        (status = 401, description = "No valid session", body = ErrorResponse)
    ),
    tag = "Groups"
)]
pub async fn list_groups_handler(
    State(state): State<Arc<GroupState>>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<Vec<GroupJson>>, (StatusCode, Json<ErrorResponse>)> {
    let service = GroupService::new(&state.db);
    let groups = service
        .list_groups(current_user.id)
        .await
        .map_err(group_error_response)?;
    Ok(Json(groups.into_iter().map(GroupJson::from).collect()))
}

/// Handler for POST /api/v1/groups.
#[tracing::instrument(skip(state, current_user, payload))]
#[utoipa::path(
    post,
    path = "/api/v1/groups",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created", body = GroupJson),
        (status = 401, description = "No valid session", body = ErrorResponse)
    ),
    tag = "Groups"
)]
pub async fn create_group_handler(
    State(state): State<Arc<GroupState>>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupJson>), (StatusCode, Json<ErrorResponse>)> {
    let service = GroupService::new(&state.db);
    let group = service
        .create_group(current_user.id, payload.name)
        .await
        .map_err(group_error_response)?;
    Ok((StatusCode::CREATED, Json(GroupJson::from(group))))
}
