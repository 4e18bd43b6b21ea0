use crate::auth::CurrentUser;
use crate::contact::{
    ContactAggregate, ContactPatch, ContactService, ContactServiceError, ContactState, GroupRef,
    NewContact, NewTask,
};
use crate::entities::contact_history_event::ContactHistoryEventType;
use crate::entities::contact_task::TaskStatus;
use crate::entities::{contact, contact_history_event, contact_task};
use crate::web::api::ErrorResponse;
use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// JSON representation of a contact for API responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct ContactJson {
    pub id: Uuid,
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
    pub birthday: Option<chrono::NaiveDate>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<contact::Model> for ContactJson {
    fn from(model: contact::Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            middle_name: model.middle_name,
            suffix: model.suffix,
            salutation: model.salutation,
            work_email: model.work_email,
            personal_email: model.personal_email,
            work_phone: model.work_phone,
            personal_phone: model.personal_phone,
            work_address: model.work_address,
            personal_address: model.personal_address,
            job_title: model.job_title,
            background_info: model.background_info,
            birthday: model.birthday,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// JSON representation of a group reference on a contact.
#[derive(Debug, Serialize, ToSchema)]
pub struct GroupRefJson {
    pub id: Uuid,
    pub name: String,
}

impl From<GroupRef> for GroupRefJson {
    fn from(group: GroupRef) -> Self {
        Self {
            id: group.id,
            name: group.name,
        }
    }
}

/// JSON representation of a contact task.
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskJson {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub due_at: DateTime<FixedOffset>,
    pub status: TaskStatus,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<contact_task::Model> for TaskJson {
    fn from(model: contact_task::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            due_at: model.due_at,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// JSON representation of a contact history event.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryEventJson {
    pub id: Uuid,
    pub event_type: ContactHistoryEventType,
    pub note: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

impl From<contact_history_event::Model> for HistoryEventJson {
    fn from(model: contact_history_event::Model) -> Self {
        Self {
            id: model.id,
            event_type: model.event_type,
            note: model.note,
            created_at: model.created_at,
        }
    }
}

/// JSON representation of a contact with its groups, tasks, and history.
#[derive(Debug, Serialize, ToSchema)]
pub struct ContactDetailJson {
    #[serde(flatten)]
    pub contact: ContactJson,
    pub groups: Vec<GroupRefJson>,
    pub tasks: Vec<TaskJson>,
    pub history_events: Vec<HistoryEventJson>,
}

impl From<ContactAggregate> for ContactDetailJson {
    fn from(aggregate: ContactAggregate) -> Self {
        Self {
            contact: ContactJson::from(aggregate.contact),
            groups: aggregate.groups.into_iter().map(GroupRefJson::from).collect(),
            tasks: aggregate.tasks.into_iter().map(TaskJson::from).collect(),
            history_events: aggregate
                .history_events
                .into_iter()
                .map(HistoryEventJson::from)
                .collect(),
        }
    }
}

/// JSON request payload for creating a contact.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateContactRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub salutation: Option<String>,
    #[serde(default)]
    pub work_email: Option<String>,
    #[serde(default)]
    pub personal_email: Option<String>,
    #[serde(default)]
    pub work_phone: Option<String>,
    #[serde(default)]
    pub personal_phone: Option<String>,
    #[serde(default)]
    pub work_address: Option<String>,
    #[serde(default)]
    pub personal_address: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub background_info: Option<String>,
    #[serde(default)]
    pub birthday: Option<chrono::NaiveDate>,
}

impl From<CreateContactRequest> for NewContact {
    fn from(request: CreateContactRequest) -> Self {
        Self {
            first_name: request.first_name,
            last_name: request.last_name,
            middle_name: request.middle_name,
            suffix: request.suffix,
            salutation: request.salutation,
            work_email: request.work_email,
            personal_email: request.personal_email,
            work_phone: request.work_phone,
            personal_phone: request.personal_phone,
            work_address: request.work_address,
            personal_address: request.personal_address,
            job_title: request.job_title,
            background_info: request.background_info,
            birthday: request.birthday,
        }
    }
}

/// JSON request payload for a partial contact update. The contact to update is
/// named by `id`; absent fields are left as they are.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateContactRequest {
    pub id: Uuid,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub salutation: Option<String>,
    #[serde(default)]
    pub work_email: Option<String>,
    #[serde(default)]
    pub personal_email: Option<String>,
    #[serde(default)]
    pub work_phone: Option<String>,
    #[serde(default)]
    pub personal_phone: Option<String>,
    #[serde(default)]
    pub work_address: Option<String>,
    #[serde(default)]
    pub personal_address: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub background_info: Option<String>,
    #[serde(default)]
    pub birthday: Option<chrono::NaiveDate>,
}

impl From<UpdateContactRequest> for ContactPatch {
    fn from(request: UpdateContactRequest) -> Self {
        Self {
            id: request.id,
            first_name: request.first_name,
            last_name: request.last_name,
            middle_name: request.middle_name,
            suffix: request.suffix,
            salutation: request.salutation,
            work_email: request.work_email,
            personal_email: request.personal_email,
            work_phone: request.work_phone,
            personal_phone: request.personal_phone,
            work_address: request.work_address,
            personal_address: request.personal_address,
            job_title: request.job_title,
            background_info: request.background_info,
            birthday: request.birthday,
        }
    }
}

/// JSON request payload for adding a note.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateNoteRequest {
    pub note: String,
}

/// JSON request payload for creating a task.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub due_at: DateTime<FixedOffset>,
}

/// JSON request payload for updating a task's status.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTaskRequest {
    pub status: TaskStatus,
}

/// JSON request payload for attaching groups to a contact.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddGroupsRequest {
    pub group_ids: Vec<Uuid>,
}

/// Creates the contact router. Every route here requires a session.
pub fn create_contact_router(state: Arc<ContactState>) -> Router {
    Router::new()
        .route("/contacts", get(list_contacts_handler).post(create_contact_handler).patch(update_contact_handler))
        .route("/contacts/{id}", get(get_contact_handler))
        .route("/contacts/{id}/notes", post(create_note_handler))
        .route("/contacts/{id}/tasks", post(create_task_handler))
        .route("/contacts/{id}/tasks/{task_id}", patch(update_task_handler))
        .route("/contacts/{id}/groups", patch(add_groups_handler))
        .route(
            "/contacts/{id}/groups/{group_id}",
            axum::routing::delete(remove_group_handler),
        )
        .with_state(state)
}

/// Maps a contact service error onto a JSON error response.
fn contact_error_response(err: ContactServiceError) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        ContactServiceError::ContactNotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("CONTACT_NOT_FOUND", "Contact not found")),
        ),
        ContactServiceError::TaskNotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("TASK_NOT_FOUND", "Task not found")),
        ),
        ContactServiceError::GroupNotFound(_) | ContactServiceError::GroupsNotFound => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("GROUP_NOT_FOUND", "Group not found")),
        ),
        err => {
            tracing::error!("Contact operation failed: {}", err);
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

/// Handler for GET /api/v1/contacts.
#[tracing::instrument(skip(state, current_user))]
#[utoipa::path(
    get,
    path = "/api/v1/contacts",
    responses(
        (status = 200, description = "The user's contacts, ordered by first name", body = [ContactJson]),
        (status = 401, description = "No valid session", body = ErrorResponse)
    ),
    tag = "Contacts"
)]
pub async fn list_contacts_handler(
    State(state): State<Arc<ContactState>>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<Vec<ContactJson>>, (StatusCode, Json<ErrorResponse>)> {
    let service = ContactService::new(&state.db);
    let contacts = service
        .list_contacts(current_user.id)
        .await
        .map_err(contact_error_response)?;
    Ok(Json(contacts.into_iter().map(ContactJson::from).collect()))
}

/// Handler for GET /api/v1/contacts/{id}.
#[tracing::instrument(skip(state, current_user))]
#[utoipa::path(
    get,
    path = "/api/v1/contacts/{id}",
    params(("id" = Uuid, Path, description = "Contact ID")),
    responses(
        (status = 200, description = "The contact with its groups, tasks, and history", body = ContactDetailJson),
        (status = 404, description = "Contact not found", body = ErrorResponse)
    ),
    tag = "Contacts"
)]
pub async fn get_contact_handler(
    State(state): State<Arc<ContactState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContactDetailJson>, (StatusCode, Json<ErrorResponse>)> {
    let service = ContactService::new(&state.db);
    let aggregate = service
        .get_contact(id, current_user.id)
        .await
        .map_err(contact_error_response)?;
    Ok(Json(ContactDetailJson::from(aggregate)))
}

/// Handler for POST /api/v1/contacts.
#[tracing::instrument(skip(state, current_user, payload))]
#[utoipa::path(
    post,
    path = "/api/v1/contacts",
    request_body = CreateContactRequest,
    responses(
        (status = 201, description = "Contact created", body = ContactDetailJson),
        (status = 401, description = "No valid session", body = ErrorResponse)
    ),
    tag = "Contacts"
)]
pub async fn create_contact_handler(
    State(state): State<Arc<ContactState>>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<CreateContactRequest>,
) -> Result<(StatusCode, Json<ContactDetailJson>), (StatusCode, Json<ErrorResponse>)> {
    let service = ContactService::new(&state.db);
    let aggregate = service
        .create_contact(NewContact::from(payload), current_user.id)
        .await
        .map_err(contact_error_response)?;
    Ok((StatusCode::CREATED, Json(ContactDetailJson::from(aggregate))))
}

/// Handler for PATCH /api/v1/contacts.
#[tracing::instrument(skip(state, current_user, payload))]
#[utoipa::path(
    patch,
    path = "/api/v1/contacts",
    request_body = UpdateContactRequest,
    responses(
        (status = 200, description = "Contact updated", body = ContactDetailJson),
        (status = 404, description = "Contact not found", body = ErrorResponse)
    ),
    tag = "Contacts"
)]
pub async fn update_contact_handler(
    State(state): State<Arc<ContactState>>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<UpdateContactRequest>,
) -> Result<Json<ContactDetailJson>, (StatusCode, Json<ErrorResponse>)> {
    let service = ContactService::new(&state.db);
    let aggregate = service
        .update_contact(ContactPatch::from(payload), current_user.id)
        .await
        .map_err(contact_error_response)?;
    Ok(Json(ContactDetailJson::from(aggregate)))
}

/// Handler for POST /api/v1/contacts/{id}/notes.
#[tracing::instrument(skip(state, current_user, payload))]
#[utoipa::path(
    post,
    path = "/api/v1/contacts/{id}/notes",
    params(("id" = Uuid, Path, description = "Contact ID")),
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note recorded", body = ContactDetailJson),
        (status = 404, description = "Contact not found", body = ErrorResponse)
    ),
    tag = "Contacts"
)]
pub async fn create_note_handler(
    State(state): State<Arc<ContactState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<ContactDetailJson>), (StatusCode, Json<ErrorResponse>)> {
    let service = ContactService::new(&state.db);
    let aggregate = service
        .add_note(id, current_user.id, payload.note)
        .await
        .map_err(contact_error_response)?;
    Ok((StatusCode::CREATED, Json(ContactDetailJson::from(aggregate))))
}

/// Handler for POST /api/v1/contacts/{id}/tasks.
#[tracing::instrument(skip(state, current_user, payload))]
#[utoipa::path(
    post,
    path = "/api/v1/contacts/{id}/tasks",
    params(("id" = Uuid, Path, description = "Contact ID")),
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = ContactDetailJson),
        (status = 404, description = "Contact not found", body = ErrorResponse)
    ),
    tag = "Contacts"
)]
pub async fn create_task_handler(
    State(state): State<Arc<ContactState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<ContactDetailJson>), (StatusCode, Json<ErrorResponse>)> {
    let service = ContactService::new(&state.db);
    let task = NewTask {
        name: payload.name,
        description: payload.description,
        due_at: payload.due_at,
    };
    let aggregate = service
        .create_task(id, current_user.id, task)
        .await
        .map_err(contact_error_response)?;
    Ok((StatusCode::CREATED, Json(ContactDetailJson::from(aggregate))))
}

/// Handler for PATCH /api/v1/contacts/{id}/tasks/{task_id}.
#[tracing::instrument(skip(state, current_user, payload))]
#[utoipa::path(
    patch,
    path = "/api/v1/contacts/{id}/tasks/{task_id}",
    params(
        ("id" = Uuid, Path, description = "Contact ID"),
        ("task_id" = Uuid, Path, description = "Task ID")
    ),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = ContactDetailJson),
        (status = 404, description = "Contact or task not found", body = ErrorResponse)
    ),
    tag = "Contacts"
)]
pub async fn update_task_handler(
    State(state): State<Arc<ContactState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path((id, task_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<ContactDetailJson>, (StatusCode, Json<ErrorResponse>)> {
    let service = ContactService::new(&state.db);
    let aggregate = service
        .update_task(id, task_id, current_user.id, payload.status)
        .await
        .map_err(contact_error_response)?;
    Ok(Json(ContactDetailJson::from(aggregate)))
}

/// Handler for PATCH /api/v1/contacts/{id}/groups.
#[tracing::instrument(skip(state, current_user, payload))]
#[utoipa::path(
    patch,
    path = "/api/v1/contacts/{id}/groups",
    params(("id" = Uuid, Path, description = "Contact ID")),
    request_body = AddGroupsRequest,
    responses(
        (status = 200, description = "Groups attached", body = ContactDetailJson),
        (status = 404, description = "Contact or groups not found", body = ErrorResponse)
    ),
    tag = "Contacts"
)]
pub async fn add_groups_handler(
    State(state): State<Arc<ContactState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddGroupsRequest>,
) -> Result<Json<ContactDetailJson>, (StatusCode, Json<ErrorResponse>)> {
    let service = ContactService::new(&state.db);
    let aggregate = service
        .add_groups(id, current_user.id, payload.group_ids)
        .await
        .map_err(contact_error_response)?;
    Ok(Json(ContactDetailJson::from(aggregate)))
}

/// Handler for DELETE /api/v1/contacts/{id}/groups/{group_id}.
#[tracing::instrument(skip(state, current_user))]
#[utoipa::path(
    delete,
    path = "/api/v1/contacts/{id}/groups/{group_id}",
    params(
        ("id" = Uuid, Path, description = "Contact ID"),
        ("group_id" = Uuid, Path, description = "Group ID")
    ),
    responses(
        (status = 200, description = "Group detached", body = ContactDetailJson),
        (status = 404, description = "Contact or group not found", body = ErrorResponse)
    ),
    tag = "Contacts"
)]
pub async fn remove_group_handler(
    State(state): State<Arc<ContactState>>,
    Extension(current_user): Extension<CurrentUser>,
    Path((id, group_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ContactDetailJson>, (StatusCode, Json<ErrorResponse>)> {
    let service = ContactService::new(&state.db);
    let aggregate = service
        .remove_group(id, current_user.id, group_id)
        .await
        .map_err(contact_error_response)?;
    Ok(Json(ContactDetailJson::from(aggregate)))
}
