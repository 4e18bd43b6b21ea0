use crate::entities::contact_history_event::ContactHistoryEventType;
use crate::entities::contact_task::TaskStatus;
use crate::entities::*;
use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::*;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

pub mod api;

/// Shared state for contact routers.
#[derive(Clone)]
pub struct ContactState {
    pub db: Arc<sea_orm::DatabaseConnection>,
}

/// A contact together with its sub-resources, shaped the way callers consume it:
/// groups by name, tasks in ascending due-date order, history events newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactAggregate {
    pub contact: contact::Model,
    pub groups: Vec<GroupRef>,
    pub tasks: Vec<contact_task::Model>,
    pub history_events: Vec<contact_history_event::Model>,
}

/// Identifier and display name of a group a contact belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRef {
    pub id: Uuid,
    pub name: String,
}

impl From<contact_group::Model> for GroupRef {
    fn from(model: contact_group::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

/// Fields accepted when creating a contact.
#[derive(Debug, Clone, Default)]
pub struct NewContact {
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
}

/// Partial update of a contact; absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ContactPatch {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
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
}

/// Fields accepted when creating a contact task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub name: String,
    pub description: Option<String>,
    pub due_at: DateTimeWithTimeZone,
}

/// Error type for ContactService operations.
#[derive(Debug, thiserror::Error)]
pub enum ContactServiceError {
    /// Represents a contact lookup that found nothing for the requesting user.
    #[error("Contact with ID {0} not found")]
    ContactNotFound(Uuid),
    /// Represents a task lookup that found nothing on the contact.
    #[error("Task with ID {0} not found")]
    TaskNotFound(Uuid),
    /// Represents a group lookup that found nothing.
    #[error("Group with ID {0} not found")]
    GroupNotFound(Uuid),
    /// Represents a group-add request where none of the IDs resolved.
    #[error("None of the requested groups exist")]
    GroupsNotFound,
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Index at which a task due at `due_at` slots into a list that is already in
/// ascending due-date order: before the first strictly later task, else at the
/// end. Ties land after existing tasks with the same due date.
fn sorted_insert_index(tasks: &[contact_task::Model], due_at: DateTimeWithTimeZone) -> usize {
    tasks
        .iter()
        .position(|task| task.due_at > due_at)
        .unwrap_or(tasks.len())
}

pub struct ContactService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl ContactService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> ContactService {
        ContactService { db }
    }

    /// Retrieves a contact aggregate scoped to its owning user.
    #[tracing::instrument(skip(self))]
    pub async fn get_contact(
        &self,
        contact_id: Uuid,
        user_id: Uuid,
    ) -> Result<ContactAggregate, ContactServiceError> {
        let contact = contact::Entity::find_by_id(contact_id)
            .filter(contact::Column::UserId.eq(user_id))
            .one(self.db)
            .await?
            .ok_or(ContactServiceError::ContactNotFound(contact_id))?;
        self.load_aggregate(contact).await
    }

    /// Retrieves the user's contacts ordered by first name, capped at 100 rows.
    #[tracing::instrument(skip(self))]
    pub async fn list_contacts(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<contact::Model>, ContactServiceError> {
        let contacts = contact::Entity::find()
            .filter(contact::Column::UserId.eq(user_id))
            .order_by_asc(contact::Column::FirstName)
            .limit(100)
            .all(self.db)
            .await?;
        Ok(contacts)
    }

    /// Creates a contact and records its CREATED history event.
    #[tracing::instrument(skip(self, contact))]
    pub async fn create_contact(
        &self,
        contact: NewContact,
        user_id: Uuid,
    ) -> Result<ContactAggregate, ContactServiceError> {
        let created = contact::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            user_id: ActiveValue::Set(user_id),
            first_name: ActiveValue::Set(contact.first_name),
            last_name: ActiveValue::Set(contact.last_name),
            middle_name: ActiveValue::Set(contact.middle_name),
            suffix: ActiveValue::Set(contact.suffix),
            salutation: ActiveValue::Set(contact.salutation),
            work_email: ActiveValue::Set(contact.work_email),
            personal_email: ActiveValue::Set(contact.personal_email),
            work_phone: ActiveValue::Set(contact.work_phone),
            personal_phone: ActiveValue::Set(contact.personal_phone),
            work_address: ActiveValue::Set(contact.work_address),
            personal_address: ActiveValue::Set(contact.personal_address),
            job_title: ActiveValue::Set(contact.job_title),
            background_info: ActiveValue::Set(contact.background_info),
            birthday: ActiveValue::Set(contact.birthday),
            ..Default::default()
        }
        .insert(self.db)
        .await?;

        let event = self
            .record_event(user_id, created.id, ContactHistoryEventType::Created, None)
            .await?;

        Ok(ContactAggregate {
            contact: created,
            groups: Vec::new(),
            tasks: Vec::new(),
            history_events: vec![event],
        })
    }

    /// Applies a partial update to a contact and records an UPDATED event.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_contact(
        &self,
        patch: ContactPatch,
        user_id: Uuid,
    ) -> Result<ContactAggregate, ContactServiceError> {
        let contact = contact::Entity::find_by_id(patch.id)
            .filter(contact::Column::UserId.eq(user_id))
            .one(self.db)
            .await?
            .ok_or(ContactServiceError::ContactNotFound(patch.id))?;

        let mut active_model: contact::ActiveModel = contact.into();
        if let Some(first_name) = patch.first_name {
            active_model.first_name = ActiveValue::Set(first_name);
        }
        if let Some(last_name) = patch.last_name {
            active_model.last_name = ActiveValue::Set(last_name);
        }
        if let Some(middle_name) = patch.middle_name {
            active_model.middle_name = ActiveValue::Set(Some(middle_name));
        }
        if let Some(suffix) = patch.suffix {
            active_model.suffix = ActiveValue::Set(Some(suffix));
        }
        if let Some(salutation) = patch.salutation {
            active_model.salutation = ActiveValue::Set(Some(salutation));
        }
        if let Some(work_email) = patch.work_email {
            active_model.work_email = ActiveValue::Set(Some(work_email));
        }
        if let Some(personal_email) = patch.personal_email {
            active_model.personal_email = ActiveValue::Set(Some(personal_email));
        }
        if let Some(work_phone) = patch.work_phone {
            active_model.work_phone = ActiveValue::Set(Some(work_phone));
        }
        if let Some(personal_phone) = patch.personal_phone {
            active_model.personal_phone = ActiveValue::Set(Some(personal_phone));
        }
        if let Some(work_address) = patch.work_address {
            active_model.work_address = ActiveValue::Set(Some(work_address));
        }
        if let Some(personal_address) = patch.personal_address {
            active_model.personal_address = ActiveValue::Set(Some(personal_address));
        }
        if let Some(job_title) = patch.job_title {
            active_model.job_title = ActiveValue::Set(Some(job_title));
        }
        if let Some(background_info) = patch.background_info {
            active_model.background_info = ActiveValue::Set(Some(background_info));
        }
        if let Some(birthday) = patch.birthday {
            active_model.birthday = ActiveValue::Set(Some(birthday));
        }
        active_model.updated_at = ActiveValue::Set(Utc::now().into());
        let updated = active_model.update(self.db).await?;

        let mut aggregate = self.load_aggregate(updated).await?;
        let event = self
            .record_event(
                user_id,
                aggregate.contact.id,
                ContactHistoryEventType::Updated,
                None,
            )
            .await?;
        aggregate.history_events.insert(0, event);
        Ok(aggregate)
    }

    /// Creates a task on a contact and slots it into the due-date-ordered task
    /// list, then records a TASK_CREATED event. The task insert, the in-memory
    /// reorder, and the event insert are three separate calls; there is no
    /// transaction around them.
    #[tracing::instrument(skip(self, task))]
    pub async fn create_task(
        &self,
        contact_id: Uuid,
        user_id: Uuid,
        task: NewTask,
    ) -> Result<ContactAggregate, ContactServiceError> {
        let mut aggregate = self.get_contact(contact_id, user_id).await?;

        let created = contact_task::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            contact_id: ActiveValue::Set(contact_id),
            name: ActiveValue::Set(task.name),
            description: ActiveValue::Set(task.description),
            due_at: ActiveValue::Set(task.due_at),
            ..Default::default()
        }
        .insert(self.db)
        .await?;

        let index = sorted_insert_index(&aggregate.tasks, created.due_at);
        aggregate.tasks.insert(index, created);

        let event = self
            .record_event(
                user_id,
                contact_id,
                ContactHistoryEventType::TaskCreated,
                None,
            )
            .await?;
        aggregate.history_events.insert(0, event);
        Ok(aggregate)
    }

    /// Updates a task's status in place. Marking a task DONE records a
    /// TASK_UPDATED event naming the task; other status changes record nothing.
    #[tracing::instrument(skip(self))]
    pub async fn update_task(
        &self,
        contact_id: Uuid,
        task_id: Uuid,
        user_id: Uuid,
        status: TaskStatus,
    ) -> Result<ContactAggregate, ContactServiceError> {
        let mut aggregate = self.get_contact(contact_id, user_id).await?;

        let index = aggregate
            .tasks
            .iter()
            .position(|task| task.id == task_id)
            .ok_or(ContactServiceError::TaskNotFound(task_id))?;

        let mut active_model: contact_task::ActiveModel = aggregate.tasks[index].clone().into();
        active_model.status = ActiveValue::Set(status);
        active_model.updated_at = ActiveValue::Set(Utc::now().into());
        let updated = active_model.update(self.db).await?;

        let task_name = updated.name.clone();
        let is_done = updated.status == TaskStatus::Done;
        aggregate.tasks[index] = updated;

        if is_done {
            let event = self
                .record_event(
                    user_id,
                    contact_id,
                    ContactHistoryEventType::TaskUpdated,
                    Some(format!("Task \"{}\" marked as done", task_name)),
                )
                .await?;
            aggregate.history_events.insert(0, event);
        }

        Ok(aggregate)
    }

    /// Records a free-text NOTE event on the contact.
    #[tracing::instrument(skip(self, note))]
    pub async fn add_note(
        &self,
        contact_id: Uuid,
        user_id: Uuid,
        note: String,
    ) -> Result<ContactAggregate, ContactServiceError> {
        let mut aggregate = self.get_contact(contact_id, user_id).await?;

        let event = self
            .record_event(
                user_id,
                contact_id,
                ContactHistoryEventType::Note,
                Some(note),
            )
            .await?;
        aggregate.history_events.insert(0, event);
        Ok(aggregate)
    }

    /// Attaches groups to a contact. IDs already attached are skipped, unknown
    /// IDs are ignored; the remainder is connected and summarized in a single
    /// GROUPS_ADDED event. When nothing is left to add the aggregate is
    /// returned unchanged, without an event.
    #[tracing::instrument(skip(self))]
    pub async fn add_groups(
        &self,
        contact_id: Uuid,
        user_id: Uuid,
        group_ids: Vec<Uuid>,
    ) -> Result<ContactAggregate, ContactServiceError> {
        let mut aggregate = self.get_contact(contact_id, user_id).await?;

        let attached: HashSet<Uuid> = aggregate.groups.iter().map(|group| group.id).collect();
        let group_ids_to_add: Vec<Uuid> = group_ids
            .into_iter()
            .filter(|group_id| !attached.contains(group_id))
            .collect();

        if group_ids_to_add.is_empty() {
            return Ok(aggregate);
        }

        let groups = contact_group::Entity::find()
            .filter(contact_group::Column::Id.is_in(group_ids_to_add))
            .filter(contact_group::Column::UserId.eq(user_id))
            .all(self.db)
            .await?;

        if groups.is_empty() {
            return Err(ContactServiceError::GroupsNotFound);
        }

        for group in &groups {
            contact_group_membership::ActiveModel {
                contact_id: ActiveValue::Set(contact_id),
                group_id: ActiveValue::Set(group.id),
            }
            .insert(self.db)
            .await?;
        }

        let group_names = groups
            .iter()
            .map(|group| group.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let event = self
            .record_event(
                user_id,
                contact_id,
                ContactHistoryEventType::GroupsAdded,
                Some(format!("Added to groups: {}", group_names)),
            )
            .await?;
        aggregate.history_events.insert(0, event);
        aggregate.groups.extend(groups.into_iter().map(GroupRef::from));
        aggregate.groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(aggregate)
    }

    /// Detaches a group from a contact and records a GROUP_REMOVED event
    /// naming the group.
    #[tracing::instrument(skip(self))]
    pub async fn remove_group(
        &self,
        contact_id: Uuid,
        user_id: Uuid,
        group_id: Uuid,
    ) -> Result<ContactAggregate, ContactServiceError> {
        let mut aggregate = self.get_contact(contact_id, user_id).await?;

        contact_group_membership::Entity::delete_by_id((contact_id, group_id))
            .exec(self.db)
            .await?;

        let group = contact_group::Entity::find_by_id(group_id)
            .one(self.db)
            .await?
            .ok_or(ContactServiceError::GroupNotFound(group_id))?;

        aggregate.groups.retain(|attached| attached.id != group_id);

        let event = self
            .record_event(
                user_id,
                contact_id,
                ContactHistoryEventType::GroupRemoved,
                Some(format!("Removed from group: {}", group.name)),
            )
            .await?;
        aggregate.history_events.insert(0, event);
        Ok(aggregate)
    }

    /// Loads the sub-resources of a contact in their canonical orders.
    async fn load_aggregate(
        &self,
        contact: contact::Model,
    ) -> Result<ContactAggregate, ContactServiceError> {
        let groups = contact
            .find_related(contact_group::Entity)
            .order_by_asc(contact_group::Column::Name)
            .all(self.db)
            .await?
            .into_iter()
            .map(GroupRef::from)
            .collect();
        let tasks = contact
            .find_related(contact_task::Entity)
            .order_by_asc(contact_task::Column::DueAt)
            .all(self.db)
            .await?;
        let history_events = contact
            .find_related(contact_history_event::Entity)
            .order_by_desc(contact_history_event::Column::CreatedAt)
            .all(self.db)
            .await?;
        Ok(ContactAggregate {
            contact,
            groups,
            tasks,
            history_events,
        })
    }

    /// Persists one history event row. Every mutation of contact state goes
    /// through here exactly once.
    #[tracing::instrument(skip(self, note))]
    async fn record_event(
        &self,
        user_id: Uuid,
        contact_id: Uuid,
        event_type: ContactHistoryEventType,
        note: Option<String>,
    ) -> Result<contact_history_event::Model, ContactServiceError> {
        let event = contact_history_event::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            contact_id: ActiveValue::Set(contact_id),
            user_id: ActiveValue::Set(user_id),
            event_type: ActiveValue::Set(event_type),
            note: ActiveValue::Set(note),
            ..Default::default()
        }
        .insert(self.db)
        .await?;
        Ok(event)
    }
}
