use chrono::{Duration, Utc};
use rolodex_server::contact::{ContactService, ContactServiceError, NewContact, NewTask};
use rolodex_server::entities::contact_history_event::ContactHistoryEventType;
use rolodex_server::entities::contact_task::TaskStatus;
use rolodex_server::group::GroupService;
use sea_orm::DatabaseConnection;
use sea_orm::prelude::DateTimeWithTimeZone;
use testcontainers_modules::{postgres, testcontainers};
use uuid::Uuid;

mod common;

pub struct TestContext {
    #[allow(dead_code)] // container is kept to ensure it's not dropped
    pub container: testcontainers::ContainerAsync<postgres::Postgres>,
    pub db: DatabaseConnection,
}

async fn setup() -> anyhow::Result<TestContext> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    let container = common::setup_container().await?;
    let db = common::setup_db(&container).await?;
    Ok(TestContext { db, container })
}

fn new_contact(first_name: &str, last_name: &str) -> NewContact {
    NewContact {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        ..Default::default()
    }
}

fn due_in(days: i64) -> DateTimeWithTimeZone {
    (Utc::now() + Duration::days(days)).into()
}

fn task_named(name: &str, days: i64) -> NewTask {
    NewTask {
        name: name.to_string(),
        description: None,
        due_at: due_in(days),
    }
}

#[tokio::test]
async fn can_create_contact_with_created_event() {
    let state = setup().await.expect("Failed to setup test context");
    let user = common::create_user(&state.db, "owner@example.com")
        .await
        .expect("Failed to create user");
    let service = ContactService::new(&state.db);

    let aggregate = service
        .create_contact(new_contact("Ada", "Lovelace"), user.id)
        .await
        .expect("Failed to create contact");

    assert_eq!(aggregate.contact.first_name, "Ada");
    assert_eq!(aggregate.contact.last_name, "Lovelace");
    assert!(aggregate.groups.is_empty());
    assert!(aggregate.tasks.is_empty());
    assert_eq!(aggregate.history_events.len(), 1);
    assert_eq!(
        aggregate.history_events[0].event_type,
        ContactHistoryEventType::Created
    );
}

#[tokio::test]
async fn can_scope_contacts_to_their_owner() {
    let state = setup().await.expect("Failed to setup test context");
    let owner = common::create_user(&state.db, "owner@example.com")
        .await
        .expect("Failed to create user");
    let stranger = common::create_user(&state.db, "stranger@example.com")
        .await
        .expect("Failed to create user");
    let service = ContactService::new(&state.db);

    let aggregate = service
        .create_contact(new_contact("Ada", "Lovelace"), owner.id)
        .await
        .expect("Failed to create contact");

    let result = service.get_contact(aggregate.contact.id, stranger.id).await;
    assert!(matches!(
        result,
        Err(ContactServiceError::ContactNotFound(_))
    ));
}

#[tokio::test]
async fn can_list_contacts_ordered_by_first_name() {
    let state = setup().await.expect("Failed to setup test context");
    let user = common::create_user(&state.db, "owner@example.com")
        .await
        .expect("Failed to create user");
    let service = ContactService::new(&state.db);

    for (first, last) in [("Charles", "Babbage"), ("Ada", "Lovelace"), ("Blaise", "Pascal")] {
        service
            .create_contact(new_contact(first, last), user.id)
            .await
            .expect("Failed to create contact");
    }

    let contacts = service
        .list_contacts(user.id)
        .await
        .expect("Failed to list contacts");
    let first_names: Vec<&str> = contacts
        .iter()
        .map(|contact| contact.first_name.as_str())
        .collect();
    assert_eq!(first_names, vec!["Ada", "Blaise", "Charles"]);
}

#[tokio::test]
async fn can_patch_only_provided_contact_fields() {
    let state = setup().await.expect("Failed to setup test context");
    let user = common::create_user(&state.db, "owner@example.com")
        .await
        .expect("Failed to create user");
    let service = ContactService::new(&state.db);

    let mut contact = new_contact("Ada", "Lovelace");
    contact.job_title = Some("Analyst".to_string());
    let created = service
        .create_contact(contact, user.id)
        .await
        .expect("Failed to create contact");

    let patch = rolodex_server::contact::ContactPatch {
        id: created.contact.id,
        last_name: Some("King".to_string()),
        ..Default::default()
    };
    let updated = service
        .update_contact(patch, user.id)
        .await
        .expect("Failed to update contact");

    assert_eq!(updated.contact.first_name, "Ada");
    assert_eq!(updated.contact.last_name, "King");
    assert_eq!(updated.contact.job_title.as_deref(), Some("Analyst"));
    assert_eq!(
        updated.history_events[0].event_type,
        ContactHistoryEventType::Updated
    );
}

#[tokio::test]
async fn can_keep_tasks_in_due_date_order() {
    let state = setup().await.expect("Failed to setup test context");
    let user = common::create_user(&state.db, "owner@example.com")
        .await
        .expect("Failed to create user");
    let service = ContactService::new(&state.db);

    let created = service
        .create_contact(new_contact("Ada", "Lovelace"), user.id)
        .await
        .expect("Failed to create contact");
    let contact_id = created.contact.id;

    // Deliberately out of order: middle, earliest, latest.
    service
        .create_task(contact_id, user.id, task_named("middle", 2))
        .await
        .expect("Failed to create task");
    service
        .create_task(contact_id, user.id, task_named("earliest", 1))
        .await
        .expect("Failed to create task");
    let aggregate = service
        .create_task(contact_id, user.id, task_named("latest", 3))
        .await
        .expect("Failed to create task");

    let names: Vec<&str> = aggregate
        .tasks
        .iter()
        .map(|task| task.name.as_str())
        .collect();
    assert_eq!(names, vec!["earliest", "middle", "latest"]);
    assert!(
        aggregate
            .tasks
            .windows(2)
            .all(|pair| pair[0].due_at <= pair[1].due_at)
    );
}

#[tokio::test]
async fn can_record_exactly_one_event_per_mutation() {
    let state = setup().await.expect("Failed to setup test context");
    let user = common::create_user(&state.db, "owner@example.com")
        .await
        .expect("Failed to create user");
    let contact_service = ContactService::new(&state.db);
    let group_service = GroupService::new(&state.db);

    let created = contact_service
        .create_contact(new_contact("Ada", "Lovelace"), user.id)
        .await
        .expect("Failed to create contact");
    let contact_id = created.contact.id;
    assert_eq!(created.history_events.len(), 1);

    let updated = contact_service
        .update_contact(
            rolodex_server::contact::ContactPatch {
                id: contact_id,
                suffix: Some("Countess".to_string()),
                ..Default::default()
            },
            user.id,
        )
        .await
        .expect("Failed to update contact");
    assert_eq!(updated.history_events.len(), 2);

    let noted = contact_service
        .add_note(contact_id, user.id, "Met at the symposium".to_string())
        .await
        .expect("Failed to add note");
    assert_eq!(noted.history_events.len(), 3);
    assert_eq!(
        noted.history_events[0].event_type,
        ContactHistoryEventType::Note
    );
    assert_eq!(
        noted.history_events[0].note.as_deref(),
        Some("Met at the symposium")
    );

    let with_task = contact_service
        .create_task(contact_id, user.id, task_named("Call", 1))
        .await
        .expect("Failed to create task");
    assert_eq!(with_task.history_events.len(), 4);
    assert_eq!(
        with_task.history_events[0].event_type,
        ContactHistoryEventType::TaskCreated
    );

    let group = group_service
        .create_group(user.id, "Friends".to_string())
        .await
        .expect("Failed to create group");
    let grouped = contact_service
        .add_groups(contact_id, user.id, vec![group.id])
        .await
        .expect("Failed to add groups");
    assert_eq!(grouped.history_events.len(), 5);
    assert_eq!(
        grouped.history_events[0].note.as_deref(),
        Some("Added to groups: Friends")
    );

    let ungrouped = contact_service
        .remove_group(contact_id, user.id, group.id)
        .await
        .expect("Failed to remove group");
    assert_eq!(ungrouped.history_events.len(), 6);
    assert_eq!(
        ungrouped.history_events[0].event_type,
        ContactHistoryEventType::GroupRemoved
    );
    assert_eq!(
        ungrouped.history_events[0].note.as_deref(),
        Some("Removed from group: Friends")
    );
    assert!(ungrouped.groups.is_empty());
}

#[tokio::test]
async fn can_skip_event_when_groups_already_attached() {
    let state = setup().await.expect("Failed to setup test context");
    let user = common::create_user(&state.db, "owner@example.com")
        .await
        .expect("Failed to create user");
    let contact_service = ContactService::new(&state.db);
    let group_service = GroupService::new(&state.db);

    let created = contact_service
        .create_contact(new_contact("Ada", "Lovelace"), user.id)
        .await
        .expect("Failed to create contact");
    let group = group_service
        .create_group(user.id, "Friends".to_string())
        .await
        .expect("Failed to create group");

    let first = contact_service
        .add_groups(created.contact.id, user.id, vec![group.id])
        .await
        .expect("Failed to add groups");
    assert_eq!(first.groups.len(), 1);
    assert_eq!(first.history_events.len(), 2);

    // Re-adding the same group changes nothing: no join row, no event.
    let second = contact_service
        .add_groups(created.contact.id, user.id, vec![group.id])
        .await
        .expect("Failed to re-add groups");
    assert_eq!(second.groups.len(), 1);
    assert_eq!(second.history_events.len(), 2);
}

#[tokio::test]
async fn can_reject_groups_that_do_not_exist() {
    let state = setup().await.expect("Failed to setup test context");
    let user = common::create_user(&state.db, "owner@example.com")
        .await
        .expect("Failed to create user");
    let service = ContactService::new(&state.db);

    let created = service
        .create_contact(new_contact("Ada", "Lovelace"), user.id)
        .await
        .expect("Failed to create contact");

    let result = service
        .add_groups(created.contact.id, user.id, vec![Uuid::new_v4()])
        .await;
    assert!(matches!(result, Err(ContactServiceError::GroupsNotFound)));
}

#[tokio::test]
async fn can_record_event_only_when_task_marked_done() {
    let state = setup().await.expect("Failed to setup test context");
    let user = common::create_user(&state.db, "owner@example.com")
        .await
        .expect("Failed to create user");
    let service = ContactService::new(&state.db);

    let created = service
        .create_contact(new_contact("Ada", "Lovelace"), user.id)
        .await
        .expect("Failed to create contact");
    let with_task = service
        .create_task(created.contact.id, user.id, task_named("Call", 1))
        .await
        .expect("Failed to create task");
    let task_id = with_task.tasks[0].id;
    let events_before = with_task.history_events.len();

    // Re-asserting PENDING records no event.
    let still_pending = service
        .update_task(created.contact.id, task_id, user.id, TaskStatus::Pending)
        .await
        .expect("Failed to update task");
    assert_eq!(still_pending.history_events.len(), events_before);

    let done = service
        .update_task(created.contact.id, task_id, user.id, TaskStatus::Done)
        .await
        .expect("Failed to update task");
    assert_eq!(done.tasks[0].status, TaskStatus::Done);
    assert_eq!(done.history_events.len(), events_before + 1);
    assert_eq!(
        done.history_events[0].event_type,
        ContactHistoryEventType::TaskUpdated
    );
    assert_eq!(
        done.history_events[0].note.as_deref(),
        Some("Task \"Call\" marked as done")
    );
}

#[tokio::test]
async fn can_handle_update_when_task_not_found() {
    let state = setup().await.expect("Failed to setup test context");
    let user = common::create_user(&state.db, "owner@example.com")
        .await
        .expect("Failed to create user");
    let service = ContactService::new(&state.db);

    let created = service
        .create_contact(new_contact("Ada", "Lovelace"), user.id)
        .await
        .expect("Failed to create contact");

    let result = service
        .update_task(created.contact.id, Uuid::new_v4(), user.id, TaskStatus::Done)
        .await;
    assert!(matches!(result, Err(ContactServiceError::TaskNotFound(_))));
}
