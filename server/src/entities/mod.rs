pub mod contact;
pub mod contact_group;
pub mod contact_group_membership;
pub mod contact_history_event;
pub mod contact_task;
pub mod password_reset_request;
pub mod subscription;
pub mod user;
pub mod user_profile;
