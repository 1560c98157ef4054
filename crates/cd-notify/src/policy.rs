//! Recipient Policy
//!
//! | event | recipients |
//! |---|---|
//! | created, assigned, reassigned | assignee, managers, admins |
//! | status_changed, comment_added | every bucket except the actor's own role bucket |
//! | anything else | managers, admins |
//!
//! The exclusion drops the whole bucket: a manager commenting silences
//! every manager of the department, not only themselves.

use cd_common::{NotificationEvent, UserRole};
use indexmap::IndexSet;

use crate::stakeholder::StakeholderPhones;

/// Compute the deduplicated recipient list for an event.
///
/// Order is client, assignee, managers, admins; the first occurrence of a
/// number wins. Values are trimmed and blanks dropped.
pub fn select_recipients(
    event: &NotificationEvent,
    actor_role: Option<UserRole>,
    phones: &StakeholderPhones,
) -> Vec<String> {
    let mut recipients = IndexSet::new();

    match event {
        NotificationEvent::Created
        | NotificationEvent::Assigned
        | NotificationEvent::Reassigned => {
            add(&mut recipients, phones.assignee.as_deref());
            add_all(&mut recipients, &phones.managers);
            add_all(&mut recipients, &phones.admins);
        }
        NotificationEvent::StatusChanged | NotificationEvent::CommentAdded => {
            let excluded = |role: UserRole| actor_role == Some(role);

            if !excluded(UserRole::Client) {
                add(&mut recipients, phones.client.as_deref());
            }
            if !excluded(UserRole::Employee) {
                add(&mut recipients, phones.assignee.as_deref());
            }
            if !excluded(UserRole::Manager) {
                add_all(&mut recipients, &phones.managers);
            }
            if !excluded(UserRole::Admin) {
                add_all(&mut recipients, &phones.admins);
            }
        }
        NotificationEvent::Other(_) => {
            add_all(&mut recipients, &phones.managers);
            add_all(&mut recipients, &phones.admins);
        }
    }

    recipients.into_iter().collect()
}

fn add(recipients: &mut IndexSet<String>, phone: Option<&str>) {
    if let Some(phone) = phone.map(str::trim).filter(|p| !p.is_empty()) {
        recipients.insert(phone.to_string());
    }
}

fn add_all(recipients: &mut IndexSet<String>, phones: &[String]) {
    for phone in phones {
        add(recipients, Some(phone));
    }
}
