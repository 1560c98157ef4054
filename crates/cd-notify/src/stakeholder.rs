//! Stakeholder Resolver
//!
//! Looks up the phone numbers of everyone with a stake in a complaint.
//! The four lookups run concurrently and a failing lookup only empties its
//! own slot.

use async_trait::async_trait;
use tracing::warn;

use crate::ComplaintSnapshot;

/// Directory of user phone numbers.
///
/// Implementations return only numbers of active users who accept WhatsApp
/// notifications.
#[async_trait]
pub trait StakeholderDirectory: Send + Sync {
    /// Phone of a single user, `None` when the user or the phone is missing
    async fn user_phone(&self, user_id: &str) -> anyhow::Result<Option<String>>;

    /// Phones of active managers belonging to the department
    async fn department_manager_phones(&self, department_id: &str) -> anyhow::Result<Vec<String>>;

    /// Phones of all active admins
    async fn admin_phones(&self) -> anyhow::Result<Vec<String>>;
}

/// Phones of the four stakeholder buckets of a complaint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StakeholderPhones {
    pub client: Option<String>,
    pub assignee: Option<String>,
    pub managers: Vec<String>,
    pub admins: Vec<String>,
}

/// Resolve stakeholder phones for a complaint. Never fails.
pub async fn resolve_stakeholders(
    directory: &dyn StakeholderDirectory,
    complaint: &ComplaintSnapshot,
) -> StakeholderPhones {
    let client = directory.user_phone(&complaint.client_id);

    let assignee = async {
        match complaint.assignee_id.as_deref() {
            Some(id) => directory.user_phone(id).await,
            None => Ok(None),
        }
    };

    let managers = async {
        match complaint.department_id.as_deref() {
            Some(id) => directory.department_manager_phones(id).await,
            None => Ok(Vec::new()),
        }
    };

    let admins = directory.admin_phones();

    let (client, assignee, managers, admins) = tokio::join!(client, assignee, managers, admins);

    StakeholderPhones {
        client: single_or_none(client, "client", &complaint.id),
        assignee: single_or_none(assignee, "assignee", &complaint.id),
        managers: list_or_empty(managers, "managers", &complaint.id),
        admins: list_or_empty(admins, "admins", &complaint.id),
    }
}

fn single_or_none(
    result: anyhow::Result<Option<String>>,
    bucket: &str,
    complaint_id: &str,
) -> Option<String> {
    match result {
        Ok(phone) => phone.filter(|p| !p.trim().is_empty()),
        Err(e) => {
            warn!(bucket, complaint_id, error = %e, "Stakeholder lookup failed");
            None
        }
    }
}

fn list_or_empty(
    result: anyhow::Result<Vec<String>>,
    bucket: &str,
    complaint_id: &str,
) -> Vec<String> {
    match result {
        Ok(phones) => phones.into_iter().filter(|p| !p.trim().is_empty()).collect(),
        Err(e) => {
            warn!(bucket, complaint_id, error = %e, "Stakeholder lookup failed");
            Vec::new()
        }
    }
}
