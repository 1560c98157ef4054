//! Complaint Routing
//!
//! Picks the department and first assignee of a new complaint.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::settings::entity::SystemSettings;
use crate::{Department, User};

/// Choose a department from the active ones (sorted by name).
///
/// Auto-routing picks uniformly among its configured departments that are
/// still active; otherwise the default department when active; otherwise
/// the first active department.
pub fn choose_department<'a, R: Rng + ?Sized>(
    settings: &SystemSettings,
    active: &'a [Department],
    rng: &mut R,
) -> Option<&'a Department> {
    if settings.auto_routing.enabled {
        let candidates: Vec<&Department> = active
            .iter()
            .filter(|d| settings.auto_routing.departments.contains(&d.id))
            .collect();
        if let Some(department) = candidates.choose(rng) {
            return Some(*department);
        }
    }

    if let Some(default_id) = &settings.default_department {
        if let Some(department) = active.iter().find(|d| &d.id == default_id) {
            return Some(department);
        }
    }

    active.first()
}

/// The manager when active and manager-role, else the default assignee
/// when it can hold complaints.
pub fn pick_assignee<'a>(manager: Option<&'a User>, default_assignee: Option<&'a User>) -> Option<&'a User> {
    manager
        .filter(|m| m.is_active && m.role == cd_common::UserRole::Manager)
        .or_else(|| default_assignee.filter(|u| u.can_hold_complaints()))
}
