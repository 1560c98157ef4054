//! Authorization
//!
//! Every handler asks one question: `can(actor, action, resource)`.
//!
//! | role | complaints |
//! |---|---|
//! | admin | all |
//! | manager | those in their department |
//! | employee | those currently assigned to them |
//! | client | their own |

use cd_common::{ComplaintStatus, UserRole};
use cd_notify::Actor;

use crate::shared::error::{PlatformError, Result};
use crate::{Comment, Complaint, User};

/// The signed-in user behind a request, rebuilt from the user record
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub department_id: Option<String>,
}

impl AuthContext {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            department_id: user.department_id.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_manager(&self) -> bool {
        self.role == UserRole::Manager
    }

    pub fn is_client(&self) -> bool {
        self.role == UserRole::Client
    }

    fn manages(&self, department_id: &str) -> bool {
        self.is_manager() && self.department_id.as_deref() == Some(department_id)
    }

    fn in_department(&self, department_id: Option<&str>) -> bool {
        department_id.is_some() && self.department_id.as_deref() == department_id
    }

    /// Identity stamped on notifications
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    Assign,
    ChangeStatus,
    Bulk,
    Comment,
    CommentInternal,
    ViewInternal,
    /// Admin-only fields and endpoints (role, department, activation, settings)
    Manage,
}

#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Complaint(&'a Complaint),
    /// The complaint collection: listing, creating, bulk actions
    Complaints,
    Assignment {
        complaint: &'a Complaint,
        assignee: &'a User,
    },
    Comment {
        complaint: &'a Complaint,
        comment: &'a Comment,
    },
    User(&'a User),
    Users,
    Team {
        department_id: Option<&'a str>,
    },
    Department,
    NatureType,
    Settings,
    Upload,
    Messaging,
}

pub fn can(actor: &AuthContext, action: Action, resource: &Resource<'_>) -> bool {
    if actor.is_admin() {
        return match resource {
            // an admin cannot remove their own account
            Resource::User(user) if action == Action::Delete => user.id != actor.user_id,
            _ => true,
        };
    }

    match resource {
        Resource::Complaint(complaint) => can_on_complaint(actor, action, complaint),

        Resource::Complaints => match action {
            Action::Read => true,
            Action::Create => matches!(actor.role, UserRole::Client | UserRole::Manager),
            Action::Bulk => actor.is_manager(),
            _ => false,
        },

        Resource::Assignment { complaint, assignee } => {
            action == Action::Assign
                && actor.manages(&complaint.department_id)
                && actor.in_department(assignee.department_id.as_deref())
        }

        Resource::Comment { complaint, comment } => match action {
            Action::Delete => {
                comment.author_id == actor.user_id || actor.manages(&complaint.department_id)
            }
            Action::Read | Action::Comment => {
                let needed = if comment.is_internal {
                    Action::ViewInternal
                } else {
                    Action::Read
                };
                can_on_complaint(actor, needed, complaint)
            }
            _ => false,
        },

        Resource::User(user) => match action {
            Action::Read => {
                user.id == actor.user_id
                    || (actor.is_manager() && actor.in_department(user.department_id.as_deref()))
            }
            Action::Update => user.id == actor.user_id,
            _ => false,
        },

        Resource::Users => action == Action::Read && actor.is_manager(),

        Resource::Team { department_id } => {
            action == Action::Read
                && actor.role.can_be_assignee()
                && actor.in_department(*department_id)
        }

        Resource::Department => action == Action::Read,

        Resource::NatureType => match action {
            Action::Read => true,
            Action::Create => actor.is_manager(),
            _ => false,
        },

        Resource::Upload => action == Action::Create,

        Resource::Settings | Resource::Messaging => false,
    }
}

fn can_on_complaint(actor: &AuthContext, action: Action, complaint: &Complaint) -> bool {
    let owner = complaint.client_id == actor.user_id;
    let assignee = complaint.is_assigned_to(&actor.user_id);
    let manager = actor.manages(&complaint.department_id);

    match actor.role {
        UserRole::Admin => true,
        UserRole::Manager => manager,
        UserRole::Employee => {
            assignee
                && matches!(
                    action,
                    Action::Read
                        | Action::ChangeStatus
                        | Action::Comment
                        | Action::CommentInternal
                        | Action::ViewInternal
                )
        }
        UserRole::Client => match action {
            Action::Read | Action::ChangeStatus | Action::Comment => owner,
            Action::Update => owner && complaint.status == ComplaintStatus::New,
            _ => false,
        },
    }
}

/// `can` or 403
pub fn require(actor: &AuthContext, action: Action, resource: &Resource<'_>) -> Result<()> {
    if can(actor, action, resource) {
        Ok(())
    } else {
        Err(PlatformError::forbidden(format!(
            "{} may not {:?} {}",
            actor.role,
            action,
            resource_name(resource)
        )))
    }
}

/// Like `require`, but for reads that should not reveal the target exists
pub fn require_visible(actor: &AuthContext, resource: &Resource<'_>, entity: &str, id: &str) -> Result<()> {
    if can(actor, Action::Read, resource) {
        Ok(())
    } else {
        Err(PlatformError::not_found(entity, id))
    }
}

fn resource_name(resource: &Resource<'_>) -> &'static str {
    match resource {
        Resource::Complaint(_) => "this complaint",
        Resource::Complaints => "complaints",
        Resource::Assignment { .. } => "this assignment",
        Resource::Comment { .. } => "this comment",
        Resource::User(_) => "this user",
        Resource::Users => "users",
        Resource::Team { .. } => "this team",
        Resource::Department => "departments",
        Resource::NatureType => "nature types",
        Resource::Settings => "settings",
        Resource::Upload => "uploads",
        Resource::Messaging => "messaging",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(id: &str, role: UserRole, department: Option<&str>) -> AuthContext {
        AuthContext {
            user_id: id.to_string(),
            email: format!("{}@desk.io", id),
            name: id.to_string(),
            role,
            department_id: department.map(String::from),
        }
    }

    fn complaint() -> Complaint {
        Complaint::new("VPN down", "since 9am", "client-1", "it", "emp-1")
    }

    fn user(id: &str, role: UserRole, department: Option<&str>) -> User {
        let mut user = User::new(format!("{}@desk.io", id), id, role, "hash");
        user.id = id.to_string();
        user.department_id = department.map(String::from);
        user
    }

    #[test]
    fn test_admin_can_do_everything_but_delete_self() {
        let admin = ctx("admin", UserRole::Admin, None);
        let c = complaint();
        assert!(can(&admin, Action::Delete, &Resource::Complaint(&c)));
        assert!(can(&admin, Action::Manage, &Resource::Settings));
        assert!(can(&admin, Action::Manage, &Resource::Messaging));

        let me = user("admin", UserRole::Admin, None);
        assert!(!can(&admin, Action::Delete, &Resource::User(&me)));
        let other = user("other", UserRole::Client, None);
        assert!(can(&admin, Action::Delete, &Resource::User(&other)));
    }

    #[test]
    fn test_manager_is_scoped_to_department() {
        let manager = ctx("mgr", UserRole::Manager, Some("it"));
        let outsider = ctx("mgr2", UserRole::Manager, Some("hr"));
        let c = complaint();

        for action in [Action::Read, Action::Update, Action::Delete, Action::ChangeStatus, Action::CommentInternal] {
            assert!(can(&manager, action, &Resource::Complaint(&c)), "{action:?}");
            assert!(!can(&outsider, action, &Resource::Complaint(&c)), "{action:?}");
        }
        assert!(can(&manager, Action::Bulk, &Resource::Complaints));
        assert!(!can(&manager, Action::Manage, &Resource::Settings));
    }

    #[test]
    fn test_manager_assigns_only_within_department() {
        let manager = ctx("mgr", UserRole::Manager, Some("it"));
        let c = complaint();
        let colleague = user("emp-2", UserRole::Employee, Some("it"));
        let stranger = user("emp-3", UserRole::Employee, Some("hr"));

        assert!(can(&manager, Action::Assign, &Resource::Assignment { complaint: &c, assignee: &colleague }));
        assert!(!can(&manager, Action::Assign, &Resource::Assignment { complaint: &c, assignee: &stranger }));
    }

    #[test]
    fn test_employee_works_on_assigned_complaints_only() {
        let assignee = ctx("emp-1", UserRole::Employee, Some("it"));
        let colleague = ctx("emp-2", UserRole::Employee, Some("it"));
        let c = complaint();

        assert!(can(&assignee, Action::Read, &Resource::Complaint(&c)));
        assert!(can(&assignee, Action::ChangeStatus, &Resource::Complaint(&c)));
        assert!(can(&assignee, Action::CommentInternal, &Resource::Complaint(&c)));
        assert!(!can(&assignee, Action::Update, &Resource::Complaint(&c)));
        assert!(!can(&assignee, Action::Delete, &Resource::Complaint(&c)));
        assert!(!can(&colleague, Action::Read, &Resource::Complaint(&c)));
        assert!(!can(&assignee, Action::Create, &Resource::Complaints));
    }

    #[test]
    fn test_client_owns_complaints() {
        let owner = ctx("client-1", UserRole::Client, None);
        let stranger = ctx("client-2", UserRole::Client, None);
        let mut c = complaint();

        assert!(can(&owner, Action::Read, &Resource::Complaint(&c)));
        assert!(can(&owner, Action::Update, &Resource::Complaint(&c)));
        assert!(can(&owner, Action::Create, &Resource::Complaints));
        assert!(!can(&owner, Action::CommentInternal, &Resource::Complaint(&c)));
        assert!(!can(&owner, Action::ViewInternal, &Resource::Complaint(&c)));
        assert!(!can(&stranger, Action::Read, &Resource::Complaint(&c)));

        c.transition_to(ComplaintStatus::InProgress);
        assert!(!can(&owner, Action::Update, &Resource::Complaint(&c)));
    }

    #[test]
    fn test_comment_delete_and_internal_visibility() {
        let c = complaint();
        let mut note = Comment::new(&c.id, "internal note", "emp-1", "Emp", UserRole::Employee);
        note.is_internal = true;

        let owner = ctx("client-1", UserRole::Client, None);
        let author = ctx("emp-1", UserRole::Employee, Some("it"));
        let manager = ctx("mgr", UserRole::Manager, Some("it"));

        let resource = Resource::Comment { complaint: &c, comment: &note };
        assert!(!can(&owner, Action::Read, &resource));
        assert!(can(&author, Action::Read, &resource));
        assert!(can(&author, Action::Delete, &resource));
        assert!(can(&manager, Action::Delete, &resource));
        assert!(!can(&owner, Action::Delete, &resource));
    }

    #[test]
    fn test_users_and_team() {
        let manager = ctx("mgr", UserRole::Manager, Some("it"));
        let employee = ctx("emp-1", UserRole::Employee, Some("it"));
        let client = ctx("client-1", UserRole::Client, None);

        let teammate = user("emp-2", UserRole::Employee, Some("it"));
        assert!(can(&manager, Action::Read, &Resource::User(&teammate)));
        assert!(!can(&manager, Action::Update, &Resource::User(&teammate)));
        assert!(!can(&employee, Action::Read, &Resource::User(&teammate)));

        assert!(can(&employee, Action::Read, &Resource::Team { department_id: Some("it") }));
        assert!(!can(&employee, Action::Read, &Resource::Team { department_id: Some("hr") }));
        assert!(!can(&client, Action::Read, &Resource::Team { department_id: None }));

        let me = user("client-1", UserRole::Client, None);
        assert!(can(&client, Action::Update, &Resource::User(&me)));
        assert!(!can(&client, Action::Manage, &Resource::User(&me)));
    }

    #[test]
    fn test_reference_data() {
        let client = ctx("client-1", UserRole::Client, None);
        let manager = ctx("mgr", UserRole::Manager, Some("it"));

        assert!(can(&client, Action::Read, &Resource::Department));
        assert!(!can(&manager, Action::Create, &Resource::Department));
        assert!(can(&manager, Action::Create, &Resource::NatureType));
        assert!(!can(&manager, Action::Update, &Resource::NatureType));
        assert!(!can(&client, Action::Create, &Resource::NatureType));
        assert!(can(&client, Action::Create, &Resource::Upload));
    }

    #[test]
    fn test_require_maps_to_forbidden() {
        let client = ctx("client-1", UserRole::Client, None);
        let err = require(&client, Action::Manage, &Resource::Settings).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }
}
