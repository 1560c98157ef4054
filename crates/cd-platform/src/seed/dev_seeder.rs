//! Development Data Seeder
//!
//! Fills an empty database with one of every role so the desk can be
//! exercised right away. Runs only in dev mode and only while the users
//! collection is empty.
//!
//! Default credentials (all share DEV_PASSWORD):
//!   Admin:    admin@complaintdesk.local
//!   Manager:  manager@complaintdesk.local
//!   Employee: employee@complaintdesk.local
//!   Client:   client@complaintdesk.local

use cd_common::UserRole;
use mongodb::Database;
use tracing::info;

use crate::auth::password_service::{Argon2Config, PasswordPolicy, PasswordService};
use crate::settings::entity::{AutoRouting, SystemSettings};
use crate::shared::error::Result;
use crate::{
    Department, DepartmentRepository, NatureType, NatureTypeRepository, SettingsRepository, User,
    UserRepository,
};

const DEV_PASSWORD: &str = "DevPassword123!";
const DEV_DOMAIN: &str = "complaintdesk.local";

const NATURE_TYPES: [(&str, &str); 3] = [
    ("Bug", "Something that used to work no longer does"),
    ("Access", "Login, permission or account problems"),
    ("Data Issue", "Wrong, missing or duplicated records"),
];

pub struct DevDataSeeder {
    users: UserRepository,
    departments: DepartmentRepository,
    nature_types: NatureTypeRepository,
    settings: SettingsRepository,
    password_service: PasswordService,
}

impl DevDataSeeder {
    pub fn new(db: &Database) -> Result<Self> {
        Ok(Self {
            users: UserRepository::new(db),
            departments: DepartmentRepository::new(db),
            nature_types: NatureTypeRepository::new(db),
            settings: SettingsRepository::new(db),
            password_service: PasswordService::new(Argon2Config::testing(), PasswordPolicy::default())?,
        })
    }

    /// Seed everything; returns false when users already exist
    pub async fn seed(&self) -> Result<bool> {
        if self.users.count_all().await? > 0 {
            info!("Users present, skipping dev seed");
            return Ok(false);
        }

        info!("=== DEV DATA SEEDER ===");

        let hash = self.password_service.hash_password(DEV_PASSWORD)?;

        let admin = User::new(email("admin"), "Dev Admin", UserRole::Admin, hash.clone());
        self.users.insert(&admin).await?;

        let mut department = Department::new("Support").with_description("First-line support");
        let manager = User::new(email("manager"), "Dev Manager", UserRole::Manager, hash.clone())
            .with_department(&department.id);
        let employee = User::new(email("employee"), "Dev Employee", UserRole::Employee, hash.clone())
            .with_department(&department.id);
        let client = User::new(email("client"), "Dev Client", UserRole::Client, hash);

        department.manager_id = Some(manager.id.clone());
        department.default_assignee_id = Some(employee.id.clone());
        self.departments.insert(&department).await?;
        info!("Created department: {}", department.name);

        for user in [&manager, &employee, &client] {
            self.users.insert(user).await?;
        }

        for (name, description) in NATURE_TYPES {
            let nature_type = NatureType::new(name, &admin.id).with_description(description);
            self.nature_types.insert(&nature_type).await?;
        }
        info!("Created {} nature types", NATURE_TYPES.len());

        self.settings
            .save(&SystemSettings {
                auto_routing: AutoRouting {
                    enabled: true,
                    departments: vec![department.id.clone()],
                },
                default_department: Some(department.id.clone()),
                updated_by: Some(admin.id.clone()),
                ..SystemSettings::default()
            })
            .await?;

        info!("Default logins (password {}):", DEV_PASSWORD);
        for user in [&admin, &manager, &employee, &client] {
            info!("  {:<8} {}", user.role.as_str(), user.email);
        }
        info!("=======================");

        Ok(true)
    }
}

fn email(local: &str) -> String {
    format!("{}@{}", local, DEV_DOMAIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_emails_are_valid() {
        for local in ["admin", "manager", "employee", "client"] {
            assert!(crate::user::entity::is_valid_email(&email(local)));
        }
    }

    #[test]
    fn test_dev_password_satisfies_policy() {
        assert!(PasswordPolicy::default().validate(DEV_PASSWORD).is_ok());
    }
}
