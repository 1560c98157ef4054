//! Test helpers

use cd_common::UserRole;
use mongodb::{options::ClientOptions, Client, Database};

use crate::shared::authorization::AuthContext;

/// A database handle that never connects.
///
/// For use cases whose tests must not reach the repository; any query
/// against it times out on server selection.
pub fn offline_database() -> Database {
    let client = Client::with_options(ClientOptions::default()).expect("default client options");
    client.database("complaint_desk_test")
}

pub fn actor(id: &str, role: UserRole, department: Option<&str>) -> AuthContext {
    AuthContext {
        user_id: id.to_string(),
        email: format!("{}@desk.io", id),
        name: id.to_string(),
        role,
        department_id: department.map(String::from),
    }
}
