//! Users API
//!
//! - GET /users - List users (admin: all, manager: own department)
//! - POST /users - Create user (admin)
//! - GET /users/team - Assignable colleagues
//! - GET/PUT/DELETE /users/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use cd_common::UserRole;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::shared::api_common::{non_blank, PaginatedResponse, PaginationParams};
use crate::shared::authorization::{require, require_visible, Action, Resource};
use crate::shared::error::PlatformError;
use crate::shared::middleware::Authenticated;
use crate::shared::tsid::parse_id;
use crate::user::entity::NotificationPreferences;
use crate::user::operations::{
    CreateUserCommand, CreateUserUseCase, DeleteUserUseCase, UpdateUserCommand, UpdateUserUseCase,
};
use crate::user::repository::UserFilter;
use crate::usecase::{MongoUnitOfWork, UseCaseResult};
use crate::{ComplaintRepository, DepartmentRepository, PasswordService, User, UserRepository};

/// User as returned by the API; never carries the password hash
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub department_id: Option<String>,
    pub is_active: bool,
    pub phone: Option<String>,
    pub notification_preferences: NotificationPreferences,
    pub last_login_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role,
            department_id: u.department_id,
            is_active: u.is_active,
            phone: u.phone,
            notification_preferences: u.notification_preferences,
            last_login_at: u.last_login_at.map(|t| t.to_rfc3339()),
            created_at: u.created_at.to_rfc3339(),
            updated_at: u.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UsersQuery {
    pub role: Option<UserRole>,
    pub department_id: Option<String>,
    pub active: Option<bool>,
    /// Case-insensitive match on name or email
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TeamQuery {
    /// Admin only; everyone else gets their own department
    pub department_id: Option<String>,
}

#[derive(Clone)]
pub struct UsersState {
    pub user_repo: Arc<UserRepository>,
    pub department_repo: Arc<DepartmentRepository>,
    pub complaint_repo: Arc<ComplaintRepository>,
    pub password_service: Arc<PasswordService>,
    pub unit_of_work: Arc<MongoUnitOfWork>,
}

async fn load_user(state: &UsersState, id: &str) -> Result<User, PlatformError> {
    let id = parse_id("User", id)?;
    state
        .user_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| PlatformError::not_found("User", id))
}

/// List users
#[utoipa::path(
    get,
    path = "",
    tag = "users",
    operation_id = "getApiUsers",
    params(PaginationParams, UsersQuery),
    responses(
        (status = 200, description = "Page of users", body = PaginatedResponse<UserResponse>),
        (status = 403, description = "Not allowed to list users")
    )
)]
pub async fn list_users(
    State(state): State<UsersState>,
    auth: Authenticated,
    Query(pagination): Query<PaginationParams>,
    Query(query): Query<UsersQuery>,
) -> Result<Json<PaginatedResponse<UserResponse>>, PlatformError> {
    require(&auth, Action::Read, &Resource::Users)?;

    let mut filter = UserFilter {
        role: query.role,
        department_id: non_blank(query.department_id),
        active: query.active,
        search: non_blank(query.search),
    };
    if !auth.is_admin() {
        let Some(department_id) = auth.department_id.clone() else {
            return Ok(Json(PaginatedResponse::new(Vec::new(), pagination.page(), pagination.size(), 0)));
        };
        filter.department_id = Some(department_id);
    }

    let total = state.user_repo.count(&filter).await?;
    let users = state
        .user_repo
        .find_page(&filter, pagination.offset(), pagination.limit())
        .await?;

    Ok(Json(PaginatedResponse::new(
        users.into_iter().map(UserResponse::from).collect(),
        pagination.page(),
        pagination.size(),
        total,
    )))
}

/// Create user
#[utoipa::path(
    post,
    path = "",
    tag = "users",
    operation_id = "postApiUsers",
    request_body = CreateUserCommand,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn create_user(
    State(state): State<UsersState>,
    auth: Authenticated,
    Json(command): Json<CreateUserCommand>,
) -> Result<(StatusCode, Json<UserResponse>), PlatformError> {
    require(&auth, Action::Create, &Resource::Users)?;

    let use_case = CreateUserUseCase::new(
        state.user_repo.clone(),
        state.department_repo.clone(),
        state.password_service.clone(),
        state.unit_of_work.clone(),
    );

    match use_case.execute(command, &auth).await {
        UseCaseResult::Success(user) => Ok((StatusCode::CREATED, Json(user.into()))),
        UseCaseResult::Failure(err) => Err(err.into()),
    }
}

/// Active employees and managers of a department
#[utoipa::path(
    get,
    path = "/team",
    tag = "users",
    operation_id = "getApiUsersTeam",
    params(TeamQuery),
    responses(
        (status = 200, description = "Team members", body = Vec<UserResponse>),
        (status = 403, description = "Not a member of the department")
    )
)]
pub async fn get_team(
    State(state): State<UsersState>,
    auth: Authenticated,
    Query(query): Query<TeamQuery>,
) -> Result<Json<Vec<UserResponse>>, PlatformError> {
    let department_id = match non_blank(query.department_id) {
        Some(id) if auth.is_admin() => Some(id),
        _ => auth.department_id.clone(),
    };

    require(
        &auth,
        Action::Read,
        &Resource::Team {
            department_id: department_id.as_deref(),
        },
    )?;

    let Some(department_id) = department_id else {
        return Err(PlatformError::validation("departmentId is required"));
    };

    let team = state.user_repo.find_team(&department_id).await?;
    Ok(Json(team.into_iter().map(UserResponse::from).collect()))
}

/// Get user
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "users",
    operation_id = "getApiUsersById",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<UsersState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, PlatformError> {
    let user = load_user(&state, &id).await?;
    require_visible(&auth, &Resource::User(&user), "User", &id)?;
    Ok(Json(user.into()))
}

/// Update user
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "users",
    operation_id = "putApiUsersById",
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUserCommand,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 403, description = "Not allowed to change this user or these fields"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn update_user(
    State(state): State<UsersState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(command): Json<UpdateUserCommand>,
) -> Result<Json<UserResponse>, PlatformError> {
    let user = load_user(&state, &id).await?;
    require_visible(&auth, &Resource::User(&user), "User", &id)?;
    require(&auth, Action::Update, &Resource::User(&user))?;

    let use_case = UpdateUserUseCase::new(
        state.user_repo.clone(),
        state.department_repo.clone(),
        state.password_service.clone(),
        state.unit_of_work.clone(),
    );

    match use_case.execute(user, command, &auth).await {
        UseCaseResult::Success(user) => Ok(Json(user.into())),
        UseCaseResult::Failure(err) => Err(err.into()),
    }
}

/// Delete user
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "users",
    operation_id = "deleteApiUsersById",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Admin only; admins cannot delete themselves"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User still holds open complaints")
    )
)]
pub async fn delete_user(
    State(state): State<UsersState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<StatusCode, PlatformError> {
    let user = load_user(&state, &id).await?;
    require(&auth, Action::Delete, &Resource::User(&user))?;

    let use_case = DeleteUserUseCase::new(state.complaint_repo.clone(), state.unit_of_work.clone());

    match use_case.execute(user, &auth).await {
        UseCaseResult::Success(_) => Ok(StatusCode::NO_CONTENT),
        UseCaseResult::Failure(err) => Err(err.into()),
    }
}

pub fn users_router(state: UsersState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_users, create_user))
        .routes(routes!(get_team))
        .routes(routes!(get_user, update_user, delete_user))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_response_hides_password_hash() {
        let user = User::new("a@desk.io", "A", UserRole::Employee, "$argon2id$secret").with_department("d1");
        let json = serde_json::to_string(&UserResponse::from(user)).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(json.contains("\"departmentId\":\"d1\""));
        assert!(json.contains("\"role\":\"employee\""));
    }
}
