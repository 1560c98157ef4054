//! Departments API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use cd_common::UserRole;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::shared::api_common::non_blank;
use crate::shared::authorization::{require, Action, Resource};
use crate::shared::error::PlatformError;
use crate::shared::middleware::Authenticated;
use crate::shared::tsid::parse_id;
use crate::{ComplaintRepository, Department, DepartmentRepository, User, UserRepository};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub manager_id: Option<String>,
    pub default_assignee_id: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Department> for DepartmentResponse {
    fn from(d: Department) -> Self {
        Self {
            id: d.id,
            name: d.name,
            description: d.description,
            manager_id: d.manager_id,
            default_assignee_id: d.default_assignee_id,
            is_active: d.is_active,
            created_at: d.created_at.to_rfc3339(),
            updated_at: d.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepartmentRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub manager_id: Option<String>,
    #[serde(default)]
    pub default_assignee_id: Option<String>,
}

/// Absent fields are left alone; an empty id clears the reference
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDepartmentRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub manager_id: Option<String>,
    pub default_assignee_id: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DepartmentsQuery {
    /// Only active departments
    pub active: Option<bool>,
}

#[derive(Clone)]
pub struct DepartmentsState {
    pub department_repo: Arc<DepartmentRepository>,
    pub user_repo: Arc<UserRepository>,
    pub complaint_repo: Arc<ComplaintRepository>,
}

async fn load_department(state: &DepartmentsState, id: &str) -> Result<Department, PlatformError> {
    let id = parse_id("Department", id)?;
    state
        .department_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| PlatformError::not_found("Department", id))
}

async fn load_active_user(state: &DepartmentsState, field: &str, id: &str) -> Result<User, PlatformError> {
    let id = parse_id("User", id)?;
    state
        .user_repo
        .find_by_id(id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| PlatformError::validation(format!("{} must reference an active user", field)))
}

/// `department_id` is `None` while the department is being created
async fn validate_manager(
    state: &DepartmentsState,
    manager_id: &str,
    department_id: Option<&str>,
) -> Result<(), PlatformError> {
    let manager = load_active_user(state, "managerId", manager_id).await?;
    if manager.role != UserRole::Manager {
        return Err(PlatformError::validation("managerId must reference a manager"));
    }
    if let Some(department_id) = department_id {
        if !manager.belongs_to(department_id) {
            return Err(PlatformError::validation(
                "The manager must belong to this department",
            ));
        }
    }
    Ok(())
}

async fn validate_default_assignee(state: &DepartmentsState, assignee_id: &str) -> Result<(), PlatformError> {
    let assignee = load_active_user(state, "defaultAssigneeId", assignee_id).await?;
    if !assignee.can_hold_complaints() {
        return Err(PlatformError::validation(
            "defaultAssigneeId must reference an employee or manager",
        ));
    }
    Ok(())
}

async fn ensure_unique_name(
    state: &DepartmentsState,
    name: &str,
    except_id: Option<&str>,
) -> Result<(), PlatformError> {
    if let Some(existing) = state.department_repo.find_by_name(name).await? {
        if Some(existing.id.as_str()) != except_id {
            return Err(PlatformError::duplicate("Department", "name", name));
        }
    }
    Ok(())
}

/// List departments
#[utoipa::path(
    get,
    path = "",
    tag = "departments",
    operation_id = "getApiDepartments",
    params(DepartmentsQuery),
    responses((status = 200, description = "Departments by name", body = Vec<DepartmentResponse>))
)]
pub async fn list_departments(
    State(state): State<DepartmentsState>,
    auth: Authenticated,
    Query(query): Query<DepartmentsQuery>,
) -> Result<Json<Vec<DepartmentResponse>>, PlatformError> {
    require(&auth, Action::Read, &Resource::Department)?;

    let active_only = query.active.unwrap_or(false) || auth.is_client();
    let departments = state.department_repo.find_all(active_only).await?;
    Ok(Json(departments.into_iter().map(DepartmentResponse::from).collect()))
}

/// Create department
#[utoipa::path(
    post,
    path = "",
    tag = "departments",
    operation_id = "postApiDepartments",
    request_body = CreateDepartmentRequest,
    responses(
        (status = 201, description = "Department created", body = DepartmentResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Name already in use")
    )
)]
pub async fn create_department(
    State(state): State<DepartmentsState>,
    auth: Authenticated,
    Json(req): Json<CreateDepartmentRequest>,
) -> Result<(StatusCode, Json<DepartmentResponse>), PlatformError> {
    require(&auth, Action::Create, &Resource::Department)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(PlatformError::validation("Name is required"));
    }
    ensure_unique_name(&state, name, None).await?;

    let mut department = Department::new(name);
    if let Some(description) = non_blank(req.description) {
        department = department.with_description(description);
    }
    if let Some(manager_id) = non_blank(req.manager_id) {
        validate_manager(&state, &manager_id, None).await?;
        department.manager_id = Some(manager_id);
    }
    if let Some(assignee_id) = non_blank(req.default_assignee_id) {
        validate_default_assignee(&state, &assignee_id).await?;
        department.default_assignee_id = Some(assignee_id);
    }

    state.department_repo.insert(&department).await?;
    info!(department_id = %department.id, name = %department.name, "Department created");

    Ok((StatusCode::CREATED, Json(department.into())))
}

/// Get department
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "departments",
    operation_id = "getApiDepartmentsById",
    params(("id" = String, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department", body = DepartmentResponse),
        (status = 404, description = "Department not found")
    )
)]
pub async fn get_department(
    State(state): State<DepartmentsState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<DepartmentResponse>, PlatformError> {
    require(&auth, Action::Read, &Resource::Department)?;
    Ok(Json(load_department(&state, &id).await?.into()))
}

/// Update department
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "departments",
    operation_id = "putApiDepartmentsById",
    params(("id" = String, Path, description = "Department ID")),
    request_body = UpdateDepartmentRequest,
    responses(
        (status = 200, description = "Department updated", body = DepartmentResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Name already in use")
    )
)]
pub async fn update_department(
    State(state): State<DepartmentsState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(req): Json<UpdateDepartmentRequest>,
) -> Result<Json<DepartmentResponse>, PlatformError> {
    require(&auth, Action::Update, &Resource::Department)?;
    let mut department = load_department(&state, &id).await?;

    if let Some(name) = &req.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlatformError::validation("Name cannot be empty"));
        }
        ensure_unique_name(&state, name, Some(&department.id)).await?;
        department.name = name.to_string();
    }
    if let Some(description) = req.description {
        department.description = description.trim().to_string();
    }
    if let Some(manager_id) = req.manager_id {
        department.manager_id = match non_blank(Some(manager_id)) {
            Some(manager_id) => {
                validate_manager(&state, &manager_id, Some(&department.id)).await?;
                Some(manager_id)
            }
            None => None,
        };
    }
    if let Some(assignee_id) = req.default_assignee_id {
        department.default_assignee_id = match non_blank(Some(assignee_id)) {
            Some(assignee_id) => {
                validate_default_assignee(&state, &assignee_id).await?;
                Some(assignee_id)
            }
            None => None,
        };
    }
    if let Some(is_active) = req.is_active {
        department.is_active = is_active;
    }

    department.touch();
    state.department_repo.update(&department).await?;
    info!(department_id = %department.id, "Department updated");

    Ok(Json(department.into()))
}

/// Delete department
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "departments",
    operation_id = "deleteApiDepartmentsById",
    params(("id" = String, Path, description = "Department ID")),
    responses(
        (status = 204, description = "Department deleted"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Department still referenced by complaints or users")
    )
)]
pub async fn delete_department(
    State(state): State<DepartmentsState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<StatusCode, PlatformError> {
    require(&auth, Action::Delete, &Resource::Department)?;
    let department = load_department(&state, &id).await?;

    let complaints = state.complaint_repo.count_by_department(&department.id).await?;
    let users = state.user_repo.count_by_department(&department.id).await?;
    if complaints > 0 || users > 0 {
        return Err(PlatformError::conflict(format!(
            "Department is referenced by {} complaint(s) and {} user(s)",
            complaints, users
        )));
    }

    state.department_repo.delete(&department.id).await?;
    info!(department_id = %department.id, "Department deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub fn departments_router(state: DepartmentsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_departments, create_department))
        .routes(routes!(get_department, update_department, delete_department))
        .with_state(state)
}
