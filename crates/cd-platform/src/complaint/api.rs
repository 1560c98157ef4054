//! Complaints API
//!
//! - GET /complaints - List within the actor's scope
//! - POST /complaints - Create (routed to a department)
//! - GET/PUT/DELETE /complaints/{id}
//! - PATCH /complaints/{id}/status
//! - POST /complaints/{id}/assign
//! - POST /complaints/bulk
//! - GET /complaints/{id}/history

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use cd_common::ComplaintStatus;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::comment::api::comment_routes;
use crate::complaint::entity::Attachment;
use crate::complaint::notify::ComplaintNotifier;
use crate::complaint::operations::{
    parse_status, AssignCommand, AssignComplaintUseCase, BulkCommand, BulkComplaintUseCase, BulkResult,
    ChangeStatusCommand, ChangeStatusUseCase, CreateComplaintCommand, CreateComplaintUseCase,
    DeleteComplaintUseCase, UpdateComplaintCommand, UpdateComplaintUseCase,
};
use crate::complaint::repository::ComplaintQuery;
use crate::complaint_history::repository::ComplaintHistoryRepository;
use crate::shared::api_common::{non_blank, PaginatedResponse, PaginationParams};
use crate::shared::authorization::{require, require_visible, Action, Resource};
use crate::shared::error::PlatformError;
use crate::shared::middleware::Authenticated;
use crate::shared::tsid::parse_id;
use crate::usecase::{MongoUnitOfWork, UseCaseResult};
use crate::{
    CommentRepository, Complaint, ComplaintHistory, ComplaintRepository, DepartmentRepository,
    NatureTypeRepository, SettingsRepository, UserRepository,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintResponse {
    pub id: String,
    /// Last six characters of the id, as shown in notifications
    pub short_id: String,
    pub title: String,
    pub description: String,
    pub error_type: Option<String>,
    pub error_screen: Option<String>,
    pub nature_type_id: Option<String>,
    pub client_id: String,
    pub department_id: String,
    pub current_assignee_id: String,
    pub first_assignee_id: String,
    pub status: ComplaintStatus,
    pub attachments: Vec<Attachment>,
    pub remark: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Complaint> for ComplaintResponse {
    fn from(c: Complaint) -> Self {
        Self {
            short_id: cd_notify::short_id(&c.id),
            id: c.id,
            title: c.title,
            description: c.description,
            error_type: c.error_type,
            error_screen: c.error_screen,
            nature_type_id: c.nature_type_id,
            client_id: c.client_id,
            department_id: c.department_id,
            current_assignee_id: c.current_assignee_id,
            first_assignee_id: c.first_assignee_id,
            status: c.status,
            attachments: c.attachments,
            remark: c.remark,
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub id: String,
    pub complaint_id: String,
    pub status: ComplaintStatus,
    pub assigned_from: Option<String>,
    pub assigned_to: Option<String>,
    pub notes: Option<String>,
    pub changed_by: String,
    pub timestamp: String,
}

impl From<ComplaintHistory> for HistoryResponse {
    fn from(h: ComplaintHistory) -> Self {
        Self {
            id: h.id,
            complaint_id: h.complaint_id,
            status: h.status,
            assigned_from: h.assigned_from,
            assigned_to: h.assigned_to,
            notes: h.notes,
            changed_by: h.changed_by,
            timestamp: h.timestamp.to_rfc3339(),
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ComplaintsQuery {
    /// One of New, Assigned, In Progress, Completed, Done, Closed
    pub status: Option<String>,
    pub department_id: Option<String>,
    pub assignee_id: Option<String>,
    pub client_id: Option<String>,
    pub nature_type_id: Option<String>,
    /// Case-insensitive match on title or description
    pub search: Option<String>,
}

impl ComplaintsQuery {
    fn into_query(self) -> Result<ComplaintQuery, PlatformError> {
        let status = match non_blank(self.status) {
            Some(raw) => Some(parse_status(&raw)?),
            None => None,
        };
        Ok(ComplaintQuery {
            status,
            department_id: non_blank(self.department_id),
            assignee_id: non_blank(self.assignee_id),
            client_id: non_blank(self.client_id),
            nature_type_id: non_blank(self.nature_type_id),
            search: non_blank(self.search),
        })
    }
}

#[derive(Clone)]
pub struct ComplaintsState {
    pub complaint_repo: Arc<ComplaintRepository>,
    pub history_repo: Arc<ComplaintHistoryRepository>,
    pub comment_repo: Arc<CommentRepository>,
    pub user_repo: Arc<UserRepository>,
    pub department_repo: Arc<DepartmentRepository>,
    pub nature_type_repo: Arc<NatureTypeRepository>,
    pub settings_repo: Arc<SettingsRepository>,
    pub unit_of_work: Arc<MongoUnitOfWork>,
    pub notifier: ComplaintNotifier,
}

/// Load a complaint the actor may see; hidden ones look missing
pub(crate) async fn load_visible(
    state: &ComplaintsState,
    auth: &Authenticated,
    id: &str,
) -> Result<Complaint, PlatformError> {
    let id = parse_id("Complaint", id)?;
    let complaint = state
        .complaint_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| PlatformError::not_found("Complaint", id))?;
    require_visible(auth, &Resource::Complaint(&complaint), "Complaint", id)?;
    Ok(complaint)
}

/// List complaints
#[utoipa::path(
    get,
    path = "",
    tag = "complaints",
    operation_id = "getApiComplaints",
    params(PaginationParams, ComplaintsQuery),
    responses(
        (status = 200, description = "Page of complaints, newest first", body = PaginatedResponse<ComplaintResponse>),
        (status = 400, description = "Unknown status filter")
    )
)]
pub async fn list_complaints(
    State(state): State<ComplaintsState>,
    auth: Authenticated,
    Query(pagination): Query<PaginationParams>,
    Query(query): Query<ComplaintsQuery>,
) -> Result<Json<PaginatedResponse<ComplaintResponse>>, PlatformError> {
    require(&auth, Action::Read, &Resource::Complaints)?;
    let query = query.into_query()?;

    let total = state.complaint_repo.count(&query, &auth).await?;
    let complaints = state
        .complaint_repo
        .find_page(&query, &auth, pagination.offset(), pagination.limit())
        .await?;

    Ok(Json(PaginatedResponse::new(
        complaints.into_iter().map(ComplaintResponse::from).collect(),
        pagination.page(),
        pagination.size(),
        total,
    )))
}

/// Create complaint
#[utoipa::path(
    post,
    path = "",
    tag = "complaints",
    operation_id = "postApiComplaints",
    request_body = CreateComplaintCommand,
    responses(
        (status = 201, description = "Complaint created", body = ComplaintResponse),
        (status = 400, description = "Validation error or no department/assignee available"),
        (status = 403, description = "Employees cannot file complaints")
    )
)]
pub async fn create_complaint(
    State(state): State<ComplaintsState>,
    auth: Authenticated,
    Json(command): Json<CreateComplaintCommand>,
) -> Result<(StatusCode, Json<ComplaintResponse>), PlatformError> {
    require(&auth, Action::Create, &Resource::Complaints)?;

    let use_case = CreateComplaintUseCase::new(
        state.user_repo.clone(),
        state.department_repo.clone(),
        state.nature_type_repo.clone(),
        state.settings_repo.clone(),
        state.unit_of_work.clone(),
        state.notifier.clone(),
    );

    match use_case.execute(command, &auth).await {
        UseCaseResult::Success(complaint) => Ok((StatusCode::CREATED, Json(complaint.into()))),
        UseCaseResult::Failure(err) => Err(err.into()),
    }
}

/// Get complaint
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "complaints",
    operation_id = "getApiComplaintsById",
    params(("id" = String, Path, description = "Complaint ID")),
    responses(
        (status = 200, description = "Complaint", body = ComplaintResponse),
        (status = 404, description = "Complaint not found")
    )
)]
pub async fn get_complaint(
    State(state): State<ComplaintsState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ComplaintResponse>, PlatformError> {
    let complaint = load_visible(&state, &auth, &id).await?;
    Ok(Json(complaint.into()))
}

/// Update complaint
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "complaints",
    operation_id = "putApiComplaintsById",
    params(("id" = String, Path, description = "Complaint ID")),
    request_body = UpdateComplaintCommand,
    responses(
        (status = 200, description = "Complaint updated", body = ComplaintResponse),
        (status = 400, description = "Validation error or unknown status"),
        (status = 403, description = "Not allowed to edit this complaint"),
        (status = 404, description = "Complaint not found")
    )
)]
pub async fn update_complaint(
    State(state): State<ComplaintsState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(command): Json<UpdateComplaintCommand>,
) -> Result<Json<ComplaintResponse>, PlatformError> {
    let complaint = load_visible(&state, &auth, &id).await?;

    let use_case = UpdateComplaintUseCase::new(
        state.nature_type_repo.clone(),
        state.unit_of_work.clone(),
        state.notifier.clone(),
    );

    match use_case.execute(complaint, command, &auth).await {
        UseCaseResult::Success(complaint) => Ok(Json(complaint.into())),
        UseCaseResult::Failure(err) => Err(err.into()),
    }
}

/// Delete complaint with its history and comments
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "complaints",
    operation_id = "deleteApiComplaintsById",
    params(("id" = String, Path, description = "Complaint ID")),
    responses(
        (status = 204, description = "Complaint deleted"),
        (status = 403, description = "Not allowed to delete this complaint"),
        (status = 404, description = "Complaint not found")
    )
)]
pub async fn delete_complaint(
    State(state): State<ComplaintsState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<StatusCode, PlatformError> {
    let complaint = load_visible(&state, &auth, &id).await?;

    match DeleteComplaintUseCase::new(state.unit_of_work.clone())
        .execute(&complaint, &auth)
        .await
    {
        UseCaseResult::Success(_) => Ok(StatusCode::NO_CONTENT),
        UseCaseResult::Failure(err) => Err(err.into()),
    }
}

/// Change complaint status
#[utoipa::path(
    patch,
    path = "/{id}/status",
    tag = "complaints",
    operation_id = "patchApiComplaintsStatus",
    params(("id" = String, Path, description = "Complaint ID")),
    request_body = ChangeStatusCommand,
    responses(
        (status = 200, description = "Status changed", body = ComplaintResponse),
        (status = 400, description = "Unknown or unchanged status"),
        (status = 403, description = "Not allowed to change the status"),
        (status = 404, description = "Complaint not found")
    )
)]
pub async fn change_status(
    State(state): State<ComplaintsState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(command): Json<ChangeStatusCommand>,
) -> Result<Json<ComplaintResponse>, PlatformError> {
    let complaint = load_visible(&state, &auth, &id).await?;

    let use_case = ChangeStatusUseCase::new(state.unit_of_work.clone(), state.notifier.clone());

    match use_case.execute(complaint, command, &auth).await {
        UseCaseResult::Success(complaint) => Ok(Json(complaint.into())),
        UseCaseResult::Failure(err) => Err(err.into()),
    }
}

/// Assign complaint
#[utoipa::path(
    post,
    path = "/{id}/assign",
    tag = "complaints",
    operation_id = "postApiComplaintsAssign",
    params(("id" = String, Path, description = "Complaint ID")),
    request_body = AssignCommand,
    responses(
        (status = 200, description = "Complaint assigned", body = ComplaintResponse),
        (status = 400, description = "Invalid assignee or already assigned to them"),
        (status = 403, description = "Assignment outside the actor's department"),
        (status = 404, description = "Complaint not found")
    )
)]
pub async fn assign_complaint(
    State(state): State<ComplaintsState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(command): Json<AssignCommand>,
) -> Result<Json<ComplaintResponse>, PlatformError> {
    let complaint = load_visible(&state, &auth, &id).await?;
    require(&auth, Action::Assign, &Resource::Complaint(&complaint))?;

    let assignee_id = parse_id("User", command.assignee_id.trim())?;
    let assignee = state
        .user_repo
        .find_by_id(assignee_id)
        .await?
        .ok_or_else(|| PlatformError::validation(format!("Assignee {} does not exist", assignee_id)))?;
    let previous_name = state
        .user_repo
        .find_by_id(&complaint.current_assignee_id)
        .await?
        .map(|u| u.name);

    let use_case = AssignComplaintUseCase::new(state.unit_of_work.clone(), state.notifier.clone());

    match use_case
        .execute(complaint, &assignee, previous_name, command, &auth)
        .await
    {
        UseCaseResult::Success(complaint) => Ok(Json(complaint.into())),
        UseCaseResult::Failure(err) => Err(err.into()),
    }
}

/// Apply one action to many complaints
#[utoipa::path(
    post,
    path = "/bulk",
    tag = "complaints",
    operation_id = "postApiComplaintsBulk",
    request_body = BulkCommand,
    responses(
        (status = 200, description = "Per-complaint outcome", body = BulkResult),
        (status = 400, description = "Malformed request"),
        (status = 403, description = "Admins and managers only")
    )
)]
pub async fn bulk_action(
    State(state): State<ComplaintsState>,
    auth: Authenticated,
    Json(command): Json<BulkCommand>,
) -> Result<Json<BulkResult>, PlatformError> {
    let use_case = BulkComplaintUseCase::new(
        state.complaint_repo.clone(),
        state.user_repo.clone(),
        state.unit_of_work.clone(),
        state.notifier.clone(),
    );

    match use_case.execute(command, &auth).await {
        UseCaseResult::Success(result) => Ok(Json(result)),
        UseCaseResult::Failure(err) => Err(err.into()),
    }
}

/// Status and assignment history, oldest first
#[utoipa::path(
    get,
    path = "/{id}/history",
    tag = "complaints",
    operation_id = "getApiComplaintsHistory",
    params(("id" = String, Path, description = "Complaint ID")),
    responses(
        (status = 200, description = "History rows", body = Vec<HistoryResponse>),
        (status = 404, description = "Complaint not found")
    )
)]
pub async fn get_history(
    State(state): State<ComplaintsState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Vec<HistoryResponse>>, PlatformError> {
    let complaint = load_visible(&state, &auth, &id).await?;
    let rows = state.history_repo.find_by_complaint(&complaint.id).await?;
    Ok(Json(rows.into_iter().map(HistoryResponse::from).collect()))
}

pub fn complaints_router(state: ComplaintsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_complaints, create_complaint))
        .routes(routes!(bulk_action))
        .routes(routes!(get_complaint, update_complaint, delete_complaint))
        .routes(routes!(change_status))
        .routes(routes!(assign_complaint))
        .routes(routes!(get_history))
        .merge(comment_routes())
        .with_state(state)
}
