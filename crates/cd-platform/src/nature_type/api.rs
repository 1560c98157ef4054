//! Nature Types API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
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
use crate::{NatureType, NatureTypeRepository};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NatureTypeResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<NatureType> for NatureTypeResponse {
    fn from(n: NatureType) -> Self {
        Self {
            id: n.id,
            name: n.name,
            description: n.description,
            is_active: n.is_active,
            created_by: n.created_by,
            created_at: n.created_at.to_rfc3339(),
            updated_at: n.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNatureTypeRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNatureTypeRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NatureTypesQuery {
    /// Ignored for clients
    pub include_inactive: Option<bool>,
}

#[derive(Clone)]
pub struct NatureTypesState {
    pub nature_type_repo: Arc<NatureTypeRepository>,
}

async fn load_nature_type(state: &NatureTypesState, id: &str) -> Result<NatureType, PlatformError> {
    let id = parse_id("NatureType", id)?;
    state
        .nature_type_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| PlatformError::not_found("NatureType", id))
}

async fn ensure_unique_name(
    state: &NatureTypesState,
    name: &str,
    except_id: Option<&str>,
) -> Result<(), PlatformError> {
    if let Some(existing) = state.nature_type_repo.find_by_name(name).await? {
        if Some(existing.id.as_str()) != except_id {
            return Err(PlatformError::duplicate("NatureType", "name", name));
        }
    }
    Ok(())
}

/// List nature types
#[utoipa::path(
    get,
    path = "",
    tag = "nature-types",
    operation_id = "getApiNatureTypes",
    params(NatureTypesQuery),
    responses((status = 200, description = "Nature types by name", body = Vec<NatureTypeResponse>))
)]
pub async fn list_nature_types(
    State(state): State<NatureTypesState>,
    auth: Authenticated,
    Query(query): Query<NatureTypesQuery>,
) -> Result<Json<Vec<NatureTypeResponse>>, PlatformError> {
    require(&auth, Action::Read, &Resource::NatureType)?;

    let include_inactive = query.include_inactive.unwrap_or(false) && !auth.is_client();
    let types = state.nature_type_repo.find_all(include_inactive).await?;
    Ok(Json(types.into_iter().map(NatureTypeResponse::from).collect()))
}

/// Create nature type
#[utoipa::path(
    post,
    path = "",
    tag = "nature-types",
    operation_id = "postApiNatureTypes",
    request_body = CreateNatureTypeRequest,
    responses(
        (status = 201, description = "Nature type created", body = NatureTypeResponse),
        (status = 400, description = "Name missing"),
        (status = 403, description = "Admin or manager only"),
        (status = 409, description = "Name already in use")
    )
)]
pub async fn create_nature_type(
    State(state): State<NatureTypesState>,
    auth: Authenticated,
    Json(req): Json<CreateNatureTypeRequest>,
) -> Result<(StatusCode, Json<NatureTypeResponse>), PlatformError> {
    require(&auth, Action::Create, &Resource::NatureType)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(PlatformError::validation("Name is required"));
    }
    ensure_unique_name(&state, name, None).await?;

    let mut nature_type = NatureType::new(name, &auth.user_id);
    if let Some(description) = non_blank(req.description) {
        nature_type = nature_type.with_description(description);
    }

    state.nature_type_repo.insert(&nature_type).await?;
    info!(nature_type_id = %nature_type.id, name = %nature_type.name, "Nature type created");

    Ok((StatusCode::CREATED, Json(nature_type.into())))
}

/// Get nature type
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "nature-types",
    operation_id = "getApiNatureTypesById",
    params(("id" = String, Path, description = "Nature type ID")),
    responses(
        (status = 200, description = "Nature type", body = NatureTypeResponse),
        (status = 404, description = "Nature type not found")
    )
)]
pub async fn get_nature_type(
    State(state): State<NatureTypesState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<NatureTypeResponse>, PlatformError> {
    require(&auth, Action::Read, &Resource::NatureType)?;
    let nature_type = load_nature_type(&state, &id).await?;
    if auth.is_client() && !nature_type.is_active {
        return Err(PlatformError::not_found("NatureType", &id));
    }
    Ok(Json(nature_type.into()))
}

/// Update nature type
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "nature-types",
    operation_id = "putApiNatureTypesById",
    params(("id" = String, Path, description = "Nature type ID")),
    request_body = UpdateNatureTypeRequest,
    responses(
        (status = 200, description = "Nature type updated", body = NatureTypeResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Nature type not found"),
        (status = 409, description = "Name already in use")
    )
)]
pub async fn update_nature_type(
    State(state): State<NatureTypesState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(req): Json<UpdateNatureTypeRequest>,
) -> Result<Json<NatureTypeResponse>, PlatformError> {
    require(&auth, Action::Update, &Resource::NatureType)?;
    let mut nature_type = load_nature_type(&state, &id).await?;

    if let Some(name) = &req.name {
        if name.trim().is_empty() {
            return Err(PlatformError::validation("Name cannot be empty"));
        }
        ensure_unique_name(&state, name, Some(&nature_type.id)).await?;
        nature_type.rename(name);
    }
    if let Some(description) = req.description {
        nature_type.description = description.trim().to_string();
    }
    if let Some(is_active) = req.is_active {
        nature_type.is_active = is_active;
    }
    nature_type.updated_at = chrono::Utc::now();

    state.nature_type_repo.update(&nature_type).await?;
    info!(nature_type_id = %nature_type.id, "Nature type updated");

    Ok(Json(nature_type.into()))
}

/// Deactivate nature type
///
/// Complaints keep pointing at it; it just stops being offered.
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "nature-types",
    operation_id = "deleteApiNatureTypesById",
    params(("id" = String, Path, description = "Nature type ID")),
    responses(
        (status = 204, description = "Nature type deactivated"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Nature type not found")
    )
)]
pub async fn delete_nature_type(
    State(state): State<NatureTypesState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<StatusCode, PlatformError> {
    require(&auth, Action::Delete, &Resource::NatureType)?;
    let mut nature_type = load_nature_type(&state, &id).await?;

    nature_type.deactivate();
    state.nature_type_repo.update(&nature_type).await?;
    info!(nature_type_id = %nature_type.id, "Nature type deactivated");

    Ok(StatusCode::NO_CONTENT)
}

pub fn nature_types_router(state: NatureTypesState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_nature_types, create_nature_type))
        .routes(routes!(get_nature_type, update_nature_type, delete_nature_type))
        .with_state(state)
}
