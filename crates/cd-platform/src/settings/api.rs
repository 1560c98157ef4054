//! Settings API
//!
//! - GET /settings - Current settings, defaults when never saved
//! - POST /settings - Replace settings (admin)

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::settings::entity::{AutoRouting, SystemSettings};
use crate::shared::api_common::non_blank;
use crate::shared::authorization::{require, Action, Resource};
use crate::shared::error::PlatformError;
use crate::shared::middleware::Authenticated;
use crate::{DepartmentRepository, SettingsRepository};

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutoRoutingDto {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub departments: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub auto_routing: AutoRoutingDto,
    pub default_department: Option<String>,
    pub updated_by: Option<String>,
    pub updated_at: String,
}

impl From<SystemSettings> for SettingsResponse {
    fn from(s: SystemSettings) -> Self {
        Self {
            auto_routing: AutoRoutingDto {
                enabled: s.auto_routing.enabled,
                departments: s.auto_routing.departments,
            },
            default_department: s.default_department,
            updated_by: s.updated_by,
            updated_at: s.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    #[serde(default)]
    pub auto_routing: AutoRoutingDto,
    #[serde(default)]
    pub default_department: Option<String>,
}

#[derive(Clone)]
pub struct SettingsState {
    pub settings_repo: Arc<SettingsRepository>,
    pub department_repo: Arc<DepartmentRepository>,
}

/// Get settings
#[utoipa::path(
    get,
    path = "",
    tag = "settings",
    operation_id = "getApiSettings",
    responses(
        (status = 200, description = "Current settings", body = SettingsResponse),
        (status = 403, description = "Admin only")
    )
)]
pub async fn get_settings(
    State(state): State<SettingsState>,
    auth: Authenticated,
) -> Result<Json<SettingsResponse>, PlatformError> {
    require(&auth, Action::Read, &Resource::Settings)?;
    Ok(Json(state.settings_repo.get().await?.into()))
}

/// Save settings
#[utoipa::path(
    post,
    path = "",
    tag = "settings",
    operation_id = "postApiSettings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings saved", body = SettingsResponse),
        (status = 400, description = "Unknown department referenced"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn save_settings(
    State(state): State<SettingsState>,
    auth: Authenticated,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>, PlatformError> {
    require(&auth, Action::Manage, &Resource::Settings)?;

    let mut seen = HashSet::new();
    let departments: Vec<String> = req
        .auto_routing
        .departments
        .into_iter()
        .filter_map(|id| non_blank(Some(id)))
        .filter(|id| seen.insert(id.clone()))
        .collect();

    let settings = SystemSettings {
        auto_routing: AutoRouting {
            enabled: req.auto_routing.enabled,
            departments,
        },
        default_department: non_blank(req.default_department),
        updated_by: Some(auth.user_id.clone()),
        updated_at: Utc::now(),
        ..SystemSettings::default()
    };

    let referenced = settings.referenced_departments();
    let found: HashSet<String> = state
        .department_repo
        .find_by_ids(&referenced)
        .await?
        .into_iter()
        .map(|d| d.id)
        .collect();
    if let Some(missing) = referenced.iter().find(|id| !found.contains(*id)) {
        return Err(PlatformError::validation(format!("Department {} does not exist", missing)));
    }

    state.settings_repo.save(&settings).await?;
    info!(
        auto_routing = settings.auto_routing.enabled,
        departments = settings.auto_routing.departments.len(),
        "Settings saved"
    );

    Ok(Json(settings.into()))
}

pub fn settings_router(state: SettingsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(get_settings, save_settings))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_render_auto_routing_off() {
        let response = SettingsResponse::from(SystemSettings::default());
        assert!(!response.auto_routing.enabled);
        assert!(response.auto_routing.departments.is_empty());
        assert!(response.default_department.is_none());
    }

    #[test]
    fn test_request_accepts_partial_body() {
        let req: UpdateSettingsRequest =
            serde_json::from_str(r#"{"autoRouting":{"enabled":true}}"#).unwrap();
        assert!(req.auto_routing.enabled);
        assert!(req.auto_routing.departments.is_empty());
    }
}
