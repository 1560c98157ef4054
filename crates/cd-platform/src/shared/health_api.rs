//! Health Endpoints
//!
//! - /health - Process is up
//! - /ready - MongoDB answers a ping

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use mongodb::{bson::doc, Database};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

#[derive(Clone)]
pub struct HealthState {
    /// None in tests that run without a database
    pub db: Option<Database>,
    pub version: String,
}

impl HealthState {
    pub fn new(db: Option<Database>, version: impl Into<String>) -> Self {
        Self {
            db,
            version: version.into(),
        }
    }
}

/// Liveness
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn get_health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthStatus::Up,
        version: state.version.clone(),
        timestamp: Utc::now(),
    })
}

/// Readiness
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Database reachable", body = ReadinessResponse),
        (status = 503, description = "Database unreachable", body = ReadinessResponse)
    )
)]
pub async fn get_readiness(State(state): State<HealthState>) -> Response {
    let Some(db) = &state.db else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: HealthStatus::Down,
                message: Some("No database configured".to_string()),
                duration_ms: None,
            }),
        )
            .into_response();
    };

    let start = std::time::Instant::now();
    let (code, status, message) = match db.run_command(doc! { "ping": 1 }).await {
        Ok(_) => (StatusCode::OK, HealthStatus::Up, None),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            HealthStatus::Down,
            Some(format!("MongoDB ping failed: {}", e)),
        ),
    };

    (
        code,
        Json(ReadinessResponse {
            status,
            message,
            duration_ms: Some(start.elapsed().as_millis() as u64),
        }),
    )
        .into_response()
}

pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/ready", get(get_readiness))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_reports_up_with_version() {
        let app = health_router(HealthState::new(None, "1.2.3"));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "UP");
        assert_eq!(json["version"], "1.2.3");
    }

    #[tokio::test]
    async fn test_ready_without_database_is_unavailable() {
        let app = health_router(HealthState::new(None, "1.2.3"));

        let response = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
