//! WhatsApp API (admin)
//!
//! - GET /whatsapp/status - Whether the gateway has credentials
//! - POST /whatsapp/test - Send one message right away, bypassing the queue

use axum::{extract::State, Json};
use cd_notify::{DispatchReport, Dispatcher};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::shared::authorization::{require, Action, Resource};
use crate::shared::error::PlatformError;
use crate::shared::middleware::Authenticated;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatusResponse {
    pub configured: bool,
    /// Whether complaint events are queued for delivery at all
    pub notifications_enabled: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestMessageRequest {
    pub phone: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestMessageResponse {
    /// Gateway address the phone normalized to
    pub chat_id: Option<String>,
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl TestMessageResponse {
    fn new(chat_id: Option<String>, report: DispatchReport) -> Self {
        Self {
            chat_id,
            attempted: report.attempted,
            sent: report.sent,
            failed: report.failed,
            skipped: report.skipped,
        }
    }
}

#[derive(Clone)]
pub struct MessagingState {
    pub dispatcher: Arc<Dispatcher>,
    pub notifications_enabled: bool,
}

/// Gateway status
#[utoipa::path(
    get,
    path = "/status",
    tag = "whatsapp",
    operation_id = "getApiWhatsappStatus",
    responses(
        (status = 200, description = "Gateway status", body = GatewayStatusResponse),
        (status = 403, description = "Admin only")
    )
)]
pub async fn gateway_status(
    State(state): State<MessagingState>,
    auth: Authenticated,
) -> Result<Json<GatewayStatusResponse>, PlatformError> {
    require(&auth, Action::Read, &Resource::Messaging)?;
    Ok(Json(GatewayStatusResponse {
        configured: state.dispatcher.is_configured(),
        notifications_enabled: state.notifications_enabled,
    }))
}

/// Send a test message
#[utoipa::path(
    post,
    path = "/test",
    tag = "whatsapp",
    operation_id = "postApiWhatsappTest",
    request_body = TestMessageRequest,
    responses(
        (status = 200, description = "Delivery report", body = TestMessageResponse),
        (status = 400, description = "Missing phone or message, or gateway not configured"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn send_test_message(
    State(state): State<MessagingState>,
    auth: Authenticated,
    Json(req): Json<TestMessageRequest>,
) -> Result<Json<TestMessageResponse>, PlatformError> {
    require(&auth, Action::Manage, &Resource::Messaging)?;

    let message = req.message.trim();
    if req.phone.trim().is_empty() || message.is_empty() {
        return Err(PlatformError::validation("phone and message are required"));
    }
    if !state.dispatcher.is_configured() {
        return Err(PlatformError::validation("WhatsApp gateway is not configured"));
    }

    let recipients = vec![req.phone.clone()];
    let chat_id = state.dispatcher.chat_ids(&recipients).into_iter().next();
    if chat_id.is_none() {
        return Err(PlatformError::validation(format!("'{}' is not a usable phone number", req.phone)));
    }

    let report = state.dispatcher.dispatch(message, &recipients).await;
    info!(
        sent = report.sent,
        failed = report.failed,
        requested_by = %auth.user_id,
        "WhatsApp test message dispatched"
    );

    Ok(Json(TestMessageResponse::new(chat_id, report)))
}

pub fn messaging_router(state: MessagingState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(gateway_status))
        .routes(routes!(send_test_message))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_from_report() {
        let report = DispatchReport {
            attempted: 1,
            sent: 1,
            failed: 0,
            skipped: 0,
        };
        let json = serde_json::to_value(TestMessageResponse::new(Some("923001234567@c.us".into()), report)).unwrap();
        assert_eq!(json["chatId"], "923001234567@c.us");
        assert_eq!(json["sent"], 1);
    }
}
