//! WhatsApp gateway client
//!
//! Outbound only: `POST {base_url}/instances/{instance_id}/client/action/send-message`
//! with a bearer token and a `{ chatId, message }` body.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use cd_config::WhatsAppSettings;

/// Numbers of this length without a country code are domestic
const DOMESTIC_NUMBER_LEN: usize = 10;
/// Country code plus the shortest subscriber number worth sending to
const MIN_PHONE_DIGITS: usize = 8;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("WhatsApp gateway is not configured")]
    NotConfigured,

    #[error("Gateway returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Gateway connection settings
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub instance_id: String,
    pub api_key: String,
    pub base_url: String,
    pub default_country_code: String,
    pub chat_suffix: String,
    /// Pause between consecutive sends
    pub send_interval: Duration,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::from(&WhatsAppSettings::default())
    }
}

impl From<&WhatsAppSettings> for GatewayConfig {
    fn from(settings: &WhatsAppSettings) -> Self {
        Self {
            instance_id: settings.instance_id.trim().to_string(),
            api_key: settings.api_key.trim().to_string(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            default_country_code: settings.default_country_code.clone(),
            chat_suffix: settings.chat_suffix.clone(),
            send_interval: Duration::from_millis(settings.send_interval_ms),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}

impl GatewayConfig {
    pub fn is_configured(&self) -> bool {
        !self.instance_id.is_empty() && !self.api_key.is_empty()
    }

    pub fn send_url(&self) -> String {
        format!(
            "{}/instances/{}/client/action/send-message",
            self.base_url, self.instance_id
        )
    }

    pub fn normalize(&self, raw: &str) -> Option<String> {
        normalize_phone(raw, &self.default_country_code, &self.chat_suffix)
    }
}

/// Normalize a phone number to the gateway's chat address.
///
/// Non-digits are stripped. `00` international prefixes are dropped, a
/// single leading `0` becomes the country code, and a bare domestic number
/// gets the country code prepended. Returns `None` when fewer than
/// `MIN_PHONE_DIGITS` digits remain.
pub fn normalize_phone(raw: &str, country_code: &str, suffix: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    let digits = if let Some(rest) = digits.strip_prefix("00") {
        rest.to_string()
    } else if let Some(rest) = digits.strip_prefix('0') {
        format!("{}{}", country_code, rest)
    } else if digits.len() == DOMESTIC_NUMBER_LEN && !digits.starts_with(country_code) {
        format!("{}{}", country_code, digits)
    } else {
        digits
    };

    if digits.len() < MIN_PHONE_DIGITS {
        return None;
    }

    Some(format!("{}{}", digits, suffix))
}

/// Message delivery channel
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Send one text message to a normalized chat address
    async fn send(&self, chat_id: &str, message: &str) -> Result<(), GatewayError>;

    /// Whether credentials are present
    fn is_configured(&self) -> bool;
}

/// Gateway used when credentials are missing; every send is refused
pub struct NoOpGateway;

#[async_trait]
impl MessageGateway for NoOpGateway {
    async fn send(&self, _chat_id: &str, _message: &str) -> Result<(), GatewayError> {
        Err(GatewayError::NotConfigured)
    }

    fn is_configured(&self) -> bool {
        false
    }
}

/// HTTP client for the WhatsApp gateway
pub struct WhatsAppGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl WhatsAppGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        info!(
            instance_id = %config.instance_id,
            base_url = %config.base_url,
            "WhatsAppGateway initialized"
        );

        Ok(Self { client, config })
    }
}

#[async_trait]
impl MessageGateway for WhatsAppGateway {
    async fn send(&self, chat_id: &str, message: &str) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(self.config.send_url())
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "chatId": chat_id,
                "message": message,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                status = %status,
                body = %body,
                chat_id,
                "WhatsApp gateway rejected message"
            );
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(chat_id, "WhatsApp message accepted by gateway");
        Ok(())
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }
}

/// Build the gateway for a configuration, falling back to the no-op
/// gateway when credentials are missing or the client cannot be built.
pub fn create_gateway(config: &GatewayConfig) -> Arc<dyn MessageGateway> {
    if !config.is_configured() {
        warn!("WhatsApp instance id or API key missing, notifications will not be sent");
        return Arc::new(NoOpGateway);
    }

    match WhatsAppGateway::new(config.clone()) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            error!(error = %e, "Failed to build WhatsApp client, notifications disabled");
            Arc::new(NoOpGateway)
        }
    }
}
