//! ComplaintDesk Configuration System
//!
//! TOML-based configuration with environment variable override support.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub mongodb: MongoConfig,
    pub auth: AuthSettings,
    pub whatsapp: WhatsAppSettings,
    pub notifications: NotificationSettings,
    pub uploads: UploadSettings,

    /// Enable development mode (seed data, verbose 500 responses)
    pub dev_mode: bool,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
        }
    }
}

/// MongoDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017/?replicaSet=rs0&directConnection=true".to_string(),
            database: "complaintdesk".to_string(),
        }
    }
}

/// Session authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// HS256 signing secret for session tokens
    pub jwt_secret: String,
    pub issuer: String,
    pub session_expiry_secs: i64,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub same_site: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: "complaintdesk".to_string(),
            session_expiry_secs: 28800, // 8 hours
            cookie_name: "cd_session".to_string(),
            cookie_secure: false,
            same_site: "Lax".to_string(),
        }
    }
}

/// WhatsApp gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppSettings {
    pub instance_id: String,
    pub api_key: String,
    pub base_url: String,
    /// Prefix used for numbers written in domestic form
    pub default_country_code: String,
    /// Gateway address domain appended to every normalized number
    pub chat_suffix: String,
    /// Pause between two consecutive sends
    pub send_interval_ms: u64,
    pub timeout_secs: u64,
}

impl Default for WhatsAppSettings {
    fn default() -> Self {
        Self {
            instance_id: String::new(),
            api_key: String::new(),
            base_url: "https://waapi.app/api/v1".to_string(),
            default_country_code: "92".to_string(),
            chat_suffix: "@c.us".to_string(),
            send_interval_ms: 1000,
            timeout_secs: 15,
        }
    }
}

impl WhatsAppSettings {
    /// Both the instance id and the API key must be present to send anything
    pub fn is_configured(&self) -> bool {
        !self.instance_id.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}

/// Notification pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub enabled: bool,
    /// Capacity of the bounded job queue between handlers and the dispatch loop
    pub queue_capacity: usize,
    /// Base URL of the web UI, used for deep links in messages
    pub app_base_url: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_capacity: 256,
            app_base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Attachment upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    pub dir: String,
    /// URL prefix the stored files are served under
    pub public_path: String,
    pub max_file_bytes: usize,
    pub max_files: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            dir: "./data/uploads".to_string(),
            public_path: "/uploads".to_string(),
            max_file_bytes: 10 * 1024 * 1024,
            max_files: 10,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() && !self.dev_mode {
            return Err(ConfigError::ValidationError(
                "auth.jwt_secret must be set outside dev mode".to_string(),
            ));
        }
        if self.notifications.queue_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "notifications.queue_capacity must be greater than zero".to_string(),
            ));
        }
        if self.uploads.max_files == 0 {
            return Err(ConfigError::ValidationError(
                "uploads.max_files must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# ComplaintDesk Configuration
# Environment variables override these settings

dev_mode = false

[http]
host = "0.0.0.0"
port = 8080
cors_origins = ["http://localhost:3000"]

[mongodb]
uri = "mongodb://localhost:27017/?replicaSet=rs0&directConnection=true"
database = "complaintdesk"

[auth]
jwt_secret = "change-me"
issuer = "complaintdesk"
session_expiry_secs = 28800
cookie_name = "cd_session"
cookie_secure = false
same_site = "Lax"

[whatsapp]
instance_id = ""
api_key = ""
base_url = "https://waapi.app/api/v1"
default_country_code = "92"
chat_suffix = "@c.us"
send_interval_ms = 1000
timeout_secs = 15

[notifications]
enabled = true
queue_capacity = 256
app_base_url = "http://localhost:3000"

[uploads]
dir = "./data/uploads"
public_path = "/uploads"
max_file_bytes = 10485760
max_files = 10
"#
        .to_string()
    }
}
