//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "complaintdesk.toml",
    "./config/config.toml",
    "/etc/complaintdesk/config.toml",
];

const ENV_PREFIX: &str = "COMPLAINTDESK_";

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        apply_overrides(&mut config, |key| env::var(key).ok());

        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("COMPLAINTDESK_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply overrides from a key lookup (the process environment in production).
pub(crate) fn apply_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

    // HTTP
    if let Some(val) = var("HTTP_HOST") {
        config.http.host = val;
    }
    if let Some(port) = var("HTTP_PORT").and_then(|v| v.parse().ok()) {
        config.http.port = port;
    }
    if let Some(val) = var("CORS_ORIGINS") {
        config.http.cors_origins = val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    // MongoDB
    if let Some(val) = var("MONGODB_URI") {
        config.mongodb.uri = val;
    }
    if let Some(val) = var("MONGODB_DATABASE") {
        config.mongodb.database = val;
    }

    // Auth
    if let Some(val) = var("JWT_SECRET") {
        config.auth.jwt_secret = val;
    }
    if let Some(val) = var("JWT_ISSUER") {
        config.auth.issuer = val;
    }
    if let Some(secs) = var("SESSION_EXPIRY_SECS").and_then(|v| v.parse().ok()) {
        config.auth.session_expiry_secs = secs;
    }
    if let Some(val) = var("COOKIE_SECURE") {
        config.auth.cookie_secure = parse_bool(&val);
    }

    // WhatsApp gateway: bare names first, prefixed names win
    for (bare, field) in [
        ("WHATSAPP_INSTANCE_ID", GatewayField::InstanceId),
        ("WHATSAPP_API_KEY", GatewayField::ApiKey),
        ("WHATSAPP_BASE_URL", GatewayField::BaseUrl),
        ("WHATSAPP_DEFAULT_COUNTRY_CODE", GatewayField::CountryCode),
    ] {
        if let Some(val) = var(bare).or_else(|| lookup(bare)) {
            field.set(config, val);
        }
    }

    // Notifications
    if let Some(val) = var("NOTIFICATIONS_ENABLED") {
        config.notifications.enabled = parse_bool(&val);
    }
    if let Some(capacity) = var("NOTIFICATION_QUEUE_CAPACITY").and_then(|v| v.parse().ok()) {
        config.notifications.queue_capacity = capacity;
    }
    if let Some(val) = var("APP_BASE_URL") {
        config.notifications.app_base_url = val;
    }

    // Uploads
    if let Some(val) = var("UPLOAD_DIR") {
        config.uploads.dir = val;
    }

    // General
    if let Some(val) = var("DEV_MODE") {
        config.dev_mode = parse_bool(&val);
    }
}

#[derive(Clone, Copy)]
enum GatewayField {
    InstanceId,
    ApiKey,
    BaseUrl,
    CountryCode,
}

impl GatewayField {
    fn set(self, config: &mut AppConfig, value: String) {
        let whatsapp = &mut config.whatsapp;
        match self {
            Self::InstanceId => whatsapp.instance_id = value,
            Self::ApiKey => whatsapp.api_key = value,
            Self::BaseUrl => whatsapp.base_url = value,
            Self::CountryCode => whatsapp.default_country_code = value,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            dev_mode = true

            [http]
            port = 9000

            [notifications]
            app_base_url = "https://desk.example.com"
            "#
        )
        .unwrap();

        let config = ConfigLoader::with_path(file.path()).load().unwrap();
        assert_eq!(config.http.port, 9000);
        assert_eq!(config.notifications.app_base_url, "https://desk.example.com");
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http\nport = ").unwrap();

        let result = ConfigLoader::with_path(file.path()).load();
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_prefixed_overrides() {
        let mut config = AppConfig::default();
        apply_overrides(
            &mut config,
            lookup_from(&[
                ("COMPLAINTDESK_HTTP_PORT", "7000"),
                ("COMPLAINTDESK_CORS_ORIGINS", "http://a.test, http://b.test,"),
                ("COMPLAINTDESK_JWT_SECRET", "s3cret"),
                ("COMPLAINTDESK_DEV_MODE", "yes"),
                ("COMPLAINTDESK_NOTIFICATION_QUEUE_CAPACITY", "8"),
            ]),
        );

        assert_eq!(config.http.port, 7000);
        assert_eq!(config.http.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert!(config.dev_mode);
        assert_eq!(config.notifications.queue_capacity, 8);
    }

    #[test]
    fn test_gateway_variables_accept_bare_names() {
        let mut config = AppConfig::default();
        apply_overrides(
            &mut config,
            lookup_from(&[
                ("WHATSAPP_INSTANCE_ID", "12345"),
                ("WHATSAPP_API_KEY", "bare-key"),
                ("COMPLAINTDESK_WHATSAPP_API_KEY", "prefixed-key"),
            ]),
        );

        assert_eq!(config.whatsapp.instance_id, "12345");
        assert_eq!(config.whatsapp.api_key, "prefixed-key");
        assert_eq!(config.whatsapp.default_country_code, "92");
        assert!(config.whatsapp.is_configured());
    }

    #[test]
    fn test_unparseable_numbers_are_ignored() {
        let mut config = AppConfig::default();
        apply_overrides(&mut config, lookup_from(&[("COMPLAINTDESK_HTTP_PORT", "eighty")]));
        assert_eq!(config.http.port, 8080);
    }
}
