//! Session Token Service
//!
//! HS256 session tokens carried in the session cookie or a bearer header.

use cd_common::UserRole;
use cd_config::AuthSettings;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::shared::error::{PlatformError, Result};
use crate::User;

const GENERATED_SECRET_LEN: usize = 48;

/// Claims of a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User ID
    pub sub: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret_key: String,
    pub issuer: String,
    pub session_expiry_secs: i64,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub same_site: String,
}

impl From<&AuthSettings> for AuthConfig {
    fn from(settings: &AuthSettings) -> Self {
        Self {
            secret_key: settings.jwt_secret.clone(),
            issuer: settings.issuer.clone(),
            session_expiry_secs: settings.session_expiry_secs,
            cookie_name: settings.cookie_name.clone(),
            cookie_secure: settings.cookie_secure,
            same_site: settings.same_site.clone(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::from(&AuthSettings::default())
    }
}

pub struct AuthService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    /// An empty secret is replaced by a random one; sessions then do not
    /// survive a restart.
    pub fn new(mut config: AuthConfig) -> Self {
        if config.secret_key.trim().is_empty() {
            warn!("No JWT secret configured, generating an ephemeral one");
            config.secret_key = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(GENERATED_SECRET_LEN)
                .map(char::from)
                .collect();
        }

        let encoding_key = EncodingKey::from_secret(config.secret_key.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret_key.as_bytes());

        info!(issuer = %config.issuer, "AuthService initialized with HS256");

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn session_expiry_secs(&self) -> i64 {
        self.config.session_expiry_secs
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    pub fn cookie_secure(&self) -> bool {
        self.config.cookie_secure
    }

    pub fn same_site(&self) -> &str {
        &self.config.same_site
    }

    pub fn generate_session_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.session_expiry_secs);

        let claims = SessionClaims {
            sub: user.id.clone(),
            iss: self.config.issuer.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: crate::TsidGenerator::generate(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            department: user.department_id.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| PlatformError::internal(format!("Failed to encode JWT: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> Result<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => PlatformError::TokenExpired,
                _ => PlatformError::InvalidToken {
                    message: e.to_string(),
                },
            })
    }
}

/// Extract bearer token from an Authorization header value
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> AuthService {
        AuthService::new(AuthConfig {
            secret_key: secret.to_string(),
            ..AuthConfig::default()
        })
    }

    fn user() -> User {
        User::new("mgr@desk.io", "Sara", UserRole::Manager, "hash").with_department("0HZXEQ5Y8JY5Z")
    }

    #[test]
    fn test_generate_and_validate_token() {
        let service = service("test-secret");
        let user = user();

        let token = service.generate_session_token(&user).unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, UserRole::Manager);
        assert_eq!(claims.department.as_deref(), Some("0HZXEQ5Y8JY5Z"));
        assert_eq!(claims.iss, "complaintdesk");
        assert_eq!(claims.exp - claims.iat, 28800);
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let token = service("secret-a").generate_session_token(&user()).unwrap();
        let err = service("secret-b").validate_token(&token).unwrap_err();
        assert!(matches!(err, PlatformError::InvalidToken { .. }));
    }

    #[test]
    fn test_expired_token() {
        let service = AuthService::new(AuthConfig {
            secret_key: "test-secret".to_string(),
            session_expiry_secs: -600,
            ..AuthConfig::default()
        });
        let token = service.generate_session_token(&user()).unwrap();
        assert!(matches!(service.validate_token(&token), Err(PlatformError::TokenExpired)));
    }

    #[test]
    fn test_empty_secret_gets_generated() {
        let service = service("");
        let token = service.generate_session_token(&user()).unwrap();
        assert!(service.validate_token(&token).is_ok());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("bearer abc123"), None);
        assert_eq!(extract_bearer_token("Basic abc123"), None);
    }
}
