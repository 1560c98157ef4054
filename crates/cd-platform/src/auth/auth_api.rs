//! Auth API Endpoints
//!
//! - POST /auth/login - Password login, sets the session cookie
//! - POST /auth/logout - Clears the session cookie
//! - GET /auth/me - Current user profile
//! - POST /auth/change-password - Change own password

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::shared::api_common::SuccessResponse;
use crate::shared::error::PlatformError;
use crate::shared::middleware::Authenticated;
use crate::user::api::UserResponse;
use crate::user::entity::normalize_email;
use crate::{AuthService, PasswordService, UserRepository};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Session token, also set as an http-only cookie
    pub token: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Clone)]
pub struct AuthState {
    pub auth_service: Arc<AuthService>,
    pub user_repo: Arc<UserRepository>,
    pub password_service: Arc<PasswordService>,
}

fn same_site(value: &str) -> SameSite {
    match value.to_lowercase().as_str() {
        "strict" => SameSite::Strict,
        "none" => SameSite::None,
        _ => SameSite::Lax,
    }
}

fn invalid_credentials() -> PlatformError {
    PlatformError::Unauthorized {
        message: "Invalid email or password".to_string(),
    }
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    operation_id = "postAuthLogin",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials or inactive account")
    )
)]
pub async fn login(
    State(state): State<AuthState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, PlatformError> {
    let email = normalize_email(&req.email);
    let mut user = state
        .user_repo
        .find_by_email(&email)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !state
        .password_service
        .verify_password(&req.password, &user.password_hash)
        .unwrap_or(false)
    {
        warn!(email = %email, "Failed login attempt");
        return Err(invalid_credentials());
    }

    if !user.is_active {
        return Err(PlatformError::Unauthorized {
            message: "Account is not active".to_string(),
        });
    }

    let token = state.auth_service.generate_session_token(&user)?;

    state.user_repo.record_login(&user.id).await?;
    user.record_login();

    let cookie = Cookie::build((state.auth_service.cookie_name().to_string(), token.clone()))
        .path("/")
        .http_only(true)
        .secure(state.auth_service.cookie_secure())
        .same_site(same_site(state.auth_service.same_site()))
        .max_age(time::Duration::seconds(state.auth_service.session_expiry_secs()))
        .build();

    info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            token,
            expires_in: state.auth_service.session_expiry_secs(),
            user: UserResponse::from(user),
        }),
    ))
}

/// Logout
#[utoipa::path(
    post,
    path = "/logout",
    tag = "auth",
    operation_id = "postAuthLogout",
    responses(
        (status = 204, description = "Logout successful"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn logout(
    State(state): State<AuthState>,
    jar: CookieJar,
    _auth: Authenticated,
) -> impl IntoResponse {
    let cookie = Cookie::build((state.auth_service.cookie_name().to_string(), ""))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::ZERO)
        .build();

    (jar.add(cookie), StatusCode::NO_CONTENT)
}

/// Get current user
#[utoipa::path(
    get,
    path = "/me",
    tag = "auth",
    operation_id = "getAuthMe",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_current_user(
    State(state): State<AuthState>,
    auth: Authenticated,
) -> Result<Json<UserResponse>, PlatformError> {
    let user = state
        .user_repo
        .find_by_id(&auth.user_id)
        .await?
        .ok_or_else(|| PlatformError::not_found("User", &auth.user_id))?;

    Ok(Json(user.into()))
}

/// Change own password
#[utoipa::path(
    post,
    path = "/change-password",
    tag = "auth",
    operation_id = "postAuthChangePassword",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = SuccessResponse),
        (status = 400, description = "New password violates the policy"),
        (status = 401, description = "Current password is wrong")
    )
)]
pub async fn change_password(
    State(state): State<AuthState>,
    auth: Authenticated,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<SuccessResponse>, PlatformError> {
    let user = state
        .user_repo
        .find_by_id(&auth.user_id)
        .await?
        .ok_or_else(|| PlatformError::not_found("User", &auth.user_id))?;

    if !state
        .password_service
        .verify_password(&req.current_password, &user.password_hash)?
    {
        return Err(PlatformError::InvalidCredentials);
    }

    let hash = state.password_service.hash_password(&req.new_password)?;
    state.user_repo.update_password(&user.id, &hash).await?;

    info!(user_id = %user.id, "Password changed");
    Ok(Json(SuccessResponse::with_message("Password changed")))
}

pub fn auth_router(state: AuthState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(login))
        .routes(routes!(logout))
        .routes(routes!(get_current_user))
        .routes(routes!(change_password))
        .with_state(state)
}
