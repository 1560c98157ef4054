//! Platform API Integration Tests
//!
//! Router wiring, session rejection and the access matrix. Nothing here
//! reaches MongoDB: every request is turned away before a query runs.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use tower::ServiceExt;
use utoipa_axum::router::OpenApiRouter;

use cd_common::{ComplaintStatus, UserRole};
use cd_platform::auth::{auth_router, Argon2Config, AuthConfig, AuthState, PasswordPolicy};
use cd_platform::complaint::{complaints_router, ComplaintNotifier, ComplaintsState};
use cd_platform::shared::authorization::{can, Action, Resource};
use cd_platform::shared::{health_router, AppState, AuthLayer, HealthState};
use cd_platform::{
    AuthContext, AuthService, CommentRepository, Complaint, ComplaintHistoryRepository,
    ComplaintRepository, DepartmentRepository, MongoUnitOfWork, NatureTypeRepository,
    PasswordService, SettingsRepository, User, UserRepository,
};

fn offline() -> (Client, Database) {
    let client = Client::with_options(ClientOptions::default()).unwrap();
    let db = client.database("complaint_desk_api_test");
    (client, db)
}

fn test_app() -> (Router, utoipa::openapi::OpenApi) {
    let (client, db) = offline();
    let user_repo = Arc::new(UserRepository::new(&db));
    let auth_service = Arc::new(AuthService::new(AuthConfig {
        secret_key: "integration-test-secret".to_string(),
        ..AuthConfig::default()
    }));

    let auth_state = AuthState {
        auth_service: auth_service.clone(),
        user_repo: user_repo.clone(),
        password_service: Arc::new(
            PasswordService::new(Argon2Config::testing(), PasswordPolicy::default()).unwrap(),
        ),
    };
    let complaints_state = ComplaintsState {
        complaint_repo: Arc::new(ComplaintRepository::new(&db)),
        history_repo: Arc::new(ComplaintHistoryRepository::new(&db)),
        comment_repo: Arc::new(CommentRepository::new(&db)),
        user_repo: user_repo.clone(),
        department_repo: Arc::new(DepartmentRepository::new(&db)),
        nature_type_repo: Arc::new(NatureTypeRepository::new(&db)),
        settings_repo: Arc::new(SettingsRepository::new(&db)),
        unit_of_work: Arc::new(MongoUnitOfWork::new(client, db.clone())),
        notifier: ComplaintNotifier::disabled(),
    };

    let (router, openapi) = OpenApiRouter::new()
        .nest("/api/auth", auth_router(auth_state))
        .nest("/api/complaints", complaints_router(complaints_state))
        .split_for_parts();

    let app = Router::new()
        .merge(router)
        .merge(health_router(HealthState::new(None, "test")))
        .layer(AuthLayer::new(AppState {
            auth_service,
            user_repo,
        }));

    (app, openapi)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

mod session_tests {
    use super::*;

    #[tokio::test]
    async fn test_listing_complaints_requires_session() {
        let (app, _) = test_app();
        let response = app
            .oneshot(Request::builder().uri("/api/complaints").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_me_requires_session() {
        let (app, _) = test_app();
        let response = app
            .oneshot(Request::builder().uri("/api/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_forged_bearer_token_is_rejected() {
        let (app, _) = test_app();
        let request = Request::builder()
            .uri("/api/complaints")
            .header(header::AUTHORIZATION, "Bearer not.a.token")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_rejected() {
        let (app, _) = test_app();
        let other = AuthService::new(AuthConfig {
            secret_key: "some-other-secret".to_string(),
            ..AuthConfig::default()
        });
        let user = User::new("mallory@desk.io", "Mallory", UserRole::Admin, "hash");
        let token = other.generate_session_token(&user).unwrap();

        let request = Request::builder()
            .uri("/api/complaints")
            .header(header::COOKIE, format!("cd_session={}", token))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let (app, _) = test_app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "UP");
    }
}

mod openapi_tests {
    use super::*;

    // the driver spawns its monitors on creation, so this needs a runtime
    #[tokio::test]
    async fn test_nested_paths_are_collected() {
        let (_, openapi) = test_app();
        let paths = &openapi.paths.paths;

        for path in [
            "/api/auth/login",
            "/api/complaints",
            "/api/complaints/bulk",
            "/api/complaints/{id}",
            "/api/complaints/{id}/status",
            "/api/complaints/{id}/assign",
            "/api/complaints/{id}/history",
            "/api/complaints/{id}/comments",
            "/api/complaints/{id}/comments/{comment_id}/reactions",
        ] {
            assert!(paths.contains_key(path), "missing {}", path);
        }
    }
}

mod access_tests {
    use super::*;

    fn ctx(id: &str, role: UserRole, department: Option<&str>) -> AuthContext {
        AuthContext {
            user_id: id.to_string(),
            email: format!("{}@desk.io", id),
            name: id.to_string(),
            role,
            department_id: department.map(String::from),
        }
    }

    fn complaint() -> Complaint {
        Complaint::new("VPN drops", "every hour", "client-1", "it", "emp-1")
    }

    #[test]
    fn test_each_role_sees_its_own_slice() {
        let complaint = complaint();
        let resource = Resource::Complaint(&complaint);

        assert!(can(&ctx("admin", UserRole::Admin, None), Action::Read, &resource));
        assert!(can(&ctx("mgr", UserRole::Manager, Some("it")), Action::Read, &resource));
        assert!(!can(&ctx("mgr-hr", UserRole::Manager, Some("hr")), Action::Read, &resource));
        assert!(can(&ctx("emp-1", UserRole::Employee, Some("it")), Action::Read, &resource));
        assert!(!can(&ctx("emp-2", UserRole::Employee, Some("it")), Action::Read, &resource));
        assert!(can(&ctx("client-1", UserRole::Client, None), Action::Read, &resource));
        assert!(!can(&ctx("client-2", UserRole::Client, None), Action::Read, &resource));
    }

    #[test]
    fn test_client_edits_only_while_new() {
        let mut complaint = complaint();
        let owner = ctx("client-1", UserRole::Client, None);
        assert!(can(&owner, Action::Update, &Resource::Complaint(&complaint)));

        complaint.status = ComplaintStatus::InProgress;
        assert!(!can(&owner, Action::Update, &Resource::Complaint(&complaint)));
        assert!(!can(&owner, Action::Delete, &Resource::Complaint(&complaint)));
    }

    #[test]
    fn test_only_admin_manages_settings() {
        assert!(can(&ctx("admin", UserRole::Admin, None), Action::Manage, &Resource::Settings));
        assert!(!can(&ctx("mgr", UserRole::Manager, Some("it")), Action::Manage, &Resource::Settings));
        assert!(!can(&ctx("mgr", UserRole::Manager, Some("it")), Action::Read, &Resource::Messaging));
    }
}
