//! ComplaintDesk Server
//!
//! Single process serving:
//! - REST APIs under /api (auth, users, departments, nature types,
//!   settings, complaints with comments, uploads, WhatsApp admin)
//! - Stored attachments under the configured public path
//! - Health probes at /health and /ready
//! - OpenAPI at /q/openapi with Swagger UI at /swagger-ui
//!
//! Complaint events are handed to a background worker that delivers
//! WhatsApp messages one at a time.
//!
//! Configuration comes from `config.toml` (or `COMPLAINTDESK_CONFIG`) with
//! `COMPLAINTDESK_*` environment overrides. `RUST_LOG` sets the log level,
//! `LOG_FORMAT=json` switches to JSON logs.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tokio::{net::TcpListener, signal};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use cd_config::{AppConfig, HttpConfig};
use cd_notify::{
    create_gateway, spawn_notification_worker, Dispatcher, GatewayConfig, MessageFormatter,
    NotificationQueue, NotificationWorker, StakeholderDirectory,
};
use cd_platform::auth::{auth_router, Argon2Config, AuthConfig, AuthState, PasswordPolicy};
use cd_platform::complaint::{complaints_router, ComplaintNotifier, ComplaintsState};
use cd_platform::department::{departments_router, DepartmentsState};
use cd_platform::messaging::{messaging_router, MessagingState};
use cd_platform::nature_type::{nature_types_router, NatureTypesState};
use cd_platform::seed::DevDataSeeder;
use cd_platform::settings::{settings_router, SettingsState};
use cd_platform::shared::error::expose_internal_errors;
use cd_platform::shared::{health_router, initialize_indexes, AppState, AuthLayer, HealthState};
use cd_platform::upload::{upload_router, UploadState, UploadStorage};
use cd_platform::user::{users_router, UsersState};
use cd_platform::{
    AuthService, CommentRepository, ComplaintHistoryRepository, ComplaintRepository,
    DepartmentRepository, MongoUnitOfWork, NatureTypeRepository, PasswordService,
    SettingsRepository, UserRepository,
};

/// How long shutdown waits for queued notifications to go out
const NOTIFICATION_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    cd_common::logging::init_logging("cd-server");

    info!("Starting ComplaintDesk Server");

    let config = AppConfig::load()?;
    config.validate()?;
    expose_internal_errors(config.dev_mode);
    if config.dev_mode {
        warn!("Development mode: seed data and detailed 500 responses enabled");
    }

    // Connect to MongoDB
    info!("Connecting to MongoDB: {}", config.mongodb.database);
    let mongo_client = mongodb::Client::with_uri_str(&config.mongodb.uri).await?;
    let db = mongo_client.database(&config.mongodb.database);

    if let Err(e) = initialize_indexes(&db).await {
        warn!("Index initialization failed: {}", e);
    }

    if config.dev_mode {
        let seeder = DevDataSeeder::new(&db)?;
        if let Err(e) = seeder.seed().await {
            warn!("Dev data seeding failed: {}", e);
        }
    }

    // Repositories
    let user_repo = Arc::new(UserRepository::new(&db));
    let department_repo = Arc::new(DepartmentRepository::new(&db));
    let nature_type_repo = Arc::new(NatureTypeRepository::new(&db));
    let settings_repo = Arc::new(SettingsRepository::new(&db));
    let complaint_repo = Arc::new(ComplaintRepository::new(&db));
    let history_repo = Arc::new(ComplaintHistoryRepository::new(&db));
    let comment_repo = Arc::new(CommentRepository::new(&db));
    let unit_of_work = Arc::new(MongoUnitOfWork::new(mongo_client.clone(), db.clone()));
    info!("Repositories initialized");

    // Auth
    let auth_service = Arc::new(AuthService::new(AuthConfig::from(&config.auth)));
    let password_service = Arc::new(PasswordService::new(
        Argon2Config::default(),
        PasswordPolicy::default(),
    )?);
    let app_state = AppState {
        auth_service: auth_service.clone(),
        user_repo: user_repo.clone(),
    };

    // Notifications
    let gateway_config = GatewayConfig::from(&config.whatsapp);
    let gateway = create_gateway(&gateway_config);
    let (queue, worker_handle) = if config.notifications.enabled {
        let directory: Arc<dyn StakeholderDirectory> = user_repo.clone();
        let worker = NotificationWorker::new(
            directory,
            MessageFormatter::new(&config.notifications.app_base_url),
            Dispatcher::new(gateway.clone(), &gateway_config),
        );
        let (queue, handle) = spawn_notification_worker(worker, config.notifications.queue_capacity);
        info!(
            capacity = config.notifications.queue_capacity,
            gateway_configured = gateway_config.is_configured(),
            "Notification worker started"
        );
        (queue, Some(handle))
    } else {
        info!("Notifications disabled");
        (NotificationQueue::disabled(), None)
    };
    let notifier = ComplaintNotifier::new(queue);

    // API states
    let auth_state = AuthState {
        auth_service,
        user_repo: user_repo.clone(),
        password_service: password_service.clone(),
    };
    let users_state = UsersState {
        user_repo: user_repo.clone(),
        department_repo: department_repo.clone(),
        complaint_repo: complaint_repo.clone(),
        password_service,
        unit_of_work: unit_of_work.clone(),
    };
    let departments_state = DepartmentsState {
        department_repo: department_repo.clone(),
        user_repo: user_repo.clone(),
        complaint_repo: complaint_repo.clone(),
    };
    let nature_types_state = NatureTypesState {
        nature_type_repo: nature_type_repo.clone(),
    };
    let settings_state = SettingsState {
        settings_repo: settings_repo.clone(),
        department_repo: department_repo.clone(),
    };
    let complaints_state = ComplaintsState {
        complaint_repo,
        history_repo,
        comment_repo,
        user_repo,
        department_repo,
        nature_type_repo,
        settings_repo,
        unit_of_work,
        notifier,
    };
    let storage = Arc::new(UploadStorage::new(&config.uploads));
    let upload_state = UploadState {
        storage: storage.clone(),
    };
    let messaging_state = MessagingState {
        dispatcher: Arc::new(Dispatcher::new(gateway, &gateway_config)),
        notifications_enabled: config.notifications.enabled,
    };

    let (router, mut openapi) = OpenApiRouter::new()
        .nest("/api/auth", auth_router(auth_state))
        .nest("/api/users", users_router(users_state))
        .nest("/api/departments", departments_router(departments_state))
        .nest("/api/nature-types", nature_types_router(nature_types_state))
        .nest("/api/settings", settings_router(settings_state))
        .nest("/api/complaints", complaints_router(complaints_state))
        .nest("/api/upload", upload_router(upload_state))
        .nest("/api/whatsapp", messaging_router(messaging_state))
        .split_for_parts();

    openapi.info.title = "ComplaintDesk API".to_string();
    openapi.info.version = env!("CARGO_PKG_VERSION").to_string();
    openapi.info.description = Some("Complaint intake, routing and tracking".to_string());

    let app = Router::new()
        .merge(router)
        .merge(health_router(HealthState::new(Some(db), env!("CARGO_PKG_VERSION"))))
        .nest_service(&config.uploads.public_path, ServeDir::new(storage.dir()))
        .merge(SwaggerUi::new("/swagger-ui").url("/q/openapi", openapi))
        .layer(AuthLayer::new(app_state))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.http));

    let addr = format!("{}:{}", config.http.host, config.http.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("API server listening on http://{}", addr);
    info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server stopped");

    // Every queue handle lived in the router; the worker now drains and exits
    if let Some(handle) = worker_handle {
        match tokio::time::timeout(NOTIFICATION_DRAIN_TIMEOUT, handle).await {
            Ok(Ok(stats)) => info!(jobs = stats.jobs, sent = stats.sent, failed = stats.failed, "Notifications drained"),
            Ok(Err(e)) => warn!("Notification worker panicked: {}", e),
            Err(_) => warn!("Pending notifications abandoned after {:?}", NOTIFICATION_DRAIN_TIMEOUT),
        }
    }

    info!("ComplaintDesk Server shutdown complete");
    Ok(())
}

/// Any origin when none are configured; otherwise the listed origins with
/// credentials so the session cookie is sent.
fn cors_layer(http: &HttpConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = http
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Ctrl+C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received...");
}
