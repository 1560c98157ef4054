//! Notification fan-out tests against a mock WhatsApp gateway
//!
//! Tests for:
//! - Recipient selection per event and actor role
//! - Internal comments skipping the client
//! - Phone normalization and deduplication before sending
//! - Gateway request shape (path, bearer token, body)
//! - Continuing past failed sends

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cd_notify::{
    create_gateway, spawn_notification_worker, Actor, ComplaintSnapshot, ComplaintStatus,
    Dispatcher, EventDetails, GatewayConfig, MessageFormatter, NotificationEvent, NotificationJob,
    NotificationWorker, StakeholderDirectory, UserRole,
};

const SEND_PATH: &str = "/instances/inst-1/client/action/send-message";

#[derive(Default)]
struct StaticDirectory {
    phones: HashMap<String, String>,
    managers: HashMap<String, Vec<String>>,
    admins: Vec<String>,
}

#[async_trait]
impl StakeholderDirectory for StaticDirectory {
    async fn user_phone(&self, user_id: &str) -> anyhow::Result<Option<String>> {
        Ok(self.phones.get(user_id).cloned())
    }

    async fn department_manager_phones(&self, department_id: &str) -> anyhow::Result<Vec<String>> {
        Ok(self.managers.get(department_id).cloned().unwrap_or_default())
    }

    async fn admin_phones(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.admins.clone())
    }
}

fn gateway_config(server: &MockServer) -> GatewayConfig {
    GatewayConfig {
        instance_id: "inst-1".to_string(),
        api_key: "secret-key".to_string(),
        base_url: server.uri(),
        send_interval: Duration::from_millis(10),
        ..Default::default()
    }
}

fn worker(server: &MockServer, directory: StaticDirectory) -> NotificationWorker {
    let config = gateway_config(server);
    let dispatcher = Dispatcher::new(create_gateway(&config), &config);
    NotificationWorker::new(
        Arc::new(directory),
        MessageFormatter::new("https://desk.example.com"),
        dispatcher,
    )
}

fn complaint() -> ComplaintSnapshot {
    ComplaintSnapshot {
        id: "0HZXEQ5Y8JY5Z".to_string(),
        title: "No water supply".to_string(),
        status: ComplaintStatus::New,
        client_id: "client-1".to_string(),
        assignee_id: Some("emp-1".to_string()),
        department_id: Some("dept-1".to_string()),
    }
}

fn actor(role: UserRole) -> Actor {
    Actor {
        user_id: "actor-1".to_string(),
        name: "Hina".to_string(),
        role,
    }
}

async fn sent_chat_ids(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
        .filter_map(|body| body["chatId"].as_str().map(String::from))
        .collect()
}

#[tokio::test]
async fn test_created_event_reaches_manager_and_admin() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(header("Authorization", "Bearer secret-key"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    // client has a phone but is not notified on creation; no assignee yet
    let directory = StaticDirectory {
        phones: HashMap::from([("client-1".to_string(), "03005555555".to_string())]),
        managers: HashMap::from([("dept-1".to_string(), vec!["0300-1234567".to_string()])]),
        admins: vec!["03009999999".to_string()],
    };
    let mut snapshot = complaint();
    snapshot.assignee_id = None;

    let job = NotificationJob::new(NotificationEvent::Created, actor(UserRole::Client), snapshot);
    let report = worker(&server, directory).process(&job).await;

    assert_eq!(report.sent, 2);
    assert_eq!(
        sent_chat_ids(&server).await,
        vec!["923001234567@c.us", "923009999999@c.us"]
    );
}

#[tokio::test]
async fn test_manager_comment_skips_every_manager() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let directory = StaticDirectory {
        phones: HashMap::from([
            ("client-1".to_string(), "03001111111".to_string()),
            ("emp-1".to_string(), "03002222222".to_string()),
        ]),
        managers: HashMap::from([(
            "dept-1".to_string(),
            vec!["03003333333".to_string(), "03004444444".to_string()],
        )]),
        admins: vec!["03009999999".to_string()],
    };

    let job = NotificationJob::new(
        NotificationEvent::CommentAdded,
        actor(UserRole::Manager),
        complaint(),
    )
    .with_details(EventDetails {
        comment: Some("Technician is on the way".to_string()),
        ..Default::default()
    });

    worker(&server, directory).process(&job).await;

    assert_eq!(
        sent_chat_ids(&server).await,
        vec![
            "923001111111@c.us",
            "923002222222@c.us",
            "923009999999@c.us"
        ]
    );
}

#[tokio::test]
async fn test_internal_comment_never_reaches_client() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let directory = StaticDirectory {
        phones: HashMap::from([
            ("client-1".to_string(), "03001111111".to_string()),
            ("emp-1".to_string(), "03002222222".to_string()),
        ]),
        admins: vec!["03009999999".to_string()],
        ..Default::default()
    };

    let job = NotificationJob::new(
        NotificationEvent::CommentAdded,
        actor(UserRole::Manager),
        complaint(),
    )
    .with_details(EventDetails {
        comment: Some("Vendor ticket #4411".to_string()),
        internal: true,
        ..Default::default()
    });

    worker(&server, directory).process(&job).await;

    assert_eq!(
        sent_chat_ids(&server).await,
        vec!["923002222222@c.us", "923009999999@c.us"]
    );
}

#[tokio::test]
async fn test_equivalent_numbers_send_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(body_partial_json(serde_json::json!({"chatId": "923001234567@c.us"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    // the assignee is also the department manager, stored in two formats
    let directory = StaticDirectory {
        phones: HashMap::from([("emp-1".to_string(), "0300-1234567".to_string())]),
        managers: HashMap::from([("dept-1".to_string(), vec!["03001234567".to_string()])]),
        admins: Vec::new(),
    };

    let job = NotificationJob::new(NotificationEvent::Assigned, actor(UserRole::Admin), complaint());
    let report = worker(&server, directory).process(&job).await;

    assert_eq!(report.attempted, 1);
    assert_eq!(report.sent, 1);
}

#[tokio::test]
async fn test_no_recipients_means_no_requests() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let job = NotificationJob::new(
        NotificationEvent::StatusChanged,
        actor(UserRole::Employee),
        complaint(),
    );
    let report = worker(&server, StaticDirectory::default()).process(&job).await;

    assert_eq!(report.attempted, 0);
}

#[tokio::test]
async fn test_failed_send_continues_with_next_recipient() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(body_partial_json(serde_json::json!({"chatId": "923001111111@c.us"})))
        .respond_with(ResponseTemplate::new(500).set_body_string("instance offline"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(body_partial_json(serde_json::json!({"chatId": "923009999999@c.us"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let directory = StaticDirectory {
        managers: HashMap::from([("dept-1".to_string(), vec!["03001111111".to_string()])]),
        admins: vec!["03009999999".to_string()],
        ..Default::default()
    };

    let job = NotificationJob::new(
        NotificationEvent::Other("escalated".to_string()),
        actor(UserRole::Employee),
        complaint(),
    );
    let report = worker(&server, directory).process(&job).await;

    assert_eq!(report.sent, 1);
    assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn test_message_body_carries_link() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let directory = StaticDirectory {
        admins: vec!["03009999999".to_string()],
        ..Default::default()
    };
    let job = NotificationJob::new(NotificationEvent::Created, actor(UserRole::Client), complaint());
    worker(&server, directory).process(&job).await;

    let requests = server.received_requests().await.unwrap_or_default();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let message = body["message"].as_str().unwrap();

    assert!(message.contains("#Y8JY5Z"));
    assert!(message.ends_with("https://desk.example.com/admin/complaints/0HZXEQ5Y8JY5Z"));
}

#[tokio::test]
async fn test_worker_drains_queue_before_stopping() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    let directory = StaticDirectory {
        admins: vec!["03009999999".to_string()],
        ..Default::default()
    };
    let (queue, handle) = spawn_notification_worker(worker(&server, directory), 8);

    for event in [
        NotificationEvent::Created,
        NotificationEvent::Assigned,
        NotificationEvent::StatusChanged,
    ] {
        queue
            .enqueue(NotificationJob::new(event, actor(UserRole::Employee), complaint()))
            .unwrap();
    }
    drop(queue);

    let stats = handle.await.unwrap();
    assert_eq!(stats.jobs, 3);
    assert_eq!(stats.sent, 3);
}
