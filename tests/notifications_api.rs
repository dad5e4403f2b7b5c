use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use travel_notifications::{
    auth::create_jwt,
    delivery::Dispatcher,
    notification::{InMemoryNotificationStore, NotificationService},
    routes::create_router,
    state::{AppState, Config},
    user::{InMemoryUserDirectory, User},
};

const SECRET: &str = "test-secret";

struct TestApp {
    router: Router,
    admin: User,
    alice: User,
    bob: User,
}

fn user(name: &str, role: &str, language: &str) -> User {
    User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: Some(format!("{}@example.com", name.to_lowercase())),
        mobile: None,
        language: language.to_string(),
        role: role.to_string(),
        is_active: true,
        created_at: Utc::now(),
    }
}

async fn setup() -> TestApp {
    let store = Arc::new(InMemoryNotificationStore::new());
    let users = Arc::new(InMemoryUserDirectory::new());

    let admin = user("Admin", "admin", "en");
    let alice = user("Alice", "customer", "en");
    let bob = user("Bob", "customer", "ar");
    for u in [&admin, &alice, &bob] {
        users.insert(u.clone()).await;
    }

    let config = Arc::new(Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: SECRET.to_string(),
        host: "127.0.0.1".to_string(),
        port: 3000,
        cors_origins: vec!["http://localhost:3000".to_string()],
        smtp: None,
        twilio: None,
    });

    let service = NotificationService::new(store.clone());
    let dispatcher = Dispatcher::new(store, users.clone(), Vec::new());
    let state = AppState::new(config, service, dispatcher, users);

    TestApp {
        router: create_router(state),
        admin,
        alice,
        bob,
    }
}

fn token(user: &User) -> String {
    create_jwt(user.id, user.email.as_deref().unwrap_or_default(), SECRET, 1).unwrap()
}

impl TestApp {
    async fn call(
        &self,
        method: Method,
        uri: &str,
        as_user: Option<&User>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(u) = as_user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(u)));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn create_for(&self, target: &User, title: &str) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/notifications",
                Some(&self.admin),
                Some(json!({
                    "title_en": title,
                    "title_ar": "عنوان",
                    "message_en": "Message",
                    "message_ar": "رسالة",
                    "notification_type": "package_update",
                    "user_id": target.id,
                    "send_immediately": false
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body
    }

    async fn unread_count(&self, as_user: &User) -> i64 {
        let (status, body) = self
            .call(Method::GET, "/api/notifications/unread-count", Some(as_user), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        body["unread_count"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let app = setup().await;
    let (status, body) = app.call(Method::GET, "/api/notifications", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_non_admin_cannot_create() {
    let app = setup().await;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/notifications",
            Some(&app.alice),
            Some(json!({
                "title_en": "x", "title_ar": "x", "message_en": "x", "message_ar": "x",
                "notification_type": "promotion"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_requires_both_languages() {
    let app = setup().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/notifications",
            Some(&app.admin),
            Some(json!({
                "title_en": "Hello",
                "message_en": "World",
                "notification_type": "promotion",
                "user_id": app.alice.id
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("title_ar"));
}

#[tokio::test]
async fn test_create_for_unknown_user_is_not_found() {
    let app = setup().await;
    let ghost = user("Ghost", "customer", "en");
    let (status, _) = app
        .call(
            Method::POST,
            "/api/notifications",
            Some(&app.admin),
            Some(json!({
                "title_en": "x", "title_ar": "x", "message_en": "x", "message_ar": "x",
                "notification_type": "promotion",
                "user_id": ghost.id
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unread_count_and_mark_read_flow() {
    let app = setup().await;
    let first = app.create_for(&app.alice, "First").await;
    app.create_for(&app.alice, "Second").await;
    app.create_for(&app.alice, "Third").await;
    assert_eq!(first["priority"], 1);
    assert_eq!(first["status"], "unread");

    assert_eq!(app.unread_count(&app.alice).await, 3);
    assert_eq!(app.unread_count(&app.bob).await, 0);

    let uri = format!("/api/notifications/{}/read", first["id"].as_str().unwrap());
    let (status, read) = app.call(Method::PUT, &uri, Some(&app.alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["status"], "read");

    let (_, again) = app.call(Method::PUT, &uri, Some(&app.alice), None).await;
    assert_eq!(again["read_at"], read["read_at"]);
    assert_eq!(app.unread_count(&app.alice).await, 2);

    // Bob cannot see Alice's notification.
    let (status, _) = app.call(Method::PUT, &uri, Some(&app.bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .call(Method::PUT, "/api/notifications/mark-all-read", Some(&app.alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Marked 2 notifications as read");
    assert_eq!(app.unread_count(&app.alice).await, 0);
}

#[tokio::test]
async fn test_archive_hides_from_default_listing_but_not_admin() {
    let app = setup().await;
    let created = app.create_for(&app.alice, "Old trip").await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/notifications/{}", id),
            Some(&app.alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, listing) = app
        .call(Method::GET, "/api/notifications", Some(&app.alice), None)
        .await;
    assert_eq!(listing["total"], 0);

    let (_, archived) = app
        .call(
            Method::GET,
            "/api/notifications?status=archived",
            Some(&app.alice),
            None,
        )
        .await;
    assert_eq!(archived["total"], 1);

    let (status, all) = app
        .call(
            Method::GET,
            &format!("/api/notifications/admin/all?user_id={}", app.alice.id),
            Some(&app.admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["data"][0]["id"], id.as_str());
    assert_eq!(all["data"][0]["status"], "archived");

    // Archived is terminal.
    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/notifications/{}/read", id),
            Some(&app.alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_admin_listing_is_forbidden_for_customers() {
    let app = setup().await;
    let (status, _) = app
        .call(Method::GET, "/api/notifications/admin/all", Some(&app.bob), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_broadcast_receipts_are_per_user() {
    let app = setup().await;
    let (status, broadcast) = app
        .call(
            Method::POST,
            "/api/notifications/broadcast",
            Some(&app.admin),
            Some(json!({
                "title_en": "Eid holiday",
                "title_ar": "عطلة العيد",
                "message_en": "Our office is closed",
                "message_ar": "مكتبنا مغلق",
                "send_immediately": false
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(broadcast["user_id"].is_null());
    assert_eq!(broadcast["notification_type"], "admin_announcement");
    assert_eq!(broadcast["priority"], 2);

    assert_eq!(app.unread_count(&app.alice).await, 1);
    assert_eq!(app.unread_count(&app.bob).await, 1);

    let uri = format!("/api/notifications/{}/read", broadcast["id"].as_str().unwrap());
    let (status, _) = app.call(Method::PUT, &uri, Some(&app.alice), None).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(app.unread_count(&app.alice).await, 0);
    assert_eq!(app.unread_count(&app.bob).await, 1);

    let (_, bob_list) = app
        .call(Method::GET, "/api/notifications", Some(&app.bob), None)
        .await;
    assert_eq!(bob_list["data"][0]["status"], "unread");
}

#[tokio::test]
async fn test_bulk_update_is_all_or_nothing() {
    let app = setup().await;
    let a = app.create_for(&app.alice, "A").await;
    let b = app.create_for(&app.alice, "B").await;
    let c = app.create_for(&app.alice, "C").await;

    let (status, _) = app
        .call(
            Method::PUT,
            "/api/notifications/bulk-update",
            Some(&app.alice),
            Some(json!({
                "notification_ids": [a["id"], Uuid::new_v4()],
                "status": "read"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.unread_count(&app.alice).await, 3);

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/notifications/bulk-update",
            Some(&app.alice),
            Some(json!({
                "notification_ids": [a["id"], b["id"]],
                "status": "read"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Updated 2 notifications to read");

    let (_, listing) = app
        .call(Method::GET, "/api/notifications?status=unread", Some(&app.alice), None)
        .await;
    assert_eq!(listing["total"], 1);
    assert_eq!(listing["data"][0]["id"], c["id"]);
}

#[tokio::test]
async fn test_stats_lists_every_type() {
    let app = setup().await;
    app.create_for(&app.alice, "A").await;

    let (status, stats) = app
        .call(Method::GET, "/api/notifications/stats", Some(&app.alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_notifications"], 1);
    assert_eq!(stats["unread_count"], 1);
    assert_eq!(stats["by_type"]["package_update"], 1);
    assert_eq!(stats["by_type"]["promotion"], 0);
}

#[tokio::test]
async fn test_domain_event_creates_templated_notification() {
    let app = setup().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/notifications/events",
            Some(&app.admin),
            Some(json!({
                "event": "booking_cancelled",
                "booking": {
                    "booking_id": Uuid::new_v4(),
                    "user_id": app.bob.id,
                    "reference": "DXB-77",
                    "travel_date": "2025-01-05"
                },
                "reason": "Flight cancelled"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["notification_type"], "booking_cancelled");
    assert_eq!(body["priority"], 3);
    assert_eq!(body["data"]["reference"], "DXB-77");
    assert!(body["message_en"].as_str().unwrap().contains("Flight cancelled"));
    assert_eq!(app.unread_count(&app.bob).await, 1);
}

#[tokio::test]
async fn test_send_unknown_notification_is_not_found() {
    let app = setup().await;
    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/notifications/send/{}", Uuid::new_v4()),
            Some(&app.admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_send_stamps_sent_at() {
    let app = setup().await;
    let created = app.create_for(&app.alice, "Ship it").await;
    assert!(created["sent_at"].is_null());

    let (status, report) = app
        .call(
            Method::POST,
            &format!("/api/notifications/send/{}", created["id"].as_str().unwrap()),
            Some(&app.admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["recipients"], 1);
    assert_eq!(report["attempted"], 0);
    assert!(report["sent_at"].is_string());
}

#[tokio::test]
async fn test_collection_path_accepts_trailing_slash() {
    let app = setup().await;
    app.create_for(&app.alice, "Slash").await;

    let (status, listing) = app
        .call(Method::GET, "/api/notifications/", Some(&app.alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["total"], 1);

    let (status, created) = app
        .call(
            Method::POST,
            "/api/notifications/",
            Some(&app.admin),
            Some(json!({
                "title_en": "Gate change",
                "title_ar": "تغيير البوابة",
                "message_en": "Now boarding at B12",
                "message_ar": "الصعود الآن من B12",
                "user_id": app.alice.id
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);

    let (status, _) = app.call(Method::GET, "/api/notifications/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_stream_only_carries_notifications_visible_to_caller() {
    let app = setup().await;

    let request = Request::builder()
        .uri("/api/notifications/stream")
        .header(header::AUTHORIZATION, format!("Bearer {}", token(&app.alice)))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let mut frames = response.into_body().into_data_stream();

    let for_bob = app.create_for(&app.bob, "Bob only").await;
    let (status, broadcast) = app
        .call(
            Method::POST,
            "/api/notifications/broadcast",
            Some(&app.admin),
            Some(json!({
                "title_en": "Service update",
                "title_ar": "تحديث الخدمة",
                "message_en": "New routes to Muscat",
                "message_ar": "رحلات جديدة إلى مسقط",
                "send_immediately": false
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let broadcast_id = broadcast["id"].as_str().unwrap();
    let mut received = String::new();
    while !received.contains(broadcast_id) {
        let frame = tokio::time::timeout(Duration::from_secs(2), frames.next())
            .await
            .expect("no event before timeout")
            .expect("stream ended")
            .unwrap();
        received.push_str(&String::from_utf8_lossy(&frame));
    }

    assert!(received.contains("event: notification"));
    assert!(!received.contains(for_bob["id"].as_str().unwrap()));
}
