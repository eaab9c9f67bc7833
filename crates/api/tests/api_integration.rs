//! Integration tests for the HTTP service over the in-memory store and bus.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use broker::{EventBus, InMemoryBus, SubscribeOptions};
use metrics_exporter_prometheus::PrometheusHandle;
use note_store::InMemoryNoteStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup_with_bus(bus: Arc<InMemoryBus>) -> axum::Router {
    let store = InMemoryNoteStore::new();
    let (state, analytics) = api::create_state(store, bus.clone() as Arc<dyn EventBus>);
    api::spawn_consumer(bus, analytics, SubscribeOptions::default());
    api::create_app(state, get_metrics_handle())
}

fn setup() -> axum::Router {
    setup_with_bus(Arc::new(InMemoryBus::new()))
}

async fn request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn note_body(title: &str, category: &str) -> serde_json::Value {
    serde_json::json!({
        "title": title,
        "content": format!("{title} content"),
        "category": category,
    })
}

#[tokio::test]
async fn health_reports_broker_state() {
    let app = setup();
    let (status, json) = request(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["broker"], "connected");
}

#[tokio::test]
async fn health_reports_disconnected_broker() {
    let bus = Arc::new(InMemoryBus::disconnected());
    let app = setup_with_bus(bus);

    let (status, json) = request(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["broker"], "disconnected");
}

#[tokio::test]
async fn create_returns_created_note() {
    let app = setup();
    let (status, json) =
        request(&app, "POST", "/api/notes", Some(note_body("First", "work"))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["id"], 1);
    assert_eq!(json["title"], "First");
    assert_eq!(json["category"], "work");
}

#[tokio::test]
async fn create_rejects_blank_title() {
    let app = setup();
    let (status, json) = request(
        &app,
        "POST",
        "/api/notes",
        Some(serde_json::json!({"title": "  ", "content": "c"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Title and content are required");
}

#[tokio::test]
async fn get_unknown_note_is_not_found() {
    let app = setup();
    let (status, _) = request(&app, "GET", "/api/notes/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn crud_roundtrip() {
    let app = setup();

    let (_, created) = request(&app, "POST", "/api/notes", Some(note_body("Note", "work"))).await;
    let id = created["id"].as_i64().unwrap();

    let (status, updated) = request(
        &app,
        "PUT",
        &format!("/api/notes/{id}"),
        Some(note_body("Renamed", "personal")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Renamed");

    let (status, fetched) = request(&app, "GET", &format!("/api/notes/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["category"], "personal");

    let (status, _) = request(&app, "DELETE", &format!("/api/notes/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(&app, "GET", &format!("/api/notes/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn toggles_flip_flags() {
    let app = setup();
    let (_, created) = request(&app, "POST", "/api/notes", Some(note_body("Note", "work"))).await;
    let id = created["id"].as_i64().unwrap();

    let (status, json) = request(&app, "PATCH", &format!("/api/notes/{id}/favorite"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_favorite"], true);

    let (_, json) = request(&app, "PATCH", &format!("/api/notes/{id}/pin"), None).await;
    assert_eq!(json["is_pinned"], true);
}

#[tokio::test]
async fn list_filters_by_category() {
    let app = setup();
    request(&app, "POST", "/api/notes", Some(note_body("A", "work"))).await;
    request(&app, "POST", "/api/notes", Some(note_body("B", "personal"))).await;

    let (status, json) = request(&app, "GET", "/api/notes?category=work", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["notes"][0]["title"], "A");
}

#[tokio::test]
async fn analytics_cache_updates_after_consumed_event() {
    let app = setup();

    let (_, initial) = request(&app, "GET", "/api/analytics", None).await;
    assert_eq!(initial["totalNotes"], 0);

    request(&app, "POST", "/api/notes", Some(note_body("A", "work"))).await;

    // The event flows producer → bus → consumer → projector; poll until
    // the swapped-in snapshot reflects it.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let (_, json) = request(&app, "GET", "/api/analytics", None).await;
        if json["totalNotes"] == 1 {
            assert_eq!(json["countsByCategory"]["work"], 1);
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "analytics cache never refreshed"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn stats_are_live() {
    let app = setup();
    request(&app, "POST", "/api/notes", Some(note_body("A", "work"))).await;
    request(&app, "POST", "/api/notes", Some(note_body("B", "ideas"))).await;

    let (status, json) = request(&app, "GET", "/api/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 2);
    assert_eq!(json["work"], 1);
    assert_eq!(json["ideas"], 1);
}

#[tokio::test]
async fn share_issue_resolve_revoke_flow() {
    let app = setup();
    let (_, created) = request(&app, "POST", "/api/notes", Some(note_body("Note", "work"))).await;
    let id = created["id"].as_i64().unwrap();

    // Issue is idempotent.
    let (status, grant) = request(&app, "POST", &format!("/api/notes/{id}/share"), None).await;
    assert_eq!(status, StatusCode::OK);
    let token = grant["token"].as_str().unwrap().to_string();
    assert_eq!(grant["newlyIssued"], true);

    let (_, again) = request(&app, "POST", &format!("/api/notes/{id}/share"), None).await;
    assert_eq!(again["token"], token.as_str());
    assert_eq!(again["newlyIssued"], false);

    // Public resolution counts the view and hides the share token.
    let (status, shared) = request(&app, "GET", &format!("/api/shared/{token}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shared["title"], "Note");
    assert_eq!(shared["view_count"], 1);
    assert!(shared.get("shared_token").is_none());

    let (_, stats) = request(&app, "GET", &format!("/api/notes/{id}/share/stats"), None).await;
    assert_eq!(stats["isShared"], true);
    assert_eq!(stats["viewCount"], 1);

    // Revoke, then the token no longer resolves.
    let (status, _) = request(&app, "DELETE", &format!("/api/notes/{id}/share"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = request(&app, "GET", &format!("/api/shared/{token}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn shared_listing_orders_by_views() {
    let app = setup();
    let (_, a) = request(&app, "POST", "/api/notes", Some(note_body("A", "work"))).await;
    let (_, b) = request(&app, "POST", "/api/notes", Some(note_body("B", "work"))).await;

    let (_, grant_a) = request(
        &app,
        "POST",
        &format!("/api/notes/{}/share", a["id"]),
        None,
    )
    .await;
    let (_, _grant_b) = request(
        &app,
        "POST",
        &format!("/api/notes/{}/share", b["id"]),
        None,
    )
    .await;

    // View A twice so it sorts first.
    let token_a = grant_a["token"].as_str().unwrap();
    request(&app, "GET", &format!("/api/shared/{token_a}"), None).await;
    request(&app, "GET", &format!("/api/shared/{token_a}"), None).await;

    let (status, json) = request(&app, "GET", "/api/shared", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
    assert_eq!(json["shared"][0]["title"], "A");
    assert_eq!(json["shared"][0]["view_count"], 2);
}

#[tokio::test]
async fn metrics_endpoint_renders() {
    let app = setup();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
