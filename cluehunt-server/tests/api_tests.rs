//! HTTP routing integration tests
//!
//! Drives the full router with `oneshot`, using the real pixel-diff scorer
//! and a temporary data folder.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use cluehunt_common::EventBus;
use cluehunt_server::clues::{ConfigStore, GameConfig};
use cluehunt_server::engine::{EngineSettings, ValidationEngine};
use cluehunt_server::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const ADMIN_TOKEN: &str = "s3cret";
const BOUNDARY: &str = "cluehunt-test-boundary";

struct TestApp {
    dir: TempDir,
    router: Router,
}

fn hunt_config() -> GameConfig {
    serde_json::from_value(json!({
        "startClueId": "a",
        "clues": [
            {
                "id": "a", "name": "Fountain", "lat": 51.5, "lng": -0.12, "radiusMeters": 50,
                "imagePath": "assets/clues/a.jpg", "nextClueId": "b"
            },
            {
                "id": "b", "name": "Bridge", "lat": 51.6, "lng": -0.12, "radiusMeters": 50,
                "validationMode": "qa", "question": "River name?", "expectedAnswer": "Thames"
            }
        ]
    }))
    .unwrap()
}

async fn test_app(admin_token: Option<&str>) -> TestApp {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ConfigStore::create(dir.path(), hunt_config()).await.unwrap());
    store.ensure_reference_images().await.unwrap();

    let event_bus = EventBus::new(100);
    let engine = Arc::new(ValidationEngine::new(
        store,
        Arc::new(event_bus.clone()),
        EngineSettings::default(),
    ));
    let state = AppState::new(engine, event_bus, admin_token.map(str::to_string));

    TestApp {
        dir,
        router: build_router(state),
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// multipart/form-data body from text fields and one optional file field
fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
                 filename=\"upload.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn join(app: &TestApp, team: &str) {
    let request = json_request(Method::POST, "/api/join", json!({ "teamId": team }));
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_reports_module() {
    let app = test_app(None).await;
    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "cluehunt-server");
    assert_eq!(body["clues"], 2);
}

#[tokio::test]
async fn test_join_and_progress() {
    let app = test_app(None).await;

    let request = json_request(Method::POST, "/api/join", json!({ "teamId": "red" }));
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currentClueId"], "a");

    let (status, body) = send(&app, get("/api/teams/red/progress")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["history"], json!([]));
    assert_eq!(body["satisfaction"], json!({ "photo": false, "qa": false }));

    let (status, body) = send(&app, get("/api/teams/red/chat")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["role"], "bot");
}

#[tokio::test]
async fn test_unknown_team_gets_not_joined() {
    let app = test_app(None).await;
    let (status, body) = send(&app, get("/api/teams/ghost/progress")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "NOT_JOINED");
}

#[tokio::test]
async fn test_stale_answer_rejected() {
    let app = test_app(None).await;
    join(&app, "red").await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/answer",
            json!({
                "teamId": "red", "clueId": "b", "lat": 51.6, "lng": -0.12, "answer": "Thames"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "STALE_SUBMISSION");
}

#[tokio::test]
async fn test_matching_photo_upload_advances() {
    let app = test_app(None).await;
    join(&app, "red").await;
    let reference = std::fs::read(app.dir.path().join("assets/clues/a.jpg")).unwrap();

    let body = multipart_body(
        &[("teamId", "red"), ("clueId", "a"), ("lat", "51.5"), ("lng", "-0.12")],
        Some(("photo", reference.as_slice())),
    );
    let (status, body) = send(&app, multipart_request("/api/upload", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["geoOk"], true);
    assert_eq!(body["imgOk"], true);
    assert_eq!(body["similarity"], 1.0);
    assert_eq!(body["distance"], 0.0);

    let (_, progress) = send(&app, get("/api/teams/red/progress")).await;
    assert_eq!(progress["currentClueId"], "b");
}

#[tokio::test]
async fn test_upload_without_photo_is_bad_request() {
    let app = test_app(None).await;
    join(&app, "red").await;

    let body = multipart_body(&[("teamId", "red"), ("clueId", "a")], None);
    let (status, body) = send(&app, multipart_request("/api/upload", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_garbage_upload_is_decode_failure() {
    let app = test_app(None).await;
    join(&app, "red").await;

    let body = multipart_body(
        &[("teamId", "red"), ("clueId", "a"), ("lat", "51.5"), ("lng", "-0.12")],
        Some(("photo", &b"not an image at all"[..])),
    );
    let (status, body) = send(&app, multipart_request("/api/upload", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "DECODE_FAILURE");
}

#[tokio::test]
async fn test_hint_and_chat_endpoints() {
    let app = test_app(None).await;
    join(&app, "red").await;

    let request = json_request(Method::POST, "/api/hint", json!({ "teamId": "red" }));
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["hint"].as_str().unwrap().is_empty());

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/chat",
            json!({ "teamId": "red", "text": "where is it?", "lat": 51.5, "lng": -0.12 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["intent"], "where");
    assert_eq!(body["distance"], 0.0);
}

#[tokio::test]
async fn test_clue_summary_route() {
    let app = test_app(None).await;

    let (status, body) = send(&app, get("/api/clue/b")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["validationMode"], "qa");
    assert_eq!(body["radiusMeters"], 50.0);
    assert!(body.get("expectedAnswer").is_none());

    let (status, body) = send(&app, get("/api/clue/zzz")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_admin_requires_token_when_configured() {
    let app = test_app(Some(ADMIN_TOKEN)).await;

    let (status, body) = send(&app, get("/api/admin/config")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let request = Request::builder()
        .uri("/api/admin/config")
        .header("x-admin-token", ADMIN_TOKEN)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["startClueId"], "a");

    // Player routes stay open
    let (status, _) = send(&app, get("/api/clue/a")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_clue_lifecycle() {
    let app = test_app(None).await;

    let (status, body) = send(
        &app,
        json_request(Method::POST, "/api/admin/clue", json!({ "id": "c", "name": "Castle" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["radiusMeters"], 50.0);
    assert_eq!(body["referenceImage"], "assets/clues/c.jpg");

    let (status, body) = send(
        &app,
        json_request(Method::POST, "/api/admin/clue", json!({ "id": "c", "name": "Again" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, body) = send(
        &app,
        json_request(Method::PUT, "/api/admin/clue/c", json!({ "validationMode": "either" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["validationMode"], "either");
    assert_eq!(body["name"], "Castle");

    let (status, _) = send(&app, json_request(Method::PUT, "/api/admin/start/c", json!({}))).await;
    assert_eq!(status, StatusCode::OK);

    let delete = Request::builder()
        .method(Method::DELETE)
        .uri("/api/admin/clue/c")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::OK);

    let (_, config) = send(&app, get("/api/admin/config")).await;
    assert_eq!(config["startClueId"], "a");
    assert_eq!(config["clues"].as_array().unwrap().len(), 2);

    let request = json_request(Method::PUT, "/api/admin/start/zzz", json!({}));
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_CLUE");
}

#[tokio::test]
async fn test_admin_tips_and_reference_image() {
    let app = test_app(None).await;

    let (status, _) = send(
        &app,
        json_request(Method::PUT, "/api/admin/tips", json!({ "wrongImageTips": ["Stand back"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let reference = std::fs::read(app.dir.path().join("assets/clues/a.jpg")).unwrap();
    let body = multipart_body(&[], Some(("image", reference.as_slice())));
    let (status, body) = send(&app, multipart_request("/api/admin/clue/b/image", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["imagePath"], "assets/clues/b.jpg");
    assert!(app.dir.path().join("assets/clues/b.jpg").exists());

    let (_, config) = send(&app, get("/api/admin/config")).await;
    assert_eq!(config["wrongImageTips"], json!(["Stand back"]));
    assert_eq!(config["wrongAnswerTips"], json!([]));
}
