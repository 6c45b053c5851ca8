use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use cineguess_back::{
    config::AppConfig,
    dao::{catalog::StaticCatalog, models::MovieEntity, room_store::memory::MemoryRoomStore},
    routes,
    state::{AppState, SharedState, clock::ManualClock},
};

const START: u64 = 1_700_000_000_000;

fn catalog(size: usize) -> Arc<StaticCatalog> {
    Arc::new(StaticCatalog::new((0..size).map(|i| MovieEntity {
        id: format!("m{i}"),
        title: format!("Movie {i}"),
        image_url: format!("https://img.example/{i}.jpg"),
        year: 2000 + i as i32,
        genre: "Drama".into(),
    })))
}

async fn app_with(catalog_size: usize) -> (Router, SharedState, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START));
    let config = AppConfig::default().with_tick_interval(Duration::from_secs(3_600));
    let state = AppState::with_parts(config, catalog(catalog_size), clock.clone());
    state.set_room_store(Arc::new(MemoryRoomStore::new())).await;
    (routes::router(state.clone()), state, clock)
}

async fn app() -> (Router, SharedState, Arc<ManualClock>) {
    app_with(20).await
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn join(app: &Router, room: &str, id: &str, username: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        &format!("/api/rooms/{room}/join"),
        Some(json!({ "player": { "id": id, "username": username } })),
    )
    .await
}

async fn action(app: &Router, room: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", &format!("/api/rooms/{room}/action"), Some(body)).await
}

#[tokio::test]
async fn health_reports_ok_with_memory_store() {
    let (app, _, _) = app().await;
    let (status, body) = send(&app, "GET", "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn unknown_room_is_not_found() {
    let (app, _, _) = app().await;
    let (status, body) = send(&app, "GET", "/api/rooms/NOPE42", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains("NOPE42"));
}

#[tokio::test]
async fn invalid_room_code_is_rejected() {
    let (app, _, _) = app().await;
    let (status, body) = join(&app, "bad-code", "p1", "Alice").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn full_round_over_http() {
    let (app, state, clock) = app().await;

    let (status, room) = join(&app, "ABC123", "p1", "Alice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(room["hostId"], "p1");
    assert_eq!(room["status"], "waiting");
    assert_eq!(room["movies"].as_array().unwrap().len(), 10);

    let (status, room) = action(&app, "ABC123", json!({ "type": "READY", "playerId": "p1" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(room["status"], "playing");
    assert_eq!(room["timer"], 10);
    assert_eq!(room["roundStartTime"], START);

    let movie_id = room["movies"][0]["id"].clone();
    let answer = json!({ "type": "SUBMIT_ANSWER", "playerId": "p1", "isCorrect": true, "movieId": movie_id });
    let (_, room) = action(&app, "ABC123", answer.clone()).await;
    assert_eq!(room["players"][0]["score"], 1);
    assert_eq!(room["players"][0]["lastAnswerCorrect"], true);

    let (_, room) = action(&app, "ABC123", answer).await;
    assert_eq!(room["players"][0]["score"], 1);
    assert_eq!(room["players"][0]["results"].as_array().unwrap().len(), 1);

    clock.advance(4_000);
    let (_, room) = send(&app, "GET", "/api/rooms/ABC123", None).await;
    assert_eq!(room["timer"], 6);

    clock.advance(6_000);
    let (_, room) = send(&app, "GET", "/api/rooms/ABC123", None).await;
    assert_eq!(room["currentRoundIndex"], 1);
    assert_eq!(room["timer"], 10);
    assert!(room["players"][0].get("lastAnswerCorrect").is_none());

    state.tickers().shutdown();
}

#[tokio::test]
async fn non_member_actions_are_forbidden() {
    let (app, _, _) = app().await;
    join(&app, "ABC123", "p1", "Alice").await;

    let (status, body) = action(&app, "ABC123", json!({ "type": "READY", "playerId": "p9" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn answers_before_start_conflict() {
    let (app, _, _) = app().await;
    join(&app, "ABC123", "p1", "Alice").await;

    let (status, _) = action(
        &app,
        "ABC123",
        json!({ "type": "SUBMIT_ANSWER", "playerId": "p1", "isCorrect": true, "movieId": "m1" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn host_exit_then_last_exit_deletes_room() {
    let (app, _, _) = app().await;
    join(&app, "ABC123", "p1", "Alice").await;
    let (_, room) = join(&app, "ABC123", "p2", "Bob").await;
    assert_eq!(room["players"].as_array().unwrap().len(), 2);

    let (_, room) = action(&app, "ABC123", json!({ "type": "EXIT", "playerId": "p1" })).await;
    assert_eq!(room["hostId"], "p2");

    let (status, body) = action(&app, "ABC123", json!({ "type": "EXIT", "playerId": "p2" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "deleted" }));

    let (status, _) = send(&app, "GET", "/api/rooms/ABC123", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rename_trims_username() {
    let (app, _, _) = app().await;
    join(&app, "ABC123", "p1", "Alice").await;

    let (_, room) = action(
        &app,
        "ABC123",
        json!({ "type": "RENAME", "playerId": "p1", "username": "  Ally  " }),
    )
    .await;
    assert_eq!(room["players"][0]["username"], "Ally");
}

#[tokio::test]
async fn small_catalog_conflicts() {
    let (app, _, _) = app_with(5).await;
    let (status, _) = join(&app, "ABC123", "p1", "Alice").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_room_generates_a_code() {
    let (app, _, _) = app().await;
    let (status, room) = send(
        &app,
        "POST",
        "/api/rooms",
        Some(json!({ "player": { "id": "p1", "username": "Alice" } })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let code = room["id"].as_str().unwrap();
    assert_eq!(code.len(), 6);

    let (status, fetched) = send(&app, "GET", &format!("/api/rooms/{code}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["hostId"], "p1");
}

#[tokio::test]
async fn degraded_mode_returns_503() {
    let (app, state, _) = app().await;
    state.clear_room_store().await;

    let (status, _) = send(&app, "GET", "/api/rooms/ABC123", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (_, health) = send(&app, "GET", "/api/health", None).await;
    assert_eq!(health["status"], "degraded");
}

#[tokio::test]
async fn unknown_action_type_gets_json_error() {
    let (app, _, _) = app().await;
    join(&app, "ABC123", "p1", "Alice").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/rooms/ABC123/action")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "type": "DANCE", "playerId": "p1" }).to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn malformed_join_body_gets_json_error() {
    let (app, _, _) = app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/rooms/ABC123/join")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"player\":"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn event_stream_of_missing_room_is_not_found() {
    let (app, state, _) = app().await;
    let (status, body) = send(&app, "GET", "/api/rooms/NOPE42/events", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].is_string());
    assert!(state.room_hubs().is_empty());
}
