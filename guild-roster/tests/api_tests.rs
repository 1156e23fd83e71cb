//! Integration tests for guild-roster API endpoints
//!
//! Drives the router with `oneshot` against a temp database.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::get,
    Json, Router,
};
use guild_common::api::{
    issue_session_token, issue_session_token_at, verify_session_token, SESSION_TTL_SECS,
};
use guild_common::config::{CallerSeed, TomlConfig};
use guild_roster::db::{callers, participants, raids};
use guild_roster::services::reconcile;
use guild_roster::{build_router, AppState};
use serde_json::{json, Value};
use serial_test::serial;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

const SECRET: i64 = 4242;
const PASSWORD: &str = "letmein";

struct TestApp {
    _dir: TempDir,
    pool: SqlitePool,
    state: AppState,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_config(TomlConfig::default()).await
    }

    async fn with_config(config: TomlConfig) -> Self {
        let (dir, pool) = common::setup_db().await;
        callers::seed_callers(
            &pool,
            &[
                CallerSeed {
                    discord_id: "900".to_string(),
                    name: "Kael".to_string(),
                    avatar_url: None,
                },
                CallerSeed {
                    discord_id: "700".to_string(),
                    name: "Ana".to_string(),
                    avatar_url: Some("https://cdn.example/ana.png".to_string()),
                },
            ],
        )
        .await
        .unwrap();

        let state = AppState::new(pool.clone(), SECRET, config, Some(PASSWORD.to_string())).unwrap();
        Self {
            _dir: dir,
            pool,
            state,
        }
    }

    fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    async fn seeded_raid(&self) -> uuid::Uuid {
        reconcile(&self.pool, &[common::event("e1", "Avalon", common::five_signups())])
            .await
            .unwrap();
        raids::find_by_external_id(&self.pool, "e1")
            .await
            .unwrap()
            .unwrap()
            .id
    }
}

fn token_for(caller_id: &str) -> String {
    issue_session_token(caller_id, SECRET).unwrap()
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("X-Caller-Token", token);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

// =============================================================================
// Public endpoints
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let app = TestApp::new().await;

    let response = app.router().oneshot(request("GET", "/health", None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "guild-roster");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_list_callers_and_raids() {
    let app = TestApp::new().await;
    app.seeded_raid().await;

    let response = app.router().oneshot(request("GET", "/api/callers", None, None)).await.unwrap();
    let body = extract_json(response.into_body()).await;
    let names: Vec<&str> = body.as_array().unwrap().iter().map(|c| c["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Ana", "Kael"]);

    let response = app
        .router()
        .oneshot(request("GET", "/api/callers/900/raids", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body[0]["title"], "Avalon");
    assert_eq!(body[0]["participants_count"], 5);

    let response = app
        .router()
        .oneshot(request("GET", "/api/callers/404/raids", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_public_signup_flow() {
    let app = TestApp::new().await;
    let raid_id = app.seeded_raid().await;

    let response = app
        .router()
        .oneshot(request("GET", &format!("/api/raids/{}", raid_id), None, None))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["title"], "Avalon");
    assert_eq!(body["caller_name"], "Kael");

    let response = app
        .router()
        .oneshot(request(
            "POST",
            &format!("/api/raids/{}/signups", raid_id),
            None,
            Some(json!({"name": "Nova", "role": "Scout", "gear_level": 1250})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["role"], "Scout");
    assert_eq!(body["selected"], false);

    let response = app
        .router()
        .oneshot(request(
            "POST",
            &format!("/api/raids/{}/signups", raid_id),
            None,
            Some(json!({"name": "Nova", "role": "Bard"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(common::registration_count(&app.pool).await, 6);
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_login() {
    let app = TestApp::new().await;

    let response = app
        .router()
        .oneshot(request(
            "POST",
            "/api/callers/900/login",
            None,
            Some(json!({"password": "wrong"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router()
        .oneshot(request(
            "POST",
            "/api/callers/900/login",
            None,
            Some(json!({"password": PASSWORD})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    let token = body["token"].as_str().unwrap();
    assert_eq!(verify_session_token(token, SECRET).unwrap().caller_id, "900");
    assert_eq!(body["caller"]["name"], "Kael");
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let app = TestApp::new().await;
    let raid_id = app.seeded_raid().await;
    let uri = format!("/api/raids/{}/participants", raid_id);

    let response = app.router().oneshot(request("GET", &uri, None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router()
        .oneshot(request("GET", &uri, Some("900.forged"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let yesterday = chrono::Utc::now().timestamp() - SESSION_TTL_SECS - 60;
    let expired = issue_session_token_at("900", SECRET, yesterday).unwrap();
    let response = app
        .router()
        .oneshot(request("GET", &uri, Some(&expired), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router()
        .oneshot(request("GET", &uri, Some(&token_for("700")), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .router()
        .oneshot(request("GET", &uri, Some(&token_for("900")), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 5);
    assert!(body[0]["player_name"].is_string());
}

// =============================================================================
// Roster management
// =============================================================================

#[tokio::test]
async fn test_roster_status_codes() {
    let app = TestApp::new().await;
    let raid_id = app.seeded_raid().await;
    let token = token_for("900");
    let roster = participants::list_for_raid(&app.pool, raid_id).await.unwrap();

    let response = app
        .router()
        .oneshot(request(
            "POST",
            &format!("/api/participants/{}/toggle_selected", roster[0].id),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await["selected"], true);

    let response = app
        .router()
        .oneshot(request(
            "POST",
            &format!("/api/participants/{}/toggle_priority", roster[0].id),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        extract_json(response.into_body()).await["error"]["code"],
        "INVALID_STATE"
    );

    let response = app
        .router()
        .oneshot(request(
            "POST",
            &format!("/api/raids/{}/draw", raid_id),
            Some(&token),
            Some(json!({"role": "Stealth"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(extract_json(response.into_body()).await["error"]["code"], "EMPTY_SET");

    let response = app
        .router()
        .oneshot(request(
            "POST",
            &format!("/api/raids/{}/draw", raid_id),
            Some(&token),
            Some(json!({"role": "Decoy"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await["role"], "Decoy");

    let response = app
        .router()
        .oneshot(request(
            "PATCH",
            &format!("/api/participants/{}", roster[1].id),
            Some(&token),
            Some(json!({"gear_level": 1333})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await["gear_level"], 1333);

    let response = app
        .router()
        .oneshot(request(
            "POST",
            &format!("/api/raids/{}/finalize", raid_id),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_raid_requires_session() {
    let app = TestApp::new().await;
    let payload = json!({"title": "Castle siege", "scheduled_at": "2025-04-02T21:00:00Z"});

    let response = app
        .router()
        .oneshot(request("POST", "/api/raids", None, Some(payload.clone())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router()
        .oneshot(request("POST", "/api/raids", Some(&token_for("700")), Some(payload)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["caller_id"], "700");
    assert_eq!(body["caller_name"], "Ana");
    assert!(body["raid_helper_id"].is_null());
}

// =============================================================================
// Sync and settings
// =============================================================================

async fn spawn_feed() -> String {
    let router = Router::new().route(
        "/events",
        get(|| async {
            Json(json!([{
                "id": "1400",
                "title": "Avalon Roads",
                "startTime": 1_740_859_200,
                "leaderId": "900",
                "leaderName": "Kael",
                "signups": [{"userId": "1", "name": "Mira", "className": "Healer"}]
            }]))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
#[serial]
async fn test_sync_without_key_fails_batch() {
    std::env::remove_var(guild_common::config::API_KEY_ENV_VAR);
    let app = TestApp::new().await;

    let response = app
        .router()
        .oneshot(request("POST", "/api/sync", Some(&token_for("900")), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], false);
    assert!(body["report"].is_null());
    assert!(body["error"].as_str().unwrap().contains("not configured"));
}

#[tokio::test]
#[serial]
async fn test_sync_with_stored_key() {
    std::env::remove_var(guild_common::config::API_KEY_ENV_VAR);
    let mut config = TomlConfig::default();
    config.raid_helper.base_url = spawn_feed().await;
    let app = TestApp::with_config(config).await;
    let token = token_for("900");

    let response = app
        .router()
        .oneshot(request(
            "POST",
            "/api/settings/raid_helper_api_key",
            Some(&token),
            Some(json!({"api_key": "   "})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router()
        .oneshot(request(
            "POST",
            "/api/settings/raid_helper_api_key",
            Some(&token),
            Some(json!({"api_key": "feed-key"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router()
        .oneshot(request("POST", "/api/sync", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["report"]["created_count"], 1);
    assert_eq!(body["report"]["events"][0]["status"], "created");
}

#[tokio::test]
async fn test_concurrent_sync_is_refused() {
    let app = TestApp::new().await;
    let _running = app.state.sync_lock.lock().await;

    let response = app
        .router()
        .oneshot(request("POST", "/api/sync", Some(&token_for("900")), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
