//! Integration tests for inb-nb API endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - Student login and teacher listing
//! - Entry read (exists / editable / fromCache flags), save validation and history order
//! - Pending markers when the store cannot be written
//! - Draft auto-save
//! - AI help with logging against a fake provider

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::post,
    Json, Router,
};
use inb_common::ai::AiHelper;
use inb_common::autosave::AutoSaver;
use inb_common::cache::LocalCache;
use inb_common::config::AiSettings;
use inb_common::identity::generate_student_id;
use inb_common::store::{
    Document, DocumentStore, OrderBy, SetMode, SqliteStore, StoredDocument, Version,
};
use inb_common::time::today_local;
use inb_common::{EntryRepository, Error, Result};
use inb_nb::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

const PAST_DATE: &str = "2024-03-01";

/// Test helper: app over `store` with the given AI settings
fn setup_app_with(store: Arc<dyn DocumentStore>, ai: AiSettings) -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(EntryRepository::new(
        store,
        LocalCache::new(dir.path().join("cache")),
    ));
    let ai = AiHelper::from_settings(&ai).unwrap();
    let autosaver = AutoSaver::new(Arc::clone(&repo), Duration::from_millis(50));
    (build_router(AppState::new(repo, ai, autosaver)), dir)
}

/// Test helper: app over an in-memory store, AI in direct mode without keys
async fn setup_app() -> (Router, TempDir) {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    setup_app_with(store, AiSettings::default())
}

/// Test helper: Create request without body
fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: Create request with JSON body
fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn login(app: &Router, name: &str, code: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/login", json!({"name": name, "code": code})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    body["studentId"].as_str().unwrap().to_string()
}

fn entry_uri(student_id: &str, date: &str) -> String {
    format!("/api/students/{}/entries/{}", student_id, date)
}

async fn put_entry(app: &Router, student_id: &str, date: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(json_request("PUT", &entry_uri(student_id, date), body))
        .await
        .unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app.clone().oneshot(test_request("GET", uri)).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// Store whose reads work but whose writes never reach the server
struct ReadOnlyStore {
    inner: SqliteStore,
}

#[async_trait]
impl DocumentStore for ReadOnlyStore {
    fn backend_name(&self) -> &'static str {
        "read-only"
    }

    async fn get_versioned(&self, path: &str) -> Result<Option<(Document, Version)>> {
        self.inner.get_versioned(path).await
    }

    async fn set(&self, _path: &str, _fields: Document, _mode: SetMode) -> Result<()> {
        Err(Error::Unavailable("connection refused".into()))
    }

    async fn set_if_version(
        &self,
        _path: &str,
        _fields: Document,
        _mode: SetMode,
        _expected: Option<&Version>,
    ) -> Result<()> {
        Err(Error::Unavailable("connection refused".into()))
    }

    async fn list(&self, collection: &str, order: Option<&OrderBy>) -> Result<Vec<StoredDocument>> {
        self.inner.list(collection, order).await
    }

    async fn enable_network(&self) -> Result<()> {
        Ok(())
    }

    async fn disable_network(&self) -> Result<()> {
        Ok(())
    }

    fn is_online(&self) -> bool {
        true
    }
}

/// Store that loses its server entirely while `offline` is set
struct SwitchableStore {
    inner: SqliteStore,
    offline: AtomicBool,
}

impl SwitchableStore {
    fn check(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(Error::Unavailable("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for SwitchableStore {
    fn backend_name(&self) -> &'static str {
        "switchable"
    }

    async fn get_versioned(&self, path: &str) -> Result<Option<(Document, Version)>> {
        self.check()?;
        self.inner.get_versioned(path).await
    }

    async fn set(&self, path: &str, fields: Document, mode: SetMode) -> Result<()> {
        self.check()?;
        self.inner.set(path, fields, mode).await
    }

    async fn set_if_version(
        &self,
        path: &str,
        fields: Document,
        mode: SetMode,
        expected: Option<&Version>,
    ) -> Result<()> {
        self.check()?;
        self.inner.set_if_version(path, fields, mode, expected).await
    }

    async fn list(&self, collection: &str, order: Option<&OrderBy>) -> Result<Vec<StoredDocument>> {
        self.check()?;
        self.inner.list(collection, order).await
    }

    async fn enable_network(&self) -> Result<()> {
        Ok(())
    }

    async fn disable_network(&self) -> Result<()> {
        Ok(())
    }

    fn is_online(&self) -> bool {
        !self.offline.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Health and login
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _dir) = setup_app().await;
    let (status, body) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "inb-nb");
    assert_eq!(body["store"], "sqlite");
    assert_eq!(body["online"], true);
    assert_eq!(body["ai_proxy"], false);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_login_is_deterministic() {
    let (app, _dir) = setup_app().await;
    let first = login(&app, "김철수", "1234").await;
    let second = login(&app, " 김철수 ", "1234").await;

    assert_eq!(first, second);
    assert_eq!(first, generate_student_id("김철수", "1234"));
}

#[tokio::test]
async fn test_login_rejects_blank_fields() {
    let (app, _dir) = setup_app().await;
    let response = app
        .oneshot(json_request("POST", "/api/login", json!({"name": "  ", "code": "1234"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_teacher_list_sorted_by_name() {
    let (app, _dir) = setup_app().await;
    login(&app, "하늘", "1").await;
    login(&app, "가람", "2").await;

    let (status, body) = get_json(&app, "/api/students").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["studentName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["가람", "하늘"]);
}

// =============================================================================
// Entries
// =============================================================================

#[tokio::test]
async fn test_missing_entry_is_empty_and_not_editable() {
    let (app, _dir) = setup_app().await;
    let id = login(&app, "김철수", "1234").await;

    let (status, body) = get_json(&app, &entry_uri(&id, PAST_DATE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], false);
    assert_eq!(body["editable"], false);
    assert_eq!(body["entry"]["date"], PAST_DATE);
    assert_eq!(body["entry"]["todayTopic"], "");
}

#[tokio::test]
async fn test_save_and_read_today() {
    let (app, _dir) = setup_app().await;
    let id = login(&app, "김철수", "1234").await;
    let today = today_local();

    let (status, _) = put_entry(
        &app,
        &id,
        &today,
        json!({"date": today, "todayTopic": "물의 순환", "findings": "구름이 생겨요"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get_json(&app, &entry_uri(&id, &today)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], true);
    assert_eq!(body["editable"], true);
    assert_eq!(body["entry"]["todayTopic"], "물의 순환");
    assert_eq!(body["entry"]["findings"], "구름이 생겨요");
    assert!(body["entry"].get("dataTable").is_none());
}

#[tokio::test]
async fn test_save_rejects_date_mismatch() {
    let (app, _dir) = setup_app().await;
    let id = login(&app, "김철수", "1234").await;

    let (status, _) = put_entry(&app, &id, PAST_DATE, json!({"date": "2024-03-02"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_save_rejects_future_date() {
    let (app, _dir) = setup_app().await;
    let id = login(&app, "김철수", "1234").await;

    let (status, _) = put_entry(&app, &id, "9999-12-31", json!({"date": "9999-12-31"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_path_date_rejected() {
    let (app, _dir) = setup_app().await;
    let id = login(&app, "김철수", "1234").await;

    let (status, _) = get_json(&app, &entry_uri(&id, "2024-3-1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_save_rejects_invalid_voice_payload() {
    let (app, _dir) = setup_app().await;
    let id = login(&app, "김철수", "1234").await;

    let body = json!({
        "date": PAST_DATE,
        "voiceRecording": {
            "dataBase64": "not base64 !!",
            "mimeType": "audio/webm",
            "recordedAt": "2024-03-01T09:00:00.000Z"
        }
    });
    let (status, _) = put_entry(&app, &id, PAST_DATE, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_newest_first() {
    let (app, _dir) = setup_app().await;
    let id = login(&app, "김철수", "1234").await;

    for date in ["2024-03-01", "2024-03-03", "2024-03-02"] {
        let (status, _) = put_entry(&app, &id, date, json!({"date": date})).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = get_json(&app, &format!("/api/students/{}/entries", id)).await;
    assert_eq!(status, StatusCode::OK);
    let dates: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2024-03-03", "2024-03-02", "2024-03-01"]);
}

#[tokio::test]
async fn test_cached_copy_after_save() {
    let (app, _dir) = setup_app().await;
    let id = login(&app, "김철수", "1234").await;

    let (status, _) = get_json(&app, &format!("{}/cached", entry_uri(&id, PAST_DATE))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    put_entry(&app, &id, PAST_DATE, json!({"date": PAST_DATE, "methods": "관찰"})).await;

    let (status, body) = get_json(&app, &format!("{}/cached", entry_uri(&id, PAST_DATE))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["methods"], "관찰");
}

#[tokio::test]
async fn test_unreachable_store_read_is_marked_from_cache() {
    let store = Arc::new(SwitchableStore {
        inner: SqliteStore::in_memory().await.unwrap(),
        offline: AtomicBool::new(false),
    });
    let (app, _dir) = setup_app_with(store.clone(), AiSettings::default());
    let id = generate_student_id("김철수", "1234");

    let (status, _) = put_entry(
        &app,
        &id,
        PAST_DATE,
        json!({"date": PAST_DATE, "todayTopic": "자석"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get_json(&app, &entry_uri(&id, PAST_DATE)).await;
    assert_eq!(body["fromCache"], false);

    store.offline.store(true, Ordering::SeqCst);
    let (status, body) = get_json(&app, &entry_uri(&id, PAST_DATE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], true);
    assert_eq!(body["fromCache"], true);
    assert_eq!(body["entry"]["todayTopic"], "자석");

    // Nothing cached for this date: the outage is reported instead
    let (status, _) = get_json(&app, &entry_uri(&id, "2024-03-02")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unwritable_store_returns_503_and_keeps_pending() {
    let store = Arc::new(ReadOnlyStore {
        inner: SqliteStore::in_memory().await.unwrap(),
    });
    let (app, _dir) = setup_app_with(store, AiSettings::default());
    let id = generate_student_id("김철수", "1234");

    let (status, body) = put_entry(
        &app,
        &id,
        PAST_DATE,
        json!({"date": PAST_DATE, "todayTopic": "자석"}),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["pending"], true);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("인터넷 연결"));

    let (status, body) = get_json(&app, &format!("/api/students/{}/pending", id)).await;
    assert_eq!(status, StatusCode::OK);
    let pending = body.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["date"], PAST_DATE);
    assert_eq!(pending[0]["entry"]["todayTopic"], "자석");
    assert_eq!(pending[0]["entry"]["_pending"], true);
}

#[tokio::test]
async fn test_draft_is_saved_after_debounce() {
    let (app, _dir) = setup_app().await;
    let id = login(&app, "김철수", "1234").await;
    let uri = format!("{}/draft", entry_uri(&id, PAST_DATE));

    for topic in ["초안 1", "초안 2"] {
        let response = app
            .clone()
            .oneshot(json_request("PUT", &uri, json!({"date": PAST_DATE, "todayTopic": topic})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    tokio::time::sleep(Duration::from_millis(300)).await;

    let (_, body) = get_json(&app, &entry_uri(&id, PAST_DATE)).await;
    assert_eq!(body["exists"], true);
    assert_eq!(body["entry"]["todayTopic"], "초안 2");
}

#[tokio::test]
async fn test_ai_log_append() {
    let (app, _dir) = setup_app().await;
    let id = login(&app, "김철수", "1234").await;
    let uri = format!("{}/ai-logs", entry_uri(&id, PAST_DATE));
    let log = json!({"provider": "perplexity", "purpose": "background", "query": "자석", "response": "답"});

    // No entry yet: nothing to append to
    let response = app.clone().oneshot(json_request("POST", &uri, log.clone())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await["appended"], false);

    put_entry(&app, &id, PAST_DATE, json!({"date": PAST_DATE})).await;

    let response = app.clone().oneshot(json_request("POST", &uri, log)).await.unwrap();
    assert_eq!(extract_json(response.into_body()).await["appended"], true);

    let (_, body) = get_json(&app, &entry_uri(&id, PAST_DATE)).await;
    let records = body["entry"]["aiHelpLogs"]["perplexity"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["query"], "자석");
    assert!(records[0]["createdAt"].is_string());
}

#[tokio::test]
async fn test_saving_loaded_form_keeps_later_ai_logs() {
    let (app, _dir) = setup_app().await;
    let id = login(&app, "김철수", "1234").await;
    let uri = format!("{}/ai-logs", entry_uri(&id, PAST_DATE));
    let log = |response: &str| {
        json!({"provider": "chatgpt", "field": "todayTopic", "response": response})
    };

    put_entry(&app, &id, PAST_DATE, json!({"date": PAST_DATE})).await;
    app.clone().oneshot(json_request("POST", &uri, log("r1"))).await.unwrap();

    let (_, loaded) = get_json(&app, &entry_uri(&id, PAST_DATE)).await;
    let mut form = loaded["entry"].clone();
    app.clone().oneshot(json_request("POST", &uri, log("r2"))).await.unwrap();

    form["findings"] = json!("싹이 났다");
    let (status, _) = put_entry(&app, &id, PAST_DATE, form).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get_json(&app, &entry_uri(&id, PAST_DATE)).await;
    assert_eq!(body["entry"]["findings"], "싹이 났다");
    let records = body["entry"]["aiHelpLogs"]["chatgpt"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["response"], "r2");
}

// =============================================================================
// AI help
// =============================================================================

async fn spawn_fake_openai() -> String {
    async fn completion(Json(_body): Json<Value>) -> Json<Value> {
        Json(json!({"choices": [{"message": {"content": "식물과 햇빛을 탐구해 보세요."}}]}))
    }

    let app = Router::new().route("/chat/completions", post(completion));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_help_without_key_reports_configuration() {
    let (app, _dir) = setup_app().await;
    let id = login(&app, "김철수", "1234").await;

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("{}/help", entry_uri(&id, PAST_DATE)),
            json!({"kind": "topic"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["logged"], false);
    assert!(body["error"].as_str().unwrap().contains("OpenAI API 키"));
}

#[tokio::test]
async fn test_help_answer_is_logged() {
    let base = spawn_fake_openai().await;
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let settings = AiSettings {
        openai_api_key: Some("sk-test".into()),
        openai_base_url: base,
        openai_model: "gpt-4o-mini".into(),
        ..Default::default()
    };
    let (app, _dir) = setup_app_with(store, settings);
    let id = login(&app, "김철수", "1234").await;
    put_entry(&app, &id, PAST_DATE, json!({"date": PAST_DATE})).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("{}/help", entry_uri(&id, PAST_DATE)),
            json!({"kind": "studentQuestions", "todayTopic": "식물"}),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], "식물과 햇빛을 탐구해 보세요.");
    assert_eq!(body["logged"], true);

    let (_, body) = get_json(&app, &entry_uri(&id, PAST_DATE)).await;
    let records = body["entry"]["aiHelpLogs"]["chatgpt"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["field"], "questions");
    assert_eq!(records[0]["response"], "식물과 햇빛을 탐구해 보세요.");
}

#[tokio::test]
async fn test_scientist_turn_is_logged_as_scientist_note() {
    let base = spawn_fake_openai().await;
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let settings = AiSettings {
        openai_api_key: Some("sk-test".into()),
        openai_base_url: base,
        ..Default::default()
    };
    let (app, _dir) = setup_app_with(store, settings);
    let id = login(&app, "김철수", "1234").await;
    put_entry(&app, &id, PAST_DATE, json!({"date": PAST_DATE, "todayTopic": "전구"})).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("{}/scientist", entry_uri(&id, PAST_DATE)),
            json!({"scientistName": "에디슨"}),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["logged"], true);

    let (_, body) = get_json(&app, &entry_uri(&id, PAST_DATE)).await;
    let records = body["entry"]["aiHelpLogs"]["chatgpt"].as_array().unwrap();
    assert_eq!(records[0]["field"], "scientistNote");
    assert!(records[0]["prompt"].as_str().unwrap().contains("전구"));
}

#[tokio::test]
async fn test_search_requires_query() {
    let (app, _dir) = setup_app().await;
    let id = login(&app, "김철수", "1234").await;

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("{}/search", entry_uri(&id, PAST_DATE)),
            json!({"purpose": "method", "query": "  "}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_videos_requires_query() {
    let (app, _dir) = setup_app().await;
    let (status, _) = get_json(&app, "/api/videos").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get_json(&app, "/api/videos?q=%EC%9E%90%EC%84%9D").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
}
