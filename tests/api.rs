//! HTTP-level tests over the full router.

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::Utc;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc::Receiver;

use hoctu::config::AppConfig;
use hoctu::db::{self, DbPool};
use hoctu::services::events::{self, LearningEvent};
use hoctu::state::AppState;

struct Harness {
    server: TestServer,
    pool: DbPool,
    events: Receiver<LearningEvent>,
    _temp: TempDir,
}

impl Harness {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let config = AppConfig {
            database_path: temp.path().join("hoctu.db"),
            static_dir: temp.path().join("static"),
            admin_email: Some("admin@example.com".to_string()),
            ..AppConfig::default()
        };
        let pool = db::init_db(&config.database_path).unwrap();
        let (sender, events) = events::channel(256);
        let state = AppState::new(pool.clone(), config, sender);
        let server = TestServer::new(hoctu::app(state)).unwrap();
        Self {
            server,
            pool,
            events,
            _temp: temp,
        }
    }

    /// Register a user and return the bearer token
    async fn register(&self, email: &str) -> String {
        let response = self
            .server
            .post("/api/auth/register")
            .json(&json!({
                "email": email,
                "password": "correct horse",
                "display_name": email.split('@').next().unwrap(),
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["data"]["token"].as_str().unwrap().to_string()
    }

    async fn create_word(&self, token: &str, body: Value) -> i64 {
        let response = self.server.post("/api/words").authorization_bearer(token).json(&body).await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["data"]["id"].as_i64().unwrap()
    }

    /// Run queued side effects the way the background worker would
    fn drain_events(&mut self) -> usize {
        let conn = self.pool.lock().unwrap();
        let mut processed = 0;
        while let Ok(event) = self.events.try_recv() {
            events::process_event(&conn, &event, Utc::now(), 30).unwrap();
            processed += 1;
        }
        processed
    }
}

fn data(response: &axum_test::TestResponse) -> Value {
    response.json::<Value>()["data"].clone()
}

#[tokio::test]
async fn test_health() {
    let h = Harness::new();
    let response = h.server.get("/api/health").await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_register_login_logout() {
    let h = Harness::new();
    let token = h.register("lan@example.com").await;

    let me = h.server.get("/api/auth/me").authorization_bearer(&token).await;
    me.assert_status_ok();
    assert_eq!(data(&me)["email"], "lan@example.com");
    assert_eq!(data(&me)["role"], "user");
    assert!(data(&me).get("password_hash").is_none());

    let duplicate = h
        .server
        .post("/api/auth/register")
        .json(&json!({"email": "LAN@example.com", "password": "another pass", "display_name": "Lan"}))
        .await;
    duplicate.assert_status(StatusCode::CONFLICT);

    let bad_login = h
        .server
        .post("/api/auth/login")
        .json(&json!({"email": "lan@example.com", "password": "wrong password"}))
        .await;
    bad_login.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(bad_login.json::<Value>()["code"], "UNAUTHORIZED");

    let login = h
        .server
        .post("/api/auth/login")
        .json(&json!({"email": "lan@example.com", "password": "correct horse"}))
        .await;
    login.assert_status_ok();
    let second = data(&login)["token"].as_str().unwrap().to_string();

    h.server
        .post("/api/auth/logout")
        .authorization_bearer(&second)
        .await
        .assert_status_ok();
    h.server
        .get("/api/auth/me")
        .authorization_bearer(&second)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    // The first session is unaffected
    h.server.get("/api/auth/me").authorization_bearer(&token).await.assert_status_ok();
}

#[tokio::test]
async fn test_requires_authentication() {
    let h = Harness::new();
    let response = h.server.get("/api/words").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body = response.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");

    h.server
        .get("/api/words")
        .authorization_bearer("not-a-real-token")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_word_visibility_and_ownership() {
    let h = Harness::new();
    let alice = h.register("alice@example.com").await;
    let bob = h.register("bob@example.com").await;

    let private = h.create_word(&alice, json!({"traditional": "水", "vietnamese": "nước"})).await;
    let public = h
        .create_word(&alice, json!({"traditional": "火", "vietnamese": "lửa", "is_public": true}))
        .await;

    let listed = h.server.get("/api/words").authorization_bearer(&bob).await;
    listed.assert_status_ok();
    assert_eq!(data(&listed)["total"], 1);
    assert_eq!(data(&listed)["words"][0]["id"], public);

    h.server
        .get(&format!("/api/words/{private}"))
        .authorization_bearer(&bob)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    h.server
        .put(&format!("/api/words/{public}"))
        .authorization_bearer(&bob)
        .json(&json!({"traditional": "火", "vietnamese": "đốt"}))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    h.server
        .get("/api/words/9999")
        .authorization_bearer(&bob)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let invalid = h
        .server
        .post("/api/words")
        .authorization_bearer(&alice)
        .json(&json!({"vietnamese": "không có chữ Hán"}))
        .await;
    invalid.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(invalid.json::<Value>()["code"], "VALIDATION_ERROR");

    h.server
        .delete(&format!("/api/words/{private}"))
        .authorization_bearer(&alice)
        .await
        .assert_status_ok();
    let mine = h
        .server
        .get("/api/words")
        .authorization_bearer(&alice)
        .add_query_param("mine", "true")
        .await;
    assert_eq!(data(&mine)["total"], 1);
}

#[tokio::test]
async fn test_bulk_import_is_all_or_nothing() {
    let h = Harness::new();
    let token = h.register("lan@example.com").await;

    let rejected = h
        .server
        .post("/api/words/bulk")
        .authorization_bearer(&token)
        .json(&json!({"words": [
            {"traditional": "水", "vietnamese": "nước"},
            {"traditional": "火", "vietnamese": ""},
        ]}))
        .await;
    rejected.assert_status(StatusCode::BAD_REQUEST);
    assert!(rejected.json::<Value>()["message"].as_str().unwrap().starts_with("Word 2"));

    let accepted = h
        .server
        .post("/api/words/bulk")
        .authorization_bearer(&token)
        .json(&json!({"words": [
            {"traditional": "水", "vietnamese": "nước"},
            {"simplified": "书", "vietnamese": "sách"},
        ]}))
        .await;
    accepted.assert_status(StatusCode::CREATED);
    assert_eq!(data(&accepted)["created"], 2);

    let listed = h.server.get("/api/words").authorization_bearer(&token).await;
    assert_eq!(data(&listed)["total"], 2);
}

#[tokio::test]
async fn test_category_delete_cascades() {
    let h = Harness::new();
    let token = h.register("lan@example.com").await;

    let category = h
        .server
        .post("/api/categories")
        .authorization_bearer(&token)
        .json(&json!({"name": "Thiên nhiên", "color": "#33aa55"}))
        .await;
    category.assert_status(StatusCode::CREATED);
    let category_id = data(&category)["id"].as_i64().unwrap();

    h.server
        .post("/api/categories")
        .authorization_bearer(&token)
        .json(&json!({"name": "thien nhien"}))
        .await
        .assert_status(StatusCode::CONFLICT);

    let word = h
        .create_word(&token, json!({"traditional": "山", "vietnamese": "núi", "category_id": category_id}))
        .await;
    let set = h
        .server
        .post("/api/word-sets")
        .authorization_bearer(&token)
        .json(&json!({"name": "Bài 1"}))
        .await;
    let set_id = data(&set)["id"].as_i64().unwrap();
    h.server
        .post(&format!("/api/word-sets/{set_id}/words"))
        .authorization_bearer(&token)
        .json(&json!({"word_ids": [word]}))
        .await
        .assert_status_ok();
    h.server
        .post("/api/progress/answer")
        .authorization_bearer(&token)
        .json(&json!({"word_id": word, "correct": true}))
        .await
        .assert_status_ok();

    let deleted = h
        .server
        .delete(&format!("/api/categories/{category_id}"))
        .authorization_bearer(&token)
        .await;
    deleted.assert_status_ok();
    assert_eq!(data(&deleted)["deleted_words"], 1);

    h.server
        .get(&format!("/api/words/{word}"))
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    let set = h.server.get(&format!("/api/word-sets/{set_id}")).authorization_bearer(&token).await;
    assert_eq!(data(&set)["word_count"], 0);
    let overview = h.server.get("/api/progress").authorization_bearer(&token).await;
    assert_eq!(data(&overview)["words_learned"], 0);
}

#[tokio::test]
async fn test_answer_updates_progress_and_publishes_events() {
    let mut h = Harness::new();
    let token = h.register("lan@example.com").await;
    let word = h.create_word(&token, json!({"traditional": "水", "vietnamese": "nước"})).await;
    h.drain_events();

    let answer = h
        .server
        .post("/api/progress/answer")
        .authorization_bearer(&token)
        .json(&json!({"word_id": word, "correct": true}))
        .await;
    answer.assert_status_ok();
    let outcome = data(&answer);
    assert_eq!(outcome["progress"]["mastery_level"], 10);
    assert_eq!(outcome["streak"]["current"], 1);
    assert_eq!(outcome["xp_earned"], 10);

    // Achievement checks run off the request path
    assert!(h.drain_events() >= 1);
    let achievements = h.server.get("/api/achievements").authorization_bearer(&token).await;
    let earned: Vec<String> = data(&achievements)
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["badge"]["id"].as_str().unwrap().to_string())
        .collect();
    assert!(earned.contains(&"first_word".to_string()));

    let unread = h
        .server
        .get("/api/notifications/unread-count")
        .authorization_bearer(&token)
        .await;
    assert!(data(&unread)["count"].as_i64().unwrap() >= 1);

    h.server
        .put("/api/notifications/read-all")
        .authorization_bearer(&token)
        .await
        .assert_status_ok();
    let unread = h
        .server
        .get("/api/notifications")
        .authorization_bearer(&token)
        .add_query_param("unread_only", "true")
        .await;
    assert_eq!(data(&unread).as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_practice_session_validation() {
    let h = Harness::new();
    let token = h.register("lan@example.com").await;
    let word = h.create_word(&token, json!({"traditional": "水", "vietnamese": "nước"})).await;

    h.server
        .post("/api/progress/sessions")
        .authorization_bearer(&token)
        .json(&json!({"mode": "dancing", "answers": [{"word_id": word, "correct": true}]}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    h.server
        .post("/api/progress/sessions")
        .authorization_bearer(&token)
        .json(&json!({"mode": "flashcard", "answers": []}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let saved = h
        .server
        .post("/api/progress/sessions")
        .authorization_bearer(&token)
        .json(&json!({
            "mode": "typing",
            "duration_secs": 90,
            "answers": [
                {"word_id": word, "correct": true},
                {"word_id": word, "correct": false},
            ],
        }))
        .await;
    saved.assert_status_ok();
    assert_eq!(data(&saved)["answered"], 2);
    assert_eq!(data(&saved)["correct"], 1);

    let stats = h.server.get("/api/users/me/stats").authorization_bearer(&token).await;
    stats.assert_status_ok();
    assert_eq!(data(&stats)["totals"]["study_seconds"], 90);
    assert_eq!(data(&stats)["daily"][0]["words_studied"], 1);
}

#[tokio::test]
async fn test_generate_and_submit_test() {
    let h = Harness::new();
    let token = h.register("lan@example.com").await;
    h.create_word(&token, json!({"traditional": "水", "vietnamese": "nước"})).await;
    h.create_word(&token, json!({"traditional": "火", "vietnamese": "lửa"})).await;
    h.create_word(&token, json!({"traditional": "山", "vietnamese": "núi"})).await;

    let created = h
        .server
        .post("/api/tests")
        .authorization_bearer(&token)
        .json(&json!({"source": {"type": "all"}, "question_type": "typing", "question_count": 3}))
        .await;
    created.assert_status(StatusCode::CREATED);
    let test = data(&created);
    let test_id = test["id"].as_i64().unwrap();
    assert_eq!(test["question_count"], 3);
    assert!(test["questions"][0].get("answer").is_none());

    // Typing prompts are headwords; answer each from the word list
    let words = data(&h.server.get("/api/words").authorization_bearer(&token).await);
    let answers: Vec<Value> = test["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| {
            let meaning = words["words"]
                .as_array()
                .unwrap()
                .iter()
                .find(|w| w["id"] == q["word_id"])
                .map(|w| w["vietnamese"].clone())
                .unwrap();
            json!({"question_index": q["index"], "answer": meaning})
        })
        .collect();

    let submitted = h
        .server
        .post(&format!("/api/tests/{test_id}/submit"))
        .authorization_bearer(&token)
        .json(&json!({"answers": answers, "duration_secs": 30}))
        .await;
    submitted.assert_status(StatusCode::CREATED);
    let outcome = data(&submitted);
    assert_eq!(outcome["result"]["score"], 100);
    assert_eq!(outcome["result"]["xp_earned"], 3 * 10 + 20 + 30);

    let results = h.server.get("/api/tests/results").authorization_bearer(&token).await;
    assert_eq!(data(&results).as_array().unwrap().len(), 1);
    let result_id = outcome["result"]["id"].as_i64().unwrap();
    h.server
        .get(&format!("/api/tests/results/{result_id}"))
        .authorization_bearer(&token)
        .await
        .assert_status_ok();

    let other = h.register("bob@example.com").await;
    h.server
        .get(&format!("/api/tests/{test_id}"))
        .authorization_bearer(&other)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_empty_test_source_is_rejected() {
    let h = Harness::new();
    let token = h.register("lan@example.com").await;
    let response = h
        .server
        .post("/api/tests")
        .authorization_bearer(&token)
        .json(&json!({"source": {"type": "review"}}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_endpoints() {
    let h = Harness::new();
    let admin = h.register("admin@example.com").await;
    let user = h.register("lan@example.com").await;

    h.server
        .get("/api/admin/stats")
        .authorization_bearer(&user)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let stats = h.server.get("/api/admin/stats").authorization_bearer(&admin).await;
    stats.assert_status_ok();
    assert_eq!(data(&stats)["users"], 2);
    assert_eq!(data(&stats)["admins"], 1);

    let users = h.server.get("/api/admin/users").authorization_bearer(&admin).await;
    assert_eq!(data(&users)["total"], 2);
    let lan_id = data(&users)["users"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "lan@example.com")
        .map(|u| u["id"].as_i64().unwrap())
        .unwrap();

    let promoted = h
        .server
        .put(&format!("/api/admin/users/{lan_id}/role"))
        .authorization_bearer(&admin)
        .json(&json!({"role": "admin"}))
        .await;
    promoted.assert_status_ok();
    assert_eq!(data(&promoted)["role"], "admin");

    let badge = h
        .server
        .put("/api/admin/badges/first_word")
        .authorization_bearer(&admin)
        .json(&json!({"xp_reward": 25}))
        .await;
    badge.assert_status_ok();
    assert_eq!(data(&badge)["xp_reward"], 25);

    h.server
        .put("/api/admin/badges/first_word")
        .authorization_bearer(&admin)
        .json(&json!({"threshold": 0}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_profile_and_password_change() {
    let h = Harness::new();
    let token = h.register("lan@example.com").await;

    let updated = h
        .server
        .put("/api/users/me")
        .authorization_bearer(&token)
        .json(&json!({"display_name": "Lan Nguyễn", "preferences": {"preferred_script": "simplified"}}))
        .await;
    updated.assert_status_ok();
    assert_eq!(data(&updated)["display_name"], "Lan Nguyễn");
    assert_eq!(data(&updated)["preferences"]["preferred_script"], "simplified");
    // Omitted preference fields fall back to defaults
    assert_eq!(data(&updated)["preferences"]["daily_goal"], 20);

    h.server
        .put("/api/users/me/password")
        .authorization_bearer(&token)
        .json(&json!({"current_password": "wrong one", "new_password": "new password"}))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    h.server
        .put("/api/users/me/password")
        .authorization_bearer(&token)
        .json(&json!({"current_password": "correct horse", "new_password": "new password"}))
        .await
        .assert_status_ok();

    h.server
        .post("/api/auth/login")
        .json(&json!({"email": "lan@example.com", "password": "new password"}))
        .await
        .assert_status_ok();

    let board = h.server.get("/api/users/leaderboard").authorization_bearer(&token).await;
    assert_eq!(data(&board)[0]["rank"], 1);
}
