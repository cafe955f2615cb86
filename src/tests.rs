//! Integration tests for the LeitnerBox backend.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_psk(Some("test-api-key".to_string())).await
    }

    async fn with_psk(psk: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        // Create config
        let config = Config {
            api_psk: psk.clone(),
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
        };

        let state = AppState {
            repo,
            config: Arc::new(config),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = psk {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        TestFixture {
            client: client_builder.build().unwrap(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Create a leitner and return its ID.
    async fn create_leitner(&self, body: Value) -> String {
        let resp = self
            .client
            .post(self.url("/api/leitners"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Create a question inside a leitner and return its ID.
    async fn create_question(&self, leitner_id: &str, question: &str, answer: &str) -> String {
        let resp = self
            .client
            .post(self.url(&format!("/api/leitners/{}/questions", leitner_id)))
            .json(&json!({ "question": question, "answer": answer }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Fetch a leitner's levels overview.
    async fn levels(&self, leitner_id: &str) -> Vec<Value> {
        let resp = self
            .client
            .get(self.url(&format!("/api/leitners/{}/levels", leitner_id)))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"].as_array().unwrap().clone()
    }

    /// Start a review session over a level and return the snapshot.
    async fn start_review(&self, level_id: &str) -> Value {
        let resp = self
            .client
            .post(self.url("/api/reviews"))
            .json(&json!({ "levelId": level_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }

    /// Drive a review action (reveal/hide/pass/fail) and return the
    /// updated snapshot.
    async fn review_action(&self, session_id: &str, action: &str) -> Value {
        let resp = self
            .client
            .post(self.url(&format!("/api/reviews/{}/{}", session_id, action)))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }

    /// Fetch a question.
    async fn question(&self, id: &str) -> Value {
        let resp = self
            .client
            .get(self.url(&format!("/api/questions/{}", id)))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_missing_psk() {
    let fixture = TestFixture::with_psk(Some("secret-key".to_string())).await;

    // Request without API key
    let client = Client::new();
    let resp = client
        .get(format!("{}/api/leitners", fixture.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_auth_invalid_psk() {
    let fixture = TestFixture::with_psk(Some("correct-key".to_string())).await;

    // Request with wrong API key
    let client = Client::new();
    let resp = client
        .get(format!("{}/api/leitners", fixture.base_url))
        .header("x-api-key", "wrong-key")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_auth_valid_psk() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/leitners"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_leitner_crud_with_default_level_plan() {
    let fixture = TestFixture::new().await;

    let leitner_id = fixture
        .create_leitner(json!({ "name": "English Vocabulary" }))
        .await;

    // Default plan: five levels with doubling intervals
    let levels = fixture.levels(&leitner_id).await;
    assert_eq!(levels.len(), 5);
    let numbers: Vec<i64> = levels
        .iter()
        .map(|l| l["level"]["levelNumber"].as_i64().unwrap())
        .collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    let days: Vec<i64> = levels
        .iter()
        .map(|l| l["level"]["daysToRecommend"].as_i64().unwrap())
        .collect();
    assert_eq!(days, vec![1, 2, 4, 8, 16]);

    // Update
    let update_resp = fixture
        .client
        .put(fixture.url(&format!("/api/leitners/{}", leitner_id)))
        .json(&json!({ "name": "Spanish Vocabulary", "backToTopLevelOnFail": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(update_resp.status(), 200);
    let update_body: Value = update_resp.json().await.unwrap();
    assert_eq!(update_body["data"]["name"], "Spanish Vocabulary");
    assert_eq!(update_body["data"]["backToTopLevelOnFail"], true);

    // List
    let list_resp = fixture
        .client
        .get(fixture.url("/api/leitners"))
        .send()
        .await
        .unwrap();
    let list_body: Value = list_resp.json().await.unwrap();
    assert_eq!(list_body["data"].as_array().unwrap().len(), 1);

    // Delete
    let delete_resp = fixture
        .client
        .delete(fixture.url(&format!("/api/leitners/{}", leitner_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(delete_resp.status(), 200);

    let get_deleted = fixture
        .client
        .get(fixture.url(&format!("/api/leitners/{}", leitner_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(get_deleted.status(), 404);
}

#[tokio::test]
async fn test_leitner_level_plan_validation() {
    let fixture = TestFixture::new().await;

    // Plan without level 1 is rejected
    let resp = fixture
        .client
        .post(fixture.url("/api/leitners"))
        .json(&json!({
            "name": "Broken",
            "levels": [ { "levelNumber": 2, "daysToRecommend": 3 } ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // Out-of-range interval is rejected
    let resp2 = fixture
        .client
        .post(fixture.url("/api/leitners"))
        .json(&json!({
            "name": "Broken",
            "levels": [ { "levelNumber": 1, "daysToRecommend": 400 } ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp2.status(), 400);

    // Nothing was created
    let list_resp = fixture
        .client
        .get(fixture.url("/api/leitners"))
        .send()
        .await
        .unwrap();
    let list_body: Value = list_resp.json().await.unwrap();
    assert!(list_body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_level_days_to_recommend_validation() {
    let fixture = TestFixture::new().await;
    let leitner_id = fixture.create_leitner(json!({ "name": "Box" })).await;
    let levels = fixture.levels(&leitner_id).await;
    let level_id = levels[0]["level"]["id"].as_str().unwrap();

    // In-range update succeeds
    let ok_resp = fixture
        .client
        .put(fixture.url(&format!("/api/levels/{}", level_id)))
        .json(&json!({ "daysToRecommend": 30 }))
        .send()
        .await
        .unwrap();
    assert_eq!(ok_resp.status(), 200);
    let ok_body: Value = ok_resp.json().await.unwrap();
    assert_eq!(ok_body["data"]["daysToRecommend"], 30);

    // Out-of-range updates are rejected and leave state untouched
    for days in [0, 366, -1] {
        let resp = fixture
            .client
            .put(fixture.url(&format!("/api/levels/{}", level_id)))
            .json(&json!({ "daysToRecommend": days }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
    }

    let levels = fixture.levels(&leitner_id).await;
    assert_eq!(levels[0]["level"]["daysToRecommend"], 30);
}

#[tokio::test]
async fn test_duplicate_level_number_is_rejected() {
    let fixture = TestFixture::new().await;
    let leitner_id = fixture.create_leitner(json!({ "name": "Box" })).await;

    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/leitners/{}/levels", leitner_id)))
        .json(&json!({ "levelNumber": 3, "daysToRecommend": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // A fresh number is fine
    let resp2 = fixture
        .client
        .post(fixture.url(&format!("/api/leitners/{}/levels", leitner_id)))
        .json(&json!({ "levelNumber": 6, "daysToRecommend": 32 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp2.status(), 200);
}

#[tokio::test]
async fn test_question_crud() {
    let fixture = TestFixture::new().await;
    let leitner_id = fixture.create_leitner(json!({ "name": "Box" })).await;

    // Create: new questions land on level 1, not completed
    let question_id = fixture.create_question(&leitner_id, "hello", "hola").await;
    let question = fixture.question(&question_id).await;
    assert_eq!(question["levelNumber"], 1);
    assert_eq!(question["completed"], false);
    assert!(question.get("passTime").is_none());

    // Update
    let update_resp = fixture
        .client
        .put(fixture.url(&format!("/api/questions/{}", question_id)))
        .json(&json!({ "answer": "buenos dias", "favorite": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(update_resp.status(), 200);
    let update_body: Value = update_resp.json().await.unwrap();
    assert_eq!(update_body["data"]["answer"], "buenos dias");
    assert_eq!(update_body["data"]["favorite"], true);
    assert_eq!(update_body["data"]["question"], "hello");

    // Delete
    let delete_resp = fixture
        .client
        .delete(fixture.url(&format!("/api/questions/{}", question_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(delete_resp.status(), 200);

    let get_deleted = fixture
        .client
        .get(fixture.url(&format!("/api/questions/{}", question_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(get_deleted.status(), 404);
}

#[tokio::test]
async fn test_single_level_review_session() {
    let fixture = TestFixture::new().await;
    let leitner_id = fixture
        .create_leitner(json!({
            "name": "One Box",
            "levels": [ { "levelNumber": 1, "daysToRecommend": 1 } ]
        }))
        .await;

    let a = fixture.create_question(&leitner_id, "alpha", "a").await;
    fixture.create_question(&leitner_id, "beta", "b").await;
    fixture.create_question(&leitner_id, "gamma", "c").await;

    let levels = fixture.levels(&leitner_id).await;
    let level_id = levels[0]["level"]["id"].as_str().unwrap();

    // All three never-passed questions are due
    let session = fixture.start_review(level_id).await;
    let session_id = session["id"].as_str().unwrap();
    assert_eq!(session["totalCount"], 3);
    assert_eq!(session["state"], "answerHidden");
    assert!(session["currentQuestion"].get("answer").is_none());

    // Reveal shows the answer without advancing
    let revealed = fixture.review_action(session_id, "reveal").await;
    assert_eq!(revealed["state"], "answerShown");
    assert_eq!(revealed["currentQuestion"]["answer"], "a");
    assert_eq!(revealed["reviewedCount"], 0);

    // Passing on the only level completes the card in place
    let after_pass = fixture.review_action(session_id, "pass").await;
    assert_eq!(after_pass["passCount"], 1);
    assert_eq!(after_pass["state"], "answerHidden");
    assert_ne!(after_pass["currentQuestion"]["id"], a);

    let passed = fixture.question(&a).await;
    assert_eq!(passed["completed"], true);
    assert_eq!(passed["levelNumber"], 1);
    assert!(passed.get("passTime").is_some());

    // The session only finishes once the remaining two are processed
    let after_second = fixture.review_action(session_id, "pass").await;
    assert_eq!(after_second["state"], "answerHidden");

    let finished = fixture.review_action(session_id, "fail").await;
    assert_eq!(finished["state"], "finished");
    assert_eq!(finished["passCount"], 2);
    assert_eq!(finished["failCount"], 1);
    assert_eq!(finished["reviewedCount"], 3);
    assert!(finished.get("currentQuestion").is_none());
}

#[tokio::test]
async fn test_pass_advances_to_next_level() {
    let fixture = TestFixture::new().await;
    let leitner_id = fixture.create_leitner(json!({ "name": "Box" })).await;
    let question_id = fixture.create_question(&leitner_id, "hello", "hola").await;

    let levels = fixture.levels(&leitner_id).await;
    let level_one_id = levels[0]["level"]["id"].as_str().unwrap();

    let session = fixture.start_review(level_one_id).await;
    let session_id = session["id"].as_str().unwrap();
    fixture.review_action(session_id, "pass").await;

    let question = fixture.question(&question_id).await;
    assert_eq!(question["levelNumber"], 2);
    assert_eq!(question["completed"], false);

    // A just-passed card is no longer due anywhere
    let levels = fixture.levels(&leitner_id).await;
    assert_eq!(levels[0]["reviewableCount"], 0);
    assert_eq!(levels[1]["questionCount"], 1);
    assert_eq!(levels[1]["reviewableCount"], 0);
    assert_eq!(levels[1]["notReviewableCount"], 1);
}

#[tokio::test]
async fn test_fail_without_back_to_top_stays_and_records_statistic() {
    let fixture = TestFixture::new().await;
    let leitner_id = fixture
        .create_leitner(json!({
            "name": "Stay Put",
            "backToTopLevelOnFail": false,
            "levels": [ { "levelNumber": 1, "daysToRecommend": 1 } ]
        }))
        .await;
    let question_id = fixture.create_question(&leitner_id, "hello", "hola").await;

    let levels = fixture.levels(&leitner_id).await;
    let level_id = levels[0]["level"]["id"].as_str().unwrap();

    let session = fixture.start_review(level_id).await;
    let session_id = session["id"].as_str().unwrap();
    fixture.review_action(session_id, "fail").await;

    let question = fixture.question(&question_id).await;
    assert_eq!(question["levelNumber"], 1);
    assert_eq!(question["completed"], false);
    // Failing never touches the pass time
    assert!(question.get("passTime").is_none());

    let stats_resp = fixture
        .client
        .get(fixture.url("/api/statistics?timeframe=week"))
        .send()
        .await
        .unwrap();
    assert_eq!(stats_resp.status(), 200);
    let stats_body: Value = stats_resp.json().await.unwrap();
    let series = stats_body["data"].as_array().unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0]["isPassed"], false);
    assert_eq!(series[0]["count"], 1);
}

#[tokio::test]
async fn test_statistics_today_timeframe_is_rejected() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/statistics?timeframe=today"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_reset_question_returns_to_level_one() {
    let fixture = TestFixture::new().await;
    let leitner_id = fixture.create_leitner(json!({ "name": "Box" })).await;
    let question_id = fixture.create_question(&leitner_id, "hello", "hola").await;

    let levels = fixture.levels(&leitner_id).await;
    let level_one_id = levels[0]["level"]["id"].as_str().unwrap();

    let session = fixture.start_review(level_one_id).await;
    let session_id = session["id"].as_str().unwrap();
    fixture.review_action(session_id, "pass").await;

    let reset_resp = fixture
        .client
        .post(fixture.url(&format!("/api/questions/{}/reset", question_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(reset_resp.status(), 200);
    let reset_body: Value = reset_resp.json().await.unwrap();
    assert_eq!(reset_body["data"]["levelNumber"], 1);
    assert_eq!(reset_body["data"]["completed"], false);

    // Reset records no statistic beyond the one pass
    let stats_resp = fixture
        .client
        .get(fixture.url("/api/statistics?timeframe=week"))
        .send()
        .await
        .unwrap();
    let stats_body: Value = stats_resp.json().await.unwrap();
    let total: i64 = stats_body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["count"].as_i64().unwrap())
        .sum();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn test_delete_question_mid_session() {
    let fixture = TestFixture::new().await;
    let leitner_id = fixture.create_leitner(json!({ "name": "Box" })).await;
    let a = fixture.create_question(&leitner_id, "alpha", "a").await;
    fixture.create_question(&leitner_id, "beta", "b").await;

    let levels = fixture.levels(&leitner_id).await;
    let level_id = levels[0]["level"]["id"].as_str().unwrap();

    let session = fixture.start_review(level_id).await;
    let session_id = session["id"].as_str().unwrap();
    assert_eq!(session["totalCount"], 2);

    let delete_resp = fixture
        .client
        .delete(fixture.url(&format!("/api/reviews/{}/question", session_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(delete_resp.status(), 200);
    let delete_body: Value = delete_resp.json().await.unwrap();

    // The session stays on the next question; deleting is not an outcome
    assert_eq!(delete_body["data"]["state"], "answerHidden");
    assert_eq!(delete_body["data"]["reviewedCount"], 0);
    assert_eq!(delete_body["data"]["remainingCount"], 1);

    // The card is gone from the store
    let get_resp = fixture
        .client
        .get(fixture.url(&format!("/api/questions/{}", a)))
        .send()
        .await
        .unwrap();
    assert_eq!(get_resp.status(), 404);
}

#[tokio::test]
async fn test_abandoned_session_keeps_committed_transitions() {
    let fixture = TestFixture::new().await;
    let leitner_id = fixture.create_leitner(json!({ "name": "Box" })).await;
    let question_id = fixture.create_question(&leitner_id, "alpha", "a").await;
    fixture.create_question(&leitner_id, "beta", "b").await;

    let levels = fixture.levels(&leitner_id).await;
    let level_id = levels[0]["level"]["id"].as_str().unwrap();

    let session = fixture.start_review(level_id).await;
    let session_id = session["id"].as_str().unwrap();
    fixture.review_action(session_id, "pass").await;

    let abandon_resp = fixture
        .client
        .delete(fixture.url(&format!("/api/reviews/{}", session_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(abandon_resp.status(), 200);

    // The session is gone but the processed card's transition survives
    let get_resp = fixture
        .client
        .get(fixture.url(&format!("/api/reviews/{}", session_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(get_resp.status(), 404);

    let question = fixture.question(&question_id).await;
    assert_eq!(question["levelNumber"], 2);
}

#[tokio::test]
async fn test_search_scenarios() {
    let fixture = TestFixture::new().await;
    let leitner_id = fixture.create_leitner(json!({ "name": "Box" })).await;
    fixture
        .create_question(&leitner_id, "greeting", "hola amigo")
        .await;
    fixture.create_question(&leitner_id, "farewell", "adios").await;

    // Single-character query returns nothing
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/leitners/{}/search?q=g", leitner_id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["results"].as_array().unwrap().is_empty());

    // Two characters matching nothing returns nothing
    let resp2 = fixture
        .client
        .get(fixture.url(&format!("/api/leitners/{}/search?q=zz", leitner_id)))
        .send()
        .await
        .unwrap();
    let body2: Value = resp2.json().await.unwrap();
    assert!(body2["data"]["results"].as_array().unwrap().is_empty());

    // A match on the answer field still returns the question
    let resp3 = fixture
        .client
        .get(fixture.url(&format!("/api/leitners/{}/search?q=amigo", leitner_id)))
        .send()
        .await
        .unwrap();
    let body3: Value = resp3.json().await.unwrap();
    let results = body3["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["question"], "greeting");
}

#[tokio::test]
async fn test_question_listing_sorts() {
    let fixture = TestFixture::new().await;
    let leitner_id = fixture.create_leitner(json!({ "name": "Box" })).await;
    fixture.create_question(&leitner_id, "cherry", "c").await;
    fixture.create_question(&leitner_id, "apple", "a").await;
    let banana = fixture.create_question(&leitner_id, "banana", "b").await;

    // Alphabet sort
    let resp = fixture
        .client
        .get(fixture.url(&format!(
            "/api/leitners/{}/questions?sort=alphabet",
            leitner_id
        )))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let order: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["question"].as_str().unwrap())
        .collect();
    assert_eq!(order, vec!["apple", "banana", "cherry"]);

    // Favorite sort groups favorites first
    fixture
        .client
        .put(fixture.url(&format!("/api/questions/{}", banana)))
        .json(&json!({ "favorite": true }))
        .send()
        .await
        .unwrap();

    let resp2 = fixture
        .client
        .get(fixture.url(&format!(
            "/api/leitners/{}/questions?sort=favorite",
            leitner_id
        )))
        .send()
        .await
        .unwrap();
    let body2: Value = resp2.json().await.unwrap();
    assert_eq!(body2["data"][0]["question"], "banana");
}

#[tokio::test]
async fn test_tag_lifecycle() {
    let fixture = TestFixture::new().await;
    let leitner_id = fixture.create_leitner(json!({ "name": "Box" })).await;
    let question_id = fixture.create_question(&leitner_id, "hello", "hola").await;

    // Create tag
    let create_resp = fixture
        .client
        .post(fixture.url(&format!("/api/leitners/{}/tags", leitner_id)))
        .json(&json!({ "name": "verbs", "color": "#ff8800" }))
        .send()
        .await
        .unwrap();
    assert_eq!(create_resp.status(), 200);
    let create_body: Value = create_resp.json().await.unwrap();
    let tag_id = create_body["data"]["id"].as_str().unwrap();

    // Attach to question
    let attach_resp = fixture
        .client
        .post(fixture.url(&format!("/api/questions/{}/tags", question_id)))
        .json(&json!({ "tagId": tag_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(attach_resp.status(), 200);

    let tags_resp = fixture
        .client
        .get(fixture.url(&format!("/api/questions/{}/tags", question_id)))
        .send()
        .await
        .unwrap();
    let tags_body: Value = tags_resp.json().await.unwrap();
    assert_eq!(tags_body["data"].as_array().unwrap().len(), 1);
    assert_eq!(tags_body["data"][0]["name"], "verbs");

    // Tags from another leitner cannot be attached
    let other_leitner = fixture.create_leitner(json!({ "name": "Other" })).await;
    let foreign_tag_resp = fixture
        .client
        .post(fixture.url(&format!("/api/leitners/{}/tags", other_leitner)))
        .json(&json!({ "name": "foreign" }))
        .send()
        .await
        .unwrap();
    let foreign_tag: Value = foreign_tag_resp.json().await.unwrap();
    let foreign_tag_id = foreign_tag["data"]["id"].as_str().unwrap();

    let cross_resp = fixture
        .client
        .post(fixture.url(&format!("/api/questions/{}/tags", question_id)))
        .json(&json!({ "tagId": foreign_tag_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(cross_resp.status(), 400);

    // Detach
    let detach_resp = fixture
        .client
        .delete(fixture.url(&format!(
            "/api/questions/{}/tags/{}",
            question_id, tag_id
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(detach_resp.status(), 200);

    let tags_resp2 = fixture
        .client
        .get(fixture.url(&format!("/api/questions/{}/tags", question_id)))
        .send()
        .await
        .unwrap();
    let tags_body2: Value = tags_resp2.json().await.unwrap();
    assert!(tags_body2["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_synonym_transitive_merge() {
    let fixture = TestFixture::new().await;
    let leitner_id = fixture.create_leitner(json!({ "name": "Box" })).await;
    let q1 = fixture.create_question(&leitner_id, "big", "grande").await;
    let q2 = fixture.create_question(&leitner_id, "large", "grande").await;
    let q3 = fixture.create_question(&leitner_id, "huge", "enorme").await;

    // Link q1-q2, then q2-q3: all three end up in one group
    fixture
        .client
        .post(fixture.url("/api/synonyms"))
        .json(&json!({ "questionId": q1, "otherQuestionId": q2 }))
        .send()
        .await
        .unwrap();

    let second_resp = fixture
        .client
        .post(fixture.url("/api/synonyms"))
        .json(&json!({ "questionId": q2, "otherQuestionId": q3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(second_resp.status(), 200);
    let second_body: Value = second_resp.json().await.unwrap();
    assert_eq!(
        second_body["data"]["questionIds"].as_array().unwrap().len(),
        3
    );

    let groups_resp = fixture
        .client
        .get(fixture.url(&format!("/api/leitners/{}/synonyms", leitner_id)))
        .send()
        .await
        .unwrap();
    let groups_body: Value = groups_resp.json().await.unwrap();
    let groups = groups_body["data"].as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["questionIds"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_synonym_merge_of_two_groups() {
    let fixture = TestFixture::new().await;
    let leitner_id = fixture.create_leitner(json!({ "name": "Box" })).await;
    let q1 = fixture.create_question(&leitner_id, "one", "uno").await;
    let q2 = fixture.create_question(&leitner_id, "two", "dos").await;
    let q3 = fixture.create_question(&leitner_id, "three", "tres").await;
    let q4 = fixture.create_question(&leitner_id, "four", "cuatro").await;

    for (a, b) in [(&q1, &q2), (&q3, &q4)] {
        fixture
            .client
            .post(fixture.url("/api/synonyms"))
            .json(&json!({ "questionId": a, "otherQuestionId": b }))
            .send()
            .await
            .unwrap();
    }

    // Linking across the two groups merges them
    let merge_resp = fixture
        .client
        .post(fixture.url("/api/synonyms"))
        .json(&json!({ "questionId": q2, "otherQuestionId": q3 }))
        .send()
        .await
        .unwrap();
    let merge_body: Value = merge_resp.json().await.unwrap();
    assert_eq!(merge_body["data"]["questionIds"].as_array().unwrap().len(), 4);

    let groups_resp = fixture
        .client
        .get(fixture.url(&format!("/api/leitners/{}/synonyms", leitner_id)))
        .send()
        .await
        .unwrap();
    let groups_body: Value = groups_resp.json().await.unwrap();
    assert_eq!(groups_body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unlink_prunes_undersized_group() {
    let fixture = TestFixture::new().await;
    let leitner_id = fixture.create_leitner(json!({ "name": "Box" })).await;
    let q1 = fixture.create_question(&leitner_id, "big", "grande").await;
    let q2 = fixture.create_question(&leitner_id, "large", "grande").await;

    fixture
        .client
        .post(fixture.url("/api/synonyms"))
        .json(&json!({ "questionId": q1, "otherQuestionId": q2 }))
        .send()
        .await
        .unwrap();

    let unlink_resp = fixture
        .client
        .delete(fixture.url(&format!("/api/questions/{}/synonyms", q1)))
        .send()
        .await
        .unwrap();
    assert_eq!(unlink_resp.status(), 200);

    // The group dropped below two members and was dissolved
    let group_resp = fixture
        .client
        .get(fixture.url(&format!("/api/questions/{}/synonyms", q2)))
        .send()
        .await
        .unwrap();
    let group_body: Value = group_resp.json().await.unwrap();
    assert!(group_body["data"].is_null());
}

#[tokio::test]
async fn test_move_question_to_other_leitner() {
    let fixture = TestFixture::new().await;
    let source = fixture.create_leitner(json!({ "name": "Source" })).await;
    let target = fixture.create_leitner(json!({ "name": "Target" })).await;
    let question_id = fixture.create_question(&source, "hello", "hola").await;

    // Promote the question off level 1 first
    let levels = fixture.levels(&source).await;
    let level_one_id = levels[0]["level"]["id"].as_str().unwrap();
    let session = fixture.start_review(level_one_id).await;
    fixture
        .review_action(session["id"].as_str().unwrap(), "pass")
        .await;

    // Moving re-enters at level 1 of the target
    let move_resp = fixture
        .client
        .post(fixture.url(&format!("/api/questions/{}/move", question_id)))
        .json(&json!({ "targetLeitnerId": target }))
        .send()
        .await
        .unwrap();
    assert_eq!(move_resp.status(), 200);
    let move_body: Value = move_resp.json().await.unwrap();
    assert_eq!(move_body["data"]["leitnerId"], target.as_str());
    assert_eq!(move_body["data"]["levelNumber"], 1);
    assert_eq!(move_body["data"]["completed"], false);

    // Moving to a missing leitner fails
    let bad_resp = fixture
        .client
        .post(fixture.url(&format!("/api/questions/{}/move", question_id)))
        .json(&json!({ "targetLeitnerId": "no-such-leitner" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_resp.status(), 404);
}

#[tokio::test]
async fn test_validation_errors() {
    let fixture = TestFixture::new().await;

    // Leitner with empty name
    let resp = fixture
        .client
        .post(fixture.url("/api/leitners"))
        .json(&json!({ "name": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // Question with empty text
    let leitner_id = fixture.create_leitner(json!({ "name": "Box" })).await;
    let resp2 = fixture
        .client
        .post(fixture.url(&format!("/api/leitners/{}/questions", leitner_id)))
        .json(&json!({ "question": "  ", "answer": "hola" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp2.status(), 400);
}

#[tokio::test]
async fn test_not_found_errors() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/leitners/non-existent-id"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let resp2 = fixture
        .client
        .get(fixture.url("/api/questions/non-existent-id"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp2.status(), 404);

    let resp3 = fixture
        .client
        .get(fixture.url("/api/reviews/non-existent-id"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp3.status(), 404);
}

#[tokio::test]
async fn test_revision_increments_on_writes() {
    let fixture = TestFixture::new().await;

    let list_resp = fixture
        .client
        .get(fixture.url("/api/leitners"))
        .send()
        .await
        .unwrap();
    let list_body: Value = list_resp.json().await.unwrap();
    let initial_revision = list_body["revisionId"].as_i64().unwrap();

    let create_resp = fixture
        .client
        .post(fixture.url("/api/leitners"))
        .json(&json!({ "name": "Box" }))
        .send()
        .await
        .unwrap();
    let create_body: Value = create_resp.json().await.unwrap();
    let after_create = create_body["revisionId"].as_i64().unwrap();
    assert_eq!(after_create, initial_revision + 1);
}
