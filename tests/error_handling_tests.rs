use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use quiz_certify::{
    CompletionClient, CompletionRequest, Database, LLMService, ProviderError, QuizService,
    api::{AppState, create_router},
    config::QuizConfig,
};
use serde_json::{Value, json};
use std::sync::Arc;

struct TwoQuestions;

#[async_trait]
impl CompletionClient for TwoQuestions {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, ProviderError> {
        Ok(r#"[{"text":"Capital of Italy?","answer":"Rome"},{"text":"3 * 3?","answer":"9"}]"#
            .to_string())
    }

    fn provider_name(&self) -> &'static str {
        "OpenAI"
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

async fn create_test_server() -> TestServer {
    let db = Database::new("sqlite::memory:").await.unwrap();
    let app_state = AppState {
        quiz_service: QuizService::new(db, LLMService::new(Arc::new(TwoQuestions))),
        quiz_config: QuizConfig::default(),
    };
    TestServer::new(create_router(app_state)).unwrap()
}

fn user_header(name: &'static str) -> (HeaderName, HeaderValue) {
    (HeaderName::from_static("x-user"), HeaderValue::from_static(name))
}

async fn create_quiz(server: &TestServer) -> i64 {
    let (name, value) = user_header("alice");
    let body: Value = server
        .post("/api/generate")
        .add_header(name, value)
        .json(&json!({ "subject": "Math", "count": 2 }))
        .await
        .json();
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_missing_user_header_is_unauthorized() {
    let server = create_test_server().await;

    let response = server
        .post("/api/generate")
        .json(&json!({ "subject": "Math" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("x-user"));

    server.get("/api/quizzes").await.assert_status(StatusCode::UNAUTHORIZED);
    server.get("/api/quizzes/1").await.assert_status(StatusCode::UNAUTHORIZED);
    server.get("/api/history").await.assert_status(StatusCode::UNAUTHORIZED);
    server.get("/api/certificates").await.assert_status(StatusCode::UNAUTHORIZED);
    server
        .post("/api/submit/1")
        .json(&json!({ "answers": [] }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_generate_requests() {
    let server = create_test_server().await;

    for body in [
        json!({ "subject": "   " }),
        json!({ "subject": "Math", "count": 0 }),
        json!({ "subject": "Math", "count": 51 }),
        json!({ "subject": "Math", "difficulty": "impossible" }),
    ] {
        let (name, value) = user_header("alice");
        let response = server.post("/api/generate").add_header(name, value).json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().starts_with("Validation error"));
    }

    let (name, value) = user_header("alice");
    let list: Value = server.get("/api/quizzes").add_header(name, value).await.json();
    assert!(list["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_submission_shape() {
    let server = create_test_server().await;
    let quiz_id = create_quiz(&server).await;

    let (name, value) = user_header("alice");
    let response = server
        .post(&format!("/api/submit/{}", quiz_id))
        .add_header(name, value)
        .json(&json!({ "answers": "Rome" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let (name, value) = user_header("alice");
    let history: Value = server.get("/api/history").add_header(name, value).await.json();
    assert!(history["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unreadable_bodies_use_error_envelope() {
    let server = create_test_server().await;
    let quiz_id = create_quiz(&server).await;

    let (name, value) = user_header("alice");
    let response = server
        .post("/api/generate")
        .add_header(name, value)
        .text("{\"subject\": ")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["data"].is_null());
    assert!(body["error"].as_str().unwrap().starts_with("Bad request"));

    let (name, value) = user_header("alice");
    let response = server
        .post(&format!("/api/submit/{}", quiz_id))
        .add_header(name, value)
        .text("answers=Rome")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Bad request"));
}

#[tokio::test]
async fn test_not_found_resources() {
    let server = create_test_server().await;

    let (name, value) = user_header("alice");
    let response = server.get("/api/quizzes/999").add_header(name, value).await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "Quiz not found");

    let (name, value) = user_header("alice");
    server
        .post("/api/submit/999")
        .add_header(name, value)
        .json(&json!({ "answers": ["Rome"] }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let (name, value) = user_header("alice");
    let response = server
        .get("/api/certificates/download/999")
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "Certificate not found");
}

#[tokio::test]
async fn test_history_is_scoped_to_caller() {
    let server = create_test_server().await;
    let quiz_id = create_quiz(&server).await;

    let (name, value) = user_header("alice");
    let submitted: Value = server
        .post(&format!("/api/submit/{}", quiz_id))
        .add_header(name, value)
        .json(&json!({ "answers": ["rome", "9"] }))
        .await
        .json();
    let history_id = submitted["data"]["history_id"].as_i64().unwrap();

    let (name, value) = user_header("mallory");
    server
        .get(&format!("/api/history/{}", history_id))
        .add_header(name, value)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let (name, value) = user_header("mallory");
    server
        .get(&format!("/api/certificates/download/{}", history_id))
        .add_header(name, value)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_certificate_below_threshold_is_forbidden() {
    let server = create_test_server().await;
    let quiz_id = create_quiz(&server).await;

    let (name, value) = user_header("bob");
    let submitted: Value = server
        .post(&format!("/api/submit/{}", quiz_id))
        .add_header(name, value)
        .json(&json!({ "answers": ["Rome", "8"] }))
        .await
        .json();
    assert_eq!(submitted["data"]["score"], 1);
    let history_id = submitted["data"]["history_id"].as_i64().unwrap();

    let (name, value) = user_header("bob");
    let response = server
        .get(&format!("/api/certificates/download/{}", history_id))
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["error"], "Certificate not available for scores below 80%");
}
