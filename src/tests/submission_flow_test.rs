use async_trait::async_trait;
use std::sync::Arc;

use crate::llm_providers::{CompletionClient, CompletionRequest, ProviderError};
use crate::quiz_service::{CertificateDecision, QuizService};
use crate::{Database, Difficulty, LLMService, QuizRequest};

struct FixedReply(Option<&'static str>);

#[async_trait]
impl CompletionClient for FixedReply {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, ProviderError> {
        self.0.map(str::to_string).ok_or(ProviderError::EmptyResponse)
    }

    fn provider_name(&self) -> &'static str {
        "OpenAI"
    }

    fn model_name(&self) -> &str {
        "fixed"
    }
}

const FIVE_QUESTIONS: &str = r#"{"questions":[
    {"text":"Capital of France?","answer":"Paris"},
    {"text":"2 + 2?","answer":"4"},
    {"text":"Largest ocean?","answer":"Pacific"},
    {"text":"Chemical symbol for gold?","answer":"Au"},
    {"text":"Planet closest to the sun?","answer":"Mercury"}
]}"#;

async fn service(reply: Option<&'static str>) -> QuizService {
    let db = Database::new("sqlite::memory:").await.unwrap();
    QuizService::new(db, LLMService::new(Arc::new(FixedReply(reply))))
}

fn request(count: u32) -> QuizRequest {
    QuizRequest {
        subject: "General Knowledge".to_string(),
        difficulty: Difficulty::Easy,
        count,
    }
}

fn answers(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_passing_attempt_earns_certificate() {
    let service = service(Some(FIVE_QUESTIONS)).await;
    let quiz = service.generate_quiz(&request(5)).await.unwrap();
    assert_eq!(quiz.questions.len(), 5);

    let result = service
        .submit_answers("alice", quiz.id, &answers(&["paris", "4", "PACIFIC", "Au", "Venus"]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.score, 4);
    assert_eq!(result.total, 5);

    let certificates = service.get_certificates("alice").await.unwrap();
    assert_eq!(certificates.len(), 1);
    assert_eq!(certificates[0].score_percentage, 80);

    match service.certificate_for("alice", result.history_id).await.unwrap() {
        Some(CertificateDecision::Issued { certificate, filename }) => {
            assert_eq!(certificate.score, 80);
            assert_eq!(certificate.certificate_id, format!("CERT-{:06}", result.history_id));
            assert!(filename.starts_with("certificate_general_knowledge_"));
        }
        other => panic!("expected an issued certificate, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failing_attempt_is_listed_but_not_certified() {
    let service = service(Some(FIVE_QUESTIONS)).await;
    let quiz = service.generate_quiz(&request(5)).await.unwrap();

    let result = service
        .submit_answers("bob", quiz.id, &answers(&["Paris"]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.score, 1);
    assert_eq!(result.total, 5);

    let history = service.get_history("bob").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].score_percentage, 20);
    assert!(!history[0].has_certificate);

    assert!(service.get_certificates("bob").await.unwrap().is_empty());
    assert!(matches!(
        service.certificate_for("bob", result.history_id).await.unwrap(),
        Some(CertificateDecision::BelowThreshold(e)) if e.percentage == 20 && !e.eligible
    ));
    assert!(service.certificate_for("alice", result.history_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_provider_failure_still_produces_a_quiz() {
    let service = service(None).await;
    let quiz = service.generate_quiz(&request(3)).await.unwrap();

    assert_eq!(quiz.questions.len(), 3);
    for question in &quiz.questions {
        assert_eq!(question.answer, "Sample answer");
        assert!(question.text.contains("General Knowledge"));
    }

    let result = service
        .submit_answers("carol", quiz.id, &answers(&["sample ANSWER", "sample answer", "x"]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.score, 2);
}

#[tokio::test]
async fn test_submission_to_unknown_quiz() {
    let service = service(Some(FIVE_QUESTIONS)).await;
    let result = service.submit_answers("alice", 404, &answers(&["Paris"])).await.unwrap();
    assert!(result.is_none());
    assert!(service.get_history("alice").await.unwrap().is_empty());
}
