use anyhow::Result;
use std::time::Instant;

use crate::certificate::{self, Certificate, CertificateEligibility};
use crate::database::Database;
use crate::grading;
use crate::llm_service::LLMService;
use crate::models::*;

// Import logging macros
use crate::{log_service_start, log_service_success};

/// Result of asking for a certificate on an existing history entry.
#[derive(Debug, Clone)]
pub enum CertificateDecision {
    Issued {
        certificate: Certificate,
        filename: String,
    },
    BelowThreshold(CertificateEligibility),
}

#[derive(Clone)]
pub struct QuizService {
    db: Database,
    llm_service: LLMService,
}

impl QuizService {
    pub fn new(db: Database, llm_service: LLMService) -> Self {
        Self { db, llm_service }
    }

    pub fn llm_service(&self) -> &LLMService {
        &self.llm_service
    }

    /// Generate questions for the request and persist them as a new quiz.
    pub async fn generate_quiz(&self, request: &QuizRequest) -> Result<Quiz> {
        log_service_start!("quiz_service", "generate_quiz", subject = request.subject);
        let started = Instant::now();

        let questions = self
            .llm_service
            .generate_quiz_questions(
                &request.subject,
                request.difficulty.as_str(),
                request.count as usize,
            )
            .await;

        let quiz = self
            .db
            .create_quiz(&request.subject, request.difficulty, &questions)
            .await?;

        log_service_success!(
            "quiz_service",
            "generate_quiz",
            quiz_id = quiz.id,
            duration_ms = started.elapsed().as_millis() as u64
        );
        Ok(quiz)
    }

    pub async fn get_quiz(&self, id: i64) -> Result<Option<Quiz>> {
        self.db.get_quiz(id).await
    }

    pub async fn get_all_quizzes(&self) -> Result<Vec<Quiz>> {
        self.db.get_all_quizzes().await
    }

    /// Grade a submission against the stored answers and record the attempt.
    /// Returns `None` when the quiz does not exist.
    pub async fn submit_answers(
        &self,
        user_name: &str,
        quiz_id: i64,
        answers: &[String],
    ) -> Result<Option<SubmissionResult>> {
        log_service_start!("quiz_service", "submit_answers", quiz_id = quiz_id);
        let started = Instant::now();

        let Some(correct_answers) = self.db.get_correct_answers(quiz_id).await? else {
            return Ok(None);
        };

        let result = grading::grade_submission(answers, &correct_answers);
        let history_id = self.db.create_history(user_name, quiz_id, result.score).await?;

        log_service_success!(
            "quiz_service",
            "submit_answers",
            quiz_id = quiz_id,
            duration_ms = started.elapsed().as_millis() as u64
        );

        Ok(Some(SubmissionResult {
            score: result.score,
            total: result.total,
            history_id,
        }))
    }

    pub async fn get_history(&self, user_name: &str) -> Result<Vec<HistoryView>> {
        let entries = self.db.get_history_for_user(user_name).await?;
        Ok(entries.into_iter().map(history_view).collect())
    }

    pub async fn get_history_entry(&self, user_name: &str, id: i64) -> Result<Option<HistoryView>> {
        Ok(self.db.get_history_entry(user_name, id).await?.map(history_view))
    }

    /// History entries that currently qualify for a certificate.
    pub async fn get_certificates(&self, user_name: &str) -> Result<Vec<HistoryView>> {
        let history = self.get_history(user_name).await?;
        Ok(history.into_iter().filter(|view| view.has_certificate).collect())
    }

    /// Decide whether a certificate can be downloaded for a history entry.
    /// Returns `None` when the entry does not exist for this user.
    pub async fn certificate_for(
        &self,
        user_name: &str,
        history_id: i64,
    ) -> Result<Option<CertificateDecision>> {
        let Some(entry) = self.db.get_history_entry(user_name, history_id).await? else {
            return Ok(None);
        };

        let decision = match Certificate::issue(&entry) {
            Some(certificate) => CertificateDecision::Issued {
                certificate,
                filename: certificate::download_filename(&entry.quiz.subject, entry.completed_at),
            },
            None => CertificateDecision::BelowThreshold(certificate::eligibility(
                entry.score,
                entry.total_questions,
            )),
        };

        Ok(Some(decision))
    }

    pub async fn test_provider_connection(&self) -> ConnectionStatus {
        self.llm_service.test_connection().await
    }
}

fn history_view(entry: HistoryEntry) -> HistoryView {
    let result = certificate::eligibility(entry.score, entry.total_questions);
    HistoryView {
        entry,
        score_percentage: result.percentage,
        has_certificate: result.eligible,
    }
}
