use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    certificate::CERTIFICATE_THRESHOLD,
    config::{MAX_QUESTION_COUNT, QuizConfig},
    errors::{ApiError, ErrorContext, ErrorResponse},
    models::*,
    quiz_service::{CertificateDecision, QuizService},
};

// Import logging macros
use crate::{log_api_error, log_api_start, log_api_success, log_api_warn, log_validation};

/// Header carrying the caller identity, set by the upstream auth layer.
pub const USER_HEADER: &str = "x-user";

const MAX_SUBJECT_LENGTH: usize = 255;

#[derive(Clone)]
pub struct AppState {
    pub quiz_service: QuizService,
    pub quiz_config: QuizConfig,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

fn current_user(headers: &HeaderMap, operation: &str) -> Result<String, ErrorResponse> {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|user| !user.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            ApiError::Unauthorized(format!("missing '{}' header", USER_HEADER))
                .to_response_with_context(ErrorContext::new(operation, "user"))
        })
}

fn json_body(body: Result<Json<serde_json::Value>, JsonRejection>) -> Result<serde_json::Value, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn validate_generate_request(
    body: serde_json::Value,
    quiz_config: &QuizConfig,
) -> Result<QuizRequest, ApiError> {
    let request: GenerateQuizRequest =
        serde_json::from_value(body).map_err(|e| ApiError::ValidationError(e.to_string()))?;

    let subject = request.subject.trim();
    if subject.is_empty() {
        return Err(ApiError::ValidationError("subject must not be empty".to_string()));
    }
    if subject.chars().count() > MAX_SUBJECT_LENGTH {
        return Err(ApiError::ValidationError(format!(
            "subject must be at most {} characters",
            MAX_SUBJECT_LENGTH
        )));
    }

    let count = request.count.unwrap_or(quiz_config.default_question_count);
    if count == 0 || count > MAX_QUESTION_COUNT {
        return Err(ApiError::ValidationError(format!(
            "count must be between 1 and {}",
            MAX_QUESTION_COUNT
        )));
    }

    Ok(QuizRequest {
        subject: subject.to_string(),
        difficulty: request.difficulty,
        count,
    })
}

fn validate_submission(body: serde_json::Value) -> Result<Vec<String>, ApiError> {
    let request: SubmitAnswersRequest = serde_json::from_value(body)
        .map_err(|e| ApiError::ValidationError(format!("answers must be a list of strings: {}", e)))?;
    Ok(request.answers)
}

// Quiz endpoints
pub async fn generate_quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Quiz>>), ErrorResponse> {
    log_api_start!("generate_quiz");
    current_user(&headers, "generate_quiz")?;

    let request = match json_body(body)
        .and_then(|body| validate_generate_request(body, &state.quiz_config))
    {
        Ok(request) => request,
        Err(e) => {
            log_validation!(failure, "generate_quiz", error = e);
            return Err(e.to_response_with_context(ErrorContext::new("generate_quiz", "quiz")));
        }
    };

    info!(
        subject = %request.subject,
        difficulty = %request.difficulty,
        count = request.count,
        "Generating new quiz"
    );

    match state.quiz_service.generate_quiz(&request).await {
        Ok(quiz) => {
            log_api_success!("generate_quiz", quiz_id = quiz.id, "quiz created");
            Ok((StatusCode::CREATED, Json(ApiResponse::success(quiz))))
        }
        Err(e) => {
            log_api_error!("generate_quiz", error = e, "failed to store quiz");
            Err(ApiError::DatabaseError(e)
                .to_response_with_context(ErrorContext::new("generate_quiz", "quiz")))
        }
    }
}

pub async fn get_all_quizzes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<Quiz>>>, ErrorResponse> {
    debug!("Getting all quizzes");
    current_user(&headers, "get_all_quizzes")?;

    match state.quiz_service.get_all_quizzes().await {
        Ok(quizzes) => {
            log_api_success!("get_all_quizzes", count = quizzes.len(), "quizzes listed");
            Ok(Json(ApiResponse::success(quizzes)))
        }
        Err(e) => Err(ApiError::DatabaseError(e)
            .to_response_with_context(ErrorContext::new("get_all_quizzes", "quiz"))),
    }
}

pub async fn get_quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Quiz>>, ErrorResponse> {
    log_api_start!("get_quiz", quiz_id = id);
    current_user(&headers, "get_quiz")?;

    match state.quiz_service.get_quiz(id).await {
        Ok(Some(quiz)) => Ok(Json(ApiResponse::success(quiz))),
        Ok(None) => {
            log_api_warn!("get_quiz", quiz_id = id, "quiz not found");
            Err(ApiError::NotFound(format!("Quiz with id '{}' not found", id))
                .to_response_with_context(
                    ErrorContext::new("get_quiz", "quiz")
                        .with_id(&id.to_string())
                        .with_user_message("Quiz not found"),
                ))
        }
        Err(e) => Err(ApiError::DatabaseError(e).to_response_with_context(
            ErrorContext::new("get_quiz", "quiz").with_id(&id.to_string()),
        )),
    }
}

pub async fn submit_answers(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(quiz_id): Path<i64>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<ApiResponse<SubmissionResult>>, ErrorResponse> {
    log_api_start!("submit_answers", quiz_id = quiz_id);
    let user_name = current_user(&headers, "submit_answers")?;

    let answers = json_body(body).and_then(validate_submission).map_err(|e| {
        e.to_response_with_context(
            ErrorContext::new("submit_answers", "submission").with_id(&quiz_id.to_string()),
        )
    })?;

    match state
        .quiz_service
        .submit_answers(&user_name, quiz_id, &answers)
        .await
    {
        Ok(Some(result)) => {
            info!(
                quiz_id = quiz_id,
                user = %user_name,
                score = result.score,
                total = result.total,
                history_id = result.history_id,
                "Quiz graded"
            );
            Ok(Json(ApiResponse::success(result)))
        }
        Ok(None) => {
            log_api_warn!("submit_answers", quiz_id = quiz_id, "quiz not found");
            Err(ApiError::NotFound(format!("Quiz with id '{}' not found", quiz_id))
                .to_response_with_context(
                    ErrorContext::new("submit_answers", "quiz")
                        .with_id(&quiz_id.to_string())
                        .with_user_message("Quiz not found"),
                ))
        }
        Err(e) => {
            log_api_error!("submit_answers", quiz_id = quiz_id, error = e, "failed to grade submission");
            Err(ApiError::DatabaseError(e).to_response_with_context(
                ErrorContext::new("submit_answers", "quiz").with_id(&quiz_id.to_string()),
            ))
        }
    }
}

// History endpoints
pub async fn get_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<HistoryView>>>, ErrorResponse> {
    let user_name = current_user(&headers, "get_history")?;

    match state.quiz_service.get_history(&user_name).await {
        Ok(history) => Ok(Json(ApiResponse::success(history))),
        Err(e) => Err(ApiError::DatabaseError(e)
            .to_response_with_context(ErrorContext::new("get_history", "history"))),
    }
}

pub async fn get_history_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<HistoryView>>, ErrorResponse> {
    log_api_start!("get_history_entry", history_id = id);
    let user_name = current_user(&headers, "get_history_entry")?;

    match state.quiz_service.get_history_entry(&user_name, id).await {
        Ok(Some(view)) => Ok(Json(ApiResponse::success(view))),
        Ok(None) => Err(ApiError::NotFound(format!("History entry '{}' not found", id))
            .to_response_with_context(
                ErrorContext::new("get_history_entry", "history").with_id(&id.to_string()),
            )),
        Err(e) => Err(ApiError::DatabaseError(e).to_response_with_context(
            ErrorContext::new("get_history_entry", "history").with_id(&id.to_string()),
        )),
    }
}

// Certificate endpoints
pub async fn get_certificates(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<HistoryView>>>, ErrorResponse> {
    let user_name = current_user(&headers, "get_certificates")?;

    match state.quiz_service.get_certificates(&user_name).await {
        Ok(certificates) => {
            log_api_success!("get_certificates", count = certificates.len(), "certificates listed");
            Ok(Json(ApiResponse::success(certificates)))
        }
        Err(e) => Err(ApiError::DatabaseError(e)
            .to_response_with_context(ErrorContext::new("get_certificates", "certificate"))),
    }
}

pub async fn download_certificate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(history_id): Path<i64>,
) -> Result<Response, ErrorResponse> {
    log_api_start!("download_certificate", history_id = history_id);
    let user_name = current_user(&headers, "download_certificate")?;
    let context = || {
        ErrorContext::new("download_certificate", "certificate").with_id(&history_id.to_string())
    };

    match state.quiz_service.certificate_for(&user_name, history_id).await {
        Ok(Some(CertificateDecision::Issued { certificate, filename })) => {
            let body = serde_json::to_string_pretty(&certificate).map_err(|e| {
                ApiError::InternalError(e.to_string()).to_response_with_context(context())
            })?;

            log_api_success!(
                "download_certificate",
                history_id = history_id,
                certificate.certificate_id
            );

            Ok((
                [
                    (header::CONTENT_TYPE, "application/json".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", filename),
                    ),
                ],
                body,
            )
                .into_response())
        }
        Ok(Some(CertificateDecision::BelowThreshold(result))) => {
            log_api_warn!(
                "download_certificate",
                history_id = history_id,
                format!("score {}% is below threshold", result.percentage)
            );
            Err(ApiError::Forbidden(format!(
                "Certificate not available for scores below {}%",
                CERTIFICATE_THRESHOLD
            ))
            .to_response_with_context(context()))
        }
        Ok(None) => Err(ApiError::NotFound(format!("History entry '{}' not found", history_id))
            .to_response_with_context(context().with_user_message("Certificate not found"))),
        Err(e) => Err(ApiError::DatabaseError(e).to_response_with_context(context())),
    }
}

// Provider endpoints
pub async fn provider_health(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ConnectionStatus>>, ErrorResponse> {
    let status = state.quiz_service.test_provider_connection().await;

    if status.ok {
        Ok(Json(ApiResponse::success(status)))
    } else {
        Err(ApiError::LLMError(status.message.clone()).to_response_with_context(
            ErrorContext::new("provider_health", "provider").with_user_message(&status.message),
        ))
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Quiz routes
        .route("/api/generate", post(generate_quiz))
        .route("/api/quizzes", get(get_all_quizzes))
        .route("/api/quizzes/:id", get(get_quiz))
        .route("/api/submit/:quiz_id", post(submit_answers))
        // History routes
        .route("/api/history", get(get_history))
        .route("/api/history/:id", get(get_history_entry))
        // Certificate routes
        .route("/api/certificates", get(get_certificates))
        .route("/api/certificates/download/:history_id", get(download_certificate))
        // Provider routes
        .route("/api/provider/health", get(provider_health))
        .with_state(state)
}
