use crate::api::ApiResponse;
use axum::{http::StatusCode, response::Json};
use tracing::{error, info, warn};

/// Centralized error types for consistent API error handling
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] anyhow::Error),

    #[error("LLM service error: {0}")]
    LLMError(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

pub type ErrorResponse = (StatusCode, Json<ApiResponse<()>>);

/// Error context for structured logging
#[derive(Debug)]
pub struct ErrorContext {
    pub operation: String,
    pub resource_id: Option<String>,
    pub resource_type: String,
    pub user_friendly_message: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: &str, resource_type: &str) -> Self {
        Self {
            operation: operation.to_string(),
            resource_id: None,
            resource_type: resource_type.to_string(),
            user_friendly_message: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn with_user_message(mut self, message: &str) -> Self {
        self.user_friendly_message = Some(message.to_string());
        self
    }
}

impl ApiError {
    /// Convert API error to HTTP response with consistent structure and logging
    pub fn to_response_with_context(self, context: ErrorContext) -> ErrorResponse {
        match &self {
            ApiError::NotFound(_) => {
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Resource not found"
                );
                (
                    StatusCode::NOT_FOUND,
                    Json(ApiResponse::error(
                        context
                            .user_friendly_message
                            .unwrap_or_else(|| format!("{} not found", context.resource_type)),
                    )),
                )
            }
            ApiError::ValidationError(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Validation error"
                );
                (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error(self.to_string())),
                )
            }
            ApiError::Unauthorized(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    error = %self,
                    "Unauthorized request"
                );
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ApiResponse::error(self.to_string())),
                )
            }
            ApiError::Forbidden(_) => {
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Forbidden request"
                );
                (
                    StatusCode::FORBIDDEN,
                    Json(ApiResponse::error(self.to_string())),
                )
            }
            ApiError::BadRequest(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Bad request"
                );
                (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error(self.to_string())),
                )
            }
            ApiError::LLMError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "LLM service error"
                );
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(ApiResponse::error(
                        context
                            .user_friendly_message
                            .unwrap_or_else(|| "AI service temporarily unavailable. Please try again.".to_string()),
                    )),
                )
            }
            ApiError::DatabaseError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Database error"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error(
                        "Database operation failed. Please try again.".to_string(),
                    )),
                )
            }
            ApiError::InternalError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Internal server error"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error(
                        "An internal error occurred. Please try again.".to_string(),
                    )),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_creation() {
        let context = ErrorContext::new("submit_answers", "quiz")
            .with_id("123")
            .with_user_message("Quiz not found");

        assert_eq!(context.operation, "submit_answers");
        assert_eq!(context.resource_type, "quiz");
        assert_eq!(context.resource_id, Some("123".to_string()));
        assert_eq!(
            context.user_friendly_message,
            Some("Quiz not found".to_string())
        );
    }

    #[test]
    fn test_api_error_responses() {
        let error = ApiError::NotFound("Quiz not found".to_string());
        let context = ErrorContext::new("get_quiz", "quiz").with_id("123");
        let (status, Json(body)) = error.to_response_with_context(context);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!body.success);
        assert_eq!(body.error.as_deref(), Some("quiz not found"));

        let (status, _) = ApiError::ValidationError("answers must be a list".to_string())
            .to_response_with_context(ErrorContext::new("submit_answers", "submission"));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = ApiError::Unauthorized("missing user".to_string())
            .to_response_with_context(ErrorContext::new("get_history", "user"));
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, Json(body)) =
            ApiError::Forbidden("Certificate not available for scores below 80%".to_string())
                .to_response_with_context(ErrorContext::new("download_certificate", "certificate"));
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(
            body.error.as_deref(),
            Some("Certificate not available for scores below 80%")
        );

        let (status, Json(body)) =
            ApiError::DatabaseError(anyhow::anyhow!("disk I/O error"))
                .to_response_with_context(ErrorContext::new("get_quiz", "quiz"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.error.unwrap().contains("disk"));

        let (status, _) = ApiError::LLMError("timeout".to_string())
            .to_response_with_context(ErrorContext::new("provider_health", "provider"));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, Json(body)) = ApiError::BadRequest("expected value at line 1".to_string())
            .to_response_with_context(ErrorContext::new("generate_quiz", "quiz"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.as_deref(), Some("Bad request: expected value at line 1"));
    }
}
