pub mod api;
pub mod certificate;
pub mod config;
pub mod database;
pub mod errors;
pub mod grading;
pub mod llm_providers;
pub mod llm_service;
pub mod logging;
pub mod models;
pub mod question_normalizer;
pub mod quiz_service;

#[cfg(test)]
mod tests {
    mod submission_flow_test;
}

pub use certificate::{Certificate, CertificateEligibility, eligibility};
pub use config::Config;
pub use database::Database;
pub use errors::*;
pub use grading::{grade, grade_submission};
pub use llm_providers::{CompletionClient, CompletionRequest, LLMProvider, LLMProviderFactory, LLMProviderType, ProviderError};
pub use llm_service::LLMService;
pub use models::*;
pub use question_normalizer::{GenerationError, ParsedQuiz, normalize};
pub use quiz_service::QuizService;
