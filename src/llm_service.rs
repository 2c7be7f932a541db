use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::llm_providers::{
    CompletionClient, CompletionRequest, LLMProviderFactory, LLMProviderType, ProviderError,
};
use crate::models::{ConnectionStatus, GeneratedQuestion};
use crate::question_normalizer;

// Import logging macros
use crate::{log_llm_operation, log_performance};

const PROBE_PROMPT: &str = "Say 'test successful' if you can read this.";
const PROBE_MAX_TOKENS: u32 = 5;

/// Describe what a difficulty level means to the quiz author.
pub fn difficulty_description(difficulty: &str) -> &'static str {
    match difficulty {
        "easy" => "basic knowledge questions that most beginners would know",
        "medium" => "intermediate level questions requiring good understanding of the subject",
        "hard" => "advanced questions that only experts would likely know",
        _ => "moderate difficulty",
    }
}

pub fn build_system_prompt(subject: &str, difficulty: &str, count: usize) -> String {
    format!(
        r#"You are an expert quiz creator. Create {count} quiz questions about {subject}.
The questions should be {description}.

Return the response in this exact JSON format:
{{
    "questions": [
        {{
            "text": "Question text here",
            "answer": "Correct answer here"
        }}
    ]
}}

Be concise and clear in both questions and answers."#,
        count = count,
        subject = subject,
        description = difficulty_description(difficulty),
    )
}

#[derive(Clone)]
pub struct LLMService {
    provider: Arc<dyn CompletionClient>,
}

impl LLMService {
    pub fn new(provider: Arc<dyn CompletionClient>) -> Self {
        Self { provider }
    }

    pub fn new_with_provider(
        api_key: String,
        base_url: Option<String>,
        provider_type: LLMProviderType,
        model: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let provider =
            LLMProviderFactory::create_provider(provider_type, api_key, base_url, model, timeout)?;
        Ok(Self::new(Arc::new(provider)))
    }

    /// Get the provider name for logging and probe messages
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Issue the single generation call and hand back the raw reply.
    pub async fn request_questions(
        &self,
        subject: &str,
        difficulty: &str,
        count: usize,
    ) -> Result<String, ProviderError> {
        log_llm_operation!(
            start,
            "generate_questions",
            provider = self.provider_name(),
            question_count = count
        );

        let request = CompletionRequest {
            system: Some(build_system_prompt(subject, difficulty, count)),
            prompt: format!("Generate {} {} questions about {}", count, difficulty, subject),
            json_response: true,
            max_tokens: None,
        };

        let started = Instant::now();
        let result = self.provider.complete(&request).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        log_performance!("generate_questions", duration_ms = duration_ms);

        if let Err(e) = &result {
            log_llm_operation!(
                error,
                "generate_questions",
                provider = self.provider_name(),
                error = e
            );
        }

        result
    }

    /// Generate questions for a subject. Always yields usable questions: any
    /// provider or shape failure is resolved by the normalizer into sentinels.
    pub async fn generate_quiz_questions(
        &self,
        subject: &str,
        difficulty: &str,
        count: usize,
    ) -> Vec<GeneratedQuestion> {
        info!(
            subject = %subject,
            difficulty = %difficulty,
            count = count,
            "Generating quiz questions"
        );

        let raw = self.request_questions(subject, difficulty, count).await;
        let questions = question_normalizer::normalize(raw, subject, count);

        info!(
            subject = %subject,
            question_count = questions.len(),
            "Quiz questions ready"
        );
        questions
    }

    /// Validate provider credentials with a minimal completion call. The reply
    /// content is not inspected.
    pub async fn test_connection(&self) -> ConnectionStatus {
        let request = CompletionRequest {
            system: None,
            prompt: PROBE_PROMPT.to_string(),
            json_response: false,
            max_tokens: Some(PROBE_MAX_TOKENS),
        };

        match self.provider.complete(&request).await {
            Ok(_) => {
                info!(provider = self.provider_name(), "Provider connectivity check passed");
                ConnectionStatus {
                    ok: true,
                    message: format!("{} connection successful!", self.provider_name()),
                }
            }
            Err(e) => {
                warn!(provider = self.provider_name(), error = %e, "Provider connectivity check failed");
                ConnectionStatus {
                    ok: false,
                    message: format!("{} connection failed: {}", self.provider_name(), e),
                }
            }
        }
    }
}
