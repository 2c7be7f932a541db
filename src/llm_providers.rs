use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Failure talking to the completion provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("authentication rejected ({status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("API request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("provider returned no content")]
    EmptyResponse,
}

impl ProviderError {
    fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Authentication {
                status: status.as_u16(),
                message,
            },
            _ => ProviderError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// A single completion call against a provider.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub json_response: bool,
    pub max_tokens: Option<u32>,
}

/// Seam between the quiz pipeline and whichever provider answers it.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;

    fn provider_name(&self) -> &'static str;

    fn model_name(&self) -> &str;
}

/// Common message structure for LLM requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMMessage {
    pub role: String,
    pub content: String,
}

/// Enum-based LLM provider implementation
#[derive(Debug, Clone)]
pub enum LLMProvider {
    OpenAI(OpenAIProvider),
    Gemini(GeminiProvider),
}

#[async_trait]
impl CompletionClient for LLMProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        match self {
            LLMProvider::OpenAI(provider) => provider.make_request(request).await,
            LLMProvider::Gemini(provider) => provider.make_request(request).await,
        }
    }

    fn provider_name(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI(provider) => provider.provider_name(),
            LLMProvider::Gemini(provider) => provider.provider_name(),
        }
    }

    fn model_name(&self) -> &str {
        match self {
            LLMProvider::OpenAI(provider) => provider.model_name(),
            LLMProvider::Gemini(provider) => provider.model_name(),
        }
    }
}

/// OpenAI-compatible chat completions provider
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<LLMMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

impl OpenAIProvider {
    pub fn new(client: Client, api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
        }
    }

    pub async fn make_request(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let mut messages = Vec::new();

        if let Some(sys_msg) = &request.system {
            messages.push(LLMMessage {
                role: "system".to_string(),
                content: sys_msg.clone(),
            });
        }

        messages.push(LLMMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        let request_body = OpenAIRequest {
            model: self.model.clone(),
            messages,
            response_format: request
                .json_response
                .then_some(ResponseFormat { kind: "json_object" }),
            max_tokens: request.max_tokens,
        };

        info!(
            provider = self.provider_name(),
            model = %self.model,
            base_url = %self.base_url,
            prompt_length = request.prompt.len(),
            json_response = request.json_response,
            "Making LLM request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                provider = self.provider_name(),
                status = %status,
                error = %error_text,
                "LLM API request failed"
            );
            return Err(ProviderError::from_status(status, error_text));
        }

        let openai_response: OpenAIResponse = response.json().await?;

        let response_content = openai_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ProviderError::EmptyResponse)?;

        info!(
            provider = self.provider_name(),
            response_length = response_content.len(),
            "Successfully received LLM response"
        );

        Ok(response_content)
    }

    pub fn provider_name(&self) -> &'static str {
        "OpenAI"
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }
}

/// Gemini provider implementation
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "topK")]
    top_k: i32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

impl GeminiProvider {
    pub fn new(client: Client, api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            model: model.unwrap_or_else(|| "gemini-2.0-flash-exp".to_string()),
        }
    }

    pub async fn make_request(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let full_prompt = match &request.system {
            Some(sys_msg) => format!("{}\n\n{}", sys_msg, request.prompt),
            None => request.prompt.clone(),
        };

        let request_body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: full_prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: 0.7,
                top_k: 40,
                top_p: 0.9,
                max_output_tokens: request.max_tokens.unwrap_or(2048),
                response_mime_type: request
                    .json_response
                    .then(|| "application/json".to_string()),
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        info!(
            provider = self.provider_name(),
            model = %self.model,
            base_url = %self.base_url,
            prompt_length = request.prompt.len(),
            json_response = request.json_response,
            "Making LLM request"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                provider = self.provider_name(),
                status = %status,
                error = %error_text,
                "LLM API request failed"
            );
            return Err(ProviderError::from_status(status, error_text));
        }

        let gemini_response: GeminiResponse = response.json().await?;

        let response_content = gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or(ProviderError::EmptyResponse)?;

        info!(
            provider = self.provider_name(),
            response_length = response_content.len(),
            "Successfully received LLM response"
        );

        Ok(response_content)
    }

    pub fn provider_name(&self) -> &'static str {
        "Gemini"
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }
}

/// Centralized JSON extraction for replies wrapped in markdown
#[derive(Clone)]
pub struct JsonResponseParser;

impl JsonResponseParser {
    /// Strip markdown code fences around a JSON payload; anything else is returned trimmed
    pub fn extract_json_from_response(content: &str) -> String {
        if let Some(start) = content.find("```json") {
            if let Some(end) = content[start + 7..].find("```") {
                let json_start = start + 7;
                let json_end = json_start + end;
                return content[json_start..json_end].trim().to_string();
            }
        }

        if let Some(start) = content.find("```") {
            if let Some(end) = content[start + 3..].find("```") {
                let json_start = start + 3;
                let json_end = json_start + end;
                let potential_json = content[json_start..json_end].trim();
                if potential_json.starts_with('{') || potential_json.starts_with('[') {
                    return potential_json.to_string();
                }
            }
        }

        content.trim().to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LLMProviderType {
    OpenAI,
    Gemini,
}

impl LLMProviderType {
    /// Parse a provider name, falling back to OpenAI for anything unrecognised
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "gemini" | "google" => LLMProviderType::Gemini,
            "openai" | "chatgpt" | "gpt" => LLMProviderType::OpenAI,
            _ => {
                info!("Unknown LLM provider '{}', defaulting to OpenAI", name);
                LLMProviderType::OpenAI
            }
        }
    }
}

/// Factory for creating LLM providers based on provider type
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create a provider whose HTTP client enforces the given request timeout
    pub fn create_provider(
        provider_type: LLMProviderType,
        api_key: String,
        base_url: Option<String>,
        model: Option<String>,
        timeout: Duration,
    ) -> Result<LLMProvider, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(match provider_type {
            LLMProviderType::OpenAI => {
                LLMProvider::OpenAI(OpenAIProvider::new(client, api_key, base_url, model))
            }
            LLMProviderType::Gemini => {
                LLMProvider::Gemini(GeminiProvider::new(client, api_key, base_url, model))
            }
        })
    }
}
