use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::env;
use std::time::Duration;
use tracing::{info, warn};

use crate::llm_providers::LLMProviderType;

// Import logging macros
use crate::{log_system_event, log_validation};

/// Upper bound on questions per generated quiz.
pub const MAX_QUESTION_COUNT: u32 = 50;

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub llm: LLMConfig,
    pub quiz: QuizConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Large Language Model provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub provider: LLMProviderType,
    pub model: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizConfig {
    pub default_question_count: u32,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Logging system configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");

        let config = Config {
            database: DatabaseConfig::from_env()?,
            llm: LLMConfig::from_env()?,
            quiz: QuizConfig::from_env()?,
            server: ServerConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        };

        log_system_event!(config, "Configuration loaded successfully");
        config.log_configuration_summary();

        Ok(config)
    }

    /// Log a summary of loaded configuration (without sensitive data)
    fn log_configuration_summary(&self) {
        info!(
            database_url_masked = %mask_sensitive_data(&self.database.url),
            llm_provider = ?self.llm.provider,
            llm_model = ?self.llm.model,
            llm_api_key_masked = %mask_sensitive_data(&self.llm.api_key),
            llm_timeout_secs = self.llm.timeout_secs,
            default_question_count = self.quiz.default_question_count,
            server_address = %self.server.address(),
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.database.url.starts_with("sqlite:") {
            return Err(anyhow!("DATABASE_URL must start with 'sqlite:'"));
        }

        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        if self.llm.timeout_secs == 0 {
            return Err(anyhow!("LLM_TIMEOUT_SECS must be greater than 0"));
        }

        if self.quiz.default_question_count == 0
            || self.quiz.default_question_count > MAX_QUESTION_COUNT
        {
            return Err(anyhow!(
                "QUIZ_QUESTION_COUNT must be between 1 and {}",
                MAX_QUESTION_COUNT
            ));
        }

        if self.llm.api_key.is_empty() || self.llm.api_key == "your-api-key" {
            warn!("LLM API key appears to be placeholder or empty - quizzes will contain sample questions");
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        let url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:quiz_certify.db".to_string());

        Ok(DatabaseConfig { url })
    }
}

impl LLMConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("LLM_API_KEY")
            .or_else(|_| env::var("OPENAI_API_KEY"))
            .unwrap_or_else(|_| "your-api-key".to_string());

        let base_url = env::var("LLM_BASE_URL").ok();

        let provider_str = env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let provider = LLMProviderType::from_name(&provider_str);

        let model = env::var("LLM_MODEL").ok();

        let timeout_str = env::var("LLM_TIMEOUT_SECS").unwrap_or_else(|_| "30".to_string());
        let timeout_secs = timeout_str.parse::<u64>().map_err(|_| {
            anyhow!("Invalid LLM_TIMEOUT_SECS value: '{}'. Must be a whole number of seconds", timeout_str)
        })?;

        Ok(LLMConfig {
            api_key,
            base_url,
            provider,
            model,
            timeout_secs,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl QuizConfig {
    pub fn from_env() -> Result<Self> {
        let count_str = env::var("QUIZ_QUESTION_COUNT").unwrap_or_else(|_| "10".to_string());
        let default_question_count = count_str
            .parse::<u32>()
            .map_err(|_| anyhow!("Invalid QUIZ_QUESTION_COUNT value: '{}'", count_str))?;

        Ok(QuizConfig { default_question_count })
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self { default_question_count: 10 }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "3000".to_string());

        let port = port_str
            .parse::<u16>()
            .map_err(|_| anyhow!("Invalid PORT value: '{}'. Must be a number between 1-65535", port_str))?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(ServerConfig { port, host })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self> {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info,quiz_certify=debug".to_string());

        let file_enabled = env::var("LOG_FILE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let console_enabled = env::var("LOG_CONSOLE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let log_directory = env::var("LOG_DIRECTORY").unwrap_or_else(|_| "logs".to_string());

        Ok(LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        })
    }
}

/// Mask sensitive data in configuration for safe logging
fn mask_sensitive_data(data: &str) -> String {
    let chars: Vec<char> = data.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}***{}", head, tail)
    }
}
