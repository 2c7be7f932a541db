//! Check that the configured completion provider accepts our credentials.
//!
//! Exits with status 1 when the provider call fails.

use anyhow::Result;
use std::process::ExitCode;

use quiz_certify::{LLMService, config::LLMConfig};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = LLMConfig::from_env()?;
    let llm_service = LLMService::new_with_provider(
        config.api_key.clone(),
        config.base_url.clone(),
        config.provider,
        config.model.clone(),
        config.timeout(),
    )?;

    println!(
        "Testing {} connection (model: {})...",
        llm_service.provider_name(),
        llm_service.model_name()
    );

    let status = llm_service.test_connection().await;
    if status.ok {
        println!("✅ {}", status.message);
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("❌ {}", status.message);
        Ok(ExitCode::FAILURE)
    }
}
