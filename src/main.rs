use anyhow::Result;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;

use quiz_certify::{
    Config, Database, LLMService, QuizService,
    api::{AppState, create_router},
    config::LoggingConfig,
    log_system_event,
    logging::init_tracing,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let _guard = init_tracing(&LoggingConfig::from_env()?)?;

    let config = Config::from_env()?;
    config.validate()?;

    log_system_event!(startup, component = "server", "Starting quiz service");

    // Initialize database
    let db = Database::new(&config.database.url).await?;
    info!("Database initialized successfully");

    let llm_service = LLMService::new_with_provider(
        config.llm.api_key.clone(),
        config.llm.base_url.clone(),
        config.llm.provider,
        config.llm.model.clone(),
        config.llm.timeout(),
    )?;
    info!(
        provider = llm_service.provider_name(),
        model = llm_service.model_name(),
        "Initialized LLM service"
    );

    let state = AppState {
        quiz_service: QuizService::new(db, llm_service),
        quiz_config: config.quiz.clone(),
    };

    let app = Router::new()
        .merge(create_router(state))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    let addr = config.server.address();
    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
