use anyhow::Result;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quiz_generator::{
    api::{create_router, AppState},
    config::{Config, LoggingConfig},
    database::Database,
    generation_service::QuizGenerationService,
    llm_service::LLMService,
    seeder::StartupSeeder,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Logging first so configuration events reach the subscriber
    let _guard = setup_logging(&LoggingConfig::from_env()?)?;

    let config = Config::from_env()?;
    config.validate()?;

    info!("Starting quiz generator server...");

    let db = Arc::new(Database::new(&config.database.url).await?);
    info!("Database initialized successfully");

    let llm_service = LLMService::new_with_provider(
        config.llm.api_key.clone(),
        config.llm.base_url.clone(),
        config.llm.provider,
        config.llm.model.clone(),
    );
    info!("Initialized LLM service with provider: {}", llm_service.provider_name());

    let generation_service = QuizGenerationService::new(Arc::new(llm_service), db.clone(), db.clone())
        .with_max_concurrent_generations(config.generation.max_concurrent);

    if config.seeding.enabled {
        // Seeding runs in the background; startup does not wait for it
        let _seeding = StartupSeeder::from_config(generation_service.clone(), &config.seeding)
            .on_ready()
            .await;
    }

    let state = AppState {
        generation_service,
        users: db,
    };

    let app = create_router(state).layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn setup_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use std::fs;
    use tracing_subscriber::fmt;

    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    // Configure console output
    let console_layer = config.console_enabled.then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
    });

    // Configure file output (no ANSI colors for files) with daily rotation
    let mut guard = None;
    let file_layer = if config.file_enabled {
        fs::create_dir_all(&config.log_directory).unwrap_or_else(|e| {
            eprintln!("Warning: Could not create logs directory: {}", e);
        });
        let file_appender = tracing_appender::rolling::daily(&config.log_directory, "quiz-generator.log");
        let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);

        Some(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(non_blocking_file),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!(
        log_directory = %config.log_directory,
        file_enabled = config.file_enabled,
        "Logging initialized"
    );

    Ok(guard)
}
