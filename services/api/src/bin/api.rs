//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        DocxExporter, InMemorySessionStore, OpenAiGenerationAdapter, PdfTextExtractor,
        YamlCredentialStore,
    },
    config::{AuthConfig, Config},
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Load Credentials ---
    info!(
        "Loading credentials from {}",
        config.auth_config_path.display()
    );
    let auth_config = AuthConfig::load(&config.auth_config_path)?;
    info!(
        "{} user(s) configured, sessions last {} day(s)",
        auth_config.credentials.usernames.len(),
        auth_config.cookie.expiry_days
    );
    let credentials = Arc::new(YamlCredentialStore::from_config(&auth_config));

    // --- 3. Initialize Service Adapters ---
    let generator = Arc::new(OpenAiGenerationAdapter::from_api_key(
        &config.openai_api_key,
        config.openai_api_base.as_deref(),
        config.generation_model.clone(),
    ));
    info!("Using generation model '{}'", config.generation_model);

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        cookie: auth_config.cookie,
        credentials,
        sessions: Arc::new(InMemorySessionStore::new()),
        generator,
        exporter: Arc::new(DocxExporter::new()),
        extractor: Arc::new(PdfTextExtractor::new()),
    });

    // --- 5. Create the Web Router ---
    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::CorsOrigin {
            origin: config.cors_origin.clone(),
            reason: e.to_string(),
        })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(web::router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
