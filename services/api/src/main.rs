use std::sync::Arc;

use axum::{
    http::{Method, StatusCode},
    response::Json,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use motusdao_api::chain::AssignmentRegistry;
use motusdao_api::config::AppConfig;
use motusdao_api::routes;
use motusdao_api::state::AppState;
use motusdao_common::ApiResponse;
use motusdao_database::{create_pool, run_migrations};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "motusdao_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    // Create database connection pool
    let db_pool = create_pool(&config.database).await?;

    // Run migrations
    run_migrations(&db_pool).await?;

    // The contract mirror is best-effort: a misconfigured chain never
    // keeps the off-chain API from starting.
    let registry = if config.chain.enabled {
        match AssignmentRegistry::from_config(&config.chain) {
            Ok(registry) => {
                tracing::info!(
                    "Assignments contract mirror enabled ({})",
                    config.chain.contract_address
                );
                Some(Arc::new(registry))
            }
            Err(err) => {
                tracing::warn!("Assignments contract mirror disabled: {}", err);
                None
            }
        }
    } else {
        None
    };

    // Build application state
    let app_state = AppState {
        db_pool,
        registry,
        config: config.clone(),
    };

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any)
        .allow_origin(Any);

    // Build the application
    let app = routes::create_routes()
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(app_state)
        .fallback(handler_404);

    // Start the server
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))
            .await?;

    tracing::info!(
        "MotusDAO platform API listening on {}:{}",
        config.server.host,
        config.server.port
    );

    axum::serve(listener, app).await?;

    Ok(())
}

async fn handler_404() -> (StatusCode, Json<ApiResponse<()>>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::error("Endpoint not found".to_string())),
    )
}
