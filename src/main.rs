use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bloomwatch::handlers::{self, AppState};
use bloomwatch::{AppConfig, JsonlObservationStore, ObservationStore, PredictionService};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;
    let addr = config.bind_addr();

    let observations: Arc<dyn ObservationStore> =
        Arc::new(JsonlObservationStore::new(&config.observations_path));
    let predictions = PredictionService::from_config(&config, observations.clone())
        .context("Failed to build forecast client")?;

    info!(
        "Forecast service: {} (timeout {:?}, fallback {})",
        config.forecast_url, config.timeout, config.fallback
    );
    info!("Fixtures: {}", config.fixture_path.display());
    info!("Observations: {}", config.observations_path.display());

    let state = web::Data::new(AppState {
        predictions,
        observations,
    });
    let frontend_url = config.frontend_url.clone();

    info!("Starting Bloomwatch API server at http://{}", addr);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT]);
        let cors = if frontend_url == "*" {
            cors.allow_any_origin()
        } else {
            cors.allowed_origin(&frontend_url)
        };

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .service(web::scope("/api").configure(handlers::configure))
    })
    .bind(&addr)
    .with_context(|| format!("Failed to bind {}", addr))?
    .run()
    .await
    .context("Server error")
}
