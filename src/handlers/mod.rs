//! HTTP handlers, mounted under `/api` by the server

pub mod blooms;
pub mod health;
pub mod predict;

use actix_web::web;
use std::sync::Arc;

use crate::data::ObservationStore;
use crate::error::AppError;
use crate::predictor::PredictionService;

/// Application state shared across handlers
pub struct AppState {
    pub predictions: PredictionService,
    pub observations: Arc<dyn ObservationStore>,
}

/// Register routes and extractor configuration
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        tracing::debug!("Rejected prediction body: {}", err);
        AppError::missing_fields().into()
    });
    let query_config = web::QueryConfig::default().error_handler(|err, _req| {
        AppError::InvalidRequest(format!("Invalid query string: {}", err)).into()
    });

    cfg.app_data(json_config)
        .app_data(query_config)
        .route("/health", web::get().to(health::health_check))
        .route("/predict", web::post().to(predict::predict))
        .route("/blooms", web::get().to(blooms::list_blooms));
}
