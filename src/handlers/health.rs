use actix_web::{web, HttpResponse, Responder};

use super::AppState;
use crate::models::HealthResponse;

/// Health check endpoint
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let response = HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        forecast_service: state.predictions.forecast_url().to_string(),
        fallback: state.predictions.policy().to_string(),
    };

    HttpResponse::Ok().json(response)
}
