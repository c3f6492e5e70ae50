use actix_web::{http::header::ContentType, web, HttpResponse};
use tracing::info;

use super::AppState;
use crate::error::AppError;
use crate::models::PredictRequest;
use crate::predictor::Prediction;

/// Predict NDVI for a city on a date
///
/// Forecasts from the external service are returned byte for byte; anything
/// else is a fallback built from fixtures.
pub async fn predict(
    state: web::Data<AppState>,
    req: web::Json<PredictRequest>,
) -> Result<HttpResponse, AppError> {
    let prediction = state.predictions.predict(&req).await?;

    if prediction.is_fallback() {
        info!("Answering with {}", prediction.source());
    }

    Ok(match prediction {
        Prediction::Forwarded(response) => HttpResponse::Ok()
            .content_type(ContentType::json())
            .body(response.raw),
        other => HttpResponse::Ok().json(other.to_json()),
    })
}
