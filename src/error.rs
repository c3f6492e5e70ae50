use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::data::StoreError;
use crate::models::ErrorResponse;
use crate::predictor::{PredictError, MISSING_FIELDS_MESSAGE};

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed request data
    #[error("{0}")]
    InvalidRequest(String),
    /// Forecasting service failed and no fallback was attempted
    #[error("Prediction failed: {0}")]
    PredictionFailed(String),
    /// Observation store failure
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl AppError {
    pub fn missing_fields() -> Self {
        AppError::InvalidRequest(MISSING_FIELDS_MESSAGE.to_string())
    }
}

impl From<PredictError> for AppError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::InvalidRequest => AppError::missing_fields(),
            PredictError::ExternalUnavailable(e) => AppError::PredictionFailed(e.to_string()),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PredictionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::InvalidRequest(msg) => ErrorResponse {
                error: msg.clone(),
                details: None,
            },
            AppError::PredictionFailed(details) => ErrorResponse {
                error: "Prediction failed".to_string(),
                details: Some(details.clone()),
            },
            AppError::Storage(e) => ErrorResponse {
                error: "Failed to read observations".to_string(),
                details: Some(e.to_string()),
            },
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}
