//! HTTP client for the external NDVI forecasting service

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::{AppConfig, DEFAULT_FORECAST_URL, DEFAULT_TIMEOUT_MS};
use crate::models::ValidPredictRequest;

/// Forecasting service errors
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Forecast request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Forecast request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Forecast service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Forecast service returned a non-JSON body: {0}")]
    InvalidBody(serde_json::Error),
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    /// Base URL, e.g. `http://localhost:8000`
    pub base_url: String,
    /// Whole-request timeout
    pub timeout: Duration,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FORECAST_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl From<&AppConfig> for ForecastConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.forecast_url.clone(),
            timeout: config.timeout,
        }
    }
}

/// Successful forecast response
///
/// `raw` is the body bytes exactly as received; `value` is its parsed form.
#[derive(Debug, Clone)]
pub struct ForecastResponse {
    pub raw: Vec<u8>,
    pub value: Value,
}

/// Forecasting service client
///
/// One attempt per call, no retries.
#[derive(Debug, Clone)]
pub struct ForecastClient {
    client: reqwest::Client,
    config: ForecastConfig,
}

impl ForecastClient {
    pub fn new(config: ForecastConfig) -> Result<Self, ForecastError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("bloomwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn predict_url(&self) -> String {
        format!("{}/predict", self.config.base_url.trim_end_matches('/'))
    }

    /// POST `{city, date}` to `{base_url}/predict`
    pub async fn predict(
        &self,
        request: &ValidPredictRequest,
    ) -> Result<ForecastResponse, ForecastError> {
        let url = self.predict_url();
        tracing::debug!("Forwarding prediction request to {}", url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let raw = response.bytes().await.map_err(|e| self.classify(e))?.to_vec();

        if !status.is_success() {
            return Err(ForecastError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&raw).into_owned(),
            });
        }

        let value = serde_json::from_slice(&raw).map_err(ForecastError::InvalidBody)?;
        Ok(ForecastResponse { raw, value })
    }

    fn classify(&self, err: reqwest::Error) -> ForecastError {
        if err.is_timeout() {
            ForecastError::Timeout(self.config.timeout)
        } else {
            ForecastError::RequestFailed(err)
        }
    }
}
