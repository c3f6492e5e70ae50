use serde::{Deserialize, Serialize};

/// Interpretation label for fixture-backed predictions
pub const MOCK_INTERPRETATION: &str = "Mock";
/// Interpretation label for the synthetic terminal fallback
pub const SYNTHETIC_INTERPRETATION: &str = "Fallback mock: moderate vegetation";
/// NDVI value used by the synthetic terminal fallback
pub const SYNTHETIC_NDVI: f64 = 0.5;

/// Prediction request body
///
/// Both fields are optional at the wire level so that a missing field can be
/// reported with the API's own error shape instead of a deserializer message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl PredictRequest {
    pub fn new(city: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            city: Some(city.into()),
            date: Some(date.into()),
        }
    }
}

/// Request that passed validation: both fields present and non-blank
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidPredictRequest {
    pub city: String,
    pub date: String,
}

/// NDVI prediction for a city on a date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub date: String,
    pub predicted_ndvi: f64,
    pub interpretation: String,
    pub anomaly: bool,
}

impl PredictionResult {
    /// Result built from a precomputed fixture point
    pub fn from_forecast_point(city: &str, point: &ForecastPoint) -> Self {
        Self {
            city: city.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            date: point.ds.clone(),
            predicted_ndvi: point.yhat,
            interpretation: MOCK_INTERPRETATION.to_string(),
            anomaly: false,
        }
    }

    /// Neutral result used when no fixture data is usable
    pub fn synthetic(request: &ValidPredictRequest) -> Self {
        Self {
            city: request.city.clone(),
            latitude: 0.0,
            longitude: 0.0,
            date: request.date.clone(),
            predicted_ndvi: SYNTHETIC_NDVI,
            interpretation: SYNTHETIC_INTERPRETATION.to_string(),
            anomaly: false,
        }
    }
}

/// One point of a precomputed forecast curve (`ds` = date, `yhat` = value)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub ds: String,
    pub yhat: f64,
}

/// Vegetation status derived from an NDVI value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VegetationStatus {
    Healthy,
    Moderate,
    Stressed,
}

impl VegetationStatus {
    pub fn from_ndvi(ndvi: f64) -> Self {
        if ndvi >= 0.6 {
            VegetationStatus::Healthy
        } else if ndvi >= 0.4 {
            VegetationStatus::Moderate
        } else {
            VegetationStatus::Stressed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VegetationStatus::Healthy => "healthy",
            VegetationStatus::Moderate => "moderate",
            VegetationStatus::Stressed => "stressed",
        }
    }
}

/// Archived NDVI observation, as listed by the blooms endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub county: String,
    pub date: String,
    pub ndvi: f64,
    pub lat: f64,
    pub lon: f64,
    pub anomaly: bool,
    pub status: VegetationStatus,
}

impl Observation {
    /// Denormalize an external prediction body into an observation
    ///
    /// Returns None if the body has no `date` or `predicted_ndvi`.
    pub fn from_prediction_body(
        request: &ValidPredictRequest,
        body: &serde_json::Value,
    ) -> Option<Self> {
        let ndvi = body.get("predicted_ndvi")?.as_f64()?;
        let date = body.get("date")?.as_str()?.to_string();
        let county = body
            .get("city")
            .and_then(|v| v.as_str())
            .unwrap_or(request.city.as_str())
            .to_string();
        let coord = |key: &str| body.get(key).and_then(|v| v.as_f64()).unwrap_or(0.0);

        Some(Self {
            county,
            date,
            ndvi,
            lat: coord("latitude"),
            lon: coord("longitude"),
            anomaly: body
                .get("anomaly")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            status: VegetationStatus::from_ndvi(ndvi),
        })
    }

    /// Calendar year of the observation date, if it starts with one
    pub fn year(&self) -> Option<i32> {
        self.date.get(..4)?.parse().ok()
    }
}

/// Filter for the observation listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservationFilter {
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
}

impl ObservationFilter {
    pub fn matches(&self, obs: &Observation) -> bool {
        if let Some(ref county) = self.county {
            if !obs.county.eq_ignore_ascii_case(county) {
                return false;
            }
        }
        if let Some(year) = self.year {
            if obs.year() != Some(year) {
                return false;
            }
        }
        true
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub version: String,
    pub forecast_service: String,
    pub fallback: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
