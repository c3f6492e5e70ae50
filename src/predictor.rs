use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{AppConfig, DateMatch, FallbackPolicy};
use crate::data::{FixtureEntry, FixtureError, FixtureSource, FixtureStore, ObservationStore};
use crate::forecast::{ForecastClient, ForecastError, ForecastResponse};
use crate::models::{
    ForecastPoint, Observation, PredictRequest, PredictionResult, ValidPredictRequest,
};

/// Message returned when `city` or `date` is missing
pub const MISSING_FIELDS_MESSAGE: &str = "city and date are required in request body";

/// Prediction errors
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("city and date are required in request body")]
    InvalidRequest,

    #[error("Prediction failed: {0}")]
    ExternalUnavailable(#[from] ForecastError),
}

/// Check that both fields are present and non-blank
///
/// Values are passed on exactly as sent; trimming only decides blankness.
pub fn validate_request(request: &PredictRequest) -> Result<ValidPredictRequest, PredictError> {
    let present = |field: &Option<String>| {
        field
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    };

    match (present(&request.city), present(&request.date)) {
        (Some(city), Some(date)) => Ok(ValidPredictRequest { city, date }),
        _ => Err(PredictError::InvalidRequest),
    }
}

/// How a fixture point was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointSelection {
    ExactDate,
    First,
    Nearest,
}

/// Outcome of a prediction request
#[derive(Debug, Clone)]
pub enum Prediction {
    /// Body from the forecasting service, unmodified
    Forwarded(ForecastResponse),
    /// Point picked from a fixture forecast series
    FixturePoint {
        result: PredictionResult,
        selection: PointSelection,
    },
    /// Fixture object returned as stored
    FixtureRecord(Map<String, Value>),
    /// Neutral default when no fixture data is usable
    Synthetic(PredictionResult),
}

impl Prediction {
    pub fn is_fallback(&self) -> bool {
        !matches!(self, Prediction::Forwarded(_))
    }

    /// Short label naming where the prediction came from
    pub fn source(&self) -> &'static str {
        match self {
            Prediction::Forwarded(_) => "forecast service",
            Prediction::FixturePoint {
                selection: PointSelection::ExactDate,
                ..
            } => "fixture (exact date)",
            Prediction::FixturePoint {
                selection: PointSelection::First,
                ..
            } => "fixture (first point)",
            Prediction::FixturePoint {
                selection: PointSelection::Nearest,
                ..
            } => "fixture (nearest date)",
            Prediction::FixtureRecord(_) => "fixture (record)",
            Prediction::Synthetic(_) => "synthetic default",
        }
    }

    /// JSON form of the response body
    pub fn to_json(&self) -> Value {
        match self {
            Prediction::Forwarded(response) => response.value.clone(),
            Prediction::FixturePoint { result, .. } | Prediction::Synthetic(result) => {
                serde_json::to_value(result).unwrap_or(Value::Null)
            }
            Prediction::FixtureRecord(map) => Value::Object(map.clone()),
        }
    }
}

/// Resolves a prediction from fixtures when the forecasting service fails
///
/// Never fails: anything unusable ends in the synthetic default.
#[derive(Clone)]
pub struct FallbackResolver {
    fixtures: Arc<dyn FixtureSource>,
    date_match: DateMatch,
}

impl FallbackResolver {
    pub fn new<S: FixtureSource + 'static>(fixtures: S, date_match: DateMatch) -> Self {
        Self {
            fixtures: Arc::new(fixtures),
            date_match,
        }
    }

    pub fn fixtures(&self) -> &dyn FixtureSource {
        self.fixtures.as_ref()
    }

    pub fn resolve(&self, request: &ValidPredictRequest) -> Prediction {
        let table = match self.fixtures.load() {
            Ok(table) => table,
            Err(FixtureError::NotFound(path)) => {
                warn!("No fixture file at {}, using synthetic default", path.display());
                return Prediction::Synthetic(PredictionResult::synthetic(request));
            }
            Err(e) => {
                error!("Failed to load fixtures: {}", e);
                return Prediction::Synthetic(PredictionResult::synthetic(request));
            }
        };

        match table.resolve(&request.city) {
            Some(FixtureEntry::Series(points)) => {
                match self.select_point(&points, &request.date) {
                    Some((point, selection)) => Prediction::FixturePoint {
                        result: PredictionResult::from_forecast_point(&request.city, point),
                        selection,
                    },
                    None => {
                        warn!("Fixture series for {} is empty", request.city);
                        Prediction::Synthetic(PredictionResult::synthetic(request))
                    }
                }
            }
            Some(FixtureEntry::Record(record)) => Prediction::FixtureRecord(record),
            None => Prediction::Synthetic(PredictionResult::synthetic(request)),
        }
    }

    /// Exact `ds` match first, then the configured miss strategy
    pub fn select_point<'a>(
        &self,
        points: &'a [ForecastPoint],
        date: &str,
    ) -> Option<(&'a ForecastPoint, PointSelection)> {
        if let Some(exact) = points.iter().find(|p| p.ds == date) {
            return Some((exact, PointSelection::ExactDate));
        }

        if self.date_match == DateMatch::Nearest {
            if let Some(nearest) = nearest_point(points, date) {
                return Some((nearest, PointSelection::Nearest));
            }
        }

        points.first().map(|p| (p, PointSelection::First))
    }
}

fn parse_day(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok()
}

/// Point with the smallest day distance to `date`; earlier points win ties
fn nearest_point<'a>(points: &'a [ForecastPoint], date: &str) -> Option<&'a ForecastPoint> {
    let target = parse_day(date)?;
    let mut best: Option<(i64, &ForecastPoint)> = None;

    for point in points {
        let Some(day) = parse_day(&point.ds) else {
            continue;
        };
        let distance = (day - target).num_days().abs();
        if best.map_or(true, |(d, _)| distance < d) {
            best = Some((distance, point));
        }
    }

    best.map(|(_, p)| p)
}

/// Prediction request path: forward, archive, fall back
pub struct PredictionService {
    client: ForecastClient,
    resolver: FallbackResolver,
    store: Arc<dyn ObservationStore>,
    policy: FallbackPolicy,
}

impl PredictionService {
    pub fn new(
        client: ForecastClient,
        resolver: FallbackResolver,
        store: Arc<dyn ObservationStore>,
        policy: FallbackPolicy,
    ) -> Self {
        Self {
            client,
            resolver,
            store,
            policy,
        }
    }

    /// Build every collaborator from configuration
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn ObservationStore>,
    ) -> Result<Self, ForecastError> {
        let client = ForecastClient::new(config.into())?;
        let resolver = FallbackResolver::new(
            FixtureStore::new(&config.fixture_path),
            config.date_match,
        );
        Ok(Self::new(client, resolver, store, config.fallback))
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    pub fn forecast_url(&self) -> &str {
        self.client.base_url()
    }

    pub fn resolver(&self) -> &FallbackResolver {
        &self.resolver
    }

    pub async fn predict(&self, request: &PredictRequest) -> Result<Prediction, PredictError> {
        let request = validate_request(request)?;

        match self.client.predict(&request).await {
            Ok(response) => {
                info!("Forecast received for {} on {}", request.city, request.date);
                self.archive(&request, &response).await;
                Ok(Prediction::Forwarded(response))
            }
            Err(e) if self.policy == FallbackPolicy::Enabled => {
                warn!(
                    "Forecast service not reachable or returned error. Falling back to mock. Err: {}",
                    e
                );
                Ok(self.resolve_blocking(request).await)
            }
            Err(e) => {
                error!("Forecast service failed and fallback is disabled: {}", e);
                Err(PredictError::ExternalUnavailable(e))
            }
        }
    }

    /// Skip the forecasting service and answer from fixtures
    pub fn predict_offline(&self, request: &PredictRequest) -> Result<Prediction, PredictError> {
        let request = validate_request(request)?;
        Ok(self.resolver.resolve(&request))
    }

    /// Fixture lookup on the blocking thread pool
    async fn resolve_blocking(&self, request: ValidPredictRequest) -> Prediction {
        let resolver = self.resolver.clone();
        let synthetic = PredictionResult::synthetic(&request);

        match tokio::task::spawn_blocking(move || resolver.resolve(&request)).await {
            Ok(prediction) => prediction,
            Err(e) => {
                error!("Fixture resolution task failed: {}", e);
                Prediction::Synthetic(synthetic)
            }
        }
    }

    /// Store a denormalized copy of a forecast; failures are only logged
    async fn archive(&self, request: &ValidPredictRequest, response: &ForecastResponse) {
        let Some(observation) = Observation::from_prediction_body(request, &response.value) else {
            warn!(
                "Forecast for {} has no date or predicted_ndvi, not archiving",
                request.city
            );
            return;
        };

        let store = Arc::clone(&self.store);
        match tokio::task::spawn_blocking(move || store.insert(&observation)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to archive observation for {}: {}", request.city, e),
            Err(e) => warn!("Archive task for {} failed: {}", request.city, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryObservationStore;
    use crate::forecast::ForecastConfig;
    use crate::models::{MOCK_INTERPRETATION, SYNTHETIC_INTERPRETATION};
    use std::io::Write;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    const FIXTURES: &str = r#"{
        "Kisumu": [
            { "ds": "2024-05-01", "yhat": 0.41 },
            { "ds": "2024-07-01", "yhat": 0.52 }
        ],
        "Nakuru": {
            "city": "Nakuru",
            "latitude": -0.3031,
            "longitude": 36.08,
            "date": "2024-03-01",
            "predicted_ndvi": 0.58,
            "interpretation": "Moderate vegetation",
            "anomaly": false
        },
        "Turkana": []
    }"#;

    fn fixture_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn resolver(path: &Path, date_match: DateMatch) -> FallbackResolver {
        FallbackResolver::new(FixtureStore::new(path), date_match)
    }

    fn request(city: &str, date: &str) -> ValidPredictRequest {
        ValidPredictRequest {
            city: city.to_string(),
            date: date.to_string(),
        }
    }

    fn points(pairs: &[(&str, f64)]) -> Vec<ForecastPoint> {
        pairs
            .iter()
            .map(|(ds, yhat)| ForecastPoint {
                ds: ds.to_string(),
                yhat: *yhat,
            })
            .collect()
    }

    #[test]
    fn test_validate_request() {
        assert!(validate_request(&PredictRequest::new("Kisumu", "2024-06-01")).is_ok());
        assert!(matches!(
            validate_request(&PredictRequest::default()),
            Err(PredictError::InvalidRequest)
        ));
        assert!(validate_request(&PredictRequest::new("", "2024-06-01")).is_err());
        assert!(validate_request(&PredictRequest::new("Kisumu", "   ")).is_err());

        let valid = validate_request(&PredictRequest::new(" Kisumu ", "2024-06-01")).unwrap();
        assert_eq!(valid.city, " Kisumu ");
        assert_eq!(valid.date, "2024-06-01");
    }

    #[test]
    fn test_invalid_request_message() {
        assert_eq!(PredictError::InvalidRequest.to_string(), MISSING_FIELDS_MESSAGE);
    }

    #[test]
    fn test_resolve_exact_date() {
        let file = fixture_file(FIXTURES);
        let prediction = resolver(file.path(), DateMatch::First)
            .resolve(&request("Kisumu", "2024-07-01"));

        match prediction {
            Prediction::FixturePoint { result, selection } => {
                assert_eq!(selection, PointSelection::ExactDate);
                assert_eq!(result.date, "2024-07-01");
                assert_eq!(result.predicted_ndvi, 0.52);
                assert_eq!(result.interpretation, MOCK_INTERPRETATION);
                assert_eq!(result.city, "Kisumu");
                assert!(!result.anomaly);
            }
            other => panic!("unexpected prediction: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_miss_takes_first_point() {
        let file = fixture_file(FIXTURES);
        let prediction = resolver(file.path(), DateMatch::First)
            .resolve(&request("Kisumu", "2024-06-01"));

        match prediction {
            Prediction::FixturePoint { result, selection } => {
                assert_eq!(selection, PointSelection::First);
                assert_eq!(result.date, "2024-05-01");
                assert_eq!(result.predicted_ndvi, 0.41);
                assert_eq!(result.interpretation, MOCK_INTERPRETATION);
            }
            other => panic!("unexpected prediction: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_exact_date_with_malformed_neighbours() {
        let file = fixture_file(
            r#"{ "Kisumu": [
                { "ds": "2024-05-01", "yhat": 0.41 },
                { "ds": "2024-07-01", "yhat": null },
                { "yhat": 0.7 }
            ] }"#,
        );
        let resolver = resolver(file.path(), DateMatch::First);

        match resolver.resolve(&request("Kisumu", "2024-05-01")) {
            Prediction::FixturePoint { result, selection } => {
                assert_eq!(selection, PointSelection::ExactDate);
                assert_eq!(result.date, "2024-05-01");
                assert_eq!(result.predicted_ndvi, 0.41);
                assert_eq!(result.interpretation, MOCK_INTERPRETATION);
            }
            other => panic!("unexpected prediction: {:?}", other),
        }

        let miss = resolver.resolve(&request("Kisumu", "2024-07-01"));
        assert_eq!(miss.source(), "fixture (first point)");
        assert_eq!(miss.to_json()["predicted_ndvi"], 0.41);
    }

    #[test]
    fn test_resolve_synthetic_when_no_point_is_usable() {
        let file = fixture_file(r#"{ "Kisumu": [{ "ds": "2024-05-01" }, { "yhat": 0.3 }] }"#);
        let prediction = resolver(file.path(), DateMatch::First)
            .resolve(&request("Kisumu", "2024-05-01"));
        assert!(matches!(prediction, Prediction::Synthetic(_)));
    }

    #[test]
    fn test_resolve_miss_first_point_is_not_nearest() {
        let file = fixture_file(FIXTURES);
        let prediction = resolver(file.path(), DateMatch::First)
            .resolve(&request("Kisumu", "2024-06-30"));
        assert_eq!(prediction.to_json()["date"], "2024-05-01");
    }

    #[test]
    fn test_resolve_record_as_is() {
        let file = fixture_file(FIXTURES);
        let prediction = resolver(file.path(), DateMatch::First)
            .resolve(&request("Nakuru", "2030-01-01"));

        assert!(matches!(prediction, Prediction::FixtureRecord(_)));
        let json = prediction.to_json();
        assert_eq!(json["date"], "2024-03-01");
        assert_eq!(json["interpretation"], "Moderate vegetation");
    }

    #[test]
    fn test_resolve_uses_default_entry() {
        let file = fixture_file(r#"{ "default": [{ "ds": "2024-01-01", "yhat": 0.33 }] }"#);
        let prediction = resolver(file.path(), DateMatch::First)
            .resolve(&request("Mombasa", "2024-06-01"));

        let json = prediction.to_json();
        assert_eq!(json["city"], "Mombasa");
        assert_eq!(json["predicted_ndvi"], 0.33);
        assert_eq!(json["interpretation"], MOCK_INTERPRETATION);
    }

    #[test]
    fn test_resolve_synthetic_when_no_entry() {
        let file = fixture_file(FIXTURES);
        let prediction = resolver(file.path(), DateMatch::First)
            .resolve(&request("Mombasa", "2024-06-01"));

        match prediction {
            Prediction::Synthetic(result) => {
                assert_eq!(result.city, "Mombasa");
                assert_eq!(result.date, "2024-06-01");
                assert_eq!(result.predicted_ndvi, 0.5);
                assert_eq!(result.latitude, 0.0);
                assert_eq!(result.longitude, 0.0);
                assert_eq!(result.interpretation, SYNTHETIC_INTERPRETATION);
                assert!(!result.anomaly);
            }
            other => panic!("unexpected prediction: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_synthetic_for_empty_series() {
        let file = fixture_file(FIXTURES);
        let prediction = resolver(file.path(), DateMatch::First)
            .resolve(&request("Turkana", "2024-06-01"));
        assert!(matches!(prediction, Prediction::Synthetic(_)));
    }

    #[test]
    fn test_resolve_synthetic_for_missing_or_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = resolver(&dir.path().join("absent.json"), DateMatch::First)
            .resolve(&request("Kisumu", "2024-06-01"));
        assert!(matches!(missing, Prediction::Synthetic(_)));

        let broken = fixture_file("{ \"Kisumu\": [");
        let prediction = resolver(broken.path(), DateMatch::First)
            .resolve(&request("Kisumu", "2024-06-01"));
        assert!(matches!(prediction, Prediction::Synthetic(_)));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let file = fixture_file(FIXTURES);
        let resolver = resolver(file.path(), DateMatch::First);
        let req = request("Kisumu", "2024-06-01");
        assert_eq!(resolver.resolve(&req).to_json(), resolver.resolve(&req).to_json());
    }

    #[test]
    fn test_select_nearest() {
        let file = fixture_file("{}");
        let resolver = resolver(file.path(), DateMatch::Nearest);
        let series = points(&[("2024-05-01", 0.41), ("2024-07-01", 0.52), ("2024-09-01", 0.6)]);

        let (point, selection) = resolver.select_point(&series, "2024-06-25").unwrap();
        assert_eq!(selection, PointSelection::Nearest);
        assert_eq!(point.ds, "2024-07-01");

        let (point, selection) = resolver.select_point(&series, "2024-09-01").unwrap();
        assert_eq!(selection, PointSelection::ExactDate);
        assert_eq!(point.yhat, 0.6);
    }

    #[test]
    fn test_select_nearest_tie_keeps_earlier_point() {
        let series = points(&[("2024-05-01", 0.41), ("2024-05-03", 0.45)]);
        assert_eq!(nearest_point(&series, "2024-05-02").unwrap().ds, "2024-05-01");
    }

    #[test]
    fn test_select_nearest_unparsable_dates_fall_back_to_first() {
        let file = fixture_file("{}");
        let resolver = resolver(file.path(), DateMatch::Nearest);
        let series = points(&[("week 1", 0.1), ("week 2", 0.2)]);

        let (point, selection) = resolver.select_point(&series, "2024-06-01").unwrap();
        assert_eq!(selection, PointSelection::First);
        assert_eq!(point.ds, "week 1");

        let (_, selection) = resolver.select_point(&series, "soon").unwrap();
        assert_eq!(selection, PointSelection::First);
    }

    #[test]
    fn test_select_point_empty() {
        let file = fixture_file("{}");
        assert!(resolver(file.path(), DateMatch::First)
            .select_point(&[], "2024-06-01")
            .is_none());
    }

    #[test]
    fn test_prediction_source_labels() {
        let req = request("Kisumu", "2024-06-01");
        assert_eq!(
            Prediction::Synthetic(PredictionResult::synthetic(&req)).source(),
            "synthetic default"
        );
        assert!(Prediction::Synthetic(PredictionResult::synthetic(&req)).is_fallback());
    }

    #[test]
    fn test_predict_offline_uses_fixtures() {
        let file = fixture_file(FIXTURES);
        let client = ForecastClient::new(ForecastConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(100),
        })
        .unwrap();
        let store = Arc::new(MemoryObservationStore::new());
        let service = PredictionService::new(
            client,
            resolver(file.path(), DateMatch::First),
            store.clone(),
            FallbackPolicy::Enabled,
        );

        let prediction = service
            .predict_offline(&PredictRequest::new("Kisumu", "2024-05-01"))
            .unwrap();
        assert_eq!(prediction.to_json()["predicted_ndvi"], 0.41);
        assert!(store.is_empty());

        assert!(matches!(
            service.predict_offline(&PredictRequest::default()),
            Err(PredictError::InvalidRequest)
        ));
    }
}
