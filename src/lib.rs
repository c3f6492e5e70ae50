//! Bloomwatch - NDVI prediction proxy for the Bloom Watchers Kenya dashboard
//!
//! This library provides:
//! - Forwarding of prediction requests to an external forecasting service
//! - Fixture-backed fallback predictions when that service is unreachable
//! - An append-only archive of forecast observations
//! - The actix-web handlers serving all of the above (`api` feature)
//!
//! # Example
//!
//! ```no_run
//! use bloomwatch::config::DateMatch;
//! use bloomwatch::data::FixtureStore;
//! use bloomwatch::models::ValidPredictRequest;
//! use bloomwatch::predictor::FallbackResolver;
//!
//! let resolver = FallbackResolver::new(
//!     FixtureStore::new("data/mock_predictions.json"),
//!     DateMatch::First,
//! );
//! let request = ValidPredictRequest {
//!     city: "Kisumu".to_string(),
//!     date: "2024-06-01".to_string(),
//! };
//! println!("{}", resolver.resolve(&request).to_json());
//! ```

pub mod config;
pub mod data;
pub mod forecast;
pub mod models;
pub mod predictor;

// API-specific modules (only available with api feature)
#[cfg(feature = "api")]
pub mod error;
#[cfg(feature = "api")]
pub mod handlers;

// Re-export commonly used types
pub use config::{AppConfig, DateMatch, FallbackPolicy};
pub use data::{
    FixtureSource, FixtureStore, JsonlObservationStore, MemoryObservationStore, ObservationStore,
};
pub use forecast::{ForecastClient, ForecastConfig, ForecastError};
pub use models::{
    ForecastPoint, Observation, ObservationFilter, PredictRequest, PredictionResult,
    ValidPredictRequest, VegetationStatus,
};
pub use predictor::{FallbackResolver, PredictError, Prediction, PredictionService};
