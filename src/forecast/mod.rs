//! Client for the external NDVI forecasting service
//!
//! # Example
//!
//! ```no_run
//! use bloomwatch::forecast::{ForecastClient, ForecastConfig};
//! use bloomwatch::models::ValidPredictRequest;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ForecastClient::new(ForecastConfig::default())?;
//!     let request = ValidPredictRequest {
//!         city: "Kisumu".to_string(),
//!         date: "2024-06-01".to_string(),
//!     };
//!
//!     let response = client.predict(&request).await?;
//!     println!("{}", response.value);
//!
//!     Ok(())
//! }
//! ```

mod client;

pub use client::{ForecastClient, ForecastConfig, ForecastError, ForecastResponse};
