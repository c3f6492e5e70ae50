use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::AppState;
use crate::error::AppError;
use crate::models::ObservationFilter;

/// Query parameters of the blooms listing; empty values are ignored
#[derive(Debug, Default, Deserialize)]
pub struct BloomsQuery {
    pub county: Option<String>,
    pub year: Option<String>,
}

impl BloomsQuery {
    pub fn into_filter(self) -> Result<ObservationFilter, AppError> {
        let non_empty = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };

        let year = match non_empty(self.year) {
            Some(y) => Some(y.parse::<i32>().map_err(|_| {
                AppError::InvalidRequest(format!("year must be a number, got {:?}", y))
            })?),
            None => None,
        };

        Ok(ObservationFilter {
            county: non_empty(self.county),
            year,
        })
    }
}

/// List archived observations, optionally filtered by county and year
pub async fn list_blooms(
    state: web::Data<AppState>,
    query: web::Query<BloomsQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = query.into_inner().into_filter()?;
    let observations = state.observations.query(&filter)?;
    Ok(HttpResponse::Ok().json(observations))
}
