pub mod era5_land;

pub use era5_land::Era5LandClient;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::WeatherSample;

/// Failures a provider lookup can produce. The engine retries `Transient`
/// errors up to its retry budget; `NoCoverage` is permanent for the record
/// and consumes no budget. Neither ever aborts a run.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transient provider failure: {0}")]
    Transient(String),

    #[error("no coverage for ({latitude}, {longitude}) at {timestamp}")]
    NoCoverage {
        latitude: f64,
        longitude: f64,
        timestamp: NaiveDateTime,
    },
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

/// Point lookup against hourly reanalysis data. The seam the engine is
/// generic over, so tests can script provider behavior without a network.
#[allow(async_fn_in_trait)]
pub trait WeatherProvider {
    async fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        timestamp: NaiveDateTime,
    ) -> std::result::Result<WeatherSample, ProviderError>;
}
