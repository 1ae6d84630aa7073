use chrono::{Duration, NaiveDateTime};
use serde::Deserialize;
use tracing::debug;

use super::{ProviderError, WeatherProvider};
use crate::models::WeatherSample;
use crate::utils::constants::ERA5_HOURLY_VARIABLES;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Client for an ERA5-Land hourly point API. One GET per record: the service
/// interpolates the reanalysis grid at the requested coordinate and returns
/// an hourly series for the requested window.
pub struct Era5LandClient {
    http: reqwest::Client,
    base_url: String,
    project: String,
}

impl Era5LandClient {
    pub fn new(base_url: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            project: project.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PointResponse {
    #[serde(default)]
    hourly: HourlySeries,
}

#[derive(Debug, Default, Deserialize)]
struct HourlySeries {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    u_component_of_wind_10m: Vec<Option<f64>>,
    #[serde(default)]
    v_component_of_wind_10m: Vec<Option<f64>>,
    #[serde(default)]
    dewpoint_temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    soil_temperature_level_1: Vec<Option<f64>>,
}

impl WeatherProvider for Era5LandClient {
    async fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        timestamp: NaiveDateTime,
    ) -> std::result::Result<WeatherSample, ProviderError> {
        // The dataset publishes on the hour; a -1h..+2h window guarantees at
        // least one covered hour around any in-between timestamp
        let start = timestamp - Duration::hours(1);
        let end = timestamp + Duration::hours(2);

        let url = format!("{}/point", self.base_url);
        let query: Vec<(&str, String)> = vec![
            ("project", self.project.clone()),
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("hourly", ERA5_HOURLY_VARIABLES.join(",")),
            ("start", start.format(TIME_FORMAT).to_string()),
            ("end", end.format(TIME_FORMAT).to_string()),
        ];

        debug!(latitude, longitude, %timestamp, "requesting reanalysis point data");

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(ProviderError::Transient(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            // 404 and friends mean the dataset has nothing for this point
            return Err(ProviderError::NoCoverage {
                latitude,
                longitude,
                timestamp,
            });
        }

        let payload: PointResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transient(format!("malformed response: {}", e)))?;

        let series = payload.hourly;
        if series.time.is_empty() {
            return Err(ProviderError::NoCoverage {
                latitude,
                longitude,
                timestamp,
            });
        }

        let idx = nearest_hour_index(&series.time, timestamp);
        Ok(WeatherSample {
            temperature_2m: value_at(&series.temperature_2m, idx),
            u_component_of_wind_10m: value_at(&series.u_component_of_wind_10m, idx),
            v_component_of_wind_10m: value_at(&series.v_component_of_wind_10m, idx),
            dewpoint_temperature_2m: value_at(&series.dewpoint_temperature_2m, idx),
            soil_temperature_level_1: value_at(&series.soil_temperature_level_1, idx),
        })
    }
}

fn value_at(series: &[Option<f64>], idx: usize) -> Option<f64> {
    series.get(idx).copied().flatten()
}

/// Index of the series entry closest in time to the target; unparseable
/// entries sort last
fn nearest_hour_index(times: &[String], target: NaiveDateTime) -> usize {
    times
        .iter()
        .enumerate()
        .min_by_key(|(_, t)| {
            NaiveDateTime::parse_from_str(t, TIME_FORMAT)
                .map(|parsed| (parsed - target).num_seconds().abs())
                .unwrap_or(i64::MAX)
        })
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 5, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_nearest_hour_picks_closest_entry() {
        let times = vec![
            "2023-05-15T13:00".to_string(),
            "2023-05-15T14:00".to_string(),
            "2023-05-15T15:00".to_string(),
        ];

        assert_eq!(nearest_hour_index(&times, at(14, 20)), 1);
        assert_eq!(nearest_hour_index(&times, at(14, 40)), 2);
        assert_eq!(nearest_hour_index(&times, at(12, 0)), 0);
    }

    #[test]
    fn test_nearest_hour_skips_unparseable_entries() {
        let times = vec!["garbage".to_string(), "2023-05-15T14:00".to_string()];

        assert_eq!(nearest_hour_index(&times, at(14, 0)), 1);
    }

    #[test]
    fn test_response_parsing_tolerates_sparse_series() {
        let payload: PointResponse = serde_json::from_str(
            r#"{
                "hourly": {
                    "time": ["2023-05-15T14:00"],
                    "temperature_2m": [300.15],
                    "u_component_of_wind_10m": [null],
                    "v_component_of_wind_10m": [2.5]
                }
            }"#,
        )
        .unwrap();

        assert_eq!(payload.hourly.time.len(), 1);
        assert_eq!(value_at(&payload.hourly.temperature_2m, 0), Some(300.15));
        assert_eq!(value_at(&payload.hourly.u_component_of_wind_10m, 0), None);
        assert_eq!(value_at(&payload.hourly.dewpoint_temperature_2m, 0), None);
    }
}
