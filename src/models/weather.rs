use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::utils::constants::KELVIN_OFFSET;

/// Raw ERA5-Land variables sampled at a point, straight off the provider.
/// Temperatures are in Kelvin; wind is u/v components in m/s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub temperature_2m: Option<f64>,
    pub u_component_of_wind_10m: Option<f64>,
    pub v_component_of_wind_10m: Option<f64>,
    pub dewpoint_temperature_2m: Option<f64>,
    pub soil_temperature_level_1: Option<f64>,
}

/// Enrichment fields appended to a record. `None` is an explicit "no data"
/// marker, never a stand-in zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub temperature_c: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub wind_direction_deg: Option<f64>,
    pub wind_direction: Option<String>,
    pub humidity_dewpoint_temperature_2m: Option<f64>,
    pub soil_temperature_level_1: Option<f64>,
}

impl Enrichment {
    /// The explicit all-null result recorded after exhausted retries,
    /// no-coverage responses, or unusable record fields
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn is_missing(&self) -> bool {
        self.temperature_c.is_none()
            && self.wind_speed_ms.is_none()
            && self.wind_direction_deg.is_none()
            && self.wind_direction.is_none()
            && self.humidity_dewpoint_temperature_2m.is_none()
            && self.soil_temperature_level_1.is_none()
    }

    /// Derive output fields from a raw sample: Kelvin to Celsius for 2m
    /// temperature, wind speed and bearing from the u/v components. Missing
    /// wind components are treated as calm.
    pub fn from_sample(sample: &WeatherSample) -> Self {
        let u = sample.u_component_of_wind_10m.unwrap_or(0.0);
        let v = sample.v_component_of_wind_10m.unwrap_or(0.0);

        let wind_speed = (u * u + v * v).sqrt();
        let wind_direction_deg = if u == 0.0 && v == 0.0 {
            0.0
        } else {
            (270.0 - v.atan2(u).to_degrees()).rem_euclid(360.0)
        };

        Self {
            temperature_c: sample.temperature_2m.map(|kelvin| kelvin - KELVIN_OFFSET),
            wind_speed_ms: Some(wind_speed),
            wind_direction_deg: Some(wind_direction_deg),
            wind_direction: Some(compass_label(wind_direction_deg).to_string()),
            humidity_dewpoint_temperature_2m: sample.dewpoint_temperature_2m,
            soil_temperature_level_1: sample.soil_temperature_level_1,
        }
    }
}

/// One record's enrichment outcome, keyed back to the source by row index
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    pub row_index: usize,
    pub fire_label: String,
    pub ignition_datetime: Option<NaiveDateTime>,
    pub enrichment: Enrichment,
}

impl EnrichedRow {
    /// The seven output cells, in `ENRICHMENT_COLUMNS` order
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.ignition_datetime
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            format_optional(self.enrichment.temperature_c),
            format_optional(self.enrichment.wind_speed_ms),
            format_optional(self.enrichment.wind_direction_deg),
            self.enrichment.wind_direction.clone().unwrap_or_default(),
            format_optional(self.enrichment.humidity_dewpoint_temperature_2m),
            format_optional(self.enrichment.soil_temperature_level_1),
        ]
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Convert a wind bearing in degrees to its 8-point compass label
pub fn compass_label(degrees: f64) -> &'static str {
    let deg = degrees.rem_euclid(360.0);

    match deg {
        d if d < 22.5 => "North",
        d if d < 67.5 => "Northeast",
        d if d < 112.5 => "East",
        d if d < 157.5 => "Southeast",
        d if d < 202.5 => "South",
        d if d < 247.5 => "Southwest",
        d if d < 292.5 => "West",
        d if d < 337.5 => "Northwest",
        _ => "North",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compass_labels_cover_all_sectors() {
        assert_eq!(compass_label(0.0), "North");
        assert_eq!(compass_label(45.0), "Northeast");
        assert_eq!(compass_label(90.0), "East");
        assert_eq!(compass_label(135.0), "Southeast");
        assert_eq!(compass_label(180.0), "South");
        assert_eq!(compass_label(225.0), "Southwest");
        assert_eq!(compass_label(270.0), "West");
        assert_eq!(compass_label(315.0), "Northwest");
        assert_eq!(compass_label(350.0), "North");
    }

    #[test]
    fn test_compass_label_wraps_degrees() {
        assert_eq!(compass_label(360.0), "North");
        assert_eq!(compass_label(-90.0), "West");
    }

    #[test]
    fn test_kelvin_conversion() {
        let sample = WeatherSample {
            temperature_2m: Some(300.15),
            ..Default::default()
        };

        let enrichment = Enrichment::from_sample(&sample);
        assert!((enrichment.temperature_c.unwrap() - 27.0).abs() < 1e-9);
    }

    #[test]
    fn test_wind_derivation_from_components() {
        // Pure westerly: wind blowing from the west (u > 0, v = 0)
        let sample = WeatherSample {
            u_component_of_wind_10m: Some(10.0),
            v_component_of_wind_10m: Some(0.0),
            ..Default::default()
        };

        let enrichment = Enrichment::from_sample(&sample);
        assert!((enrichment.wind_speed_ms.unwrap() - 10.0).abs() < 1e-9);
        assert!((enrichment.wind_direction_deg.unwrap() - 270.0).abs() < 1e-9);
        assert_eq!(enrichment.wind_direction.as_deref(), Some("West"));
    }

    #[test]
    fn test_calm_wind_defaults_to_north() {
        let sample = WeatherSample::default();

        let enrichment = Enrichment::from_sample(&sample);
        assert_eq!(enrichment.wind_speed_ms, Some(0.0));
        assert_eq!(enrichment.wind_direction_deg, Some(0.0));
        assert_eq!(enrichment.wind_direction.as_deref(), Some("North"));
    }

    #[test]
    fn test_dewpoint_and_soil_pass_through_unconverted() {
        let sample = WeatherSample {
            dewpoint_temperature_2m: Some(280.0),
            soil_temperature_level_1: Some(285.5),
            ..Default::default()
        };

        let enrichment = Enrichment::from_sample(&sample);
        assert_eq!(enrichment.humidity_dewpoint_temperature_2m, Some(280.0));
        assert_eq!(enrichment.soil_temperature_level_1, Some(285.5));
    }

    #[test]
    fn test_missing_is_all_none() {
        let missing = Enrichment::missing();
        assert!(missing.is_missing());

        let enriched = Enrichment::from_sample(&WeatherSample::default());
        assert!(!enriched.is_missing());
    }

    #[test]
    fn test_cells_render_missing_as_empty() {
        let row = EnrichedRow {
            row_index: 0,
            fire_label: "F1".to_string(),
            ignition_datetime: None,
            enrichment: Enrichment::missing(),
        };

        assert!(row.cells().iter().all(|cell| cell.is_empty()));
    }
}
