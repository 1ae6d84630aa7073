use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{EnrichmentError, Result};
use crate::utils::dates::normalize_raw_date;

/// Header names recognized for each column role, matched case-insensitively
const LATITUDE_NAMES: &[&str] = &["latitude", "lat"];
const LONGITUDE_NAMES: &[&str] = &["longitude", "lon", "long", "lng"];
const FIRE_LABEL_NAMES: &[&str] = &[
    "firelabel",
    "fire_label",
    "fire_id",
    "fire_number",
    "fire_name",
];

/// Resolved positions of the role-bearing columns in a source table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRoles {
    pub latitude: usize,
    pub longitude: usize,
    pub fire_label: usize,
    pub date: usize,
}

impl ColumnRoles {
    /// Detect column roles from headers. The date column is the caller-supplied
    /// name; the rest are matched against the recognized alias lists.
    pub fn detect(headers: &[String], date_column: &str) -> Result<Self> {
        let latitude = find_column(headers, LATITUDE_NAMES)
            .ok_or_else(|| EnrichmentError::ColumnNotFound("latitude".to_string()))?;
        let longitude = find_column(headers, LONGITUDE_NAMES)
            .ok_or_else(|| EnrichmentError::ColumnNotFound("longitude".to_string()))?;
        let fire_label = find_column(headers, FIRE_LABEL_NAMES)
            .ok_or_else(|| EnrichmentError::ColumnNotFound("fire label".to_string()))?;
        let date = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(date_column.trim()))
            .ok_or_else(|| EnrichmentError::ColumnNotFound(date_column.to_string()))?;

        Ok(Self {
            latitude,
            longitude,
            fire_label,
            date,
        })
    }
}

fn find_column(headers: &[String], names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let header = h.trim().to_lowercase();
        names.contains(&header.as_str())
    })
}

/// A loaded source dataset: every original column, in original row order
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub roles: ColumnRoles,
}

impl SourceTable {
    pub fn new(headers: Vec<String>, mut rows: Vec<Vec<String>>, date_column: &str) -> Result<Self> {
        if headers.is_empty() {
            return Err(EnrichmentError::InvalidFormat(
                "source has no columns".to_string(),
            ));
        }

        let roles = ColumnRoles::detect(&headers, date_column)?;

        // Ragged rows are normalized to header width once, here
        for row in &mut rows {
            row.resize(headers.len(), String::new());
        }

        Ok(Self {
            headers,
            rows,
            roles,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Extract one `FireRecord` per row, preserving row order. Unparseable
    /// coordinates or dates leave the corresponding field `None`; the record
    /// itself is never dropped.
    pub fn records(&self) -> Vec<FireRecord> {
        self.rows
            .iter()
            .enumerate()
            .map(|(row_index, row)| {
                let cell = |idx: usize| row.get(idx).map(|s| s.trim()).unwrap_or("");
                let raw_date = cell(self.roles.date).to_string();

                FireRecord {
                    row_index,
                    fire_label: cell(self.roles.fire_label).to_string(),
                    latitude: parse_coordinate(cell(self.roles.latitude), -90.0, 90.0),
                    longitude: parse_coordinate(cell(self.roles.longitude), -180.0, 180.0),
                    ignition_datetime: normalize_raw_date(&raw_date),
                    raw_date,
                }
            })
            .collect()
    }
}

/// One wildfire occurrence row, immutable once loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct FireRecord {
    pub row_index: usize,
    pub fire_label: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,

    pub raw_date: String,
    pub ignition_datetime: Option<NaiveDateTime>,
}

impl FireRecord {
    /// Whether the record carries everything a provider lookup needs
    pub fn enrichable(&self) -> bool {
        self.ignition_datetime.is_some() && self.latitude.is_some() && self.longitude.is_some()
    }
}

fn parse_coordinate(raw: &str, min: f64, max: f64) -> Option<f64> {
    let value = raw.parse::<f64>().ok()?;
    (min..=max).contains(&value).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detect_roles_case_insensitive() {
        let headers = headers(&["FIRELABEL", "LATITUDE", "LONGITUDE", "FIRE_DATE", "SIZE_HA"]);
        let roles = ColumnRoles::detect(&headers, "fire_date").unwrap();

        assert_eq!(roles.fire_label, 0);
        assert_eq!(roles.latitude, 1);
        assert_eq!(roles.longitude, 2);
        assert_eq!(roles.date, 3);
    }

    #[test]
    fn test_missing_date_column_is_an_error() {
        let headers = headers(&["fire_id", "lat", "lon"]);
        let result = ColumnRoles::detect(&headers, "ignition");

        assert!(matches!(
            result,
            Err(EnrichmentError::ColumnNotFound(ref name)) if name == "ignition"
        ));
    }

    #[test]
    fn test_records_preserve_order_and_handle_bad_cells() {
        let table = SourceTable::new(
            headers(&["fire_id", "lat", "lon", "date"]),
            vec![
                vec!["F1".into(), "49.5".into(), "-120.1".into(), "20230515".into()],
                vec!["F2".into(), "not-a-number".into(), "-121.0".into(), "20230601".into()],
                vec!["F3".into(), "50.2".into(), "-119.8".into(), "bad-date".into()],
            ],
            "date",
        )
        .unwrap();

        let records = table.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].row_index, 0);
        assert!(records[0].enrichable());
        assert!(records[1].latitude.is_none());
        assert!(!records[1].enrichable());
        assert!(records[2].ignition_datetime.is_none());
        assert!(!records[2].enrichable());
    }

    #[test]
    fn test_out_of_range_coordinates_become_none() {
        let table = SourceTable::new(
            headers(&["fire_id", "lat", "lon", "date"]),
            vec![vec!["F1".into(), "95.0".into(), "-120.0".into(), "20230515".into()]],
            "date",
        )
        .unwrap();

        let records = table.records();
        assert!(records[0].latitude.is_none());
        assert_eq!(records[0].longitude, Some(-120.0));
    }

    #[test]
    fn test_ragged_rows_are_padded() {
        let table = SourceTable::new(
            headers(&["fire_id", "lat", "lon", "date", "extra"]),
            vec![vec!["F1".into(), "49.0".into(), "-120.0".into(), "20230515".into()]],
            "date",
        )
        .unwrap();

        assert_eq!(table.rows[0].len(), 5);
        assert_eq!(table.rows[0][4], "");
    }

    #[test]
    fn test_record_validation() {
        let record = FireRecord {
            row_index: 0,
            fire_label: "F1".to_string(),
            latitude: Some(49.5),
            longitude: Some(-120.1),
            raw_date: "20230515".to_string(),
            ignition_datetime: normalize_raw_date("20230515"),
        };

        assert!(record.validate().is_ok());
    }
}
