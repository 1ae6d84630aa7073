use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader as _};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{EnrichmentError, Result};
use crate::models::SourceTable;

type Table = (Vec<String>, Vec<Vec<String>>);

/// Source formats recognized by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Spreadsheet,
    Json,
    Sqlite,
}

impl SourceFormat {
    pub fn detect(source: &str) -> Result<Self> {
        let lower = source.to_lowercase();

        if lower.ends_with(".csv") {
            Ok(SourceFormat::Csv)
        } else if lower.ends_with(".xls") || lower.ends_with(".xlsx") {
            Ok(SourceFormat::Spreadsheet)
        } else if lower.ends_with(".json") {
            Ok(SourceFormat::Json)
        } else if lower.ends_with(".db") || lower.ends_with(".sqlite") {
            Ok(SourceFormat::Sqlite)
        } else {
            Err(EnrichmentError::UnsupportedFormat(source.to_string()))
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            SourceFormat::Csv => ".csv",
            SourceFormat::Spreadsheet => ".xlsx",
            SourceFormat::Json => ".json",
            SourceFormat::Sqlite => ".db",
        }
    }
}

/// Loads tabular wildfire records from a local path or HTTP(S) URL, preserving
/// every original column and the original row order for later re-merging.
pub struct SourceReader {
    http: reqwest::Client,
}

impl SourceReader {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Load a source into a `SourceTable`. `table` names the table to read
    /// from SQLite sources; `None` falls back to the first user table.
    pub async fn load(
        &self,
        source: &str,
        date_column: &str,
        table: Option<&str>,
    ) -> Result<SourceTable> {
        let format = SourceFormat::detect(source)?;
        debug!(source, ?format, "loading source");

        let (headers, rows) = if is_url(source) {
            self.load_remote(source, format, table).await?
        } else {
            self.load_local(source, format, table)?
        };

        info!(rows = rows.len(), columns = headers.len(), "source loaded");
        SourceTable::new(headers, rows, date_column)
    }

    fn load_local(&self, source: &str, format: SourceFormat, table: Option<&str>) -> Result<Table> {
        let path = expand_home(source);
        if !path.exists() {
            return Err(EnrichmentError::SourceUnreadable {
                source_ref: source.to_string(),
                reason: "file does not exist".to_string(),
            });
        }

        match format {
            SourceFormat::Csv => read_csv_path(&path),
            SourceFormat::Spreadsheet => read_spreadsheet(&path),
            SourceFormat::Json => read_json(&std::fs::read(&path)?),
            SourceFormat::Sqlite => read_sqlite(&path, table),
        }
    }

    async fn load_remote(
        &self,
        url: &str,
        format: SourceFormat,
        table: Option<&str>,
    ) -> Result<Table> {
        info!(url, "downloading source");

        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(EnrichmentError::SourceUnreadable {
                source_ref: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }
        let bytes = response.bytes().await?;

        match format {
            SourceFormat::Csv => {
                read_csv_reader(csv::ReaderBuilder::new().flexible(true).from_reader(bytes.as_ref()))
            }
            SourceFormat::Json => read_json(&bytes),
            // Binary formats need a real file on disk to open
            SourceFormat::Spreadsheet | SourceFormat::Sqlite => {
                let mut tmp = tempfile::Builder::new()
                    .suffix(format.extension())
                    .tempfile()?;
                tmp.write_all(&bytes)?;

                match format {
                    SourceFormat::Spreadsheet => read_spreadsheet(tmp.path()),
                    _ => read_sqlite(tmp.path(), table),
                }
            }
        }
    }
}

impl Default for SourceReader {
    fn default() -> Self {
        Self::new()
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn expand_home(source: &str) -> PathBuf {
    if let Some(rest) = source.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(source)
}

fn read_csv_path(path: &Path) -> Result<Table> {
    read_csv_reader(csv::ReaderBuilder::new().flexible(true).from_path(path)?)
}

fn read_csv_reader<R: Read>(mut reader: csv::Reader<R>) -> Result<Table> {
    let headers = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok((headers, rows))
}

/// JSON sources are an array of objects; column order follows first
/// appearance across the array.
fn read_json(bytes: &[u8]) -> Result<Table> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    let array = value.as_array().ok_or_else(|| {
        EnrichmentError::InvalidFormat("JSON source must be an array of objects".to_string())
    })?;

    let objects = array
        .iter()
        .map(|item| {
            item.as_object().ok_or_else(|| {
                EnrichmentError::InvalidFormat(
                    "JSON source must be an array of objects".to_string(),
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut headers: Vec<String> = Vec::new();
    for object in &objects {
        for key in object.keys() {
            if !headers.iter().any(|h| h == key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = objects
        .iter()
        .map(|object| {
            headers
                .iter()
                .map(|h| object.get(h).map(json_cell).unwrap_or_default())
                .collect()
        })
        .collect();

    Ok((headers, rows))
}

fn json_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn read_spreadsheet(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| EnrichmentError::InvalidFormat("workbook has no sheets".to_string()))?;

    let range = workbook.worksheet_range(&sheet)?;
    let mut rows_iter = range.rows();

    let headers = rows_iter
        .next()
        .ok_or_else(|| EnrichmentError::InvalidFormat("spreadsheet is empty".to_string()))?
        .iter()
        .map(spreadsheet_cell)
        .collect();
    let rows = rows_iter
        .map(|row| row.iter().map(spreadsheet_cell).collect())
        .collect();

    Ok((headers, rows))
}

fn spreadsheet_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}

fn read_sqlite(path: &Path, table: Option<&str>) -> Result<Table> {
    let conn = Connection::open(path)?;

    let table_name = match table {
        Some(name) => name.to_string(),
        None => first_user_table(&conn)?,
    };

    let mut stmt = conn.prepare(&format!("SELECT * FROM \"{}\"", table_name.replace('"', "\"\"")))?;
    let headers: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let column_count = headers.len();

    let mut rows_out = Vec::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            let value: rusqlite::types::Value = row.get(idx)?;
            cells.push(sql_cell(value));
        }
        rows_out.push(cells);
    }

    Ok((headers, rows_out))
}

fn first_user_table(conn: &Connection) -> Result<String> {
    conn.query_row(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
         ORDER BY name LIMIT 1",
        [],
        |row| row.get(0),
    )
    .map_err(|_| EnrichmentError::InvalidFormat("database contains no tables".to_string()))
}

fn sql_cell(value: rusqlite::types::Value) -> String {
    use rusqlite::types::Value;

    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s,
        Value::Blob(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    #[test]
    fn test_format_detection() {
        assert_eq!(SourceFormat::detect("fires.csv").unwrap(), SourceFormat::Csv);
        assert_eq!(
            SourceFormat::detect("FIRES.XLSX").unwrap(),
            SourceFormat::Spreadsheet
        );
        assert_eq!(
            SourceFormat::detect("https://example.com/fires.json").unwrap(),
            SourceFormat::Json
        );
        assert_eq!(
            SourceFormat::detect("fires.db").unwrap(),
            SourceFormat::Sqlite
        );
        assert!(SourceFormat::detect("fires.txt").is_err());
    }

    #[tokio::test]
    async fn test_load_csv_source() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "FIRELABEL,LATITUDE,LONGITUDE,FIRE_DATE,SIZE_HA").unwrap();
        writeln!(file, "F1,49.5,-120.1,20230515,12.5").unwrap();
        writeln!(file, "F2,50.2,-119.8,20230601143000,3.0").unwrap();

        let reader = SourceReader::new();
        let table = reader
            .load(&file.path().to_string_lossy(), "FIRE_DATE", None)
            .await
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.headers.len(), 5);

        let records = table.records();
        assert_eq!(records[0].fire_label, "F1");
        assert_eq!(records[0].latitude, Some(49.5));
        assert!(records[1].ignition_datetime.is_some());
    }

    #[tokio::test]
    async fn test_load_missing_file_is_source_unreadable() {
        let reader = SourceReader::new();
        let result = reader.load("/no/such/file.csv", "date", None).await;

        assert!(matches!(
            result,
            Err(EnrichmentError::SourceUnreadable { .. })
        ));
    }

    #[test]
    fn test_read_json_preserves_column_order() {
        let bytes = br#"[
            {"fire_id": "F1", "lat": 49.5, "lon": -120.1, "date": "20230515"},
            {"fire_id": "F2", "lat": 50.0, "lon": -119.0, "date": "20230601", "note": "late"}
        ]"#;

        let (headers, rows) = read_json(bytes).unwrap();

        assert_eq!(headers, vec!["fire_id", "lat", "lon", "date", "note"]);
        assert_eq!(rows[0][0], "F1");
        assert_eq!(rows[0][1], "49.5");
        assert_eq!(rows[1][4], "late");
    }

    #[test]
    fn test_read_json_rejects_non_array() {
        assert!(read_json(br#"{"fire_id": "F1"}"#).is_err());
    }

    #[test]
    fn test_json_null_becomes_empty_cell() {
        let (_, rows) = read_json(br#"[{"a": null, "b": 1}]"#).unwrap();
        assert_eq!(rows[0][0], "");
        assert_eq!(rows[0][1], "1");
    }

    #[test]
    fn test_read_sqlite_table() {
        let file = NamedTempFile::with_suffix(".db").unwrap();
        let conn = Connection::open(file.path()).unwrap();
        conn.execute_batch(
            "CREATE TABLE fires (fire_id TEXT, lat REAL, lon REAL, fire_date INTEGER);
             INSERT INTO fires VALUES ('F1', 49.5, -120.1, 20230515);
             INSERT INTO fires VALUES ('F2', 50.0, NULL, 20230601);",
        )
        .unwrap();
        drop(conn);

        let (headers, rows) = read_sqlite(file.path(), None).unwrap();

        assert_eq!(headers, vec!["fire_id", "lat", "lon", "fire_date"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][3], "20230515");
        assert_eq!(rows[1][2], "");
    }

    #[test]
    fn test_expand_home_leaves_plain_paths_alone() {
        assert_eq!(expand_home("/tmp/fires.csv"), PathBuf::from("/tmp/fires.csv"));
    }
}
