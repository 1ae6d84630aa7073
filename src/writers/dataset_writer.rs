use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use rust_xlsxwriter::Workbook;
use tracing::info;

use crate::error::{EnrichmentError, Result};
use crate::models::{EnrichedRow, SourceTable};
use crate::utils::constants::{
    DEFAULT_OUTPUT_BASENAME, DEFAULT_OUTPUT_DIRNAME, ENRICHMENT_COLUMNS,
};
use crate::writers::parquet_writer::ParquetWriter;

const OUTPUT_TABLE: &str = "enriched_records";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
    Xlsx,
    Sqlite,
    Parquet,
}

impl OutputFormat {
    pub fn parse(format: &str) -> Result<Self> {
        match format.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "xlsx" | "xls" | "spreadsheet" => Ok(OutputFormat::Xlsx),
            "sqlite" | "db" => Ok(OutputFormat::Sqlite),
            "parquet" => Ok(OutputFormat::Parquet),
            other => Err(EnrichmentError::Config(format!(
                "Unsupported output format: {}",
                other
            ))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Sqlite => "db",
            OutputFormat::Parquet => "parquet",
        }
    }
}

/// Merges enrichment results back onto the original rows and serializes the
/// combined dataset. A failure here is fatal to the run, but the per-batch
/// artifacts already on disk stay recoverable.
pub struct DatasetWriter {
    format: OutputFormat,
}

impl DatasetWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Original columns concatenated with the seven enrichment columns, one
    /// output row per input row, in input order.
    pub fn merged_table(
        table: &SourceTable,
        rows: &[EnrichedRow],
    ) -> (Vec<String>, Vec<Vec<String>>) {
        let mut headers = table.headers.clone();
        headers.extend(ENRICHMENT_COLUMNS.iter().map(|c| c.to_string()));

        let by_index: HashMap<usize, &EnrichedRow> =
            rows.iter().map(|row| (row.row_index, row)).collect();

        let merged = table
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let mut cells = row.clone();
                match by_index.get(&idx) {
                    Some(enriched) => cells.extend(enriched.cells()),
                    None => cells.extend(vec![String::new(); ENRICHMENT_COLUMNS.len()]),
                }
                cells
            })
            .collect();

        (headers, merged)
    }

    pub fn write(&self, table: &SourceTable, rows: &[EnrichedRow], path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let result = match self.format {
            OutputFormat::Parquet => ParquetWriter::new().write(table, rows, path),
            _ => {
                let (headers, merged) = Self::merged_table(table, rows);
                match self.format {
                    OutputFormat::Csv => write_csv(&headers, &merged, path),
                    OutputFormat::Json => write_json(&headers, &merged, path),
                    OutputFormat::Xlsx => write_xlsx(&headers, &merged, path),
                    _ => write_sqlite(&headers, &merged, path),
                }
            }
        };

        result.map_err(|e| EnrichmentError::WriteFailure {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        info!(path = %path.display(), rows = table.len(), "wrote enriched dataset");
        Ok(path.to_path_buf())
    }
}

/// Default output location: a scratch folder under the user's Downloads
pub fn default_output_path(format: OutputFormat) -> PathBuf {
    dirs::download_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_OUTPUT_DIRNAME)
        .join(format!(
            "{}.{}",
            DEFAULT_OUTPUT_BASENAME,
            format.extension()
        ))
}

fn write_csv(headers: &[String], rows: &[Vec<String>], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// JSON output is an array of objects. Cells that round-trip cleanly through
/// f64 are emitted as numbers, empty cells as explicit nulls, the rest as
/// strings.
fn write_json(headers: &[String], rows: &[Vec<String>], path: &Path) -> Result<()> {
    let array: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| {
            let mut object = serde_json::Map::new();
            for (header, cell) in headers.iter().zip(row) {
                object.insert(header.clone(), json_cell(cell));
            }
            serde_json::Value::Object(object)
        })
        .collect();

    fs::write(path, serde_json::to_string_pretty(&array)?)?;
    Ok(())
}

fn json_cell(cell: &str) -> serde_json::Value {
    if cell.is_empty() {
        return serde_json::Value::Null;
    }

    if let Ok(number) = cell.parse::<f64>() {
        if number.to_string() == cell {
            if let Some(value) = serde_json::Number::from_f64(number) {
                return serde_json::Value::Number(value);
            }
        }
    }

    serde_json::Value::String(cell.to_string())
}

fn write_xlsx(headers: &[String], rows: &[Vec<String>], path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, header)?;
    }
    for (row_idx, row) in rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            match cell.parse::<f64>() {
                Ok(number) => sheet.write_number((row_idx + 1) as u32, col as u16, number)?,
                Err(_) => sheet.write_string((row_idx + 1) as u32, col as u16, cell)?,
            };
        }
    }

    workbook.save(path)?;
    Ok(())
}

/// One `enriched_records` table, all columns TEXT, empty cells as NULL
fn write_sqlite(headers: &[String], rows: &[Vec<String>], path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }

    let mut conn = Connection::open(path)?;

    let columns: Vec<String> = headers
        .iter()
        .map(|header| format!("\"{}\" TEXT", header.replace('"', "\"\"")))
        .collect();
    conn.execute_batch(&format!(
        "CREATE TABLE {} ({})",
        OUTPUT_TABLE,
        columns.join(", ")
    ))?;

    let placeholders = vec!["?"; headers.len()].join(", ");
    let insert = format!("INSERT INTO {} VALUES ({})", OUTPUT_TABLE, placeholders);

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(&insert)?;
        for row in rows {
            stmt.execute(rusqlite::params_from_iter(row.iter().map(|cell| {
                if cell.is_empty() {
                    None
                } else {
                    Some(cell.as_str())
                }
            })))?;
        }
    }
    tx.commit()?;

    Ok(())
}
