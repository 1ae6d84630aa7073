use std::collections::HashMap;
use std::fs::File;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampSecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;

use crate::error::Result;
use crate::models::{EnrichedRow, SourceTable};
use crate::utils::constants::DEFAULT_ROW_GROUP_SIZE;

/// Writes the enriched dataset to Parquet: original columns as strings,
/// enrichment columns typed and nullable.
pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            "snappy" => Compression::SNAPPY,
            "gzip" => Compression::GZIP(GzipLevel::default()),
            "lz4" => Compression::LZ4,
            "zstd" => Compression::ZSTD(ZstdLevel::default()),
            "none" => Compression::UNCOMPRESSED,
            _ => {
                return Err(crate::error::EnrichmentError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Write the merged dataset, one row group per `row_group_size` rows.
    pub fn write(&self, table: &SourceTable, rows: &[EnrichedRow], path: &Path) -> Result<()> {
        if table.is_empty() {
            return Ok(());
        }

        let schema = self.create_schema(table);
        let by_index: HashMap<usize, &EnrichedRow> =
            rows.iter().map(|row| (row.row_index, row)).collect();

        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();
        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        let total = table.rows.len();
        let mut start = 0;
        while start < total {
            let end = (start + self.row_group_size).min(total);
            let batch = self.rows_to_batch(table, &by_index, start..end, schema.clone())?;
            writer.write(&batch)?;
            start = end;
        }

        writer.close()?;
        Ok(())
    }

    fn create_schema(&self, table: &SourceTable) -> Arc<Schema> {
        let mut fields: Vec<Field> = table
            .headers
            .iter()
            .map(|header| Field::new(header, DataType::Utf8, true))
            .collect();

        fields.push(Field::new(
            "ignition_datetime",
            DataType::Timestamp(TimeUnit::Second, None),
            true,
        ));
        fields.push(Field::new("temperature_c", DataType::Float64, true));
        fields.push(Field::new("wind_speed_ms", DataType::Float64, true));
        fields.push(Field::new("wind_direction_deg", DataType::Float64, true));
        fields.push(Field::new("wind_direction", DataType::Utf8, true));
        fields.push(Field::new(
            "humidity_dewpoint_temperature_2m",
            DataType::Float64,
            true,
        ));
        fields.push(Field::new(
            "soil_temperature_level_1",
            DataType::Float64,
            true,
        ));

        Arc::new(Schema::new(fields))
    }

    fn rows_to_batch(
        &self,
        table: &SourceTable,
        by_index: &HashMap<usize, &EnrichedRow>,
        range: Range<usize>,
        schema: Arc<Schema>,
    ) -> Result<RecordBatch> {
        let lookup = |idx: usize| by_index.get(&idx).copied();
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

        for col in 0..table.headers.len() {
            let values: Vec<&str> = range
                .clone()
                .map(|idx| table.rows[idx].get(col).map(String::as_str).unwrap_or(""))
                .collect();
            columns.push(Arc::new(StringArray::from(values)));
        }

        let ignition: TimestampSecondArray = range
            .clone()
            .map(|idx| {
                lookup(idx)
                    .and_then(|row| row.ignition_datetime)
                    .map(|dt| dt.and_utc().timestamp())
            })
            .collect();
        columns.push(Arc::new(ignition));

        let float_column = |accessor: fn(&EnrichedRow) -> Option<f64>| -> Float64Array {
            range.clone().map(|idx| lookup(idx).and_then(accessor)).collect()
        };

        columns.push(Arc::new(float_column(|row| row.enrichment.temperature_c)));
        columns.push(Arc::new(float_column(|row| row.enrichment.wind_speed_ms)));
        columns.push(Arc::new(float_column(|row| {
            row.enrichment.wind_direction_deg
        })));

        let compass: Vec<Option<String>> = range
            .clone()
            .map(|idx| lookup(idx).and_then(|row| row.enrichment.wind_direction.clone()))
            .collect();
        columns.push(Arc::new(StringArray::from(compass)));

        columns.push(Arc::new(float_column(|row| {
            row.enrichment.humidity_dewpoint_temperature_2m
        })));
        columns.push(Arc::new(float_column(|row| {
            row.enrichment.soil_temperature_level_1
        })));

        Ok(RecordBatch::try_new(schema, columns)?)
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Enrichment, WeatherSample};
    use tempfile::TempDir;

    fn small_table() -> SourceTable {
        SourceTable::new(
            vec![
                "fire_id".to_string(),
                "lat".to_string(),
                "lon".to_string(),
                "date".to_string(),
            ],
            vec![
                vec!["F1".into(), "49.5".into(), "-120.1".into(), "20230515".into()],
                vec!["F2".into(), "50.0".into(), "-119.0".into(), "garbage".into()],
            ],
            "date",
        )
        .unwrap()
    }

    fn enriched_rows() -> Vec<EnrichedRow> {
        let sample = WeatherSample {
            temperature_2m: Some(300.15),
            u_component_of_wind_10m: Some(3.0),
            v_component_of_wind_10m: Some(4.0),
            dewpoint_temperature_2m: Some(280.0),
            soil_temperature_level_1: Some(290.0),
        };

        vec![
            EnrichedRow {
                row_index: 0,
                fire_label: "F1".to_string(),
                ignition_datetime: crate::utils::normalize_raw_date("20230515"),
                enrichment: Enrichment::from_sample(&sample),
            },
            EnrichedRow {
                row_index: 1,
                fire_label: "F2".to_string(),
                ignition_datetime: None,
                enrichment: Enrichment::missing(),
            },
        ]
    }

    #[test]
    fn test_write_creates_parquet_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("enriched.parquet");

        let table = small_table();
        let writer = ParquetWriter::new();
        writer.write(&table, &enriched_rows(), &path).unwrap();

        assert!(path.exists());
        assert!(path.metadata().unwrap().len() > 0);
    }

    #[test]
    fn test_schema_has_original_plus_enrichment_columns() {
        let table = small_table();
        let schema = ParquetWriter::new().create_schema(&table);

        assert_eq!(schema.fields().len(), 4 + 7);
        assert_eq!(schema.field(0).name(), "fire_id");
        assert_eq!(schema.field(4).name(), "ignition_datetime");
        assert_eq!(schema.field(10).name(), "soil_temperature_level_1");
    }

    #[test]
    fn test_unsupported_compression_is_rejected() {
        assert!(ParquetWriter::new().with_compression("brotli9000").is_err());
    }
}
