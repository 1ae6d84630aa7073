use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EnrichmentError, Result};
use crate::models::{EnrichedRow, Enrichment};
use crate::utils::constants::{BATCH_ARTIFACT_PREFIX, CHECKPOINT_FILE, DEFAULT_OUTPUT_DIRNAME};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Columns of a partial batch artifact: record identity plus the enrichment
/// fields, one CSV per committed batch
const PARTIAL_COLUMNS: &[&str] = &[
    "row_index",
    "fire_label",
    "ignition_datetime",
    "temperature_c",
    "wind_speed_ms",
    "wind_direction_deg",
    "wind_direction",
    "humidity_dewpoint_temperature_2m",
    "soil_temperature_level_1",
];

/// Persisted marker of the highest fully processed batch. The batch size and
/// record count fingerprint the partitioning inputs: a resume against
/// different inputs is rejected instead of silently misapplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last_completed: Option<usize>,
    pub batch_size: usize,
    pub total_records: usize,
}

/// Durable store for the checkpoint and per-batch partial artifacts. All
/// writes go through a tempfile-then-rename so a crash never leaves a torn
/// file behind; at worst the checkpoint lags the newest artifact and that
/// batch is recomputed idempotently.
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the store, making the work directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(dir);
        fs::create_dir_all(&store.dir)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Read the checkpoint without fingerprint validation. Unreadable state
    /// (torn write from a crash) reads as no checkpoint at all.
    pub fn peek(&self) -> Result<Option<Checkpoint>> {
        let path = self.dir.join(CHECKPOINT_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read_to_string(&path)?;
        match serde_json::from_str(&data) {
            Ok(checkpoint) => Ok(Some(checkpoint)),
            Err(e) => {
                warn!("discarding unreadable checkpoint: {}", e);
                Ok(None)
            }
        }
    }

    /// Load the checkpoint for a run with the given partitioning inputs.
    pub fn load(&self, batch_size: usize, total_records: usize) -> Result<Option<Checkpoint>> {
        let Some(checkpoint) = self.peek()? else {
            return Ok(None);
        };

        if checkpoint.batch_size != batch_size || checkpoint.total_records != total_records {
            return Err(EnrichmentError::Checkpoint(format!(
                "checkpoint in {} was written for batch_size={} over {} records; \
                 rerun with matching parameters or start over with --fresh",
                self.dir.display(),
                checkpoint.batch_size,
                checkpoint.total_records
            )));
        }

        Ok(Some(checkpoint))
    }

    /// Mark `batch_index` as the highest completed batch.
    pub fn advance(&self, batch_index: usize, batch_size: usize, total_records: usize) -> Result<()> {
        let checkpoint = Checkpoint {
            last_completed: Some(batch_index),
            batch_size,
            total_records,
        };

        debug!(batch = batch_index, "advancing checkpoint");
        self.write_atomic(CHECKPOINT_FILE, serde_json::to_string_pretty(&checkpoint)?.as_bytes())
    }

    /// Drop all checkpoint state and partial artifacts.
    pub fn clear(&self) -> Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
        }
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Persist a batch's rows as its partial artifact.
    pub fn save_partial(&self, batch_index: usize, rows: &[EnrichedRow]) -> Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(PARTIAL_COLUMNS)?;

        for row in rows {
            let mut cells = vec![row.row_index.to_string(), row.fire_label.clone()];
            cells.extend(row.cells());
            writer.write_record(&cells)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| EnrichmentError::Checkpoint(e.to_string()))?;
        self.write_atomic(&artifact_name(batch_index), &bytes)
    }

    /// Load a previously committed batch's rows.
    pub fn load_partial(&self, batch_index: usize) -> Result<Vec<EnrichedRow>> {
        let path = self.dir.join(artifact_name(batch_index));
        let mut reader = csv::Reader::from_path(&path).map_err(|e| {
            EnrichmentError::Checkpoint(format!(
                "missing partial artifact for batch {}: {}",
                batch_index, e
            ))
        })?;

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let cell = |idx: usize| record.get(idx).unwrap_or("");

            let row_index = cell(0).parse::<usize>().map_err(|_| {
                EnrichmentError::Checkpoint(format!("corrupt partial artifact: {}", path.display()))
            })?;

            rows.push(EnrichedRow {
                row_index,
                fire_label: cell(1).to_string(),
                ignition_datetime: parse_timestamp(cell(2)),
                enrichment: Enrichment {
                    temperature_c: parse_optional(cell(3)),
                    wind_speed_ms: parse_optional(cell(4)),
                    wind_direction_deg: parse_optional(cell(5)),
                    wind_direction: non_empty(cell(6)),
                    humidity_dewpoint_temperature_2m: parse_optional(cell(7)),
                    soil_temperature_level_1: parse_optional(cell(8)),
                },
            });
        }

        Ok(rows)
    }

    /// Number of partial artifacts currently on disk.
    pub fn artifact_count(&self) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let mut count = 0;
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.starts_with(BATCH_ARTIFACT_PREFIX) && name.ends_with(".csv") {
                count += 1;
            }
        }

        Ok(count)
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.persist(self.dir.join(name))
            .map_err(|e| EnrichmentError::Checkpoint(e.to_string()))?;
        Ok(())
    }
}

fn artifact_name(batch_index: usize) -> String {
    format!("{}{:05}.csv", BATCH_ARTIFACT_PREFIX, batch_index)
}

fn parse_timestamp(cell: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(cell, TIMESTAMP_FORMAT).ok()
}

fn parse_optional(cell: &str) -> Option<f64> {
    if cell.is_empty() {
        None
    } else {
        cell.parse().ok()
    }
}

fn non_empty(cell: &str) -> Option<String> {
    if cell.is_empty() {
        None
    } else {
        Some(cell.to_string())
    }
}

/// Default checkpoint location, beside the default output directory
pub fn default_work_dir() -> PathBuf {
    dirs::download_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_OUTPUT_DIRNAME)
        .join("checkpoints")
}
