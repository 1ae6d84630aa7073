use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{EnrichmentError, Result};
use crate::models::{partition, BatchStatus, EnrichedRow, Enrichment, FireRecord};
use crate::processors::checkpoint::CheckpointStore;
use crate::processors::retry::{decide, RetryDecision};
use crate::providers::WeatherProvider;
use crate::utils::progress::ProgressReporter;

/// Engine tunables, resolved by the caller before construction
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub max_retries: u32,
}

/// Per-batch accounting surfaced to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub index: usize,
    pub enriched: usize,
    pub missing: usize,
    pub status: BatchStatus,
    /// True when the batch was loaded from a prior run's artifact
    pub resumed: bool,
}

/// The completed run: every input row, in original order
#[derive(Debug)]
pub struct RunOutcome {
    pub rows: Vec<EnrichedRow>,
    pub batches: Vec<BatchSummary>,
}

impl RunOutcome {
    pub fn missing_total(&self) -> usize {
        self.batches.iter().map(|b| b.missing).sum()
    }
}

/// Drives enrichment of a full dataset to completion: fixed-size batches,
/// bounded immediate retries on transient failures, one durable partial
/// artifact and checkpoint advance per batch, and a fixed pause between
/// batches to stay inside provider rate limits.
pub struct BatchEngine<P: WeatherProvider> {
    provider: P,
    checkpoints: CheckpointStore,
    settings: EngineSettings,
}

impl<P: WeatherProvider> BatchEngine<P> {
    pub fn new(provider: P, checkpoints: CheckpointStore, settings: EngineSettings) -> Self {
        Self {
            provider,
            checkpoints,
            settings,
        }
    }

    /// Enrich `records`, resuming past any batches a previous run committed.
    /// Per-record failures degrade to explicit missing enrichment; only
    /// checkpoint-store failures abort the run.
    pub async fn run(
        &self,
        records: &[FireRecord],
        progress: Option<&ProgressReporter>,
    ) -> Result<RunOutcome> {
        if self.settings.batch_size == 0 {
            return Err(EnrichmentError::Config(
                "batch size must be at least 1".to_string(),
            ));
        }

        let mut batches = partition(records.len(), self.settings.batch_size);
        let total_batches = batches.len();

        let resume_from = self
            .checkpoints
            .load(self.settings.batch_size, records.len())?
            .and_then(|checkpoint| checkpoint.last_completed);
        if let Some(last) = resume_from {
            info!(last_completed = last, "resuming from checkpoint");
        }

        let mut rows = Vec::with_capacity(records.len());
        let mut summaries = Vec::with_capacity(total_batches);

        for batch in &mut batches {
            let already_done = resume_from.is_some_and(|last| batch.index <= last);
            if already_done {
                let loaded = self.checkpoints.load_partial(batch.index)?;
                let missing = loaded.iter().filter(|r| r.enrichment.is_missing()).count();

                batch.status = terminal_status(missing);
                summaries.push(BatchSummary {
                    index: batch.index,
                    enriched: loaded.len() - missing,
                    missing,
                    status: batch.status,
                    resumed: true,
                });

                debug!(batch = batch.index, rows = loaded.len(), "batch already committed, loading artifact");
                if let Some(p) = progress {
                    p.increment(batch.len() as u64);
                }
                rows.extend(loaded);
                continue;
            }

            batch.status = BatchStatus::InProgress;
            info!(
                batch = batch.index + 1,
                total = total_batches,
                rows = batch.len(),
                "processing batch"
            );
            if let Some(p) = progress {
                p.set_message(&format!("Batch {}/{}", batch.index + 1, total_batches));
            }

            let mut batch_rows = Vec::with_capacity(batch.len());
            let mut missing = 0usize;

            for record in &records[batch.rows.clone()] {
                let enrichment = self.enrich_record(record).await;
                if enrichment.is_missing() {
                    missing += 1;
                }

                batch_rows.push(EnrichedRow {
                    row_index: record.row_index,
                    fire_label: record.fire_label.clone(),
                    ignition_datetime: record.ignition_datetime,
                    enrichment,
                });

                if let Some(p) = progress {
                    p.increment(1);
                }
            }

            // The partial artifact lands before the checkpoint moves; a crash
            // between the two recomputes this batch on the next run
            self.checkpoints.save_partial(batch.index, &batch_rows)?;
            self.checkpoints
                .advance(batch.index, self.settings.batch_size, records.len())?;

            batch.status = terminal_status(missing);
            info!(
                batch = batch.index + 1,
                enriched = batch.len() - missing,
                missing,
                "batch committed"
            );
            summaries.push(BatchSummary {
                index: batch.index,
                enriched: batch.len() - missing,
                missing,
                status: batch.status,
                resumed: false,
            });
            rows.extend(batch_rows);

            if batch.index + 1 < total_batches && !self.settings.batch_delay.is_zero() {
                debug!(delay_secs = self.settings.batch_delay.as_secs(), "pausing before next batch");
                tokio::time::sleep(self.settings.batch_delay).await;
            }
        }

        Ok(RunOutcome {
            rows,
            batches: summaries,
        })
    }

    /// Enrich one record, degrading to missing data whenever the provider
    /// cannot help within the retry budget.
    async fn enrich_record(&self, record: &FireRecord) -> Enrichment {
        let Some(timestamp) = record.ignition_datetime else {
            warn!(
                fire = %record.fire_label,
                raw = %record.raw_date,
                "unparseable ignition date, recording missing enrichment"
            );
            return Enrichment::missing();
        };
        let (Some(latitude), Some(longitude)) = (record.latitude, record.longitude) else {
            warn!(fire = %record.fire_label, "missing or out-of-range coordinates");
            return Enrichment::missing();
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.provider.fetch(latitude, longitude, timestamp).await {
                Ok(sample) => return Enrichment::from_sample(&sample),
                Err(error) => match decide(attempt, self.settings.max_retries, &error) {
                    RetryDecision::Retry => {
                        debug!(fire = %record.fire_label, attempt, %error, "retrying enrichment");
                    }
                    RetryDecision::GiveUp => {
                        warn!(fire = %record.fire_label, attempt, %error, "giving up on record");
                        return Enrichment::missing();
                    }
                },
            }
        }
    }
}

fn terminal_status(missing: usize) -> BatchStatus {
    if missing > 0 {
        BatchStatus::CompletedWithMissing
    } else {
        BatchStatus::Completed
    }
}
