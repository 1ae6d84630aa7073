use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::HumanDuration;
use tracing::{debug, info};

use crate::cli::args::{Cli, Commands};
use crate::cli::input;
use crate::config::Settings;
use crate::error::Result;
use crate::processors::{default_work_dir, BatchEngine, CheckpointStore, EngineSettings};
use crate::providers::Era5LandClient;
use crate::readers::SourceReader;
use crate::utils::progress::ProgressReporter;
use crate::writers::{default_output_path, DatasetWriter, OutputFormat};

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Enrich {
            source,
            date_column,
            table,
            output,
            format,
            batch_size,
            batch_delay,
            max_retries,
            work_dir,
            fresh,
        } => {
            run_enrich(EnrichParams {
                source,
                date_column,
                table,
                output,
                format,
                batch_size,
                batch_delay,
                max_retries,
                work_dir,
                fresh,
            })
            .await
        }

        Commands::Status { work_dir } => run_status(work_dir),
    }
}

struct EnrichParams {
    source: Option<String>,
    date_column: Option<String>,
    table: Option<String>,
    output: Option<PathBuf>,
    format: String,
    batch_size: Option<usize>,
    batch_delay: Option<u64>,
    max_retries: Option<u32>,
    work_dir: Option<PathBuf>,
    fresh: bool,
}

async fn run_enrich(params: EnrichParams) -> Result<()> {
    let started = Instant::now();
    let settings = Settings::from_env()?;
    debug!(?settings, "resolved settings");

    // Thin input-collection layer: everything below sees resolved values
    let source = match params.source {
        Some(source) => source,
        None => input::prompt_source()?,
    };
    let date_column = match params.date_column {
        Some(column) => column,
        None => input::prompt_date_column()?,
    };
    let table = match params.table {
        Some(table) => Some(table),
        None if is_sqlite_source(&source) => input::prompt_table_name(&source)?,
        None => None,
    };

    let format = OutputFormat::parse(&params.format)?;
    let output = params.output.unwrap_or_else(|| default_output_path(format));
    let work_dir = params.work_dir.unwrap_or_else(default_work_dir);

    let engine_settings = EngineSettings {
        batch_size: params.batch_size.unwrap_or(settings.batch_size),
        batch_delay: Duration::from_secs(params.batch_delay.unwrap_or(settings.batch_delay)),
        max_retries: params.max_retries.unwrap_or(settings.max_retries),
    };

    println!("Loading records from {}...", source);
    let reader = SourceReader::new();
    let dataset = reader.load(&source, &date_column, table.as_deref()).await?;
    let records = dataset.records();

    let usable = records.iter().filter(|r| r.enrichable()).count();
    println!(
        "Loaded {} records ({} enrichable, {} with unusable dates or coordinates)",
        records.len(),
        usable,
        records.len() - usable
    );

    if records.is_empty() {
        println!("Nothing to enrich");
        return Ok(());
    }

    let checkpoints = CheckpointStore::open(&work_dir)?;
    if params.fresh {
        checkpoints.clear()?;
        println!("Discarded existing checkpoint state");
    }
    info!(work_dir = %work_dir.display(), "checkpoint store ready");

    let provider = Era5LandClient::new(
        settings.era5_base_url.clone(),
        settings.project_name.clone(),
    );
    let engine = BatchEngine::new(provider, checkpoints, engine_settings);

    let progress = ProgressReporter::new(records.len() as u64, "Enriching records...", false);
    let outcome = engine.run(&records, Some(&progress)).await?;
    progress.finish_with_message("Enrichment complete");

    println!();
    for summary in &outcome.batches {
        let origin = if summary.resumed {
            " (from checkpoint)"
        } else {
            ""
        };
        println!(
            "Batch {}: {} enriched, {} missing{}",
            summary.index + 1,
            summary.enriched,
            summary.missing,
            origin
        );
    }

    let writer = DatasetWriter::new(format);
    let written = writer.write(&dataset, &outcome.rows, &output)?;

    println!("\n{} rows written to {}", outcome.rows.len(), written.display());
    println!(
        "{} rows have missing enrichment data",
        outcome.missing_total()
    );
    println!("Done in {}", HumanDuration(started.elapsed()));

    Ok(())
}

fn run_status(work_dir: Option<PathBuf>) -> Result<()> {
    let work_dir = work_dir.unwrap_or_else(default_work_dir);
    let store = CheckpointStore::new(&work_dir);

    match store.peek()? {
        None => println!("No checkpoint found in {}", work_dir.display()),
        Some(checkpoint) => {
            let completed = checkpoint.last_completed.map(|idx| idx + 1).unwrap_or(0);
            let total = checkpoint.total_records.div_ceil(checkpoint.batch_size);

            println!(
                "Checkpoint: {} of {} batches completed ({} records, batch size {})",
                completed, total, checkpoint.total_records, checkpoint.batch_size
            );
            println!(
                "Partial artifacts on disk: {}",
                store.artifact_count()?
            );
        }
    }

    Ok(())
}

fn is_sqlite_source(source: &str) -> bool {
    let lower = source.to_lowercase();
    lower.ends_with(".db") || lower.ends_with(".sqlite")
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_directive = if verbose {
        "wildfire_enricher=debug"
    } else {
        "wildfire_enricher=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    Ok(())
}
