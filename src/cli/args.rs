use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wildfire-enricher")]
#[command(about = "Enrich wildfire occurrence records with ERA5-Land weather data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enrich a wildfire dataset with historical weather data
    Enrich {
        #[arg(
            short,
            long,
            help = "Input file path or URL (CSV, XLS/XLSX, JSON, or SQLite)"
        )]
        source: Option<String>,

        #[arg(short, long, help = "Name of the raw date column in the source")]
        date_column: Option<String>,

        #[arg(long, help = "Table name for SQLite sources [default: first user table]")]
        table: Option<String>,

        #[arg(
            short,
            long,
            help = "Output file path [default: ~/Downloads/temp_downloads/weather_data.<ext>]"
        )]
        output: Option<PathBuf>,

        #[arg(
            short,
            long,
            default_value = "csv",
            help = "Output format: csv, json, xlsx, sqlite, parquet"
        )]
        format: String,

        #[arg(long, help = "Records per batch [default: BATCH_SIZE or 100]")]
        batch_size: Option<usize>,

        #[arg(long, help = "Seconds to pause between batches [default: BATCH_DELAY or 3]")]
        batch_delay: Option<u64>,

        #[arg(
            long,
            help = "Retries per record on transient failures [default: MAX_RETRIES or 3]"
        )]
        max_retries: Option<u32>,

        #[arg(long, help = "Checkpoint and partial-artifact directory")]
        work_dir: Option<PathBuf>,

        #[arg(
            long,
            default_value = "false",
            help = "Discard any existing checkpoint and start over"
        )]
        fresh: bool,
    },

    /// Show checkpoint state left behind by an interrupted run
    Status {
        #[arg(long, help = "Checkpoint and partial-artifact directory")]
        work_dir: Option<PathBuf>,
    },
}
