/// Engine defaults, overridable from the environment or the command line
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_BATCH_DELAY_SECS: u64 = 3;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Reanalysis point API
pub const DEFAULT_ERA5_BASE_URL: &str = "https://api.era5-land.dev/v1";

/// Hourly variables requested from the provider, per record
pub const ERA5_HOURLY_VARIABLES: &[&str] = &[
    "temperature_2m",
    "u_component_of_wind_10m",
    "v_component_of_wind_10m",
    "dewpoint_temperature_2m",
    "soil_temperature_level_1",
];

/// Enrichment columns appended to the original dataset, in output order
pub const ENRICHMENT_COLUMNS: &[&str] = &[
    "ignition_datetime",
    "temperature_c",
    "wind_speed_ms",
    "wind_direction_deg",
    "wind_direction",
    "humidity_dewpoint_temperature_2m",
    "soil_temperature_level_1",
];

/// Output defaults
pub const DEFAULT_OUTPUT_DIRNAME: &str = "temp_downloads";
pub const DEFAULT_OUTPUT_BASENAME: &str = "weather_data";

/// Checkpoint store file names
pub const CHECKPOINT_FILE: &str = "checkpoint.json";
pub const BATCH_ARTIFACT_PREFIX: &str = "batch_";

/// Physical conversions
pub const KELVIN_OFFSET: f64 = 273.15;

/// Parquet defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
