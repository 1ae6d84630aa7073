use serde::Deserialize;
use validator::Validate;

use crate::error::{EnrichmentError, Result};
use crate::utils::constants::{
    DEFAULT_BATCH_DELAY_SECS, DEFAULT_BATCH_SIZE, DEFAULT_ERA5_BASE_URL, DEFAULT_MAX_RETRIES,
};

/// Run configuration resolved from the environment, then overridden by CLI
/// flags. Built once in the CLI layer and passed down explicitly; nothing
/// below the CLI reads the process environment.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    /// Project identifier forwarded to the reanalysis API (`PROJECT_NAME`)
    #[validate(length(min = 1))]
    pub project_name: String,

    /// Records per batch (`BATCH_SIZE`)
    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1))]
    pub batch_size: usize,

    /// Seconds to pause between batches (`BATCH_DELAY`)
    #[serde(default = "default_batch_delay")]
    pub batch_delay: u64,

    /// Retries per record on transient provider failures (`MAX_RETRIES`)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Reanalysis API base URL (`ERA5_BASE_URL`)
    #[serde(default = "default_base_url")]
    pub era5_base_url: String,
}

impl Settings {
    /// Resolve settings from environment variables.
    pub fn from_env() -> Result<Self> {
        let loader = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .map_err(|e| EnrichmentError::Config(e.to_string()))?;

        let settings: Settings = loader.try_deserialize().map_err(|e| {
            EnrichmentError::Config(format!(
                "failed to load settings from the environment (is PROJECT_NAME set?): {}",
                e
            ))
        })?;

        settings.validate()?;
        Ok(settings)
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_batch_delay() -> u64 {
    DEFAULT_BATCH_DELAY_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_base_url() -> String {
    DEFAULT_ERA5_BASE_URL.to_string()
}
