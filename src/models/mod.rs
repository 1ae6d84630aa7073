pub mod batch;
pub mod record;
pub mod weather;

pub use batch::{partition, Batch, BatchStatus};
pub use record::{ColumnRoles, FireRecord, SourceTable};
pub use weather::{compass_label, EnrichedRow, Enrichment, WeatherSample};
