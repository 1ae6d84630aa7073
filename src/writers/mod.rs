pub mod dataset_writer;
pub mod parquet_writer;

pub use dataset_writer::{default_output_path, DatasetWriter, OutputFormat};
pub use parquet_writer::ParquetWriter;
