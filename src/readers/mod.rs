pub mod source_reader;

pub use source_reader::{SourceFormat, SourceReader};
