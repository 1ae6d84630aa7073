pub mod constants;
pub mod dates;
pub mod progress;

pub use constants::*;
pub use dates::normalize_raw_date;
pub use progress::ProgressReporter;
