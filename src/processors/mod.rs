pub mod batch_engine;
pub mod checkpoint;
pub mod retry;

pub use batch_engine::{BatchEngine, BatchSummary, EngineSettings, RunOutcome};
pub use checkpoint::{default_work_dir, Checkpoint, CheckpointStore};
pub use retry::{decide, RetryDecision};
