//! Single-worker background computation with per-source de-duplication.

mod queue;
mod worker;

pub use queue::{AbandonedTask, BackgroundTaskQueue, EnqueueOutcome, SourceState};
pub use worker::{PostError, TaskEnvelope, TaskResult, TaskSourceId, ThreadWorker, Worker};
