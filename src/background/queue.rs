use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::error::{ChartError, ChartResult};

use super::worker::{PostError, TaskEnvelope, TaskResult, TaskSourceId, Worker};

/// What `enqueue` did with a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Sent to the idle worker.
    Dispatched,
    /// Stored as the source's pending task; `replaced` when an older pending
    /// task of the same source was discarded.
    Queued { replaced: bool },
    /// No worker; the caller must compute synchronously.
    Unavailable,
}

/// Per-source occupancy of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Empty,
    /// Waiting for the worker while another source's task runs.
    Pending,
    InFlight,
    InFlightWithPending,
}

/// Task the queue gave up on when its worker failed; the caller computes it
/// synchronously instead.
///
/// `payload` is `None` for the task that was running when the worker went away.
#[derive(Debug, Clone, PartialEq)]
pub struct AbandonedTask<P> {
    pub source: TaskSourceId,
    pub payload: Option<P>,
}

struct SourceSlot<P> {
    pending: Option<P>,
}

impl<P> Default for SourceSlot<P> {
    fn default() -> Self {
        Self { pending: None }
    }
}

/// Single-worker task queue with at most one in-flight task and at most one
/// pending task per source.
///
/// A newer task from a source replaces its older pending one. When the worker
/// finishes, sources are scanned round-robin starting right after the one that
/// completed, so a chatty source cannot starve the others.
///
/// A worker that rejects a task or stops delivering results is dropped; every
/// task it held is handed back through [`take_abandoned`](Self::take_abandoned)
/// and later enqueues report [`EnqueueOutcome::Unavailable`].
pub struct BackgroundTaskQueue<W: Worker> {
    worker: Option<W>,
    sources: Vec<SourceSlot<W::Payload>>,
    in_flight: Option<TaskSourceId>,
    abandoned: Vec<AbandonedTask<W::Payload>>,
}

impl<W: Worker> std::fmt::Debug for BackgroundTaskQueue<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pending = self.sources.iter().filter(|slot| slot.pending.is_some()).count();
        f.debug_struct("BackgroundTaskQueue")
            .field("has_worker", &self.worker.is_some())
            .field("sources", &self.sources.len())
            .field("pending", &pending)
            .field("in_flight", &self.in_flight)
            .field("abandoned", &self.abandoned.len())
            .finish()
    }
}

impl<W: Worker> BackgroundTaskQueue<W> {
    #[must_use]
    pub fn with_worker(worker: W) -> Self {
        Self {
            worker: Some(worker),
            sources: Vec::new(),
            in_flight: None,
            abandoned: Vec::new(),
        }
    }

    /// Queue for environments without background execution; every enqueue
    /// reports [`EnqueueOutcome::Unavailable`].
    #[must_use]
    pub fn without_worker() -> Self {
        Self {
            worker: None,
            sources: Vec::new(),
            in_flight: None,
            abandoned: Vec::new(),
        }
    }

    /// Builds a queue from a fallible worker constructor, degrading to no
    /// worker when it fails.
    pub fn from_spawn(spawn: impl FnOnce() -> ChartResult<W>) -> Self {
        match spawn() {
            Ok(worker) => Self::with_worker(worker),
            Err(err) => {
                warn!(error = %err, "background worker unavailable, tasks run synchronously");
                Self::without_worker()
            }
        }
    }

    #[must_use]
    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }

    pub fn register_source(&mut self) -> TaskSourceId {
        self.sources.push(SourceSlot::default());
        TaskSourceId::new(self.sources.len() - 1)
    }

    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none()
    }

    #[must_use]
    pub fn in_flight(&self) -> Option<TaskSourceId> {
        self.in_flight
    }

    pub fn source_state(&self, source: TaskSourceId) -> ChartResult<SourceState> {
        let slot = self.slot(source)?;
        let in_flight = self.in_flight == Some(source);
        Ok(match (in_flight, slot.pending.is_some()) {
            (false, false) => SourceState::Empty,
            (false, true) => SourceState::Pending,
            (true, false) => SourceState::InFlight,
            (true, true) => SourceState::InFlightWithPending,
        })
    }

    /// Dispatches `payload` when the worker is idle, otherwise keeps it as the
    /// source's only pending task.
    pub fn enqueue(&mut self, source: TaskSourceId, payload: W::Payload) -> ChartResult<EnqueueOutcome> {
        self.slot(source)?;
        if self.worker.is_none() {
            return Ok(EnqueueOutcome::Unavailable);
        }
        if self.in_flight.is_none() {
            let outcome = match self.dispatch(source, payload) {
                Ok(()) => EnqueueOutcome::Dispatched,
                Err(rejected) => {
                    self.disable_worker(&rejected.error, None);
                    EnqueueOutcome::Unavailable
                }
            };
            return Ok(outcome);
        }

        let slot = self.slot_mut(source)?;
        let replaced = slot.pending.replace(payload).is_some();
        trace!(source = source.index(), replaced, "task queued");
        Ok(EnqueueOutcome::Queued { replaced })
    }

    /// Drops the source's queued task; an in-flight task is never cancelled.
    pub fn cancel_pending(&mut self, source: TaskSourceId) -> ChartResult<bool> {
        if self.worker.is_none() {
            return Ok(false);
        }
        let cancelled = self.slot_mut(source)?.pending.take().is_some();
        if cancelled {
            trace!(source = source.index(), "pending task cancelled");
        }
        Ok(cancelled)
    }

    /// Collects finished results without blocking and keeps the worker busy.
    pub fn poll(&mut self) -> Vec<TaskResult<W::Output>> {
        let mut finished = Vec::new();
        while let Some(worker) = self.worker.as_mut() {
            match worker.try_recv() {
                Ok(Some(result)) => finished.extend(self.complete(result)),
                Ok(None) => break,
                Err(err) => {
                    self.disable_worker(&err, None);
                    break;
                }
            }
        }
        finished
    }

    /// Like [`poll`](Self::poll) but waits up to `timeout` for the in-flight task.
    pub fn wait(&mut self, timeout: Duration) -> Vec<TaskResult<W::Output>> {
        if self.in_flight.is_none() {
            return self.poll();
        }
        let Some(worker) = self.worker.as_mut() else {
            return Vec::new();
        };
        let mut finished = Vec::new();
        match worker.recv_timeout(timeout) {
            Ok(Some(result)) => finished.extend(self.complete(result)),
            Ok(None) => {}
            Err(err) => {
                self.disable_worker(&err, None);
                return finished;
            }
        }
        finished.extend(self.poll());
        finished
    }

    /// Removes and returns the tasks dropped when the worker failed.
    pub fn take_abandoned(&mut self) -> Vec<AbandonedTask<W::Payload>> {
        std::mem::take(&mut self.abandoned)
    }

    #[must_use]
    pub fn has_abandoned(&self) -> bool {
        !self.abandoned.is_empty()
    }

    fn complete(&mut self, result: TaskResult<W::Output>) -> Option<TaskResult<W::Output>> {
        if self.in_flight != Some(result.source) {
            warn!(
                source = result.source.index(),
                "dropping background result from a source with no task in flight"
            );
            return None;
        }
        self.in_flight = None;
        trace!(source = result.source.index(), "task completed");
        self.dispatch_next_after(result.source);
        Some(result)
    }

    fn dispatch_next_after(&mut self, completed: TaskSourceId) {
        let count = self.sources.len();
        for offset in 1..=count {
            let index = (completed.index() + offset) % count;
            if let Some(payload) = self.sources[index].pending.take() {
                if let Err(rejected) = self.dispatch(TaskSourceId::new(index), payload) {
                    self.disable_worker(&rejected.error, Some(rejected.task));
                }
                return;
            }
        }
    }

    fn dispatch(
        &mut self,
        source: TaskSourceId,
        payload: W::Payload,
    ) -> Result<(), PostError<W::Payload>> {
        let task = TaskEnvelope { source, payload };
        let Some(worker) = self.worker.as_mut() else {
            return Err(PostError {
                task,
                error: ChartError::WorkerUnavailable,
            });
        };
        worker.post(task)?;
        self.in_flight = Some(source);
        trace!(source = source.index(), "task dispatched");
        Ok(())
    }

    /// Drops the worker for good and moves every task it held to the
    /// abandoned list: the lost in-flight one, `rejected`, then the pending ones.
    fn disable_worker(&mut self, error: &ChartError, rejected: Option<TaskEnvelope<W::Payload>>) {
        warn!(error = %error, "background worker failed, disabling it");
        self.worker = None;
        if let Some(source) = self.in_flight.take() {
            self.abandoned.push(AbandonedTask {
                source,
                payload: None,
            });
        }
        if let Some(task) = rejected {
            self.abandoned.push(AbandonedTask {
                source: task.source,
                payload: Some(task.payload),
            });
        }
        for (index, slot) in self.sources.iter_mut().enumerate() {
            if let Some(payload) = slot.pending.take() {
                self.abandoned.push(AbandonedTask {
                    source: TaskSourceId::new(index),
                    payload: Some(payload),
                });
            }
        }
        debug!(
            abandoned = self.abandoned.len(),
            "background queue switched to synchronous mode"
        );
    }

    fn slot(&self, source: TaskSourceId) -> ChartResult<&SourceSlot<W::Payload>> {
        self.sources.get(source.index()).ok_or_else(|| {
            ChartError::InvalidData(format!("unknown task source {}", source.index()))
        })
    }

    fn slot_mut(&mut self, source: TaskSourceId) -> ChartResult<&mut SourceSlot<W::Payload>> {
        self.sources.get_mut(source.index()).ok_or_else(|| {
            ChartError::InvalidData(format!("unknown task source {}", source.index()))
        })
    }
}
