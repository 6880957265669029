use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{ChartError, ChartResult};

/// Identity of a logical producer of background work.
///
/// Sources are numbered in registration order, which is also the round-robin
/// order used when the worker frees up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskSourceId(usize);

impl TaskSourceId {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Task payload tagged with the source it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskEnvelope<P> {
    pub source: TaskSourceId,
    pub payload: P,
}

/// Worker output tagged with the originating source.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult<R> {
    pub source: TaskSourceId,
    pub output: R,
}

/// Task the worker could not accept, handed back with the reason.
#[derive(Debug)]
pub struct PostError<P> {
    pub task: TaskEnvelope<P>,
    pub error: ChartError,
}

/// Executor on the far side of a message channel.
///
/// Payloads go in, tagged results come out; nothing is shared between the two
/// sides, so tasks must be pure functions of their payload.
pub trait Worker {
    type Payload;
    type Output;

    fn post(&mut self, task: TaskEnvelope<Self::Payload>) -> Result<(), PostError<Self::Payload>>;

    /// Next finished result, `Ok(None)` when none is ready yet.
    ///
    /// Fails with [`ChartError::WorkerUnavailable`] once the worker can no
    /// longer deliver results, for example after its task panicked.
    fn try_recv(&mut self) -> ChartResult<Option<TaskResult<Self::Output>>>;

    /// Waits up to `timeout` for a result; workers without blocking support poll once.
    fn recv_timeout(&mut self, _timeout: Duration) -> ChartResult<Option<TaskResult<Self::Output>>> {
        self.try_recv()
    }
}

/// Worker backed by one dedicated OS thread and two `mpsc` channels.
///
/// Dropping the worker closes its inbox, which ends the thread.
pub struct ThreadWorker<P, R> {
    sender: Option<mpsc::Sender<TaskEnvelope<P>>>,
    results: mpsc::Receiver<TaskResult<R>>,
    handle: Option<JoinHandle<()>>,
}

impl<P, R> std::fmt::Debug for ThreadWorker<P, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadWorker")
            .field("running", &self.handle.is_some())
            .finish()
    }
}

impl<P, R> ThreadWorker<P, R>
where
    P: Send + 'static,
    R: Send + 'static,
{
    /// Spawns a thread named `name` that runs `task` for every posted payload.
    pub fn spawn<F>(name: &str, task: F) -> ChartResult<Self>
    where
        F: Fn(P) -> R + Send + 'static,
    {
        let (sender, inbox) = mpsc::channel::<TaskEnvelope<P>>();
        let (outbox, results) = mpsc::channel::<TaskResult<R>>();

        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || worker_loop(inbox, outbox, task))
            .map_err(|err| {
                warn!(error = %err, "failed to spawn background worker thread");
                ChartError::WorkerUnavailable
            })?;
        debug!(worker = name, "background worker started");

        Ok(Self {
            sender: Some(sender),
            results,
            handle: Some(handle),
        })
    }
}

impl<P, R> Worker for ThreadWorker<P, R> {
    type Payload = P;
    type Output = R;

    fn post(&mut self, task: TaskEnvelope<P>) -> Result<(), PostError<P>> {
        let Some(sender) = self.sender.as_ref() else {
            return Err(PostError {
                task,
                error: ChartError::WorkerUnavailable,
            });
        };
        sender.send(task).map_err(|mpsc::SendError(task)| PostError {
            task,
            error: ChartError::WorkerUnavailable,
        })
    }

    fn try_recv(&mut self) -> ChartResult<Option<TaskResult<R>>> {
        match self.results.try_recv() {
            Ok(result) => Ok(Some(result)),
            Err(mpsc::TryRecvError::Empty) => Ok(None),
            Err(mpsc::TryRecvError::Disconnected) => Err(ChartError::WorkerUnavailable),
        }
    }

    fn recv_timeout(&mut self, timeout: Duration) -> ChartResult<Option<TaskResult<R>>> {
        match self.results.recv_timeout(timeout) {
            Ok(result) => Ok(Some(result)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(ChartError::WorkerUnavailable),
        }
    }
}

impl<P, R> Drop for ThreadWorker<P, R> {
    fn drop(&mut self) {
        self.sender = None;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn worker_loop<P, R, F>(
    inbox: mpsc::Receiver<TaskEnvelope<P>>,
    outbox: mpsc::Sender<TaskResult<R>>,
    task: F,
) where
    F: Fn(P) -> R,
{
    while let Ok(envelope) = inbox.recv() {
        let result = TaskResult {
            source: envelope.source,
            output: task(envelope.payload),
        };
        if outbox.send(result).is_err() {
            return;
        }
    }
}
