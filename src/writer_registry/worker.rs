//! Per-path worker: owns the ordered queue of [`Batch`]es for one path and
//! asynchronously commits each to the secondary file system in enqueue
//! order (spec.md §4.3).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, trace, warn};

use crate::path::Path;

/// How long a worker waits for a new batch before attempting to retire.
const IDLE_GRACE: Duration = Duration::from_millis(50);

/// Lifecycle state of one outbound secondary-FS write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Open,
    Submitted,
    Finished,
}

struct Job {
    stream: Box<dyn AsyncWrite + Send + Unpin>,
    sequence: u64,
}

/// Handle returned by [`super::WriterRegistry::enqueue`]. Dropping it has
/// no effect on the underlying commit, which proceeds on the worker
/// regardless — the handle exists so callers can observe completion via
/// the registry's `await`, not to own cancellation.
pub struct Batch {
    pub path: Path,
    pub sequence: u64,
}

pub(super) struct Worker {
    sender: mpsc::UnboundedSender<Job>,
    pub(super) accepting: AtomicBool,
    enqueued: AtomicU64,
    completed: AtomicU64,
    pub(super) idle_notify: Notify,
    completion_notify: Notify,
}

impl Worker {
    pub(super) fn spawn(path: Path, on_retire: impl FnOnce() + Send + 'static) -> Arc<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let worker = Arc::new(Self {
            sender,
            accepting: AtomicBool::new(true),
            enqueued: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            idle_notify: Notify::new(),
            completion_notify: Notify::new(),
        });

        let task_worker = worker.clone();
        let task_path = path.clone();
        tokio::spawn(async move {
            loop {
                match tokio::time::timeout(IDLE_GRACE, receiver.recv()).await {
                    Ok(Some(job)) => {
                        trace!(path = %task_path, sequence = job.sequence, "committing batch to secondary fs");
                        let mut stream = job.stream;
                        if let Err(err) = stream.shutdown().await {
                            warn!(path = %task_path, %err, "secondary fs batch commit failed");
                        }
                        task_worker.completed.store(job.sequence, Ordering::Release);
                        task_worker.completion_notify.notify_waiters();
                    }
                    Ok(None) => break,
                    Err(_timeout) => {
                        // Queue looks idle: stop accepting, then drain any
                        // batch that raced in before the flag flip, or
                        // retire for good.
                        task_worker.accepting.store(false, Ordering::Release);
                        match receiver.try_recv() {
                            Ok(mut job) => {
                                task_worker.accepting.store(true, Ordering::Release);
                                trace!(path = %task_path, sequence = job.sequence, "late batch reopened worker");
                                if let Err(err) = job.stream.shutdown().await {
                                    warn!(path = %task_path, %err, "secondary fs batch commit failed");
                                }
                                task_worker.completed.store(job.sequence, Ordering::Release);
                                task_worker.completion_notify.notify_waiters();
                            }
                            Err(mpsc::error::TryRecvError::Empty) => {
                                debug!(path = %task_path, "writer worker retiring, queue idle");
                                on_retire();
                                break;
                            }
                            Err(mpsc::error::TryRecvError::Disconnected) => break,
                        }
                    }
                }
                task_worker.idle_notify.notify_waiters();
            }
        });

        worker
    }

    /// Attempts to hand `stream` to this worker's commit loop. Returns
    /// `Err` with the stream handed back if the send failed — the worker
    /// raced us into retirement between the caller's `accepting` check
    /// and this call, so the job was never queued and the caller must
    /// retry the same stream against a fresh worker.
    pub(super) fn submit(
        &self,
        path: &Path,
        stream: Box<dyn AsyncWrite + Send + Unpin>,
    ) -> std::result::Result<Batch, Box<dyn AsyncWrite + Send + Unpin>> {
        let sequence = self.enqueued.fetch_add(1, Ordering::AcqRel) + 1;
        match self.sender.send(Job { stream, sequence }) {
            Ok(()) => Ok(Batch { path: path.clone(), sequence }),
            Err(mpsc::error::SendError(job)) => Err(job.stream),
        }
    }

    pub(super) fn last_enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Acquire)
    }

    /// Waits until every batch enqueued up to and including `sequence`
    /// has been committed.
    pub(super) async fn await_sequence(&self, sequence: u64) {
        loop {
            if self.completed.load(Ordering::Acquire) >= sequence {
                return;
            }
            self.completion_notify.notified().await;
        }
    }
}
