use super::task::GCWorkersTask;
use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicBool, Ordering};

/// Why the pool did not accept a task.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// The queue is at its capacity.
    QueueFull,
    /// The pool has been shut down.
    Closed,
}

/// A task the pool did not accept.  The task is handed back so that the caller can execute it
/// synchronously.
pub struct RejectedTask<P> {
    pub task: GCWorkersTask<P>,
    pub reason: RejectReason,
}

impl<P> RejectedTask<P> {
    pub fn into_task(self) -> GCWorkersTask<P> {
        self.task
    }
}

impl<P> std::fmt::Debug for RejectedTask<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RejectedTask")
            .field("task", &self.task)
            .field("reason", &self.reason)
            .finish()
    }
}

impl<P> std::fmt::Display for RejectedTask<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let why = match self.reason {
            RejectReason::QueueFull => "the task queue is full",
            RejectReason::Closed => "the task pool is closed",
        };
        write!(f, "{} was not added: {}", self.task.get_type(), why)
    }
}

impl<P> std::error::Error for RejectedTask<P> {}

/// The bounded queue of a task pool.  Pushing and popping are lock-free.  Waking up idle workers
/// is the job of the `WorkerMonitor`.
pub(crate) struct TaskQueue<P> {
    queue: ArrayQueue<GCWorkersTask<P>>,
    closed: AtomicBool,
}

impl<P> TaskQueue<P> {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            closed: AtomicBool::new(false),
        }
    }

    pub fn push(&self, task: GCWorkersTask<P>) -> Result<(), RejectedTask<P>> {
        if self.is_closed() {
            return Err(RejectedTask {
                task,
                reason: RejectReason::Closed,
            });
        }
        self.queue.push(task).map_err(|task| RejectedTask {
            task,
            reason: RejectReason::QueueFull,
        })
    }

    pub fn pop(&self) -> Option<GCWorkersTask<P>> {
        self.queue.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Stop accepting tasks.  Tasks already queued can still be popped.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
