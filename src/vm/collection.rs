use crate::scheduler::{GCWorkerContext, GCWorkersTask};

/// The collector that owns a task pool.  The pool only distributes tasks and tracks their
/// completion; what a task does is entirely up to the collector.
pub trait Collector: 'static + Send + Sync + Sized {
    /// The data a task carries, e.g. a marking stack or a range of moved objects.
    type Payload: Send + 'static;

    /// Execute one task.  This is called concurrently from all the GC worker threads and from
    /// threads helping to drain the pool, so it must be reentrant.
    ///
    /// Task execution is expected to be total.  A panic escaping this function is fatal for the
    /// executing thread, and the pool will never observe the task as solved.
    ///
    /// Arguments:
    /// * `task`: The task to execute.  It is consumed.
    /// * `worker`: The context of the executing thread.
    fn worker_task_processing(
        &self,
        task: GCWorkersTask<Self::Payload>,
        worker: &mut GCWorkerContext,
    );

    /// Called by [`crate::coroutines::GcRequester`] when a requested GC should start.  The
    /// collector usually wakes up its GC thread, which eventually calls
    /// [`crate::Runtime::stop_the_world`].  The default implementation does nothing.
    fn schedule_collection(&self) {}
}
