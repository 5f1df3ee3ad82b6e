//! The runtime context: everything a managed runtime needs to run mutators and GC tasks, built
//! once by a [`RuntimeBuilder`] and passed around explicitly.

use crate::coroutines::{CoroutineWorker, GcCoordinator, GcRequester};
use crate::scheduler::GCWorkersTaskPool;
use crate::thread::{MutatorThread, ThreadRegistry};
use crate::util::options::{InvalidOption, Options};
use crate::vm::Collector;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Collects the options of a runtime before creating it.
pub struct RuntimeBuilder {
    /// The options for this instance.
    pub options: Options,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    /// Create a builder with the default options, overridden by `GCPOOL_*` environment variables.
    pub fn new() -> Self {
        let mut builder = Self::new_no_env_vars();
        builder.options.read_env_var_settings();
        builder
    }

    /// Create a builder with the default options, ignoring environment variables.
    pub fn new_no_env_vars() -> Self {
        RuntimeBuilder {
            options: Options::default(),
        }
    }

    /// Set an option.  Returns `false` if the name is unknown or the value is invalid.
    pub fn set_option(&mut self, name: &str, val: &str) -> bool {
        self.options.set_from_str(name, val)
    }

    /// Set options from a whitespace-separated list of `key=value` pairs.
    pub fn set_options_bulk_by_str(&mut self, options: &str) -> Result<(), InvalidOption> {
        self.options.set_bulk_from_command_line(options)
    }

    /// Initialize the logger, create the task pool and spawn its workers.  Fails only if a
    /// worker thread cannot be spawned.
    pub fn build<C: Collector>(&self, collector: Arc<C>) -> std::io::Result<Runtime<C>> {
        crate::util::logger::init_for_runtime();

        let options = Arc::new(self.options.clone());
        let pool = GCWorkersTaskPool::new(collector.clone(), &options)?;
        let requester = Arc::new(GcRequester::new(collector));
        let coordinator = Arc::new(GcCoordinator::new(requester.clone()));
        let runtime = Runtime {
            registry: Arc::new(ThreadRegistry::new(options.suspend_wait_timeout())),
            pool,
            requester,
            coordinator,
            options,
            next_worker_id: AtomicUsize::new(1),
            gc_count: AtomicUsize::new(0),
            gc_lock: Mutex::new(()),
        };
        info!("Initialized gcpool with {:?}", runtime.options);
        Ok(runtime)
    }
}

/// A runtime instance.  Dropping it shuts the task pool down.
pub struct Runtime<C: Collector> {
    options: Arc<Options>,
    registry: Arc<ThreadRegistry>,
    pool: Arc<GCWorkersTaskPool<C>>,
    requester: Arc<GcRequester<C>>,
    coordinator: Arc<GcCoordinator<C>>,
    next_worker_id: AtomicUsize,
    gc_count: AtomicUsize,
    /// Serializes stop-the-world pauses.
    gc_lock: Mutex<()>,
}

impl<C: Collector> Runtime<C> {
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn thread_registry(&self) -> &Arc<ThreadRegistry> {
        &self.registry
    }

    pub fn task_pool(&self) -> &Arc<GCWorkersTaskPool<C>> {
        &self.pool
    }

    pub fn gc_requester(&self) -> &Arc<GcRequester<C>> {
        &self.requester
    }

    pub fn coordinator(&self) -> &Arc<GcCoordinator<C>> {
        &self.coordinator
    }

    /// Register a mutator.  It starts in a safe region.
    pub fn register_mutator(&self, name: impl Into<String>) -> Arc<MutatorThread> {
        self.registry.register(name)
    }

    pub fn unregister_mutator(&self, thread: &Arc<MutatorThread>) -> bool {
        self.registry.unregister(thread)
    }

    /// Create a coroutine worker that notifies this runtime's coordinator, configured by
    /// `external_scheduling` and `mutator_mailbox_capacity`.
    pub fn create_coroutine_worker(
        &self,
        name: impl Into<String>,
    ) -> std::io::Result<CoroutineWorker<GcCoordinator<C>>> {
        let id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
        CoroutineWorker::new(
            id,
            name,
            self.coordinator.clone(),
            self.options.external_scheduling,
            self.options.mutator_mailbox_capacity,
        )
    }

    /// Request a GC.  The collector's `schedule_collection` is called unless a GC is already
    /// scheduled.
    pub fn request_gc(&self) {
        self.requester.request();
    }

    /// Run one stop-the-world pause: stop all mutators, let `enqueue` submit GC tasks, wait for
    /// all tasks to be executed, then resume mutators.  Pauses are serialized.  Must not be
    /// called from a running mutator or from a GC worker.
    ///
    /// A GC requested during the pause is scheduled when a mutator next becomes active on a
    /// coroutine worker, or right after the pause if `external_scheduling` is off.
    pub fn stop_the_world<F>(&self, enqueue: F)
    where
        F: FnOnce(&GCWorkersTaskPool<C>),
    {
        let _gc = self.gc_lock.lock().unwrap();
        let start = Instant::now();

        let mutators = self.registry.stop_all_mutators();
        self.requester.clear_request();
        enqueue(&self.pool);
        self.pool.wait_until_tasks_end();
        let count = self.gc_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.requester.on_gc_finished();
        self.registry.resume_mutators();
        if !self.options.external_scheduling {
            // No coroutine worker reports resumed mutators.
            self.requester.on_mutator_resumed();
        }
        info!(
            "GC #{} finished: {} mutators paused for {:?}",
            count,
            mutators,
            start.elapsed()
        );
    }

    /// The number of pauses completed.
    pub fn gc_count(&self) -> usize {
        self.gc_count.load(Ordering::SeqCst)
    }

    /// Shut down the task pool.  Idempotent.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}

impl<C: Collector> Drop for Runtime<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
