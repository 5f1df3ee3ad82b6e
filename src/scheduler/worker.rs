use super::stat::WorkerLocalStat;
use super::task_pool::GCWorkersTaskPool;
use crate::vm::Collector;
use atomic::Atomic;
use atomic_refcell::{AtomicRef, AtomicRefCell, AtomicRefMut};
use bytemuck::NoUninit;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// What an execution context (a GC worker or a coroutine worker) is doing.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, NoUninit, strum_macros::Display)]
pub enum WorkerState {
    Idle,
    RunningMutator,
    RunningGcTask,
}

static_assertions::assert_eq_size!(WorkerState, u8);

/// The context passed to the collector with every task.
///
/// A task executed by a dedicated GC worker sees the worker's ordinal.  A task executed by a
/// thread that helps draining the pool, or executed synchronously after the pool rejected it,
/// sees `None`.
pub struct GCWorkerContext {
    ordinal: Option<usize>,
    /// Set for dedicated workers.  Helpers record statistics into the pool.
    shared: Option<Arc<GCWorkerShared>>,
    tasks_executed: usize,
}

impl GCWorkerContext {
    pub(crate) fn for_worker(shared: Arc<GCWorkerShared>) -> Self {
        Self {
            ordinal: Some(shared.ordinal),
            shared: Some(shared),
            tasks_executed: 0,
        }
    }

    /// The context of a thread that is not a dedicated GC worker.
    pub fn helper() -> Self {
        Self {
            ordinal: None,
            shared: None,
            tasks_executed: 0,
        }
    }

    pub fn ordinal(&self) -> Option<usize> {
        self.ordinal
    }

    pub fn is_helper(&self) -> bool {
        self.ordinal.is_none()
    }

    /// The number of tasks executed with this context.
    pub fn tasks_executed(&self) -> usize {
        self.tasks_executed
    }

    pub(crate) fn on_task_executed(&mut self) {
        self.tasks_executed += 1;
    }

    pub(crate) fn shared(&self) -> Option<&Arc<GCWorkerShared>> {
        self.shared.as_ref()
    }
}

/// The part shared between a GC worker thread and the pool.
pub struct GCWorkerShared {
    pub ordinal: usize,
    state: Atomic<WorkerState>,
    /// Written only by the worker thread.  Read by the pool when statistics are requested.
    stat: AtomicRefCell<WorkerLocalStat>,
}

impl GCWorkerShared {
    fn new(ordinal: usize) -> Self {
        Self {
            ordinal,
            state: Atomic::new(WorkerState::Idle),
            stat: Default::default(),
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state.load(Ordering::Acquire)
    }

    pub(crate) fn set_state(&self, state: WorkerState) {
        self.state.store(state, Ordering::Release);
    }

    /// Borrow the statistics for reading.  Returns `None` if the worker is recording right now.
    pub(crate) fn try_borrow_stat(&self) -> Option<AtomicRef<'_, WorkerLocalStat>> {
        self.stat.try_borrow().ok()
    }

    /// Borrow the statistics for recording.  Returns `None` if they are being read right now.
    pub(crate) fn try_borrow_stat_mut(&self) -> Option<AtomicRefMut<'_, WorkerLocalStat>> {
        self.stat.try_borrow_mut().ok()
    }
}

/// A dedicated GC worker.  This part is privately owned by the worker thread.
pub struct GCWorker<C: Collector> {
    pub ordinal: usize,
    pool: Arc<GCWorkersTaskPool<C>>,
    context: GCWorkerContext,
    shared: Arc<GCWorkerShared>,
}

impl<C: Collector> GCWorker<C> {
    fn new(shared: Arc<GCWorkerShared>, pool: Arc<GCWorkersTaskPool<C>>) -> Self {
        Self {
            ordinal: shared.ordinal,
            pool,
            context: GCWorkerContext::for_worker(shared.clone()),
            shared,
        }
    }

    /// The main loop of a GC worker thread: execute queued tasks, and park when there are none.
    /// Returns when the pool shuts down.
    pub fn run(&mut self) {
        debug!("GCWorker-{} started", self.ordinal);
        loop {
            if let Some(task) = self.pool.pop_task() {
                self.shared.set_state(WorkerState::RunningGcTask);
                self.pool.run_task(task, &mut self.context);
                self.shared.set_state(WorkerState::Idle);
                continue;
            }
            let pool = &self.pool;
            if pool
                .worker_monitor()
                .park_and_wait(self.ordinal, || pool.has_queued_tasks())
                .is_err()
            {
                break;
            }
        }
        debug!(
            "GCWorker-{} exited after executing {} tasks",
            self.ordinal,
            self.context.tasks_executed()
        );
    }
}

/// The dedicated GC workers of a pool.
pub struct WorkerGroup {
    pub workers_shared: Vec<Arc<GCWorkerShared>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerGroup {
    pub(crate) fn new(workers: usize) -> Self {
        Self {
            workers_shared: (0..workers)
                .map(|ordinal| Arc::new(GCWorkerShared::new(ordinal)))
                .collect(),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn one thread per worker.  This is separate from `new` because each worker needs a
    /// reference to the pool, which owns this group.
    pub(crate) fn spawn<C: Collector>(
        &self,
        pool: &Arc<GCWorkersTaskPool<C>>,
    ) -> std::io::Result<()> {
        let mut handles = self.handles.lock().unwrap();
        debug_assert!(handles.is_empty(), "GC workers are spawned twice");
        for shared in &self.workers_shared {
            let mut worker = GCWorker::new(shared.clone(), pool.clone());
            let handle = std::thread::Builder::new()
                .name(format!("GCWorker-{}", shared.ordinal))
                .spawn(move || worker.run())?;
            handles.push(handle);
        }
        Ok(())
    }

    /// Wait for all worker threads to exit.  The workers must have been told to exit.
    pub(crate) fn join(&self) {
        let handles = std::mem::take(&mut *self.handles.lock().unwrap());
        for handle in handles {
            let name = handle.thread().name().unwrap_or("GCWorker").to_owned();
            if handle.join().is_err() {
                error!("{} panicked while executing a GC task", name);
            }
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers_shared.len()
    }

    /// The number of workers currently executing a task.
    pub fn busy_workers(&self) -> usize {
        self.workers_shared
            .iter()
            .filter(|w| w.state() == WorkerState::RunningGcTask)
            .count()
    }
}
