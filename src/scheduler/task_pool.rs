use super::stat::{SchedulerStat, WorkStat, WorkerLocalStat};
use super::task::GCWorkersTask;
use super::task_queue::{RejectedTask, TaskQueue};
use super::worker::{GCWorkerContext, WorkerGroup};
use super::worker_monitor::WorkerMonitor;
use crate::util::options::Options;
use crate::vm::Collector;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// The synchronized part of `TaskCounters`.
#[derive(Default, Debug)]
struct CounterSync {
    /// Tasks accepted by the pool since the last drain.
    sent: usize,
    /// Tasks executed to completion since the last drain.
    solved: usize,
}

/// The outcome of one bounded wait in `TaskCounters::wait_for_drain`.
#[derive(Debug, PartialEq, Eq)]
enum DrainWait {
    /// `solved == sent`.  Both counters were reset.
    Drained,
    /// Woken before the timeout, but not drained.
    Woken,
    /// The timeout elapsed.
    TimedOut,
}

/// The `sent`/`solved` counters of a pool and the condition variable the drain waiter blocks on.
///
/// The mutex is the single serialization point for the drain check: the comparison
/// `solved == sent` and the wait on `all_solved` happen under it, and every update that can make
/// the comparison true notifies under it.
struct TaskCounters {
    sync: Mutex<CounterSync>,
    all_solved: Condvar,
}

impl TaskCounters {
    fn new() -> Self {
        Self {
            sync: Mutex::new(CounterSync::default()),
            all_solved: Condvar::new(),
        }
    }

    fn inc_sent(&self) {
        let mut sync = self.sync.lock().unwrap();
        sync.sent += 1;
    }

    /// Undo `inc_sent` for a task the queue did not accept.
    fn dec_sent(&self) {
        let mut sync = self.sync.lock().unwrap();
        debug_assert!(sync.sent > sync.solved);
        sync.sent -= 1;
        if sync.sent == sync.solved {
            self.all_solved.notify_all();
        }
    }

    fn inc_solved(&self) {
        let mut sync = self.sync.lock().unwrap();
        sync.solved += 1;
        debug_assert!(
            sync.solved <= sync.sent,
            "solved ({}) exceeds sent ({})",
            sync.solved,
            sync.sent
        );
        #[cfg(feature = "extreme_assertions")]
        assert!(sync.solved <= sync.sent);
        if sync.solved == sync.sent {
            self.all_solved.notify_all();
        }
    }

    fn wait_for_drain(&self, timeout: Duration) -> DrainWait {
        let mut sync = self.sync.lock().unwrap();
        if sync.solved == sync.sent {
            *sync = CounterSync::default();
            return DrainWait::Drained;
        }
        let (mut sync, result) = self.all_solved.wait_timeout(sync, timeout).unwrap();
        if sync.solved == sync.sent {
            *sync = CounterSync::default();
            DrainWait::Drained
        } else if result.timed_out() {
            DrainWait::TimedOut
        } else {
            DrainWait::Woken
        }
    }

    fn snapshot(&self) -> (usize, usize) {
        let sync = self.sync.lock().unwrap();
        (sync.sent, sync.solved)
    }
}

/// A pool of GC worker threads fed from a bounded task queue.
///
/// The collector splits a GC phase into tasks and submits them with [`add_task`].  Dedicated
/// worker threads execute them through [`Collector::worker_task_processing`].  The collector
/// then calls [`wait_until_tasks_end`], which executes pending tasks on the calling thread as
/// well, and returns once every accepted task has been executed.
///
/// [`add_task`]: GCWorkersTaskPool::add_task
/// [`wait_until_tasks_end`]: GCWorkersTaskPool::wait_until_tasks_end
pub struct GCWorkersTaskPool<C: Collector> {
    collector: Arc<C>,
    queue: TaskQueue<C::Payload>,
    counters: TaskCounters,
    worker_monitor: WorkerMonitor,
    worker_group: WorkerGroup,
    /// Statistics of tasks executed by threads that are not dedicated workers, and of worker
    /// tasks that finished while the worker's statistics were being read.
    helper_stat: Mutex<WorkerLocalStat>,
    stats_enabled: bool,
    drain_wait_timeout: Duration,
    shut_down: AtomicBool,
}

impl<C: Collector> GCWorkersTaskPool<C> {
    /// Create a pool and spawn its worker threads, configured by `gc_workers_count`,
    /// `task_queue_capacity`, `drain_wait_timeout_ms` and `task_pool_stats`.
    pub fn new(collector: Arc<C>, options: &Options) -> std::io::Result<Arc<Self>> {
        let workers = options.gc_workers_count;
        let pool = Arc::new(Self {
            collector,
            queue: TaskQueue::new(options.task_queue_capacity),
            counters: TaskCounters::new(),
            worker_monitor: WorkerMonitor::new(workers),
            worker_group: WorkerGroup::new(workers),
            helper_stat: Mutex::new(WorkerLocalStat::default()),
            stats_enabled: options.task_pool_stats,
            drain_wait_timeout: options.drain_wait_timeout(),
            shut_down: AtomicBool::new(false),
        });
        if let Err(e) = pool.worker_group.spawn(&pool) {
            pool.stop_workers();
            return Err(e);
        }
        debug!(
            "GC task pool created: {} workers, queue capacity {}",
            workers,
            pool.queue.capacity()
        );
        Ok(pool)
    }

    /// Submit a task.  `Ok(())` means the task was added and will be executed by a worker or by
    /// a thread in [`GCWorkersTaskPool::wait_until_tasks_end`].  If the queue is full or the pool
    /// is closed, the task is returned so the caller can execute it itself.
    ///
    /// `sent` is incremented before the task becomes visible in the queue and decremented again
    /// if the queue rejects it.  A drain waiter may therefore briefly observe one task too many
    /// in `sent`; it keeps waiting and re-checks, which is harmless.
    pub fn add_task(
        &self,
        task: GCWorkersTask<C::Payload>,
    ) -> Result<(), RejectedTask<C::Payload>> {
        self.counters.inc_sent();
        match self.queue.push(task) {
            Ok(()) => {
                self.worker_monitor.notify_work_available(false);
                Ok(())
            }
            Err(rejected) => {
                self.counters.dec_sent();
                debug!("{}", rejected);
                Err(rejected)
            }
        }
    }

    /// Submit a task, or execute it on the calling thread if the pool does not accept it.
    pub fn add_task_or_process(&self, task: GCWorkersTask<C::Payload>) {
        if let Err(rejected) = self.add_task(task) {
            let mut context = GCWorkerContext::helper();
            self.execute(rejected.into_task(), &mut context);
        }
    }

    /// Take a queued task, if any.  The caller must pass it to [`GCWorkersTaskPool::run_task`].
    /// This lets threads outside the pool (e.g. a shared task manager) execute tasks.
    pub fn pop_task(&self) -> Option<GCWorkersTask<C::Payload>> {
        self.queue.pop()
    }

    /// Execute a task taken from this pool, then count it as solved.  Wakes up the drain waiter
    /// if it was the last outstanding task.
    pub fn run_task(&self, task: GCWorkersTask<C::Payload>, context: &mut GCWorkerContext) {
        self.execute(task, context);
        self.counters.inc_solved();
    }

    fn execute(&self, task: GCWorkersTask<C::Payload>, context: &mut GCWorkerContext) {
        let ty = task.get_type();
        trace!("Execute {} on {:?}", ty, context.ordinal());
        if self.stats_enabled {
            let work = WorkStat::start(ty);
            self.collector.worker_task_processing(task, context);
            match context.shared().and_then(|shared| shared.try_borrow_stat_mut()) {
                Some(mut stat) => work.end_of_work(&mut stat),
                None => work.end_of_work(&mut self.helper_stat.lock().unwrap()),
            }
        } else {
            self.collector.worker_task_processing(task, context);
        }
        context.on_task_executed();
    }

    /// Execute queued tasks on the calling thread until the queue is empty.  Returns the number
    /// of tasks executed.
    pub fn help(&self) -> usize {
        let mut context = GCWorkerContext::helper();
        while let Some(task) = self.pop_task() {
            self.run_task(task, &mut context);
        }
        context.tasks_executed()
    }

    /// Block until every accepted task has been executed, then reset the counters for the next
    /// GC cycle.
    ///
    /// The calling thread helps: it executes queued tasks itself before each wait, so the drain
    /// completes even if every worker is busy or the pool has no workers.  Each wait is bounded
    /// by `drain_wait_timeout_ms`, after which the thread helps and checks again.
    pub fn wait_until_tasks_end(&self) {
        let mut helped = 0;
        let mut timeouts = 0;
        loop {
            helped += self.help();
            match self.counters.wait_for_drain(self.drain_wait_timeout) {
                DrainWait::Drained => break,
                DrainWait::Woken => {}
                DrainWait::TimedOut => {
                    timeouts += 1;
                    let (sent, solved) = self.counters.snapshot();
                    debug!(
                        "Waiting for GC tasks: {}/{} solved, {} queued",
                        solved,
                        sent,
                        self.queue.len()
                    );
                }
            }
        }
        debug!(
            "All GC tasks finished.  {} executed by the waiting thread, {} timed out waits.",
            helped, timeouts
        );
    }

    /// The current `(sent, solved)` counters.
    pub fn counters(&self) -> (usize, usize) {
        self.counters.snapshot()
    }

    pub fn is_drained(&self) -> bool {
        let (sent, solved) = self.counters.snapshot();
        sent == solved
    }

    pub fn queued_tasks(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn has_queued_tasks(&self) -> bool {
        !self.queue.is_empty()
    }

    /// The number of dedicated workers parked for lack of tasks.
    pub fn idle_workers(&self) -> usize {
        self.worker_monitor.parked_workers()
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn worker_group(&self) -> &WorkerGroup {
        &self.worker_group
    }

    pub(crate) fn worker_monitor(&self) -> &WorkerMonitor {
        &self.worker_monitor
    }

    pub fn collector(&self) -> &Arc<C> {
        &self.collector
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Stop accepting tasks, execute the tasks still outstanding, and stop the worker threads.
    /// Calling it again does nothing.  Must not be called from a GC worker thread.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.queue.close();
        self.wait_until_tasks_end();
        self.stop_workers();
        info!(
            "GC task pool shut down, {} workers joined",
            self.worker_group.worker_count()
        );
    }

    fn stop_workers(&self) {
        self.worker_monitor.request_exit();
        self.worker_group.join();
    }

    /// Per task type counts and execution times, if `task_pool_stats` is enabled.  Statistics of
    /// a worker that is executing a task right now are skipped.
    pub fn statistics(&self) -> HashMap<String, String> {
        let mut summary = SchedulerStat::default();
        if !self.stats_enabled {
            return summary.harness_stat();
        }
        for worker in &self.worker_group.workers_shared {
            match worker.try_borrow_stat() {
                Some(stat) => summary.merge(&stat),
                None => warn!(
                    "Statistics of GCWorker-{} are busy and were skipped",
                    worker.ordinal
                ),
            }
        }
        summary.merge(&self.helper_stat.lock().unwrap());
        summary.harness_stat()
    }
}
