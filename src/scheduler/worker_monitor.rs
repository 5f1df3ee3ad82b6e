//! This module contains `WorkerMonitor` and related types.  Its purposes include:
//!
//! -   allowing GC workers to park when the task queue is empty,
//! -   letting producers of tasks wake parked workers, and
//! -   telling workers to exit when the pool shuts down.

use std::sync::{Condvar, Mutex};

/// Returned by `WorkerMonitor::park_and_wait` when the worker should exit its loop.
#[derive(Debug)]
pub(crate) struct WorkerShouldExit;

/// A data structure for synchronizing GC workers with the threads that give them tasks.
///
/// There is only one instance of `WorkerMonitor` per task pool.
pub(crate) struct WorkerMonitor {
    /// The synchronized part.
    sync: Mutex<WorkerMonitorSync>,
    /// Workers wait on this when idle.  Notified when tasks are added, or when workers should
    /// exit.
    workers_have_anything_to_do: Condvar,
}

/// The synchronized part of `WorkerMonitor`.
struct WorkerMonitorSync {
    /// Count parked workers.
    parker: WorkerParker,
    /// Set when the pool shuts down.  Never reset.
    should_exit: bool,
}

/// This struct counts the number of workers parked.
struct WorkerParker {
    /// The total number of workers.
    worker_count: usize,
    /// Number of parked workers.
    parked_workers: usize,
}

impl WorkerParker {
    fn new(worker_count: usize) -> Self {
        Self {
            worker_count,
            parked_workers: 0,
        }
    }

    /// Increase the parked-workers counter.
    /// Called before a worker is parked.
    ///
    /// Return true if all the workers are parked.
    fn inc_parked_workers(&mut self) -> bool {
        let old = self.parked_workers;
        debug_assert!(old < self.worker_count);
        let new = old + 1;
        self.parked_workers = new;
        new == self.worker_count
    }

    /// Decrease the parked-workers counter.
    /// Called after a worker is resumed from the parked state.
    fn dec_parked_workers(&mut self) {
        let old = self.parked_workers;
        debug_assert!(old <= self.worker_count);
        debug_assert!(old > 0);
        self.parked_workers = old - 1;
    }
}

impl WorkerMonitor {
    pub fn new(worker_count: usize) -> Self {
        Self {
            sync: Mutex::new(WorkerMonitorSync {
                parker: WorkerParker::new(worker_count),
                should_exit: false,
            }),
            workers_have_anything_to_do: Default::default(),
        }
    }

    /// Wake up workers after tasks have been added to the queue.
    ///
    /// The mutex is acquired before notifying.  A worker checks the queue while holding the same
    /// mutex before it waits, so a task pushed before this call is either seen by the worker or
    /// the worker is already waiting and receives the notification.
    pub fn notify_work_available(&self, all: bool) {
        let _sync = self.sync.lock().unwrap();
        if all {
            self.workers_have_anything_to_do.notify_all();
        } else {
            self.workers_have_anything_to_do.notify_one();
        }
    }

    /// Park a worker and wait on the CondVar `workers_have_anything_to_do`, unless `has_work`
    /// returns true when checked under the mutex.
    ///
    /// This function returns `Ok(())` if the current worker should continue working,
    /// or `Err(WorkerShouldExit)` if the current worker should exit now.
    pub fn park_and_wait<F>(&self, ordinal: usize, has_work: F) -> Result<(), WorkerShouldExit>
    where
        F: Fn() -> bool,
    {
        let mut sync = self.sync.lock().unwrap();
        if sync.should_exit {
            return Err(WorkerShouldExit);
        }

        let all_parked = sync.parker.inc_parked_workers();
        trace!(
            "Worker {} parked.  parked/total: {}/{}.  All parked: {}",
            ordinal,
            sync.parker.parked_workers,
            sync.parker.worker_count,
            all_parked
        );

        // Tasks are pushed without holding the mutex, so test the queue again now that we hold
        // it.  A spurious wake-up simply brings the worker back to its loop, where it checks the
        // queue and parks again if nothing is there.
        if !has_work() {
            sync = self.workers_have_anything_to_do.wait(sync).unwrap();
        }

        sync.parker.dec_parked_workers();
        trace!(
            "Worker {} unparked.  parked/total: {}/{}.",
            ordinal,
            sync.parker.parked_workers,
            sync.parker.worker_count,
        );

        if sync.should_exit {
            return Err(WorkerShouldExit);
        }
        Ok(())
    }

    /// Tell all workers to exit.  Parked workers are woken; running workers exit the next time
    /// they try to park.
    pub fn request_exit(&self) {
        let mut sync = self.sync.lock().unwrap();
        sync.should_exit = true;
        self.workers_have_anything_to_do.notify_all();
    }

    pub fn parked_workers(&self) -> usize {
        self.sync.lock().unwrap().parker.parked_workers
    }
}
