use super::mutator::MutatorThread;
use super::state::ThreadStatus;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// The suspension request shared by the registry and all its mutators.
///
/// `requested` is read without the lock on the mutators' fast paths.  It is only written while
/// holding `sync`, so that the waits on `resumed` and `mutator_parked`, which test their
/// conditions under `sync`, cannot miss an update.
pub(crate) struct SuspensionControl {
    requested: AtomicBool,
    sync: Mutex<()>,
    /// Blocked mutators wait on this until the request is cleared.
    resumed: Condvar,
    /// The collector waits on this until all mutators are in safe regions.
    mutator_parked: Condvar,
}

impl SuspensionControl {
    fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
            sync: Mutex::new(()),
            resumed: Condvar::new(),
            mutator_parked: Condvar::new(),
        }
    }

    /// Sequentially consistent, pairing with the status store in
    /// `MutatorThread::leave_safe_region`.
    #[inline(always)]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Called by a mutator that entered a safe region while a suspension is requested.
    pub fn notify_parked(&self) {
        let _sync = self.sync.lock().unwrap();
        self.mutator_parked.notify_all();
    }

    /// Block the calling mutator until the suspension request is cleared.
    pub fn wait_until_resumed(&self) {
        let mut sync = self.sync.lock().unwrap();
        while self.requested.load(Ordering::SeqCst) {
            sync = self.resumed.wait(sync).unwrap();
        }
    }
}

/// All mutator threads of a runtime.  The collector uses it to stop and resume the world.
pub struct ThreadRegistry {
    control: Arc<SuspensionControl>,
    threads: Mutex<Vec<Arc<MutatorThread>>>,
    next_id: AtomicUsize,
    suspend_wait_timeout: Duration,
}

impl ThreadRegistry {
    /// `suspend_wait_timeout` bounds each wait in [`ThreadRegistry::stop_all_mutators`] before
    /// the statuses are checked again.
    pub fn new(suspend_wait_timeout: Duration) -> Self {
        Self {
            control: Arc::new(SuspensionControl::new()),
            threads: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            suspend_wait_timeout,
        }
    }

    /// Register a new mutator.  It starts in a safe region: call
    /// [`MutatorThread::leave_safe_region`] before it touches the managed heap.  A thread
    /// registered while the world is stopped blocks there until mutators are resumed.
    pub fn register(&self, name: impl Into<String>) -> Arc<MutatorThread> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let thread = Arc::new(MutatorThread::new(id, name.into(), self.control.clone()));
        self.threads.lock().unwrap().push(thread.clone());
        debug!("Registered mutator {}", thread);
        thread
    }

    /// Remove a mutator.  It must be in a safe region.  Returns `false` if it was not registered.
    pub fn unregister(&self, thread: &Arc<MutatorThread>) -> bool {
        debug_assert!(
            thread.is_in_safe_region(),
            "{} is unregistered while running managed code",
            thread
        );
        let mut threads = self.threads.lock().unwrap();
        let before = threads.len();
        threads.retain(|t| !Arc::ptr_eq(t, thread));
        let removed = threads.len() != before;
        if removed {
            debug!("Unregistered mutator {}", thread);
        }
        removed
    }

    pub fn mutator_count(&self) -> usize {
        self.threads.lock().unwrap().len()
    }

    /// A snapshot of the registered mutators.
    pub fn mutators(&self) -> Vec<Arc<MutatorThread>> {
        self.threads.lock().unwrap().clone()
    }

    /// The number of mutators currently running managed code.
    pub fn running_mutators(&self) -> usize {
        self.threads
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.status() == ThreadStatus::Running)
            .count()
    }

    pub fn is_suspension_requested(&self) -> bool {
        self.control.is_requested()
    }

    /// Request all mutators to suspend, and wait until every registered mutator is in a safe
    /// region.  Returns the number of mutators registered when the world stopped.
    ///
    /// Must not be called by a thread that is itself a running mutator, and must be paired with
    /// [`ThreadRegistry::resume_mutators`].
    pub fn stop_all_mutators(&self) -> usize {
        let start = Instant::now();
        {
            let _sync = self.control.sync.lock().unwrap();
            let was_requested = self.control.requested.swap(true, Ordering::SeqCst);
            debug_assert!(!was_requested, "Mutators are already being stopped");
        }

        let mut rechecks = 0;
        loop {
            let mutators = self.mutators();
            // Test the statuses under `sync`.  A mutator that parks after this test notifies
            // under the same lock, so the notification cannot slip in before the wait.
            let sync = self.control.sync.lock().unwrap();
            let running = mutators
                .iter()
                .filter(|t| t.status() == ThreadStatus::Running)
                .count();
            if running == 0 {
                debug!(
                    "Stopped {} mutators in {:?} ({} re-checks)",
                    mutators.len(),
                    start.elapsed(),
                    rechecks
                );
                return mutators.len();
            }
            trace!("Waiting for {} running mutators to suspend", running);
            let _ = self
                .control
                .mutator_parked
                .wait_timeout(sync, self.suspend_wait_timeout)
                .unwrap();
            rechecks += 1;
        }
    }

    /// Clear the suspension request and wake up every mutator blocked in
    /// [`MutatorThread::leave_safe_region`].
    pub fn resume_mutators(&self) {
        let _sync = self.control.sync.lock().unwrap();
        let was_requested = self.control.requested.swap(false, Ordering::SeqCst);
        debug_assert!(was_requested, "Mutators are resumed without being stopped");
        self.control.resumed.notify_all();
        debug!("Resumed mutators");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ThreadRegistry {
        ThreadRegistry::new(Duration::from_millis(1))
    }

    #[test]
    fn register_and_unregister() {
        let registry = registry();
        let a = registry.register("a");
        let b = registry.register("b");
        assert_ne!(a.id(), b.id());
        assert_eq!(registry.mutator_count(), 2);
        assert!(registry.unregister(&a));
        assert!(!registry.unregister(&a));
        assert_eq!(registry.mutator_count(), 1);
    }

    #[test]
    fn new_mutators_start_in_safe_region() {
        let registry = registry();
        let thread = registry.register("m");
        assert_eq!(thread.status(), ThreadStatus::Native);
        assert_eq!(registry.running_mutators(), 0);
        thread.leave_safe_region();
        assert_eq!(registry.running_mutators(), 1);
        thread.enter_safe_region();
    }

    #[test]
    fn stop_with_all_mutators_native() {
        let registry = registry();
        let _a = registry.register("a");
        let _b = registry.register("b");
        assert_eq!(registry.stop_all_mutators(), 2);
        assert!(registry.is_suspension_requested());
        registry.resume_mutators();
        assert!(!registry.is_suspension_requested());
    }

    #[test]
    fn stop_with_no_mutators() {
        let registry = registry();
        assert_eq!(registry.stop_all_mutators(), 0);
        registry.resume_mutators();
    }
}
