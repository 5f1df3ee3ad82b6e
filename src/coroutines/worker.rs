use super::mailbox::{make_mailbox, PostError, Receiver, Sender, WorkerMessage};
use crate::scheduler::WorkerState;
use crate::thread::MutatorThread;
use crate::vm::CoroutineManager;
use atomic::Atomic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Message counters of a coroutine worker.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CoroutineWorkerStats {
    /// Messages accepted by the mailbox.
    pub posted: usize,
    /// Messages rejected because the mailbox was full or closed.
    pub rejected: usize,
    /// Messages executed by the sequencing thread.
    pub executed: usize,
}

#[derive(Default)]
struct MessageCounters {
    posted: AtomicUsize,
    rejected: AtomicUsize,
    executed: AtomicUsize,
}

/// An execution context that runs mutators, with its own sequencing thread.
///
/// Messages posted to a worker run one at a time, in order, on the sequencing thread.  In
/// particular `CoroutineManager::schedule` is never called concurrently for the same worker.
pub struct CoroutineWorker<M: CoroutineManager> {
    id: usize,
    name: String,
    manager: Arc<M>,
    external_scheduling: bool,
    state: Atomic<WorkerState>,
    active_mutators: AtomicUsize,
    counters: Arc<MessageCounters>,
    /// `None` after shutdown.
    sender: Mutex<Option<Sender>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<M: CoroutineManager> CoroutineWorker<M> {
    /// Create a worker and spawn its sequencing thread.
    ///
    /// Arguments:
    /// * `external_scheduling`: Whether the manager is told when a mutator becomes active.
    /// * `mailbox_capacity`: The number of messages that can wait for the sequencing thread.
    pub fn new(
        id: usize,
        name: impl Into<String>,
        manager: Arc<M>,
        external_scheduling: bool,
        mailbox_capacity: usize,
    ) -> std::io::Result<Self> {
        let name = name.into();
        let (sender, receiver) = make_mailbox(mailbox_capacity);
        let counters: Arc<MessageCounters> = Default::default();

        let handle = {
            let manager = manager.clone();
            let counters = counters.clone();
            std::thread::Builder::new()
                .name(format!("CoroutineWorker-{}", id))
                .spawn(move || sequence(manager, receiver, counters))?
        };
        debug!(
            "Created coroutine worker {}({}), external scheduling {}",
            id,
            name,
            if external_scheduling { "on" } else { "off" }
        );

        Ok(Self {
            id,
            name,
            manager,
            external_scheduling,
            state: Atomic::new(WorkerState::Idle),
            active_mutators: AtomicUsize::new(0),
            counters,
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn manager(&self) -> &Arc<M> {
        &self.manager
    }

    pub fn is_external_scheduling(&self) -> bool {
        self.external_scheduling
    }

    pub fn state(&self) -> WorkerState {
        self.state.load(Ordering::Acquire)
    }

    /// The number of mutators resumed on this worker and not suspended yet.
    pub fn active_mutators(&self) -> usize {
        self.active_mutators.load(Ordering::Acquire)
    }

    /// Called when `thread` became active on this worker.  With external scheduling, exactly one
    /// `Schedule` message is posted, and the manager's `schedule()` runs later on the sequencing
    /// thread.  Without it, nothing is posted.
    pub fn on_mutator_became_active(&self, thread: &MutatorThread) -> Result<(), PostError> {
        if !self.external_scheduling {
            return Ok(());
        }
        trace!("{} became active on coroutine worker {}", thread, self.id);
        self.post(WorkerMessage::Schedule)
    }

    /// Let `thread` run managed code on this worker.  Blocks while the world is stopped.
    pub fn resume_mutator(&self, thread: &MutatorThread) -> Result<(), PostError> {
        thread.leave_safe_region();
        self.active_mutators.fetch_add(1, Ordering::AcqRel);
        self.state.store(WorkerState::RunningMutator, Ordering::Release);
        self.on_mutator_became_active(thread)
    }

    /// Put `thread` into a safe region.  The worker becomes idle when its last active mutator is
    /// suspended.
    pub fn suspend_mutator(&self, thread: &MutatorThread) {
        thread.enter_safe_region();
        let previous = self.active_mutators.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "No mutator is active on coroutine worker {}", self.id);
        if previous == 1 {
            self.state.store(WorkerState::Idle, Ordering::Release);
        }
    }

    /// Post a message without blocking.  Rejections are counted.
    pub fn post(&self, message: WorkerMessage) -> Result<(), PostError> {
        let result = match &*self.sender.lock().unwrap() {
            Some(sender) => sender.post(message),
            None => Err(PostError::Disconnected),
        };
        match result {
            Ok(()) => {
                self.counters.posted.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                debug!("Coroutine worker {}: {}", self.id, e);
            }
        }
        result
    }

    pub fn stats(&self) -> CoroutineWorkerStats {
        CoroutineWorkerStats {
            posted: self.counters.posted.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            executed: self.counters.executed.load(Ordering::Relaxed),
        }
    }

    /// Close the mailbox, let the sequencing thread execute the messages already posted, and
    /// join it.  Idempotent.  Must not be called from the sequencing thread.
    pub fn shutdown(&self) {
        drop(self.sender.lock().unwrap().take());
        let handle = self.handle.lock().unwrap().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("The sequencing thread of coroutine worker {} panicked", self.id);
            }
            debug!("Coroutine worker {} shut down: {:?}", self.id, self.stats());
        }
    }
}

impl<M: CoroutineManager> Drop for CoroutineWorker<M> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The body of the sequencing thread.
fn sequence<M: CoroutineManager>(
    manager: Arc<M>,
    receiver: Receiver,
    counters: Arc<MessageCounters>,
) {
    while let Some(message) = receiver.next_message() {
        match message {
            WorkerMessage::Schedule => manager.schedule(),
            WorkerMessage::Callback(callback) => callback(),
        }
        counters.executed.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thread::ThreadRegistry;
    use crate::util::test_util::MockManager;
    use std::sync::mpsc;
    use std::time::Duration;

    fn registry() -> ThreadRegistry {
        ThreadRegistry::new(Duration::from_millis(1))
    }

    #[test]
    fn activation_schedules_once() {
        let manager = Arc::new(MockManager::default());
        let worker = CoroutineWorker::new(1, "w", manager.clone(), true, 16).unwrap();
        let registry = registry();
        let thread = registry.register("m");

        worker.on_mutator_became_active(&thread).unwrap();
        worker.shutdown();
        assert_eq!(manager.schedule_calls(), 1);
        assert_eq!(
            worker.stats(),
            CoroutineWorkerStats {
                posted: 1,
                rejected: 0,
                executed: 1
            }
        );
    }

    #[test]
    fn activation_without_external_scheduling() {
        let manager = Arc::new(MockManager::default());
        let worker = CoroutineWorker::new(1, "w", manager.clone(), false, 16).unwrap();
        let registry = registry();
        let thread = registry.register("m");

        worker.on_mutator_became_active(&thread).unwrap();
        worker.shutdown();
        assert_eq!(manager.schedule_calls(), 0);
        assert_eq!(worker.stats().posted, 0);
    }

    #[test]
    fn full_mailbox_is_observable() {
        let manager = Arc::new(MockManager::default());
        let worker = CoroutineWorker::new(1, "w", manager.clone(), true, 1).unwrap();
        let registry = registry();
        let thread = registry.register("m");

        // Hold the sequencing thread in a callback so the mailbox fills up.
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        worker
            .post(WorkerMessage::Callback(Box::new(move || {
                entered_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            })))
            .unwrap();
        entered_rx.recv().unwrap();

        assert_eq!(worker.on_mutator_became_active(&thread), Ok(()));
        assert_eq!(
            worker.on_mutator_became_active(&thread),
            Err(PostError::Full)
        );
        release_tx.send(()).unwrap();
        worker.shutdown();

        assert_eq!(manager.schedule_calls(), 1);
        assert_eq!(
            worker.stats(),
            CoroutineWorkerStats {
                posted: 2,
                rejected: 1,
                executed: 2
            }
        );
    }

    #[test]
    fn post_after_shutdown() {
        let manager = Arc::new(MockManager::default());
        let worker = CoroutineWorker::new(1, "w", manager, true, 4).unwrap();
        worker.shutdown();
        worker.shutdown();
        assert_eq!(
            worker.post(WorkerMessage::Schedule),
            Err(PostError::Disconnected)
        );
    }

    #[test]
    fn resume_and_suspend_track_state() {
        let manager = Arc::new(MockManager::default());
        let worker = CoroutineWorker::new(1, "w", manager.clone(), true, 16).unwrap();
        let registry = registry();
        let a = registry.register("a");
        let b = registry.register("b");

        assert_eq!(worker.state(), WorkerState::Idle);
        worker.resume_mutator(&a).unwrap();
        worker.resume_mutator(&b).unwrap();
        assert_eq!(worker.state(), WorkerState::RunningMutator);
        assert_eq!(worker.active_mutators(), 2);
        worker.suspend_mutator(&a);
        assert_eq!(worker.state(), WorkerState::RunningMutator);
        worker.suspend_mutator(&b);
        assert_eq!(worker.state(), WorkerState::Idle);
        assert!(a.is_in_safe_region() && b.is_in_safe_region());

        worker.shutdown();
        assert_eq!(manager.schedule_calls(), 2);
    }
}
