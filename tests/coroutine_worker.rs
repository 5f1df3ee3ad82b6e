//! Coroutine workers notify their manager once per mutator activation.

use gcpool::coroutines::CoroutineWorker;
use gcpool::thread::ThreadRegistry;
use gcpool::vm::CoroutineManager;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const ACTIVATIONS: usize = 100;

#[derive(Default)]
struct CountingManager {
    calls: AtomicUsize,
    running: AtomicBool,
    overlapped: AtomicBool,
}

impl CoroutineManager for CountingManager {
    fn schedule(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }
}

fn activate(external_scheduling: bool) -> (Arc<CountingManager>, usize) {
    let manager = Arc::new(CountingManager::default());
    let worker = CoroutineWorker::new(
        1,
        "worker",
        manager.clone(),
        external_scheduling,
        ACTIVATIONS,
    )
    .unwrap();
    let registry = ThreadRegistry::new(Duration::from_millis(1));
    let thread = registry.register("m");

    for _ in 0..ACTIVATIONS {
        worker.on_mutator_became_active(&thread).unwrap();
    }
    worker.shutdown();
    (manager, worker.stats().posted)
}

#[test]
fn one_schedule_per_activation() {
    let (manager, posted) = activate(true);
    assert_eq!(manager.calls.load(Ordering::SeqCst), ACTIVATIONS);
    assert_eq!(posted, ACTIVATIONS);
}

#[test]
fn no_schedule_without_external_scheduling() {
    let (manager, posted) = activate(false);
    assert_eq!(manager.calls.load(Ordering::SeqCst), 0);
    assert_eq!(posted, 0);
}

#[test]
fn schedule_is_sequenced_per_worker() {
    let manager = Arc::new(CountingManager::default());
    let worker = CoroutineWorker::new(1, "worker", manager.clone(), true, 1024).unwrap();
    let registry = ThreadRegistry::new(Duration::from_millis(1));
    let threads: Vec<_> = (0..4).map(|i| registry.register(format!("m{}", i))).collect();

    std::thread::scope(|scope| {
        for thread in &threads {
            let worker = &worker;
            scope.spawn(move || {
                for _ in 0..ACTIVATIONS {
                    worker.resume_mutator(thread).unwrap();
                    worker.suspend_mutator(thread);
                }
            });
        }
    });
    worker.shutdown();

    assert_eq!(manager.calls.load(Ordering::SeqCst), 4 * ACTIVATIONS);
    assert!(!manager.overlapped.load(Ordering::SeqCst));
    assert_eq!(worker.active_mutators(), 0);
}
