//! The collector stops and resumes the world while mutators run managed code and poll
//! safepoints.

use gcpool::thread::{ManagedCodeScope, NativeCodeScope, ThreadRegistry, ThreadStatus};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

const MUTATORS: usize = 4;
const PAUSES: usize = 50;

#[test]
fn no_mutator_touches_the_heap_while_stopped() {
    let registry = ThreadRegistry::new(Duration::from_millis(1));
    let threads: Vec<_> = (0..MUTATORS)
        .map(|i| registry.register(format!("mutator-{}", i)))
        .collect();
    // The number of mutators between their status check and their next safepoint.
    let in_heap = AtomicUsize::new(0);
    let done = AtomicBool::new(false);
    let iterations = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for thread in &threads {
            let in_heap = &in_heap;
            let done = &done;
            let iterations = &iterations;
            scope.spawn(move || {
                let _managed = ManagedCodeScope::new(thread);
                while !done.load(Ordering::SeqCst) {
                    in_heap.fetch_add(1, Ordering::SeqCst);
                    std::hint::spin_loop();
                    in_heap.fetch_sub(1, Ordering::SeqCst);
                    iterations.fetch_add(1, Ordering::Relaxed);
                    thread.safepoint_poll();
                }
            });
        }

        for _ in 0..PAUSES {
            assert_eq!(registry.stop_all_mutators(), MUTATORS);
            assert_eq!(registry.running_mutators(), 0);
            assert_eq!(in_heap.load(Ordering::SeqCst), 0);
            std::thread::sleep(Duration::from_micros(200));
            assert_eq!(in_heap.load(Ordering::SeqCst), 0);
            registry.resume_mutators();
            std::thread::sleep(Duration::from_micros(200));
        }
        done.store(true, Ordering::SeqCst);
    });

    assert!(iterations.load(Ordering::Relaxed) > 0);
    for thread in &threads {
        assert_eq!(thread.status(), ThreadStatus::Native);
    }
}

#[test]
fn native_code_does_not_delay_the_pause() {
    let registry = ThreadRegistry::new(Duration::from_millis(1));
    let thread = registry.register("blocked-in-native");
    let entered_native = AtomicBool::new(false);
    let release = AtomicBool::new(false);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            let _managed = ManagedCodeScope::new(&thread);
            {
                let _native = NativeCodeScope::new(&thread);
                entered_native.store(true, Ordering::SeqCst);
                // Simulates a long blocking call outside the managed heap.
                while !release.load(Ordering::SeqCst) {
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
            // Back in managed code only after the pause is over.
            assert_eq!(thread.status(), ThreadStatus::Running);
        });

        while !entered_native.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }
        assert_eq!(registry.stop_all_mutators(), 1);
        release.store(true, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(thread.status(), ThreadStatus::Native);
        registry.resume_mutators();
    });
    assert!(thread.is_in_safe_region());
}

#[test]
fn repeated_if_in_native_is_harmless() {
    let registry = ThreadRegistry::new(Duration::from_millis(1));
    let thread = registry.register("m");
    assert!(thread.leave_safe_region_if_in_native());
    assert!(!thread.leave_safe_region_if_in_native());
    assert_eq!(thread.status(), ThreadStatus::Running);
    assert!(thread.enter_safe_region_if_in_running());
    assert!(!thread.enter_safe_region_if_in_running());
    assert_eq!(thread.status(), ThreadStatus::Native);
    assert!(registry.unregister(&thread));
}
