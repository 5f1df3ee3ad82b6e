//! Collectors and coroutine managers for unit tests.

use crate::scheduler::{GCWorkerContext, GCWorkersTask, GCWorkersTaskTypes};
use crate::vm::{Collector, CoroutineManager};
use enum_map::EnumMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A collector whose tasks add their payload to a sum.
#[derive(Default)]
pub(crate) struct MockCollector {
    executed: AtomicUsize,
    executed_by_helpers: AtomicUsize,
    payload_sum: AtomicUsize,
    by_type: Mutex<EnumMap<GCWorkersTaskTypes, usize>>,
    collections: AtomicUsize,
}

impl MockCollector {
    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }

    pub fn executed_by_helpers(&self) -> usize {
        self.executed_by_helpers.load(Ordering::SeqCst)
    }

    pub fn payload_sum(&self) -> usize {
        self.payload_sum.load(Ordering::SeqCst)
    }

    pub fn executed_of(&self, ty: GCWorkersTaskTypes) -> usize {
        self.by_type.lock().unwrap()[ty]
    }

    pub fn collections_scheduled(&self) -> usize {
        self.collections.load(Ordering::SeqCst)
    }
}

impl Collector for MockCollector {
    type Payload = usize;

    fn worker_task_processing(&self, task: GCWorkersTask<usize>, worker: &mut GCWorkerContext) {
        self.by_type.lock().unwrap()[task.get_type()] += 1;
        self.payload_sum.fetch_add(task.into_payload(), Ordering::SeqCst);
        if worker.is_helper() {
            self.executed_by_helpers.fetch_add(1, Ordering::SeqCst);
        }
        self.executed.fetch_add(1, Ordering::SeqCst);
    }

    fn schedule_collection(&self) {
        self.collections.fetch_add(1, Ordering::SeqCst);
    }
}

/// A coroutine manager that counts `schedule()` calls.
#[derive(Default)]
pub(crate) struct MockManager {
    schedule_calls: AtomicUsize,
}

impl MockManager {
    pub fn schedule_calls(&self) -> usize {
        self.schedule_calls.load(Ordering::SeqCst)
    }
}

impl CoroutineManager for MockManager {
    fn schedule(&self) {
        self.schedule_calls.fetch_add(1, Ordering::SeqCst);
    }
}
