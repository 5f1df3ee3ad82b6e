use crate::vm::{Collector, CoroutineManager};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct RequestSync {
    /// Is GC scheduled (but not finished)?
    gc_scheduled: bool,
    /// Are mutators stopped for a GC?  Set by `clear_request`, cleared by `on_gc_finished`.
    world_stopped: bool,
}

/// Lets mutators request a GC, and asks the collector to start one when appropriate.  At most
/// one collection is scheduled at a time.
///
/// A request made while the world is stopped is held.  It is scheduled by the first
/// `on_mutator_resumed` after the GC finished, so the next collection starts only once a mutator
/// runs again.
pub struct GcRequester<C: Collector> {
    request_sync: Mutex<RequestSync>,
    request_flag: AtomicBool,
    collector: Arc<C>,
    collections_scheduled: AtomicUsize,
    collections_rearmed: AtomicUsize,
}

impl<C: Collector> GcRequester<C> {
    pub fn new(collector: Arc<C>) -> Self {
        GcRequester {
            request_sync: Mutex::new(RequestSync {
                gc_scheduled: false,
                world_stopped: false,
            }),
            request_flag: AtomicBool::new(false),
            collector,
            collections_scheduled: AtomicUsize::new(0),
            collections_rearmed: AtomicUsize::new(0),
        }
    }

    /// Request a GC.  Successive requests before the world stops are merged into one.
    pub fn request(&self) {
        if self.request_flag.load(Ordering::Relaxed) {
            return;
        }

        let mut guard = self.request_sync.lock().unwrap();
        // Double-checked locking.  The flag only filters out successive requests, and does not
        // publish other data, so `Relaxed` is enough.
        if !self.request_flag.load(Ordering::Relaxed) {
            self.request_flag.store(true, Ordering::Relaxed);

            if guard.world_stopped {
                debug!("GC requested while the world is stopped, held until a mutator resumes");
                return;
            }
            self.try_schedule_collection(&mut guard);
        }
    }

    pub fn is_gc_requested(&self) -> bool {
        self.request_flag.load(Ordering::Relaxed)
    }

    /// Returns true if a GC has been scheduled and has not finished yet.
    pub fn is_gc_scheduled(&self) -> bool {
        let guard = self.request_sync.lock().unwrap();
        guard.gc_scheduled
    }

    /// Returns true if a request is waiting for `on_mutator_resumed`.
    pub fn is_gc_held(&self) -> bool {
        let guard = self.request_sync.lock().unwrap();
        self.request_flag.load(Ordering::Relaxed) && !guard.gc_scheduled
    }

    /// The number of collections scheduled so far.
    pub fn collections_scheduled(&self) -> usize {
        self.collections_scheduled.load(Ordering::Relaxed)
    }

    /// The number of collections scheduled by `on_mutator_resumed`.
    pub fn collections_rearmed(&self) -> usize {
        self.collections_rearmed.load(Ordering::Relaxed)
    }

    /// Clear the request flag so that mutators can request the next GC.  Called once all
    /// mutators have stopped.  Requests made from now until `on_gc_finished` are held.
    pub fn clear_request(&self) {
        let mut guard = self.request_sync.lock().unwrap();
        guard.world_stopped = true;
        self.request_flag.store(false, Ordering::Relaxed);
    }

    /// Called when a GC has finished, before mutators are resumed.  A request held during the
    /// GC stays pending until `on_mutator_resumed`.
    pub fn on_gc_finished(&self) {
        let mut guard = self.request_sync.lock().unwrap();
        guard.gc_scheduled = false;
        guard.world_stopped = false;

        if self.request_flag.load(Ordering::Relaxed) {
            debug!("A GC request is pending until a mutator resumes");
        }
    }

    /// Called when a mutator became active again.  Schedules the pending request, if any.  Does
    /// nothing if no request is pending, a GC is already scheduled, or the world is stopped.
    pub fn on_mutator_resumed(&self) {
        let mut guard = self.request_sync.lock().unwrap();
        if guard.world_stopped {
            return;
        }
        if self.try_schedule_collection(&mut guard) {
            self.collections_rearmed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn try_schedule_collection(&self, sync: &mut RequestSync) -> bool {
        if !self.request_flag.load(Ordering::Relaxed) || sync.gc_scheduled {
            return false;
        }
        self.collector.schedule_collection();
        self.collections_scheduled.fetch_add(1, Ordering::Relaxed);

        sync.gc_scheduled = true;

        // The flag stays set until `clear_request`, after all mutators have stopped.
        debug!("Scheduled a collection");
        true
    }
}

/// The coroutine manager of a runtime.  Every `schedule()` re-evaluates the pending GC request.
pub struct GcCoordinator<C: Collector> {
    requester: Arc<GcRequester<C>>,
    schedule_calls: AtomicUsize,
}

impl<C: Collector> GcCoordinator<C> {
    pub fn new(requester: Arc<GcRequester<C>>) -> Self {
        Self {
            requester,
            schedule_calls: AtomicUsize::new(0),
        }
    }

    pub fn requester(&self) -> &Arc<GcRequester<C>> {
        &self.requester
    }

    /// The number of `schedule()` calls received.
    pub fn schedule_calls(&self) -> usize {
        self.schedule_calls.load(Ordering::Relaxed)
    }
}

impl<C: Collector> CoroutineManager for GcCoordinator<C> {
    fn schedule(&self) {
        self.schedule_calls.fetch_add(1, Ordering::Relaxed);
        trace!("Coroutine manager re-evaluates the pending GC request");
        self.requester.on_mutator_resumed();
    }
}
