use super::registry::SuspensionControl;
use super::state::ThreadStatus;
use atomic::Atomic;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// A mutator thread as seen by the collector.
///
/// The status is written only by the thread the handle belongs to, and read by any thread.  The
/// transitions are lock-free unless a suspension is requested.
pub struct MutatorThread {
    id: usize,
    name: String,
    status: Atomic<ThreadStatus>,
    control: Arc<SuspensionControl>,
}

impl MutatorThread {
    pub(crate) fn new(id: usize, name: String, control: Arc<SuspensionControl>) -> Self {
        Self {
            id,
            name,
            status: Atomic::new(ThreadStatus::Native),
            control,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current status.  Pairs with the sequentially consistent stores of the transitions.
    #[inline(always)]
    pub fn status(&self) -> ThreadStatus {
        self.status.load(Ordering::SeqCst)
    }

    #[inline(always)]
    pub fn is_in_safe_region(&self) -> bool {
        self.status() == ThreadStatus::Native
    }

    /// Transfer from `Running` to `Native`.  The thread must not touch the managed heap until
    /// it leaves the safe region.
    #[inline]
    pub fn enter_safe_region(&self) {
        debug_assert_eq!(
            self.status(),
            ThreadStatus::Running,
            "{} enters a safe region twice",
            self
        );
        self.status.store(ThreadStatus::Native, Ordering::SeqCst);
        if self.control.is_requested() {
            self.control.notify_parked();
        }
    }

    /// Enter the safe region if the thread is `Running`.  Returns whether it was `Running`.
    #[inline]
    pub fn enter_safe_region_if_in_running(&self) -> bool {
        if self
            .status
            .compare_exchange(
                ThreadStatus::Running,
                ThreadStatus::Native,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return false;
        }
        if self.control.is_requested() {
            self.control.notify_parked();
        }
        true
    }

    /// Transfer from `Native` to `Running`.  If the collector has requested a suspension, the
    /// thread stays in its safe region and blocks until mutators are resumed.
    #[inline]
    pub fn leave_safe_region(&self) {
        debug_assert_eq!(
            self.status(),
            ThreadStatus::Native,
            "{} leaves a safe region it is not in",
            self
        );
        loop {
            // Publish `Running` before reading the request.  The collector sets the request
            // before reading our status.  With both sides sequentially consistent, at least one
            // of them sees the other's store.
            self.status.store(ThreadStatus::Running, Ordering::SeqCst);
            if !self.control.is_requested() {
                return;
            }
            self.status.store(ThreadStatus::Native, Ordering::SeqCst);
            self.control.notify_parked();
            trace!("{} blocks until mutators are resumed", self);
            self.control.wait_until_resumed();
        }
    }

    /// Leave the safe region if the thread is `Native`.  Returns whether it was `Native`.
    #[inline]
    pub fn leave_safe_region_if_in_native(&self) -> bool {
        if self.status() != ThreadStatus::Native {
            return false;
        }
        self.leave_safe_region();
        true
    }

    /// A safepoint.  If a suspension is requested, park in a safe region until mutators are
    /// resumed.  Returns whether the thread parked.  Must be called while `Running`.
    #[inline]
    pub fn safepoint_poll(&self) -> bool {
        debug_assert_eq!(self.status(), ThreadStatus::Running);
        if !self.control.is_requested() {
            return false;
        }
        self.enter_safe_region();
        self.leave_safe_region();
        true
    }
}

impl std::fmt::Display for MutatorThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mutator-{}({})", self.id, self.name)
    }
}

impl std::fmt::Debug for MutatorThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutatorThread")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("status", &self.status())
            .finish()
    }
}
