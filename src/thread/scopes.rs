use super::mutator::MutatorThread;

/// While alive, the mutator runs managed code.  On drop, the mutator re-enters its safe region
/// if this scope is the one that left it.
///
/// ```ignore
/// let _managed = ManagedCodeScope::new(&thread);
/// // access the managed heap
/// ```
pub struct ManagedCodeScope<'a> {
    thread: &'a MutatorThread,
    transferred: bool,
}

impl<'a> ManagedCodeScope<'a> {
    /// Leave the safe region if the thread is in one.  Blocks while the world is stopped.
    pub fn new(thread: &'a MutatorThread) -> Self {
        let transferred = thread.leave_safe_region_if_in_native();
        Self {
            thread,
            transferred,
        }
    }

    pub fn thread(&self) -> &MutatorThread {
        self.thread
    }
}

impl Drop for ManagedCodeScope<'_> {
    fn drop(&mut self) {
        if self.transferred {
            self.thread.enter_safe_region();
        }
    }
}

/// While alive, the mutator is in a safe region and the collector may stop the world without
/// waiting for it.  On drop, the mutator leaves the safe region if this scope entered it.
pub struct NativeCodeScope<'a> {
    thread: &'a MutatorThread,
    transferred: bool,
}

impl<'a> NativeCodeScope<'a> {
    pub fn new(thread: &'a MutatorThread) -> Self {
        let transferred = thread.enter_safe_region_if_in_running();
        Self {
            thread,
            transferred,
        }
    }

    pub fn thread(&self) -> &MutatorThread {
        self.thread
    }
}

impl Drop for NativeCodeScope<'_> {
    fn drop(&mut self) {
        if self.transferred {
            self.thread.leave_safe_region();
        }
    }
}
