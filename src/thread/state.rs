use bytemuck::NoUninit;

/// The status of a mutator thread with respect to the managed heap.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, NoUninit, strum_macros::Display)]
pub enum ThreadStatus {
    /// Executing managed code.  The thread may read and write the managed heap.
    #[strum(serialize = "RUNNING")]
    Running,
    /// In a safe region.  The thread does not touch the managed heap, and the collector treats it
    /// as suspended.
    #[strum(serialize = "NATIVE")]
    Native,
}

// The status lives in an `Atomic<ThreadStatus>`, which is only lock-free for the sizes of the
// native atomic integers.
static_assertions::assert_eq_size!(ThreadStatus, u8);
