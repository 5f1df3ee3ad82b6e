/// The coroutine manager of the runtime, seen from a coroutine worker.
pub trait CoroutineManager: 'static + Send + Sync {
    /// Re-evaluate scheduling decisions.  A coroutine worker calls this on its own sequencing
    /// thread after one of its mutators became active.
    ///
    /// This may be called repeatedly and must do nothing if no rescheduling is needed.
    fn schedule(&self);
}
