//! Coroutine workers and their coordination with the coroutine manager and the GC requester.

mod mailbox;
pub use mailbox::{PostError, WorkerMessage};

mod manager;
pub use manager::{GcCoordinator, GcRequester};

mod worker;
pub use worker::{CoroutineWorker, CoroutineWorkerStats};
