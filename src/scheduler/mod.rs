//! The GC worker task pool: a bounded queue of GC tasks executed by dedicated worker threads and
//! by the thread that waits for the pool to drain.

mod stat;
pub use stat::{SchedulerStat, WorkerLocalStat};

mod task;
pub use task::{GCWorkersTask, GCWorkersTaskTypes};

mod task_pool;
pub use task_pool::GCWorkersTaskPool;

mod task_queue;
pub use task_queue::{RejectReason, RejectedTask};

mod worker;
pub use worker::{GCWorker, GCWorkerContext, GCWorkerShared, WorkerGroup, WorkerState};

mod worker_monitor;
