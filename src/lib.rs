//! gcpool is the GC worker infrastructure of a managed runtime: a pool of GC worker threads fed
//! from a bounded task queue, the safe-region protocol that lets the collector stop and resume
//! mutator threads, and the hooks that keep coroutine workers in sync with pending GC requests.
//!
//! The runtime plugs its collector in by implementing [`vm::Collector`], builds a [`Runtime`]
//! with a [`RuntimeBuilder`], and registers its mutator threads with it.  A pause then looks like
//! this:
//!
//! ```ignore
//! runtime.stop_the_world(|pool| {
//!     for stack in marking_stacks {
//!         pool.add_task_or_process(GCWorkersTask::new(GCWorkersTaskTypes::Marking, stack));
//!     }
//! });
//! ```
//!
//! Mutators cooperate by leaving their safe region before touching the managed heap, and by
//! entering it (or polling a safepoint) regularly.  See the [`thread`] module.

#[macro_use]
extern crate log;

mod runtime;
pub use runtime::{Runtime, RuntimeBuilder};

pub mod coroutines;
pub mod scheduler;
pub mod thread;
pub mod util;
pub mod vm;
