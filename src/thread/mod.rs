//! Mutator threads and the safe-region protocol.
//!
//! A mutator is either `Running`, and may access the managed heap, or `Native` (in a safe
//! region), and must not.  The collector stops the world by requesting a suspension and waiting
//! until every registered mutator is `Native`.  A mutator that tries to leave its safe region
//! while a suspension is requested blocks until the collector resumes mutators.

mod mutator;
pub use mutator::MutatorThread;

mod registry;
pub use registry::ThreadRegistry;

mod scopes;
pub use scopes::{ManagedCodeScope, NativeCodeScope};

mod state;
pub use state::ThreadStatus;
