//! The traits a managed runtime implements to plug its collector and its coroutine manager into
//! this crate.

mod collection;
mod coroutines;

pub use self::collection::Collector;
pub use self::coroutines::CoroutineManager;
