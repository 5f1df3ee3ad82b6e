//! Utilities used by other modules, including logging and options.

/// Logger initialization.
pub mod logger;
/// Runtime options.
pub mod options;

/// Mocks and helpers for tests.
#[cfg(test)]
pub(crate) mod test_util;

pub use self::options::Options;
