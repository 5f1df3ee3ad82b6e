//! Logging setup.  The crate logs through the `log` facade.  A runtime that already installed
//! its own logger keeps it; otherwise `env_logger` is used when the `builtin_env_logger` feature
//! is on.

use log::SetLoggerError;

/// Attempt to init an `env_logger` reading `RUST_LOG`, defaulting to `info`.
/// Does nothing if the "builtin_env_logger" feature is disabled.
pub fn try_init() -> Result<(), SetLoggerError> {
    cfg_if::cfg_if! {
        if #[cfg(feature = "builtin_env_logger")] {
            env_logger::try_init_from_env(
                env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
            )
        } else {
            Ok(())
        }
    }
}

/// Called once by [`crate::RuntimeBuilder::build`].  Failing to install the logger is not an
/// error: the host runtime may have installed one already.
pub(crate) fn init_for_runtime() {
    match try_init() {
        Ok(_) => debug!("gcpool initialized the logger."),
        Err(_) => debug!(
            "gcpool failed to initialize the logger. Possibly a logger has been initialized by the runtime."
        ),
    }
}
