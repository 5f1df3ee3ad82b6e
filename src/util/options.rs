//! Runtime options.  Options are plain typed fields with a validator and a default.  They can be
//! set by name from strings (e.g. from the command line of the host runtime), or from environment
//! variables with the prefix `GCPOOL_` (e.g. `GCPOOL_GC_WORKERS_COUNT=4`).

use std::str::FromStr;
use std::time::Duration;

/// The prefix of environment variables that override options.
pub const ENV_VAR_PREFIX: &str = "GCPOOL_";

fn always_valid<T>(_: &T) -> bool {
    true
}

fn positive_usize(v: &usize) -> bool {
    *v > 0
}

fn positive_u64(v: &u64) -> bool {
    *v > 0
}

/// The error returned by [`Options::set_bulk_from_command_line`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidOption {
    /// The offending `key=value` pair as it was supplied.
    pub pair: String,
}

impl std::fmt::Display for InvalidOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid option: {:?}", self.pair)
    }
}

impl std::error::Error for InvalidOption {}

macro_rules! options {
    ($($(#[$outer:meta])* $name:ident: $type:ty [$validator:expr] = $default:expr),* $(,)?) => [
        /// All the options of a runtime instance.  See the module documentation.
        #[derive(Clone, Debug)]
        pub struct Options {
            $($(#[$outer])* pub $name: $type),*
        }

        impl Options {
            /// Set an option by its name from a string.  Return `true` if the option is set.
            /// An unknown name, an unparsable value, or a value rejected by the validator leaves
            /// the option unchanged and returns `false`.
            pub fn set_from_str(&mut self, s: &str, val: &str) -> bool {
                match s {
                    $(stringify!($name) => match val.parse::<$type>() {
                        Ok(val) => {
                            let validate_fn = $validator;
                            if validate_fn(&val) {
                                self.$name = val;
                                true
                            } else {
                                warn!("Unable to set {}={:?}. Invalid value. Default value will be used.", s, val);
                                false
                            }
                        }
                        Err(_) => {
                            warn!("Unable to set {}={:?}. Can't parse value. Default value will be used.", s, val);
                            false
                        }
                    },)*
                    _ => {
                        warn!("Unknown option {:?}", s);
                        false
                    }
                }
            }

            /// Is `s` the name of an option?
            pub fn is_valid_key(s: &str) -> bool {
                matches!(s, $(stringify!($name))|*)
            }
        }

        impl Default for Options {
            fn default() -> Self {
                Options {
                    $($name: $default),*
                }
            }
        }
    ]
}

options! {
    /// Number of dedicated GC worker threads.  With 0 workers, tasks are only executed by the
    /// thread waiting for the pool to drain.
    gc_workers_count:         usize [always_valid]   = num_cpus::get(),
    /// The maximum number of tasks queued in the pool.  Submissions beyond it are rejected.
    task_queue_capacity:      usize [positive_usize] = 4096,
    /// How long (ms) the drain waiter blocks before re-checking the counters.
    drain_wait_timeout_ms:    u64   [positive_u64]   = 5,
    /// How long (ms) the collector blocks before re-checking that all mutators are suspended.
    suspend_wait_timeout_ms:  u64   [positive_u64]   = 5,
    /// The capacity of the mailbox of each coroutine worker.
    mutator_mailbox_capacity: usize [positive_usize] = 256,
    /// Whether coroutine workers notify the coroutine manager when a mutator becomes active.
    external_scheduling:      bool  [always_valid]   = true,
    /// Collect per task type statistics in the task pool.
    task_pool_stats:          bool  [always_valid]   = false,
}

impl Options {
    /// Set options from environment variables whose names start with [`ENV_VAR_PREFIX`].
    /// Variables that do not match any option are ignored.
    pub fn read_env_var_settings(&mut self) {
        for (key, val) in std::env::vars() {
            if let Some(rest_of_key) = key.strip_prefix(ENV_VAR_PREFIX) {
                let lowercase: &str = &rest_of_key.to_lowercase();
                if Self::is_valid_key(lowercase) {
                    self.set_from_str(lowercase, &val);
                }
            }
        }
    }

    /// Set options in bulk from a whitespace-separated list of `key=value` pairs.  All pairs are
    /// attempted; the first pair that could not be applied is reported.
    pub fn set_bulk_from_command_line(&mut self, options: &str) -> Result<(), InvalidOption> {
        let mut first_error = None;
        for opt in options.split_ascii_whitespace() {
            let applied = match opt.split_once('=') {
                Some((key, val)) => self.set_from_str(key, val),
                None => false,
            };
            if !applied && first_error.is_none() {
                first_error = Some(InvalidOption {
                    pair: opt.to_owned(),
                });
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn drain_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_wait_timeout_ms)
    }

    pub fn suspend_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.suspend_wait_timeout_ms)
    }
}

impl FromStr for Options {
    type Err = InvalidOption;

    /// Parse a `key=value` list on top of the default options.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut options = Options::default();
        options.set_bulk_from_command_line(s)?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_env_var() {
        let options = Options::default();
        assert_eq!(options.task_queue_capacity, 4096);
        assert_eq!(options.drain_wait_timeout_ms, 5);
        assert!(options.external_scheduling);
    }

    #[test]
    fn set_valid_value() {
        let mut options = Options::default();
        assert!(options.set_from_str("gc_workers_count", "3"));
        assert_eq!(options.gc_workers_count, 3);
        assert!(options.set_from_str("external_scheduling", "false"));
        assert!(!options.external_scheduling);
    }

    #[test]
    fn reject_invalid_value() {
        let mut options = Options::default();
        assert!(!options.set_from_str("task_queue_capacity", "0"));
        assert_eq!(options.task_queue_capacity, 4096);
        assert!(!options.set_from_str("drain_wait_timeout_ms", "soon"));
        assert_eq!(options.drain_wait_timeout_ms, 5);
    }

    #[test]
    fn reject_unknown_key() {
        let mut options = Options::default();
        assert!(!options.set_from_str("no_such_option", "1"));
        assert!(!Options::is_valid_key("no_such_option"));
        assert!(Options::is_valid_key("task_pool_stats"));
    }

    #[test]
    fn bulk_from_command_line() {
        let mut options = Options::default();
        options
            .set_bulk_from_command_line("gc_workers_count=2 task_queue_capacity=16")
            .unwrap();
        assert_eq!(options.gc_workers_count, 2);
        assert_eq!(options.task_queue_capacity, 16);

        let err = options
            .set_bulk_from_command_line("drain_wait_timeout_ms=7 bogus task_pool_stats=true")
            .unwrap_err();
        assert_eq!(err.pair, "bogus");
        // Valid pairs around the bad one are still applied.
        assert_eq!(options.drain_wait_timeout_ms, 7);
        assert!(options.task_pool_stats);
    }

    #[test]
    fn from_str() {
        let options: Options = "mutator_mailbox_capacity=8".parse().unwrap();
        assert_eq!(options.mutator_mailbox_capacity, 8);
        assert!("mutator_mailbox_capacity=0".parse::<Options>().is_err());
    }

    #[test]
    fn durations() {
        let mut options = Options::default();
        options.set_from_str("suspend_wait_timeout_ms", "12");
        assert_eq!(options.suspend_wait_timeout(), Duration::from_millis(12));
        assert_eq!(options.drain_wait_timeout(), Duration::from_millis(5));
    }

    #[test]
    fn env_var_overrides_default() {
        // Only this test sets this variable.
        std::env::set_var("GCPOOL_MUTATOR_MAILBOX_CAPACITY", "7");
        std::env::set_var("GCPOOL_NOT_AN_OPTION", "1");
        let mut options = Options::default();
        options.read_env_var_settings();
        std::env::remove_var("GCPOOL_MUTATOR_MAILBOX_CAPACITY");
        std::env::remove_var("GCPOOL_NOT_AN_OPTION");
        assert_eq!(options.mutator_mailbox_capacity, 7);
    }
}
