//! Logging bootstrap for the command line binary.
//!
//! The library only talks to the `log` facade. Warnings from template
//! resolution (failed script tokens, unrenderable date formats) reach the
//! user through whatever logger the host installs; the binary installs
//! `env_logger` on stderr.

use env_logger::{Builder, Env};

/// Installs the stderr logger. `RUST_LOG` overrides the default level.
/// Calling this more than once is harmless.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let result = Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .try_init();
    if let Err(err) = result {
        log::debug!("logger already installed: {err}");
    }
}
