//! REPL, command-line driver, and logging setup for the DSSSL engine.
//!
//! This crate provides:
//! - [`Repl`] - Interactive read-eval-print loop
//! - [`LineEditor`] - The editor abstraction the REPL reads through
//! - [`init_logging`] - `tracing` subscriber installation for the `dsssl` binary

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod editor;
pub mod repl;

pub use editor::{LineEditor, ReadResult, RustylineEditor, is_complete};
pub use repl::{Repl, format_report, print_error};

use tracing_subscriber::{EnvFilter, fmt};

/// Installs a stderr `fmt` subscriber.
///
/// `RUST_LOG` overrides the level chosen by `verbosity`: 0 is `warn`, 1 is
/// `info`, anything higher is `debug`. Installing twice is a no-op.
pub fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
