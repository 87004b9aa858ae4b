//! Unrecoverable startup failures.
//!
//! Bind errors, bad configuration and registration errors found while the
//! application is assembled are never handed to the error channel: they are
//! logged and the process exits with status 1.

use std::fmt::Display;

/// Exit status for fatal failures.
pub const EXIT_FATAL: i32 = 1;

/// Log `err` and terminate the process.
pub fn fatal(context: &str, err: impl Display) -> ! {
    // Logging may not be set up yet when the config itself is broken.
    let _ = tracing_subscriber::fmt().with_writer(std::io::stderr).try_init();
    tracing::error!(error = %err, "{context}");
    std::process::exit(EXIT_FATAL)
}

/// Unwrap `result` or exit through [`fatal`].
pub fn or_exit<T, E: Display>(result: Result<T, E>, context: &str) -> T {
    match result {
        Ok(value) => value,
        Err(err) => fatal(context, err),
    }
}
