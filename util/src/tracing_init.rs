#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! Small helper for wiring up a [`tracing_subscriber::fmt`] subscriber the same way
//! across every binary in this workspace, so host applications (and `compute-demo`)
//! don't each re-derive their own formatting choices.

use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

/// Installs a process-wide [`tracing`] subscriber writing to stderr.
///
/// Returns `Err` if a global subscriber was already installed; callers that don't
/// care (e.g. tests, which may run this more than once across the binary) should
/// ignore the error.
pub fn init_stderr_logging(max_level: Level) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
