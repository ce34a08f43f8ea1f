//! The single fatal-log-and-terminate facility used by every fatal path.

/// Logs `context` and `err` at error level and terminates the process with
/// exit code 1. Never returns.
pub fn die(context: &str, err: impl std::fmt::Display) -> ! {
    log::error!(error = err.to_string(); "{context}");
    std::process::exit(1);
}
