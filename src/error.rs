//! Fatal and non-fatal error kinds produced by the supervisor core.

use thiserror::Error;

/// Errors that can terminate the supervisor before or during startup.
///
/// Non-fatal conditions (a crashed worker, a failed kill of an already-exited
/// child, ECHILD races with the reaper) are logged in place and never turn
/// into one of these.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config invalid: {0}")]
    ConfigInvalid(String),

    #[error("unknown user {user:?}: {source}")]
    UserUnknown {
        user: String,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("template error rendering {src} -> {dst}: {reason}")]
    Template {
        src: String,
        dst: String,
        reason: String,
    },

    #[error("failed to spawn {cmd:?}: {source}")]
    SpawnFailed {
        cmd: String,
        #[source]
        source: std::io::Error,
    },
}
