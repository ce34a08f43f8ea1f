//! Runs one child asynchronously with cancellation and unbounded, immediate,
//! no-backoff auto-restart on crash.
//!
//! A worker's full lifetime, including every restart, runs inside a single
//! task. The supervisor's wait-group is therefore incremented exactly once
//! per worker (when the task is spawned) and decremented exactly once (when
//! the task returns), regardless of how many times the child crashed and was
//! restarted in between.

use std::io;
use std::iter;
use std::sync::Arc;
use std::time::Duration;

use tokio_retry::Retry;
use tokio_util::sync::CancellationToken;

use crate::config::Command;
use crate::launcher::{self, LaunchPolicy};

enum Outcome {
    /// The child could not even be started; do not restart.
    SpawnFailed,
    /// The root context was already cancelled; do not spawn or restart.
    Cancelled,
    /// The child ran and exited (for any reason) while the context was active.
    Crashed,
}

async fn run_once(cmd: &Command, token: &CancellationToken) -> Outcome {
    if token.is_cancelled() {
        return Outcome::Cancelled;
    }

    let mut child = match launcher::spawn(cmd, &LaunchPolicy { strip_env: cmd.safe_env }) {
        Ok(child) => child,
        Err(e) => {
            log::error!(cmd = cmd.cmd.as_str(), error = e.to_string(); "failed starting command");
            return Outcome::SpawnFailed;
        }
    };
    let pid = child.id().map(|p| p as i32);

    tokio::select! {
        _ = child.wait() => {}
        _ = token.cancelled() => {
            if let Some(pid) = pid {
                launcher::kill_process_group(pid);
            }
            let _ = child.wait().await;
        }
    }

    if token.is_cancelled() {
        Outcome::Cancelled
    } else {
        Outcome::Crashed
    }
}

/// Supervises `cmd` for as long as `token` stays active, restarting it
/// immediately (no backoff, no retry limit) every time it exits on its own.
///
/// Intended to be registered with the supervisor's wait-group exactly once
/// per worker, e.g. via `TaskTracker::spawn(forked::run(cmd, token))`.
pub async fn run(cmd: Arc<Command>, token: CancellationToken) {
    let strategy = iter::repeat(Duration::from_millis(0));

    let _ = Retry::spawn(strategy, move || {
        let cmd = cmd.clone();
        let token = token.clone();
        async move {
            log::info!(cmd = cmd.cmd.as_str(); "starting process");
            let outcome = run_once(&cmd, &token).await;
            log::info!(cmd = cmd.cmd.as_str(); "process exited");
            match outcome {
                Outcome::Crashed => Err(io::Error::other("worker exited, restarting")),
                Outcome::SpawnFailed | Outcome::Cancelled => Ok(()),
            }
        }
    })
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::task::TaskTracker;

    #[tokio::test]
    async fn wait_group_drains_after_cancellation() {
        let cmd = Arc::new(Command {
            cmd: "/bin/sh -c 'exit 1'".into(),
            ..Default::default()
        });
        let token = CancellationToken::new();
        let tracker = TaskTracker::new();
        tracker.spawn(run(cmd, token.clone()));
        tracker.close();

        // Let it crash/restart a couple of times before shutting down.
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();

        let drained = tokio::time::timeout(Duration::from_secs(5), tracker.wait()).await;
        assert!(drained.is_ok(), "wait-group did not drain after cancellation");
    }

    #[tokio::test]
    async fn no_spawn_after_cancellation() {
        let cmd = Arc::new(Command {
            cmd: "/bin/true".into(),
            ..Default::default()
        });
        let token = CancellationToken::new();
        token.cancel();
        // run_once must refuse to spawn once the token is already cancelled.
        let outcome = run_once(&cmd, &token).await;
        assert!(matches!(outcome, Outcome::Cancelled));
    }

    #[tokio::test]
    async fn spawn_failure_ends_supervision_without_restart() {
        let cmd = Arc::new(Command {
            cmd: "/definitely/not/a/real/binary-xyz".into(),
            ..Default::default()
        });
        let token = CancellationToken::new();
        let tracker = TaskTracker::new();
        tracker.spawn(run(cmd, token));
        tracker.close();
        let drained = tokio::time::timeout(Duration::from_secs(5), tracker.wait()).await;
        assert!(drained.is_ok(), "supervision kept retrying after spawn failure");
    }
}
