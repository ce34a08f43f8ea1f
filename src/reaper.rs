//! PID-1 duty: collects exit status of orphaned descendants.

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Runs until `token` is cancelled, reaping every zombie descendant on each
/// SIGCHLD (including orphans the supervisor never spawned itself).
pub async fn run(token: CancellationToken) {
    let mut sigchld = match signal(SignalKind::child()) {
        Ok(s) => s,
        Err(e) => {
            log::error!(error = e.to_string(); "failed to install SIGCHLD handler");
            return;
        }
    };

    // Drain anything that already exited before we installed the handler.
    reap_all();

    loop {
        tokio::select! {
            _ = sigchld.recv() => reap_all(),
            _ = token.cancelled() => break,
        }
    }
}

fn reap_all() {
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => {
                log::debug!(pid = status.pid().map(Pid::as_raw).unwrap_or(-1); "reaped child process");
            }
            Err(Errno::ECHILD) => break,
            Err(e) => {
                log::warn!(error = e.to_string(); "error reaping child process");
                break;
            }
        }
    }
}
