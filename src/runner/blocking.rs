//! Runs one child synchronously with cancellation. Used for pre-start,
//! post-start, and cron invocations.

use tokio_util::sync::CancellationToken;

use crate::config::Command;
use crate::fatal;
use crate::launcher::{self, LaunchPolicy};

/// Runs `cmd` to completion (or until `ctx` is cancelled), blocking the
/// calling task for the duration.
///
/// A spawn failure always aborts the whole supervisor, regardless of
/// `fatal`: init cannot proceed if it can't even start the child. `fatal`
/// governs only what happens once the child *has* started: if true, a
/// non-zero exit (or a wait error other than the benign PID-1 "no child
/// processes" race) also aborts the supervisor; otherwise it is logged and
/// swallowed.
pub async fn run_blocking(cmd: &Command, fatal: bool, strip_env: bool, ctx: &CancellationToken) {
    let mut child = match launcher::spawn(cmd, &LaunchPolicy { strip_env }) {
        Ok(child) => child,
        Err(e) => fatal::die("failed starting command", e),
    };
    let pid = child.id().map(|p| p as i32);

    log::info!(cmd = cmd.cmd.as_str(); "starting");

    let result = tokio::select! {
        res = child.wait() => res,
        _ = ctx.cancelled() => {
            if let Some(pid) = pid {
                launcher::kill_process_group(pid);
            }
            child.wait().await
        }
    };

    match result {
        Err(e) if e.raw_os_error() == Some(libc::ECHILD) => {
            // Expected race: PID 1's reaper collected this child first.
            log::info!(cmd = cmd.cmd.as_str(); "process ended");
        }
        Err(e) => {
            if fatal {
                fatal::die(&format!("process terminated: {}", cmd.cmd), e);
            } else {
                log::warn!(cmd = cmd.cmd.as_str(), error = e.to_string(); "process terminated");
            }
        }
        Ok(status) if !status.success() => {
            if fatal {
                fatal::die(
                    &format!("process terminated: {}", cmd.cmd),
                    format!("exit status {status}"),
                );
            } else {
                log::warn!(cmd = cmd.cmd.as_str(), status = status.to_string(); "process terminated");
            }
        }
        Ok(_) => {
            log::info!(cmd = cmd.cmd.as_str(); "process ended");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_fatal_crash_returns_instead_of_aborting() {
        let cmd = Command {
            cmd: "/bin/sh -c 'exit 1'".into(),
            ..Default::default()
        };
        let token = CancellationToken::new();
        // Must return normally (not call process::exit) because fatal=false.
        run_blocking(&cmd, false, false, &token).await;
    }

    #[tokio::test]
    async fn cancellation_kills_long_running_child() {
        let cmd = Command {
            cmd: "/bin/sleep 30".into(),
            ..Default::default()
        };
        let token = CancellationToken::new();
        let token2 = token.clone();
        let handle = tokio::spawn(async move {
            let cmd = cmd;
            let token2 = token2;
            run_blocking(&cmd, false, false, &token2).await
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        token.cancel();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
        assert!(result.is_ok(), "run_blocking did not return after cancellation");
    }
}
