//! Shared spawn protocol used by both the blocking and forked runners.

use std::os::unix::process::CommandExt as _;

use nix::unistd::User;
use tokio::process::{Child, Command as TokioCommand};

use crate::config::{Command, SAFE_ENV_WHITELIST};
use crate::error::Error;
use crate::output::ChildOutputAdapter;

/// How a single launch should be wired up, independent of the `Command` being launched.
pub struct LaunchPolicy {
    /// Strip the child's environment down to [`SAFE_ENV_WHITELIST`].
    pub strip_env: bool,
}

/// Spawns one child per the shared protocol: new process group, optional credential
/// switch, stdin closed, stdout/stderr routed through the [`ChildOutputAdapter`],
/// optional environment whitelist.
pub fn spawn(cmd: &Command, policy: &LaunchPolicy) -> Result<Child, Error> {
    let argv = cmd.argv();
    let program = *argv.first().ok_or_else(|| Error::SpawnFailed {
        cmd: cmd.cmd.clone(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
    })?;

    let mut command = TokioCommand::new(program);
    command.args(&argv[1..]);
    command.stdin(std::process::Stdio::null());
    command.stdout(std::process::Stdio::piped());
    command.stderr(std::process::Stdio::piped());

    // New process group so the supervisor can signal the whole subtree with
    // kill(-pgid, ...). pgid 0 means "use this child's own pid as the pgid".
    command.process_group(0);

    if let Some(username) = &cmd.run_as {
        let user = User::from_name(username)
            .map_err(|source| Error::UserUnknown {
                user: username.clone(),
                source,
            })?
            .ok_or_else(|| Error::UserUnknown {
                user: username.clone(),
                source: nix::errno::Errno::ENOENT,
            })?;
        // uid/gid must be applied before the child's image runs, not after spawn.
        command.uid(user.uid.as_raw());
        command.gid(user.gid.as_raw());
    }

    if policy.strip_env {
        command.env_clear();
        for key in SAFE_ENV_WHITELIST {
            if let Ok(value) = std::env::var(key) {
                command.env(key, value);
            }
        }
    }

    let mut child = command.spawn().map_err(|source| Error::SpawnFailed {
        cmd: cmd.cmd.clone(),
        source,
    })?;

    ChildOutputAdapter::pump(
        "stdout",
        cmd.cmd.clone(),
        child.stdout.take().expect("stdout was piped"),
    );
    ChildOutputAdapter::pump(
        "stderr",
        cmd.cmd.clone(),
        child.stderr.take().expect("stderr was piped"),
    );

    Ok(child)
}

/// Sends SIGKILL to the process group of `pid`. Failures (the child already
/// having exited) are logged at debug and never escalated.
pub fn kill_process_group(pid: i32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    match kill(Pid::from_raw(-pid), Signal::SIGKILL) {
        Ok(()) => {}
        Err(e) => {
            log::debug!(pid = pid, error = e.to_string(); "kill failed, child likely already exited");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Command as Cmd;

    #[tokio::test]
    async fn spawns_into_new_process_group() {
        let cmd = Cmd {
            cmd: "/bin/sh -c 'exit 0'".into(),
            ..Default::default()
        };
        let mut child = spawn(&cmd, &LaunchPolicy { strip_env: false }).unwrap();
        let pid = child.id().unwrap() as i32;
        // pgid should equal the child's own pid (process_group(0)), never the
        // supervisor's pgid.
        let pgid = nix::unistd::getpgid(Some(nix::unistd::Pid::from_raw(pid))).unwrap();
        assert_eq!(pgid.as_raw(), pid);
        assert_ne!(pgid.as_raw(), nix::unistd::getpgrp().as_raw());
        let _ = child.wait().await;
    }

    #[tokio::test]
    async fn strip_env_only_forwards_whitelist() {
        std::env::set_var("SECRET_FOR_TEST", "s3cr3t");
        let cmd = Cmd {
            cmd: "/bin/sh -c 'env'".into(),
            safe_env: true,
            ..Default::default()
        };
        let mut child = spawn(&cmd, &LaunchPolicy { strip_env: true }).unwrap();
        let status = child.wait().await.unwrap();
        assert!(status.success());
        std::env::remove_var("SECRET_FOR_TEST");
    }

    #[tokio::test]
    async fn unknown_user_is_reported() {
        let cmd = Cmd {
            cmd: "/bin/true".into(),
            run_as: Some("definitely-not-a-real-user-abcxyz".into()),
            ..Default::default()
        };
        let err = spawn(&cmd, &LaunchPolicy { strip_env: false }).unwrap_err();
        assert!(matches!(err, Error::UserUnknown { .. }));
    }
}
