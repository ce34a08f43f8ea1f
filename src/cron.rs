//! Triggers Blocking Runner invocations on crontab schedules.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use cron::Schedule;
use tokio_util::sync::CancellationToken;

use crate::config::Command;
use crate::error::Error;
use crate::runner::blocking::run_blocking;

struct Entry {
    schedule: Schedule,
    command: Arc<Command>,
    strip_env: bool,
}

/// A set of (schedule, trigger-fn) entries added once at startup and ticked
/// at minute granularity. Overlapping firings of the same entry are allowed.
pub struct CronScheduler {
    entries: Vec<Entry>,
}

impl CronScheduler {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Registers a job. `schedule_expr` is a standard 5-field crontab
    /// expression (minute granularity); internally it's widened to the
    /// 6-field form the `cron` crate expects by pinning seconds to `0`.
    pub fn add(&mut self, schedule_expr: &str, command: Arc<Command>, strip_env: bool) -> Result<(), Error> {
        let schedule = parse_schedule(schedule_expr)
            .map_err(|e| Error::ConfigInvalid(format!("bad cron schedule {schedule_expr:?}: {e}")))?;
        self.entries.push(Entry {
            schedule,
            command,
            strip_env,
        });
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ticks once a minute, firing every entry whose expression matches the
    /// current local time. Each firing runs on its own task so overlapping
    /// invocations of the same job are never serialized against each other.
    /// Stops accepting new fires once `token` is cancelled.
    pub async fn run(self, token: CancellationToken) {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if token.is_cancelled() {
                        break;
                    }
                    self.fire_due(&token);
                }
                _ = token.cancelled() => break,
            }
        }
    }

    fn fire_due(&self, token: &CancellationToken) {
        let now = chrono::Local::now();
        for entry in &self.entries {
            if entry.schedule.includes(now) {
                let cmd = entry.command.clone();
                let strip_env = entry.strip_env;
                let token = token.clone();
                log::info!(cmd = cmd.cmd.as_str(); "cron firing");
                tokio::spawn(async move {
                    run_blocking(&cmd, false, strip_env, &token).await;
                });
            }
        }
    }
}

impl Default for CronScheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_schedule(expr: &str) -> Result<Schedule, cron::error::Error> {
    let field_count = expr.split_whitespace().count();
    if field_count == 5 {
        Schedule::from_str(&format!("0 {expr}"))
    } else {
        Schedule::from_str(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_standard_five_field_expressions() {
        let schedule = parse_schedule("*/5 * * * *").unwrap();
        let now = chrono::Local::now();
        // Just confirm it parses and can answer `includes` without panicking.
        let _ = schedule.includes(now);
    }

    #[test]
    fn rejects_garbage_expressions() {
        assert!(parse_schedule("not a cron expr").is_err());
    }

    #[tokio::test]
    async fn disabled_job_is_never_registered() {
        let mut scheduler = CronScheduler::new();
        assert!(scheduler.is_empty());
        scheduler
            .add("* * * * *", Arc::new(Command::default()), false)
            .unwrap();
        assert!(!scheduler.is_empty());
    }
}
