//! Top-level lifecycle: loads config, evaluates enablers, renders templates,
//! sequences pre-start, workers and post-start, installs signal handling and
//! drives shutdown.

use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::Config;
use crate::cron::CronScheduler;
use crate::enabler::gated_off;
use crate::fatal;
use crate::logsock;
use crate::reaper;
use crate::runner::{blocking::run_blocking, forked};
use crate::template;

/// Drives a single container's init sequence from a loaded [`Config`].
pub struct Supervisor {
    config: Config,
    logger_path: String,
}

impl Supervisor {
    pub fn new(config: Config, logger_path: String) -> Self {
        Self { config, logger_path }
    }

    /// Runs pre-start, workers and post-start to completion (or cancellation),
    /// then returns once every registered unit has drained.
    pub async fn run(self) {
        let token = CancellationToken::new();

        tokio::spawn(reaper::run(token.clone()));
        tokio::spawn(install_signal_handler(token.clone()));

        if let Some(pre) = &self.config.pre_start {
            if !pre.cmd.is_empty() {
                run_blocking(pre, false, false, &token).await;
            }
        }

        for proc in &self.config.process {
            if let Err(e) = template::process(&proc.cmd, &proc.template) {
                fatal::die("template processing failed", e);
            }
        }

        let mut cron_scheduler = CronScheduler::new();
        for job in &self.config.cron {
            if gated_off(&job.command.enabled) {
                log::info!(cmd = job.command.cmd.as_str(); "cron job disabled, skipping");
                continue;
            }
            log::info!(cmd = job.command.cmd.as_str(), schedule = job.schedule.as_str(); "scheduling cron job");
            if let Err(e) = cron_scheduler.add(
                &job.schedule,
                Arc::new(job.command.clone()),
                job.command.safe_env,
            ) {
                fatal::die("adding cron entry failed", e);
            }
        }
        tokio::spawn(cron_scheduler.run(token.clone()));

        let tracker = TaskTracker::new();

        for proc in &self.config.process {
            if gated_off(&proc.enabled) {
                log::info!(cmd = proc.cmd.as_str(); "worker disabled, skipping");
                continue;
            }
            // Re-render: idempotent, and picks up any data keyed off env set
            // by pre_start.
            if let Err(e) = template::process(&proc.cmd, &proc.template) {
                fatal::die("template processing failed", e);
            }
            tracker.spawn(forked::run(Arc::new(proc.clone()), token.clone()));
        }

        if let Some(post) = &self.config.post_start {
            if !post.cmd.is_empty() {
                let post = post.clone();
                let post_token = token.clone();
                tracker.spawn(async move {
                    run_blocking(&post, false, false, &post_token).await;
                });
            }
        }

        tracker.close();

        tokio::spawn(logsock::serve(self.logger_path.clone()));

        log::info!("init sequence complete, supervising workers");
        tracker.wait().await;
    }
}

/// Cancels `token` on the first SIGINT, SIGTERM or SIGHUP the process
/// receives. There is no graceful phase: workers are hard-killed by their
/// runner once the token is observed cancelled.
async fn install_signal_handler(token: CancellationToken) {
    let (mut sigint, mut sigterm, mut sighup) = match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
    ) {
        (Ok(a), Ok(b), Ok(c)) => (a, b, c),
        _ => {
            log::error!("failed to install signal handlers");
            return;
        }
    };

    let received = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sighup.recv() => "SIGHUP",
    };
    log::info!(signal = received; "received shutdown signal, cancelling workers");
    token.cancel();
}
