// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operational policies over the job store.
//!
//! The engine never times jobs out or forgets them itself. When
//! `job_timeout` is configured the daemon requests cancellation with reason
//! `timeout` through the normal cancel path; uninterruptible actions still
//! run to completion. When `job_retention` is configured, finished jobs
//! older than the window are pruned.

use std::time::Duration;

use rst_core::{CancelOutcome, CancelReason, Clock, JobId, JobState};
use rst_engine::Dispatcher;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Which sweeps the supervisor runs. `None` disables a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    pub job_timeout: Option<Duration>,
    pub job_retention: Option<Duration>,
}

impl Policy {
    pub fn is_empty(&self) -> bool {
        self.job_timeout.is_none() && self.job_retention.is_none()
    }

    /// A quarter of the shortest window, kept between 100ms and 5s.
    pub fn interval(&self) -> Duration {
        let shortest = [self.job_timeout, self.job_retention]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(Duration::from_secs(20));
        (shortest / 4).clamp(Duration::from_millis(100), Duration::from_secs(5))
    }
}

/// Request cancellation of every running job older than `timeout`.
///
/// Jobs that already have a pending cancellation are left alone.
pub fn sweep<C: Clock>(dispatcher: &Dispatcher<C>, now_ms: u64, timeout: Duration) -> Vec<JobId> {
    let limit_ms = timeout.as_millis() as u64;
    let mut cancelled = Vec::new();
    for job in dispatcher.store().list() {
        if job.state != JobState::Running || job.cancellation.is_some() {
            continue;
        }
        let Some(started) = job.started_at_ms else { continue };
        let elapsed_ms = now_ms.saturating_sub(started);
        if elapsed_ms < limit_ms {
            continue;
        }
        match dispatcher.cancel(&job.id, CancelReason::Timeout) {
            Ok(CancelOutcome::Requested) => {
                warn!(job_id = %job.id, kind = %job.kind, elapsed_ms, "job exceeded timeout");
                cancelled.push(job.id);
            }
            Ok(outcome) => debug!(job_id = %job.id, ?outcome, "timeout sweep skipped job"),
            Err(e) => debug!(job_id = %job.id, error = %e, "timeout sweep skipped job"),
        }
    }
    cancelled
}

/// Drop finished jobs whose completion is more than `retention` ago.
pub fn prune<C: Clock>(dispatcher: &Dispatcher<C>, now_ms: u64, retention: Duration) -> usize {
    let cutoff = now_ms.saturating_sub(retention.as_millis() as u64);
    let pruned = dispatcher.store().prune_finished(cutoff);
    if pruned > 0 {
        info!(pruned, "pruned finished jobs");
    }
    pruned
}

/// Background task running [`sweep`] and [`prune`] on an interval.
pub struct Supervisor {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl Supervisor {
    pub fn spawn<C: Clock>(
        dispatcher: Dispatcher<C>,
        clock: C,
        policy: Policy,
        interval: Duration,
    ) -> Self {
        let stop = CancellationToken::new();
        let token = stop.clone();
        info!(
            timeout_secs = policy.job_timeout.map(|d| d.as_secs()),
            retention_secs = policy.job_retention.map(|d| d.as_secs()),
            "job supervisor started"
        );
        let handle = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticks.tick() => {
                        let now_ms = clock.epoch_ms();
                        if let Some(timeout) = policy.job_timeout {
                            sweep(&dispatcher, now_ms, timeout);
                        }
                        if let Some(retention) = policy.job_retention {
                            prune(&dispatcher, now_ms, retention);
                        }
                    }
                }
            }
            debug!("job supervisor stopped");
        });
        Self { stop, handle }
    }

    pub async fn stop(self) {
        self.stop.cancel();
        let _ = self.handle.await;
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
