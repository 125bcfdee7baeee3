//! Scheduler Module
//!
//! Fires the update job on a cron trigger and drains cleanly on shutdown.
//!
//! Executions run inline on the scheduler task, so they never overlap: a
//! trigger that elapses while a job is still running is skipped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::auth::Authenticator;
use crate::sync::JobResult;
use crate::trigger::{Clock, ScheduleTrigger, SystemClock};

/// Work driven by the scheduler
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    /// Run one execution; must not propagate failures
    async fn execute(&self) -> JobResult;
}

/// Lifecycle of the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Created, loop not yet started
    Idle,
    /// Waiting for the next trigger instant
    Armed,
    /// One execution in flight
    Running,
    /// Shutdown requested while running; waiting for the execution to finish
    Draining,
    Stopped,
}

/// Recurring scheduler for a single job
pub struct Scheduler {
    trigger: ScheduleTrigger,
    job: Arc<dyn ScheduledJob>,
    auth: Arc<Authenticator>,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    /// Create a scheduler on the system clock
    pub fn new(trigger: ScheduleTrigger, job: Arc<dyn ScheduledJob>, auth: Arc<Authenticator>) -> Self {
        Self { trigger, job, auth, clock: Arc::new(SystemClock) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Spawn the scheduling loop and return its handle
    pub fn start(self) -> SchedulerHandle {
        info!("Starting scheduler with cron {}", self.trigger);

        let cancel = CancellationToken::new();
        let (state_tx, _) = watch::channel(SchedulerState::Idle);
        let state = Arc::new(state_tx);

        let task = tokio::spawn(run_loop(
            self.trigger,
            self.job,
            self.clock,
            cancel.clone(),
            Arc::clone(&state),
        ));

        SchedulerHandle { cancel, state, task: Some(task), auth: self.auth }
    }
}

/// Handle to a running scheduler
pub struct SchedulerHandle {
    cancel: CancellationToken,
    state: Arc<watch::Sender<SchedulerState>>,
    task: Option<JoinHandle<()>>,
    auth: Arc<Authenticator>,
}

impl SchedulerHandle {
    /// Current lifecycle state
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Stop arming triggers, wait for any in-flight execution, then log out
    ///
    /// Consumes the handle, so logout runs exactly once.
    #[instrument(skip(self))]
    pub async fn shutdown(mut self) {
        info!("Shutting down scheduler");
        self.cancel.cancel();

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Scheduler task ended abnormally: {}", e);
                self.state.send_replace(SchedulerState::Stopped);
            }
        }

        self.auth.logout().await;
        info!("Scheduler stopped");
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        if !self.cancel.is_cancelled() {
            warn!("SchedulerHandle dropped without shutdown; cancelling");
            self.cancel.cancel();
        }
    }
}

async fn run_loop(
    trigger: ScheduleTrigger,
    job: Arc<dyn ScheduledJob>,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    state: Arc<watch::Sender<SchedulerState>>,
) {
    loop {
        let now = clock.now();
        let Some(next) = trigger.next_after(now) else {
            warn!("Cron {} has no upcoming fire time", trigger);
            break;
        };

        state.send_replace(SchedulerState::Armed);
        debug!("Next update at {}", next);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Shutdown requested while waiting for the next trigger");
                break;
            }
            _ = tokio::time::sleep(until(now, next)) => {}
        }

        // Timers can wake slightly ahead of the wall clock
        if clock.now() < next {
            continue;
        }

        if cancel.is_cancelled() {
            info!("Shutdown requested as the trigger fired; not starting the update");
            break;
        }

        state.send_replace(SchedulerState::Running);
        let result = {
            let execution = job.execute();
            tokio::pin!(execution);

            tokio::select! {
                result = &mut execution => result,
                _ = cancel.cancelled() => {
                    info!("Shutdown requested, waiting for the running update to finish");
                    state.send_replace(SchedulerState::Draining);
                    execution.await
                }
            }
        };

        if !result.is_success() {
            info!("Update cycle failed; next trigger stays armed");
        }

        if cancel.is_cancelled() {
            break;
        }

        let finished = clock.now();
        if let Some(missed) = trigger.next_after(next).filter(|t| *t <= finished) {
            warn!("Update ran past the trigger at {}; skipping to the next one", missed);
        }
    }

    state.send_replace(SchedulerState::Stopped);
}

fn until(now: DateTime<Utc>, next: DateTime<Utc>) -> Duration {
    (next - now).to_std().unwrap_or(Duration::ZERO)
}
