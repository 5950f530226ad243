//! Scheduler workers for timed lock/unlock and grace changes.
//!
//! Each tick runs one pass over the instance's pending record:
//! 1. Nothing scheduled, or more than epsilon away: do nothing
//! 2. Otherwise claim the record (clear `when`) in one commit, so later ticks
//!    and concurrent workers skip it
//! 3. Sleep out the remaining delay; a reschedule during the sleep cancels
//!    the claimed record
//! 4. Apply through the phase orchestrator
//!
//! Rescheduling bumps a per-instance revision while the new record is still
//! uncommitted. A tick subscribes to the revision only after it holds the
//! instance, so any change it observes belongs to a newer record.
//!
//! A worker shut down during the sleep puts the claimed record back unless a
//! newer one replaced it, so a restart picks the change up again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, error, info, warn};

use game_core::{InstanceId, TickDecision, TransitionKind, ValidationError};

use crate::api::{Result, RuntimeError};
use crate::clock::Clock;
use crate::events::{EventBus, PhaseEvent, ScheduleEvent};
use crate::phase::PhaseOrchestrator;
use crate::repository::GameStore;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum JobKind {
    Transition,
    Grace,
}

/// Result of a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    NotYet,
    /// The record was claimed but the state already matched it.
    AlreadyApplied,
    /// A newer record replaced the claimed one during the wait.
    Cancelled,
    /// Shutdown arrived during the wait; the claimed record was restored.
    Interrupted,
    Applied,
    /// The orchestrator refused the transition, e.g. the game ended meanwhile.
    Rejected(ValidationError),
}

/// Per-instance revision counters used to cancel in-flight waits.
#[derive(Clone, Default)]
pub struct ScheduleSignals {
    revisions: Arc<Mutex<HashMap<(InstanceId, JobKind), watch::Sender<u64>>>>,
}

impl ScheduleSignals {
    pub fn subscribe(&self, instance: InstanceId, job: JobKind) -> watch::Receiver<u64> {
        let mut revisions = self.revisions.lock().unwrap_or_else(PoisonError::into_inner);
        revisions
            .entry((instance, job))
            .or_insert_with(|| watch::channel(0).0)
            .subscribe()
    }

    pub fn bump(&self, instance: InstanceId, job: JobKind) {
        let mut revisions = self.revisions.lock().unwrap_or_else(PoisonError::into_inner);
        revisions
            .entry((instance, job))
            .or_insert_with(|| watch::channel(0).0)
            .send_modify(|revision| *revision += 1);
    }
}

#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn kind(&self) -> JobKind;

    /// One pass over the pending record; `stop` interrupts the precise wait.
    async fn tick_until(
        &self,
        instance: InstanceId,
        stop: &mut watch::Receiver<bool>,
    ) -> Result<TickOutcome>;

    async fn tick(&self, instance: InstanceId) -> Result<TickOutcome> {
        let (_running, mut stop) = watch::channel(false);
        self.tick_until(instance, &mut stop).await
    }
}

/// How a precise wait ended.
enum WaitEnd {
    Elapsed,
    Rescheduled,
    Stopped,
}

/// Resolves once `stop` reads true or its sender is gone.
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

#[derive(Clone)]
struct JobContext {
    store: GameStore,
    phases: PhaseOrchestrator,
    clock: Arc<dyn Clock>,
    signals: ScheduleSignals,
    events: EventBus,
    epsilon: TimeDelta,
}

impl JobContext {
    fn log_overdue(&self, instance: InstanceId, job: JobKind, overdue: Option<TimeDelta>) {
        if let Some(late) = overdue {
            warn!(
                target: "runtime::scheduler",
                %instance,
                %job,
                late_ms = late.num_milliseconds(),
                "Scheduled change is overdue, applying now"
            );
        }
    }

    /// Sleeps `delay` unless the revision changes or `stop` fires first.
    async fn wait(
        &self,
        instance: InstanceId,
        job: JobKind,
        delay: Duration,
        revision: &mut watch::Receiver<u64>,
        stop: &mut watch::Receiver<bool>,
    ) -> WaitEnd {
        if delay.is_zero() {
            return WaitEnd::Elapsed;
        }

        debug!(target: "runtime::scheduler", %instance, %job, ?delay, "Waiting for scheduled time");
        self.events.publish(ScheduleEvent::Waiting {
            instance,
            job,
            delay,
        });

        tokio::select! {
            _ = sleep(delay) => WaitEnd::Elapsed,
            _ = revision.changed() => {
                info!(target: "runtime::scheduler", %instance, %job, "Rescheduled while waiting, dropping claimed change");
                self.events.publish(ScheduleEvent::Cancelled { instance, job });
                WaitEnd::Rescheduled
            }
            _ = stop_requested(stop) => WaitEnd::Stopped,
        }
    }

    /// Whether a newer record replaced the one this tick claimed.
    ///
    /// Must be called while holding the instance: a reschedule bumps the
    /// revision before it commits.
    fn replaced(&self, revision: &watch::Receiver<u64>) -> bool {
        revision.has_changed().unwrap_or(true)
    }

    fn skipped(&self, instance: InstanceId, job: JobKind, reason: &str) {
        debug!(target: "runtime::scheduler", %instance, %job, reason, "Scheduled change skipped");
        self.events.publish(ScheduleEvent::Skipped {
            instance,
            job,
            reason: reason.to_owned(),
        });
    }
}

/// Applies the pending lock/unlock of an instance.
pub struct TransitionJob {
    ctx: JobContext,
}

impl TransitionJob {
    pub fn new(
        store: GameStore,
        phases: PhaseOrchestrator,
        clock: Arc<dyn Clock>,
        signals: ScheduleSignals,
        events: EventBus,
        epsilon: TimeDelta,
    ) -> Self {
        Self {
            ctx: JobContext {
                store,
                phases,
                clock,
                signals,
                events,
                epsilon,
            },
        }
    }
}

#[async_trait]
impl ScheduledJob for TransitionJob {
    fn kind(&self) -> JobKind {
        JobKind::Transition
    }

    async fn tick_until(
        &self,
        instance: InstanceId,
        stop: &mut watch::Receiver<bool>,
    ) -> Result<TickOutcome> {
        let ctx = &self.ctx;
        let job = JobKind::Transition;

        let mut tx = ctx.store.begin(instance).await?;
        let mut revision = ctx.signals.subscribe(instance, job);
        let pending = tx.pending_transition().clone();

        let delay = match pending.decide(ctx.clock.now(), ctx.epsilon) {
            TickDecision::Idle => return Ok(TickOutcome::Idle),
            TickDecision::NotYet => return Ok(TickOutcome::NotYet),
            TickDecision::Due { delay, overdue } => {
                ctx.log_overdue(instance, job, overdue);
                delay
            }
        };

        tx.pending_transition_mut().when = None;
        let grace_changed = tx.state().grace != pending.grace;
        tx.state_mut().grace = pending.grace;
        let documents = tx.commit()?;

        if grace_changed {
            ctx.events.publish(PhaseEvent::GraceChanged {
                instance,
                grace: pending.grace,
            });
        }
        if pending.kind.is_applied(documents.state.locked) {
            ctx.skipped(instance, job, "already applied");
            return Ok(TickOutcome::AlreadyApplied);
        }

        match ctx.wait(instance, job, delay, &mut revision, stop).await {
            WaitEnd::Elapsed => {}
            WaitEnd::Rescheduled => return Ok(TickOutcome::Cancelled),
            WaitEnd::Stopped => {
                let mut tx = ctx.store.begin(instance).await?;
                if !ctx.replaced(&revision) {
                    *tx.pending_transition_mut() = pending;
                    tx.commit()?;
                    info!(target: "runtime::scheduler", %instance, %job, "Shutdown during wait, transition restored");
                }
                return Ok(TickOutcome::Interrupted);
            }
        }

        let applied = match pending.kind {
            TransitionKind::Lock => ctx.phases.lock(instance).await,
            TransitionKind::Unlock => ctx.phases.unlock(instance, pending.increment_day).await,
        };

        match applied {
            Ok(report) => {
                info!(
                    target: "runtime::scheduler",
                    %instance,
                    kind = %pending.kind,
                    day = report.state.day,
                    hooks_failed = report.hooks.failed.len(),
                    "Scheduled transition applied"
                );
                ctx.events.publish(ScheduleEvent::Applied { instance, job });
                Ok(TickOutcome::Applied)
            }
            Err(RuntimeError::Validation(e)) => {
                ctx.skipped(instance, job, &e.to_string());
                Ok(TickOutcome::Rejected(e))
            }
            Err(e) => Err(e),
        }
    }
}

/// Applies the pending grace change of an instance.
pub struct GraceJob {
    ctx: JobContext,
}

impl GraceJob {
    pub fn new(
        store: GameStore,
        phases: PhaseOrchestrator,
        clock: Arc<dyn Clock>,
        signals: ScheduleSignals,
        events: EventBus,
        epsilon: TimeDelta,
    ) -> Self {
        Self {
            ctx: JobContext {
                store,
                phases,
                clock,
                signals,
                events,
                epsilon,
            },
        }
    }
}

#[async_trait]
impl ScheduledJob for GraceJob {
    fn kind(&self) -> JobKind {
        JobKind::Grace
    }

    async fn tick_until(
        &self,
        instance: InstanceId,
        stop: &mut watch::Receiver<bool>,
    ) -> Result<TickOutcome> {
        let ctx = &self.ctx;
        let job = JobKind::Grace;

        let mut tx = ctx.store.begin(instance).await?;
        let mut revision = ctx.signals.subscribe(instance, job);
        let pending = tx.pending_grace().clone();

        let delay = match pending.decide(ctx.clock.now(), ctx.epsilon) {
            TickDecision::Idle => return Ok(TickOutcome::Idle),
            TickDecision::NotYet => return Ok(TickOutcome::NotYet),
            TickDecision::Due { delay, overdue } => {
                ctx.log_overdue(instance, job, overdue);
                delay
            }
        };

        tx.pending_grace_mut().when = None;
        let already = tx.state().grace == pending.target;
        tx.commit()?;

        if already {
            ctx.skipped(instance, job, "already applied");
            return Ok(TickOutcome::AlreadyApplied);
        }

        match ctx.wait(instance, job, delay, &mut revision, stop).await {
            WaitEnd::Elapsed => {}
            WaitEnd::Rescheduled => return Ok(TickOutcome::Cancelled),
            WaitEnd::Stopped => {
                let mut tx = ctx.store.begin(instance).await?;
                if !ctx.replaced(&revision) {
                    *tx.pending_grace_mut() = pending;
                    tx.commit()?;
                    info!(target: "runtime::scheduler", %instance, %job, "Shutdown during wait, grace change restored");
                }
                return Ok(TickOutcome::Interrupted);
            }
        }

        ctx.phases.set_grace(instance, pending.target).await?;
        info!(target: "runtime::scheduler", %instance, grace = pending.target, "Scheduled grace applied");
        ctx.events.publish(ScheduleEvent::Applied { instance, job });
        Ok(TickOutcome::Applied)
    }
}

/// Polls one job for one instance until shut down.
pub struct ScheduleWorker {
    instance: InstanceId,
    job: Arc<dyn ScheduledJob>,
    period: Duration,
    phases: PhaseOrchestrator,
    events: EventBus,
    shutdown: watch::Receiver<bool>,
}

impl ScheduleWorker {
    pub fn new(
        instance: InstanceId,
        job: Arc<dyn ScheduledJob>,
        period: Duration,
        phases: PhaseOrchestrator,
        events: EventBus,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            instance,
            job,
            period,
            phases,
            events,
            shutdown,
        }
    }

    /// Main worker loop.
    pub async fn run(self) {
        let Self {
            instance,
            job,
            period,
            phases,
            events,
            mut shutdown,
        } = self;
        let kind = job.kind();

        info!(target: "runtime::scheduler", %instance, job = %kind, ?period, "Schedule worker started");

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = stop_requested(&mut shutdown) => break,
                _ = ticker.tick() => {}
            }
            tick_once(instance, job.as_ref(), &mut shutdown, &phases, &events).await;
        }

        info!(target: "runtime::scheduler", %instance, job = %kind, "Schedule worker stopped");
    }
}

async fn tick_once(
    instance: InstanceId,
    job: &dyn ScheduledJob,
    shutdown: &mut watch::Receiver<bool>,
    phases: &PhaseOrchestrator,
    events: &EventBus,
) {
    let kind = job.kind();
    match job.tick_until(instance, shutdown).await {
        Ok(outcome) => {
            debug!(target: "runtime::scheduler", %instance, job = %kind, ?outcome, "Tick finished");
        }
        Err(e) => {
            error!(target: "runtime::scheduler", %instance, job = %kind, error = %e, "Scheduled tick failed");
            phases
                .alert_operator(instance, format!("Scheduled {kind} failed: {e}"))
                .await;
            events.publish(ScheduleEvent::Failed {
                instance,
                job: kind,
                error: e.to_string(),
            });
        }
    }
}

/// Handle over the workers spawned for an instance.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub(crate) fn new(shutdown: watch::Sender<bool>, tasks: Vec<JoinHandle<()>>) -> Self {
        Self { shutdown, tasks }
    }

    /// Signals every worker and waits for them to stop.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(target: "runtime::scheduler", error = %e, "Schedule worker panicked");
            }
        }
    }
}
