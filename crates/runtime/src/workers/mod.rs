//! Worker tasks that back the runtime orchestration.
//!
//! Each scheduler worker owns one job kind for one instance and polls it on a
//! fixed interval until shut down.

mod scheduler;

pub use scheduler::{
    GraceJob, JobKind, ScheduleSignals, ScheduleWorker, ScheduledJob, SchedulerHandle, TickOutcome,
    TransitionJob,
};
