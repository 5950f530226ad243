//! Concurrent invocation of lifecycle hooks.

use std::fmt;
use std::sync::Arc;

use futures_util::future::join_all;
use thiserror::Error;
use tracing::{debug, error};

use super::{Extension, HookCall, HookContext, HookName};

/// A single failed hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
    /// Extension name, or the runtime step (e.g. `announcement`) that failed.
    pub source: String,
    pub reason: String,
}

impl fmt::Display for HookFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.reason)
    }
}

/// Every failure of one fan-out, one per line.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub struct AggregateHookFailure {
    pub failures: Vec<HookFailure>,
}

impl fmt::Display for AggregateHookFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

/// Outcome of fanning a hook out to the enabled extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookReport {
    pub hook: HookName,
    pub succeeded: Vec<String>,
    pub failed: Vec<HookFailure>,
}

impl HookReport {
    pub fn new(hook: HookName) -> Self {
        Self {
            hook,
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn record_failure(&mut self, source: impl Into<String>, reason: impl ToString) {
        self.failed.push(HookFailure {
            source: source.into(),
            reason: reason.to_string(),
        });
    }

    pub fn failed_sources(&self) -> Vec<String> {
        self.failed.iter().map(|f| f.source.clone()).collect()
    }

    pub fn failure(&self) -> Option<AggregateHookFailure> {
        (!self.failed.is_empty()).then(|| AggregateHookFailure {
            failures: self.failed.clone(),
        })
    }

    /// The succeeded extensions, or every failure when there was any.
    pub fn into_result(self) -> Result<Vec<String>, AggregateHookFailure> {
        if self.failed.is_empty() {
            Ok(self.succeeded)
        } else {
            Err(AggregateHookFailure {
                failures: self.failed,
            })
        }
    }
}

/// Invokes `call` on every extension concurrently and waits for all of them.
///
/// A failing extension never prevents the others from running; each outcome is
/// recorded in the returned report in extension order.
pub async fn fan_out(
    extensions: &[Arc<dyn Extension>],
    call: HookCall,
    ctx: &HookContext<'_>,
) -> HookReport {
    let hook = call.hook();
    let invocations = extensions.iter().map(|extension| async move {
        let result = call.invoke(extension.as_ref(), ctx).await;
        (extension.name(), result)
    });

    let mut report = HookReport::new(hook);
    for (name, result) in join_all(invocations).await {
        match result {
            Ok(()) => {
                debug!(target: "runtime::extensions", %hook, extension = name, "Hook completed");
                report.succeeded.push(name.to_owned());
            }
            Err(e) => {
                error!(
                    target: "runtime::extensions",
                    instance = %ctx.instance,
                    %hook,
                    extension = name,
                    error = %e,
                    "Hook failed, continuing"
                );
                report.record_failure(name, e);
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_lists_one_failure_per_line() {
        let mut report = HookReport::new(HookName::OnLock);
        report.succeeded.push("a".into());
        report.record_failure("b", "boom");
        report.record_failure("announcement", "channel gone");

        let failure = report.clone().into_result().unwrap_err();
        assert_eq!(failure.to_string(), "b: boom\nannouncement: channel gone");
        assert_eq!(report.failed_sources(), vec!["b", "announcement"]);
    }

    #[test]
    fn clean_report_yields_succeeded() {
        let mut report = HookReport::new(HookName::OnEnd);
        report.succeeded.push("a".into());
        assert!(report.is_clean());
        assert!(report.failure().is_none());
        assert_eq!(report.into_result().unwrap(), vec!["a".to_string()]);
    }
}
