//! Atomic counters fed by dispatch events.

use std::sync::atomic::{AtomicU64, Ordering};

use hostcall_kernel::{DispatchEvent, DispatchObserver};
use serde::Serialize;

/// Counts dispatch outcomes.
///
/// Register it with
/// [`Dispatcher::with_observer`](hostcall_kernel::Dispatcher::with_observer),
/// usually alongside the tracing observer in a
/// [`CompositeDispatchObserver`](hostcall_kernel::CompositeDispatchObserver).
#[derive(Debug, Default)]
pub struct DispatchStats {
    not_found: AtomicU64,
    rejected: AtomicU64,
    queued: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    background_failures: AtomicU64,
    discarded_errors: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSnapshot {
    /// Calls naming an unknown tool.
    pub not_found: u64,
    /// Calls whose arguments failed to bind.
    pub rejected: u64,
    /// Calls handed to the host thread.
    pub queued: u64,
    /// Result-bearing calls that completed successfully.
    pub succeeded: u64,
    /// Result-bearing calls that completed with an error.
    pub failed: u64,
    /// Fire-and-forget failures parked for a later caller.
    pub background_failures: u64,
    /// Parked failures cleared by an idle tick.
    pub discarded_errors: u64,
}

impl DispatchStats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every counter.
    #[must_use]
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            not_found: self.not_found.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            background_failures: self.background_failures.load(Ordering::Relaxed),
            discarded_errors: self.discarded_errors.load(Ordering::Relaxed),
        }
    }
}

impl DispatchObserver for DispatchStats {
    fn on_event(&self, event: &DispatchEvent<'_>) {
        let counter = match event {
            DispatchEvent::NotFound { .. } => &self.not_found,
            DispatchEvent::Rejected { .. } => &self.rejected,
            DispatchEvent::Queued { .. } => &self.queued,
            DispatchEvent::Completed { result, .. } if result.is_ok() => &self.succeeded,
            DispatchEvent::Completed { .. } => &self.failed,
            DispatchEvent::BackgroundFailed { .. } => &self.background_failures,
            DispatchEvent::ErrorDiscarded { .. } => &self.discarded_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use hostcall_primitives::RouteResult;
    use hostcall_tools::CallingConvention;
    use serde_json::json;

    use super::*;

    #[test]
    fn events_land_in_their_counters() {
        let stats = DispatchStats::new();
        let ok = RouteResult::ok(json!(1));
        let failed = RouteResult::internal_error("boom");

        stats.on_event(&DispatchEvent::NotFound { tool: "missing" });
        stats.on_event(&DispatchEvent::Queued {
            tool: "add",
            convention: CallingConvention::Synchronous,
        });
        stats.on_event(&DispatchEvent::Completed {
            tool: "add",
            result: &ok,
        });
        stats.on_event(&DispatchEvent::Completed {
            tool: "add",
            result: &failed,
        });
        stats.on_event(&DispatchEvent::BackgroundFailed {
            tool: "spawn",
            message: "boom",
        });
        stats.on_event(&DispatchEvent::ErrorDiscarded { message: "boom" });

        assert_eq!(
            stats.snapshot(),
            DispatchSnapshot {
                not_found: 1,
                rejected: 0,
                queued: 1,
                succeeded: 1,
                failed: 1,
                background_failures: 1,
                discarded_errors: 1,
            }
        );
    }
}
