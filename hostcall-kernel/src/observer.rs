//! Hooks for observing dispatch outcomes.

use std::sync::Arc;

use hostcall_primitives::{RouteResult, RouteStatus};
use hostcall_tools::CallingConvention;
use tracing::{debug, warn};

/// Something that happened to a dispatched call.
#[derive(Debug, Clone, Copy)]
pub enum DispatchEvent<'a> {
    /// The requested tool does not exist.
    NotFound {
        /// Requested tool name.
        tool: &'a str,
    },
    /// Arguments failed to bind; nothing was queued.
    Rejected {
        /// Tool name.
        tool: &'a str,
        /// Binder failure rendered as text.
        reason: &'a str,
    },
    /// The call was queued for the host thread.
    Queued {
        /// Tool name.
        tool: &'a str,
        /// Calling convention of the tool.
        convention: CallingConvention,
    },
    /// A result-bearing call produced its result.
    Completed {
        /// Tool name.
        tool: &'a str,
        /// Result delivered to the caller.
        result: &'a RouteResult,
    },
    /// A fire-and-forget call failed and its error was parked.
    BackgroundFailed {
        /// Tool name.
        tool: &'a str,
        /// Parked error message.
        message: &'a str,
    },
    /// A parked error was cleared by an idle tick without reaching a caller.
    ErrorDiscarded {
        /// Discarded error message.
        message: &'a str,
    },
}

/// Observer invoked for every dispatch event.
///
/// `Completed`, `BackgroundFailed` and `ErrorDiscarded` are reported from the
/// host thread; the others from the calling thread.
pub trait DispatchObserver: Send + Sync {
    /// Records a dispatch event.
    fn on_event(&self, event: &DispatchEvent<'_>);
}

/// Observer that emits dispatch events to the tracing system.
#[derive(Debug, Default)]
pub struct TracingDispatchObserver;

impl DispatchObserver for TracingDispatchObserver {
    fn on_event(&self, event: &DispatchEvent<'_>) {
        match *event {
            DispatchEvent::NotFound { tool } => debug!(tool, "dispatch to unknown tool"),
            DispatchEvent::Rejected { tool, reason } => {
                warn!(tool, reason, "dispatch rejected during argument binding");
            }
            DispatchEvent::Queued { tool, convention } => {
                debug!(tool, ?convention, "dispatch queued");
            }
            DispatchEvent::Completed { tool, result } => match result.status {
                RouteStatus::Ok => debug!(tool, "dispatch completed"),
                _ => warn!(
                    tool,
                    message = result.message.as_deref().unwrap_or_default(),
                    "dispatch failed"
                ),
            },
            DispatchEvent::BackgroundFailed { tool, message } => {
                warn!(tool, message, "fire-and-forget call failed");
            }
            DispatchEvent::ErrorDiscarded { message } => {
                warn!(message, "discarding unreported fire-and-forget error on idle tick");
            }
        }
    }
}

/// Composite observer that forwards events to a collection of observers.
#[derive(Default)]
pub struct CompositeDispatchObserver {
    observers: Vec<Arc<dyn DispatchObserver>>,
}

impl CompositeDispatchObserver {
    /// Creates a composite observer from the supplied list.
    #[must_use]
    pub fn new<I>(observers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn DispatchObserver>>,
    {
        Self {
            observers: observers.into_iter().collect(),
        }
    }

    /// Adds an observer to the composite set.
    pub fn push(&mut self, observer: Arc<dyn DispatchObserver>) {
        self.observers.push(observer);
    }
}

impl DispatchObserver for CompositeDispatchObserver {
    fn on_event(&self, event: &DispatchEvent<'_>) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recording(Mutex<Vec<String>>);

    impl DispatchObserver for Recording {
        fn on_event(&self, event: &DispatchEvent<'_>) {
            self.0
                .lock()
                .expect("recording poisoned")
                .push(format!("{event:?}"));
        }
    }

    #[test]
    fn composite_forwards_to_every_observer() {
        let first = Arc::new(Recording::default());
        let second = Arc::new(Recording::default());
        let mut composite = CompositeDispatchObserver::new([first.clone() as Arc<dyn DispatchObserver>]);
        composite.push(second.clone());
        composite.push(Arc::new(TracingDispatchObserver));

        composite.on_event(&DispatchEvent::NotFound { tool: "missing" });

        assert_eq!(first.0.lock().expect("poisoned").len(), 1);
        assert!(second.0.lock().expect("poisoned")[0].contains("missing"));
    }
}
