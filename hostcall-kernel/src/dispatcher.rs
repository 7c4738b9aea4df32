//! Routes requests to tools and hands their execution to the host thread.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use hostcall_primitives::{CallId, RequestContext, RouteResult};
use hostcall_tools::{
    BoundArgs, Invocation, RegisteredTool, ToolError, ToolRegistry, ToolResult, bind_arguments,
};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{Instrument, Span, debug, debug_span};

use crate::queue::{ActionQueue, ErrorSlot, PendingAction};
use crate::{
    DispatchError, DispatchEvent, DispatchObserver, DispatchResult, HostContext, HostLoop,
    TracingDispatchObserver,
};

/// State shared by every dispatcher handle and the host loop.
pub(crate) struct Shared {
    pub(crate) registry: Arc<ToolRegistry>,
    pub(crate) queue: ActionQueue,
    pub(crate) pending_error: ErrorSlot,
    pub(crate) observer: Arc<dyn DispatchObserver>,
    host_active: AtomicBool,
}

impl Shared {
    pub(crate) fn release_host(&self) {
        self.host_active.store(false, Ordering::Release);
    }

    fn park_failure(&self, tool: &str, error: &ToolError) {
        let message = DispatchError::execution(tool, error).to_string();
        self.observer.on_event(&DispatchEvent::BackgroundFailed {
            tool,
            message: &message,
        });
        if let Some(previous) = self.pending_error.replace(message) {
            debug!(tool, previous, "unreported fire-and-forget error overwritten");
        }
    }

    fn complete(
        &self,
        tool: &str,
        outcome: ToolResult<Value>,
        reply: oneshot::Sender<RouteResult>,
    ) {
        let result = match outcome {
            Ok(value) => RouteResult::ok(value),
            Err(error) => DispatchError::execution(tool, &error).into(),
        };
        self.observer
            .on_event(&DispatchEvent::Completed { tool, result: &result });
        if reply.send(result).is_err() {
            debug!(tool, "caller stopped waiting before the result was ready");
        }
    }
}

/// Outcome of submitting a request.
#[derive(Debug)]
pub enum Ticket {
    /// The result was known without involving the host thread.
    Ready(RouteResult),
    /// The call is queued; the result arrives once the host loop runs it.
    Waiting(oneshot::Receiver<RouteResult>),
}

impl Ticket {
    /// Waits for the result without blocking the current thread.
    pub async fn resolve(self) -> RouteResult {
        match self {
            Self::Ready(result) => result,
            Self::Waiting(receiver) => receiver
                .await
                .unwrap_or_else(|_| DispatchError::Abandoned.into()),
        }
    }

    /// Blocks the current thread until the result arrives.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context, and
    /// never returns when called on the host thread itself.
    #[must_use]
    pub fn resolve_blocking(self) -> RouteResult {
        match self {
            Self::Ready(result) => result,
            Self::Waiting(receiver) => receiver
                .blocking_recv()
                .unwrap_or_else(|_| DispatchError::Abandoned.into()),
        }
    }

    /// Returns the result if it is already available.
    pub fn try_resolve(&mut self) -> Option<RouteResult> {
        match self {
            Self::Ready(result) => Some(result.clone()),
            Self::Waiting(receiver) => match receiver.try_recv() {
                Ok(result) => Some(result),
                Err(oneshot::error::TryRecvError::Empty) => None,
                Err(oneshot::error::TryRecvError::Closed) => Some(DispatchError::Abandoned.into()),
            },
        }
    }
}

/// Entry point for calling tools from any thread.
///
/// Cloning is cheap; every clone feeds the same queue and pending-error slot.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tools", &self.shared.registry.len())
            .field("queued", &self.queued())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher that logs events through `tracing`.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self::with_observer(registry, Arc::new(TracingDispatchObserver))
    }

    /// Creates a dispatcher reporting to `observer`.
    #[must_use]
    pub fn with_observer(
        registry: Arc<ToolRegistry>,
        observer: Arc<dyn DispatchObserver>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry,
                queue: ActionQueue::default(),
                pending_error: ErrorSlot::default(),
                observer,
                host_active: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the registry calls are routed through.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.shared.registry
    }

    /// Creates the host loop for this dispatcher on the current thread.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::HostAlreadyRunning`] while another host loop
    /// for this dispatcher is alive.
    pub fn host_loop(&self) -> DispatchResult<HostLoop> {
        if self.shared.host_active.swap(true, Ordering::AcqRel) {
            return Err(DispatchError::HostAlreadyRunning);
        }
        Ok(HostLoop::new(Arc::clone(&self.shared)))
    }

    /// Number of actions waiting for the next tick.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    /// Returns the parked fire-and-forget error without clearing it.
    #[must_use]
    pub fn pending_error(&self) -> Option<String> {
        self.shared.pending_error.peek()
    }

    /// Queues an arbitrary action for the host thread.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::HostStopped`] when the host loop is gone.
    pub fn enqueue<F>(&self, action: F) -> DispatchResult<()>
    where
        F: FnOnce(&mut HostContext<'_>) + Send + 'static,
    {
        self.push(Box::new(action))
    }

    fn push(&self, action: PendingAction) -> DispatchResult<()> {
        self.shared
            .queue
            .push(action)
            .map_err(|_| DispatchError::HostStopped)
    }

    /// Looks up, binds, and queues a call.
    ///
    /// Unknown tools and binding failures resolve immediately without
    /// touching the queue. Fire-and-forget tools resolve immediately with the
    /// delayed acknowledgement once queued.
    pub fn submit(&self, request: &dyn RequestContext) -> Ticket {
        let name = request.tool_name();
        let observer = &self.shared.observer;

        let Some(tool) = self.shared.registry.get(name) else {
            observer.on_event(&DispatchEvent::NotFound { tool: name });
            return Ticket::Ready(DispatchError::NotFound { name: name.into() }.into());
        };

        let args = match bind_arguments(tool.metadata(), request) {
            Ok(args) => args,
            Err(source) => {
                let error = DispatchError::Binding {
                    tool: name.into(),
                    source,
                };
                let reason = error.to_string();
                observer.on_event(&DispatchEvent::Rejected {
                    tool: name,
                    reason: &reason,
                });
                return Ticket::Ready(error.into());
            }
        };

        let convention = tool.metadata().convention();
        let span = debug_span!("call", call = %CallId::random(), tool = name);
        if convention.is_result_bearing() {
            let (reply, receiver) = oneshot::channel();
            let action = move |context: &mut HostContext<'_>| {
                let _entered = span.enter();
                run_awaited(context, &tool, args, reply);
            };
            match self.push(Box::new(action)) {
                Ok(()) => {
                    observer.on_event(&DispatchEvent::Queued { tool: name, convention });
                    Ticket::Waiting(receiver)
                }
                Err(error) => Ticket::Ready(error.into()),
            }
        } else {
            let action = move |context: &mut HostContext<'_>| {
                let _entered = span.enter();
                run_detached(context, &tool, args);
            };
            match self.push(Box::new(action)) {
                Ok(()) => {
                    observer.on_event(&DispatchEvent::Queued { tool: name, convention });
                    Ticket::Ready(RouteResult::delayed())
                }
                Err(error) => Ticket::Ready(error.into()),
            }
        }
    }

    /// Dispatches a call and waits for its result without blocking.
    pub async fn dispatch(&self, request: &dyn RequestContext) -> RouteResult {
        self.submit(request).resolve().await
    }

    /// Dispatches a call and blocks the calling thread until it completes.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context.
    #[must_use]
    pub fn dispatch_blocking(&self, request: &dyn RequestContext) -> RouteResult {
        self.submit(request).resolve_blocking()
    }
}

fn invoke(tool: &RegisteredTool, args: BoundArgs) -> ToolResult<Invocation> {
    panic::catch_unwind(AssertUnwindSafe(|| tool.invoke(args)))
        .unwrap_or_else(|payload| Err(ToolError::from_panic(payload.as_ref())))
}

fn run_detached(context: &mut HostContext<'_>, tool: &RegisteredTool, args: BoundArgs) {
    let name = tool.metadata().name();
    let continuation = match invoke(tool, args) {
        Ok(Invocation::Done | Invocation::Complete(_)) => return,
        Ok(Invocation::Detached(future)) => future,
        Ok(Invocation::Pending(future)) => future.map(|outcome| outcome.map(drop)).boxed_local(),
        Err(error) => {
            context.shared().park_failure(name, &error);
            return;
        }
    };

    let shared = Arc::clone(context.shared());
    let name = name.to_owned();
    let continuation = async move {
        let outcome = AssertUnwindSafe(continuation)
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(ToolError::from_panic(payload.as_ref())));
        if let Err(error) = outcome {
            shared.park_failure(&name, &error);
        }
    };
    context.spawn_local(continuation.instrument(Span::current()));
}

fn run_awaited(
    context: &mut HostContext<'_>,
    tool: &RegisteredTool,
    args: BoundArgs,
    reply: oneshot::Sender<RouteResult>,
) {
    let name = tool.metadata().name();
    let shared = Arc::clone(context.shared());

    if let Some(message) = context.take_pending_error() {
        let result: RouteResult = DispatchError::PendingFailure { message }.into();
        shared
            .observer
            .on_event(&DispatchEvent::Completed { tool: name, result: &result });
        if reply.send(result).is_err() {
            debug!(tool = name, "caller stopped waiting before the result was ready");
        }
        return;
    }

    let continuation = match invoke(tool, args) {
        Ok(Invocation::Complete(value)) => return shared.complete(name, Ok(value), reply),
        Ok(Invocation::Done) => return shared.complete(name, Ok(Value::Null), reply),
        Ok(Invocation::Pending(future)) => future,
        Ok(Invocation::Detached(future)) => future
            .map(|outcome| outcome.map(|()| Value::Null))
            .boxed_local(),
        Err(error) => return shared.complete(name, Err(error), reply),
    };

    let name = name.to_owned();
    let continuation = async move {
        let outcome = AssertUnwindSafe(continuation)
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(ToolError::from_panic(payload.as_ref())));
        shared.complete(&name, outcome, reply);
    };
    context.spawn_local(continuation.instrument(Span::current()));
}

#[cfg(test)]
mod tests {
    use hostcall_primitives::{RouteStatus, ToolRequest};
    use hostcall_tools::{CallingConvention, ParamSpec, Signature, ToolCandidate};

    use super::*;

    fn add_signature() -> Signature {
        Signature::new(CallingConvention::Synchronous)
            .param(ParamSpec::of::<i64>("a"))
            .param(ParamSpec::of::<i64>("b"))
            .returns::<i64>()
    }

    fn add(mut args: BoundArgs) -> ToolResult<Invocation> {
        let a: i64 = args.take(0, "a")?;
        let b: i64 = args.take(1, "b")?;
        Ok(Invocation::Complete(Value::from(a + b)))
    }

    fn panic_signature() -> Signature {
        Signature::new(CallingConvention::FireAndForget)
    }

    fn panics(_args: BoundArgs) -> ToolResult<Invocation> {
        panic!("kaboom")
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(ToolRegistry::from_candidates([
            ToolCandidate::new("add", add_signature, add),
            ToolCandidate::new("panics", panic_signature, panics),
        ])))
    }

    #[test]
    fn unknown_tools_resolve_without_queueing() {
        let dispatcher = dispatcher();
        let result = dispatcher.dispatch_blocking(&ToolRequest::new("missing"));
        assert_eq!(result.status, RouteStatus::NotFound);
        assert_eq!(dispatcher.queued(), 0);
    }

    #[test]
    fn awaited_calls_resolve_after_a_tick() {
        let dispatcher = dispatcher();
        let mut host = dispatcher.host_loop().expect("host loop");
        let mut ticket =
            dispatcher.submit(&ToolRequest::new("add").with_param("a", 2).with_param("b", 3));
        assert!(ticket.try_resolve().is_none());

        let report = host.tick();
        assert_eq!(report.executed, 1);
        assert_eq!(ticket.resolve_blocking(), RouteResult::ok(Value::from(5)));
    }

    #[test]
    fn panicking_bodies_are_parked_like_errors() {
        let dispatcher = dispatcher();
        let mut host = dispatcher.host_loop().expect("host loop");
        assert!(dispatcher.submit(&ToolRequest::new("panics")).try_resolve().is_some());

        let report = host.tick();
        assert_eq!(report.panicked, 0);
        let parked = dispatcher.pending_error().expect("parked error");
        assert!(parked.contains("kaboom"), "{parked}");
    }

    #[test]
    fn only_one_host_loop_at_a_time() {
        let dispatcher = dispatcher();
        let host = dispatcher.host_loop().expect("first");
        assert!(crate::is_host_thread());
        assert_eq!(
            dispatcher.host_loop().err(),
            Some(DispatchError::HostAlreadyRunning)
        );
        drop(host);
        assert!(!crate::is_host_thread());
        assert!(dispatcher.host_loop().is_ok());
    }

    #[test]
    fn dropping_the_host_loop_abandons_queued_calls() {
        let dispatcher = dispatcher();
        let host = dispatcher.host_loop().expect("host loop");
        let ticket =
            dispatcher.submit(&ToolRequest::new("add").with_param("a", 1).with_param("b", 1));
        drop(host);

        let result = ticket.resolve_blocking();
        assert_eq!(result.message, Some(DispatchError::Abandoned.to_string()));
        let rejected = dispatcher.submit(&ToolRequest::new("add"));
        assert_eq!(
            rejected.resolve_blocking().message,
            Some(DispatchError::HostStopped.to_string())
        );
    }
}
