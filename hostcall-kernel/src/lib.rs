//! Host-thread execution queue and dispatcher.
//!
//! Callers on any thread hand requests to a [`Dispatcher`], which binds the
//! arguments and queues a closure. A single [`HostLoop`] living on the host
//! thread drains the queue once per tick, so tool bodies only ever run there.
//! Asynchronous tool bodies are polled by the same loop, which means their
//! continuations resume on the host thread too.
//!
//! Fire-and-forget calls return immediately; if one of them fails, its error
//! is parked in a single-slot mailbox and handed to the next result-bearing
//! call that starts, unless an idle tick clears it first.

#![warn(missing_docs, clippy::pedantic)]

mod dispatcher;
mod error;
mod host_loop;
mod host_thread;
mod observer;
mod queue;
mod tick;

pub use dispatcher::{Dispatcher, Ticket};
pub use error::{DispatchError, DispatchResult};
pub use host_loop::{Attachment, HostContext, HostLoop, TickReport, is_host_thread};
pub use host_thread::{HostThread, HostThreadConfig};
pub use observer::{
    CompositeDispatchObserver, DispatchEvent, DispatchObserver, TracingDispatchObserver,
};
pub use queue::PendingAction;
pub use tick::{IntervalTicker, ManualTicker, TickHandle, TickSource};
