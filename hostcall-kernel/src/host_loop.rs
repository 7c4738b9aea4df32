//! The consumer side of the execution queue, owned by the host thread.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Arc;

use futures::FutureExt;
use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;
use tracing::{debug, trace, warn};

use crate::dispatcher::Shared;
use crate::observer::DispatchEvent;
use crate::tick::{TickHandle, TickSource};

thread_local! {
    static HOST_LOOPS: Cell<usize> = const { Cell::new(0) };
}

/// Returns `true` when the current thread owns a live [`HostLoop`].
#[must_use]
pub fn is_host_thread() -> bool {
    HOST_LOOPS.with(Cell::get) > 0
}

/// Summary of one drain tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Actions run during this tick.
    pub executed: usize,
    /// Actions that panicked; they were logged and skipped.
    pub panicked: usize,
    /// Fire-and-forget error cleared because the queue was empty.
    pub discarded_error: Option<String>,
    /// Host-local continuations still waiting after this tick.
    pub pending_continuations: usize,
}

impl TickReport {
    /// Returns `true` when the tick found nothing to run.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.executed == 0
    }
}

/// Spawner for continuations that must resume on the host thread.
#[derive(Clone)]
struct Continuations {
    spawner: LocalSpawner,
    live: Rc<Cell<usize>>,
}

impl Continuations {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + 'static,
    {
        let live = Rc::clone(&self.live);
        live.set(live.get() + 1);
        let guarded = async move {
            if AssertUnwindSafe(future).catch_unwind().await.is_err() {
                warn!("host continuation panicked");
            }
            live.set(live.get() - 1);
        };
        if self.spawner.spawn_local(guarded).is_err() {
            warn!("host executor is shut down; continuation dropped");
        }
    }
}

/// View of the host loop handed to each action while it runs.
pub struct HostContext<'a> {
    shared: &'a Arc<Shared>,
    continuations: &'a Continuations,
}

impl HostContext<'_> {
    /// Runs `future` on the host thread, polled by subsequent ticks.
    ///
    /// A panic inside the future is caught and logged.
    pub fn spawn_local<F>(&self, future: F)
    where
        F: Future<Output = ()> + 'static,
    {
        self.continuations.spawn(future);
    }

    /// Reads and clears the parked fire-and-forget error.
    #[must_use]
    pub fn take_pending_error(&self) -> Option<String> {
        self.shared.pending_error.take()
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        self.shared
    }
}

/// Drains the dispatcher's queue on the thread that owns it.
///
/// A `HostLoop` is not `Send`: create it on the host thread with
/// [`Dispatcher::host_loop`](crate::Dispatcher::host_loop) and drive it either
/// by calling [`HostLoop::tick`] from the host's own update hook or by
/// attaching it to a [`TickSource`].
pub struct HostLoop {
    shared: Arc<Shared>,
    pool: LocalPool,
    continuations: Continuations,
    ticks: u64,
}

impl HostLoop {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        shared.queue.open();
        HOST_LOOPS.with(|count| count.set(count.get() + 1));
        let pool = LocalPool::new();
        let continuations = Continuations {
            spawner: pool.spawner(),
            live: Rc::new(Cell::new(0)),
        };
        debug!("host loop started");
        Self {
            shared,
            pool,
            continuations,
            ticks: 0,
        }
    }

    /// Runs one drain tick.
    ///
    /// With an empty queue the parked fire-and-forget error is discarded.
    /// Otherwise every action queued before the tick started runs in FIFO
    /// order; actions queued meanwhile wait for the next tick. Host-local
    /// continuations are then polled until none can make progress.
    pub fn tick(&mut self) -> TickReport {
        self.ticks += 1;
        let actions = self.shared.queue.drain();
        let mut report = TickReport::default();

        if actions.is_empty() {
            if let Some(message) = self.shared.pending_error.take() {
                self.shared
                    .observer
                    .on_event(&DispatchEvent::ErrorDiscarded { message: &message });
                report.discarded_error = Some(message);
            }
        } else {
            let mut context = HostContext {
                shared: &self.shared,
                continuations: &self.continuations,
            };
            for action in actions {
                report.executed += 1;
                if panic::catch_unwind(AssertUnwindSafe(|| action(&mut context))).is_err() {
                    warn!(tick = self.ticks, "host action panicked");
                    report.panicked += 1;
                }
            }
        }

        self.pool.run_until_stalled();
        report.pending_continuations = self.continuations.live.get();
        trace!(tick = self.ticks, ?report, "host tick finished");
        report
    }

    /// Number of ticks run so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Host-local continuations that have not finished yet.
    #[must_use]
    pub fn pending_continuations(&self) -> usize {
        self.continuations.live.get()
    }

    /// Registers this loop's tick with `source`.
    pub fn attach<S>(self, source: &S) -> Attachment
    where
        S: TickSource + ?Sized,
    {
        let host = Rc::new(RefCell::new(self));
        let callback_host = Rc::clone(&host);
        let handle = source.register(Box::new(move || {
            // Skipped when fired re-entrantly from inside a tick.
            if let Ok(mut host) = callback_host.try_borrow_mut() {
                host.tick();
            }
        }));
        debug!(?handle, "host loop attached to tick source");
        Attachment { handle, host }
    }
}

impl Drop for HostLoop {
    fn drop(&mut self) {
        let dropped = self.shared.queue.close().len();
        self.shared.release_host();
        HOST_LOOPS.with(|count| count.set(count.get().saturating_sub(1)));
        debug!(dropped, "host loop stopped");
    }
}

/// A host loop registered with a [`TickSource`].
pub struct Attachment {
    handle: TickHandle,
    host: Rc<RefCell<HostLoop>>,
}

impl Attachment {
    /// Handle under which the loop's tick is registered.
    #[must_use]
    pub const fn handle(&self) -> TickHandle {
        self.handle
    }

    /// Runs a tick immediately, outside the tick source's schedule.
    ///
    /// Returns `None` when called from inside a running tick.
    pub fn tick_now(&self) -> Option<TickReport> {
        self.host.try_borrow_mut().ok().map(|mut host| host.tick())
    }

    /// Unregisters the loop's tick and returns the loop.
    ///
    /// Returns `None` when the tick source still holds the callback, in which
    /// case the loop stops once the source drops it.
    pub fn detach<S>(self, source: &S) -> Option<HostLoop>
    where
        S: TickSource + ?Sized,
    {
        source.unregister(self.handle);
        debug!(handle = ?self.handle, "host loop detached from tick source");
        Rc::try_unwrap(self.host).ok().map(RefCell::into_inner)
    }
}
