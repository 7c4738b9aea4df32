//! Periodic callbacks that drive host loops.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::mem;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::trace;

/// Identifies a callback registered with a [`TickSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(u64);

/// External periodic callback owned by the host environment.
///
/// The dispatcher never schedules ticks itself; it registers its drain
/// function with a source and unregisters it on stop.
pub trait TickSource {
    /// Registers `callback` to run on every tick.
    fn register(&self, callback: Box<dyn FnMut()>) -> TickHandle;

    /// Removes a callback, returning `false` when `handle` was unknown.
    fn unregister(&self, handle: TickHandle) -> bool;
}

/// Tick source fired explicitly by its owner.
///
/// Suits hosts that already have an update hook: call [`ManualTicker::fire`]
/// from it. Callbacks must not register or unregister on the same ticker
/// while it is firing.
#[derive(Default)]
pub struct ManualTicker {
    callbacks: RefCell<Vec<(TickHandle, Box<dyn FnMut()>)>>,
    next_handle: Cell<u64>,
}

impl ManualTicker {
    /// Creates a ticker with no callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every registered callback once, in registration order.
    ///
    /// Returns the number of callbacks run.
    pub fn fire(&self) -> usize {
        let mut callbacks = mem::take(&mut *self.callbacks.borrow_mut());
        for (_, callback) in &mut callbacks {
            callback();
        }
        let fired = callbacks.len();
        let mut registered = self.callbacks.borrow_mut();
        let added = mem::replace(&mut *registered, callbacks);
        registered.extend(added);
        fired
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.borrow().len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.borrow().is_empty()
    }
}

impl TickSource for ManualTicker {
    fn register(&self, callback: Box<dyn FnMut()>) -> TickHandle {
        let handle = TickHandle(self.next_handle.get());
        self.next_handle.set(handle.0 + 1);
        self.callbacks.borrow_mut().push((handle, callback));
        handle
    }

    fn unregister(&self, handle: TickHandle) -> bool {
        let mut callbacks = self.callbacks.borrow_mut();
        let before = callbacks.len();
        callbacks.retain(|(registered, _)| *registered != handle);
        before != callbacks.len()
    }
}

/// Tick source that fires on a fixed period using `tokio` timers.
pub struct IntervalTicker {
    period: Duration,
    ticker: ManualTicker,
}

impl IntervalTicker {
    /// Creates a ticker that fires every `period`.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            ticker: ManualTicker::new(),
        }
    }

    /// Tick period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Fires callbacks every period until `stop` resolves.
    ///
    /// Must run inside a `tokio` runtime on the thread that owns the
    /// registered callbacks. Missed ticks are delayed, not burst.
    pub async fn run_until<F>(&self, stop: F)
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(stop);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let fired = self.ticker.fire();
                    trace!(fired, "interval tick");
                }
                () = &mut stop => break,
            }
        }
    }
}

impl TickSource for IntervalTicker {
    fn register(&self, callback: Box<dyn FnMut()>) -> TickHandle {
        self.ticker.register(callback)
    }

    fn unregister(&self, handle: TickHandle) -> bool {
        self.ticker.unregister(handle)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn manual_ticker_runs_callbacks_until_unregistered() {
        let ticker = ManualTicker::new();
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let handle = ticker.register(Box::new(move || counter.set(counter.get() + 1)));

        assert_eq!(ticker.fire(), 1);
        assert_eq!(ticker.fire(), 1);
        assert!(ticker.unregister(handle));
        assert!(!ticker.unregister(handle));
        assert_eq!(ticker.fire(), 0);
        assert!(ticker.is_empty());
        assert_eq!(count.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_ticker_fires_until_stopped() {
        let ticker = IntervalTicker::new(Duration::from_millis(10));
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        ticker.register(Box::new(move || counter.set(counter.get() + 1)));

        ticker
            .run_until(tokio::time::sleep(Duration::from_millis(35)))
            .await;

        // Fires at 0, 10, 20 and 30 ms.
        assert_eq!(count.get(), 4);
        assert_eq!(ticker.period(), Duration::from_millis(10));
    }
}
