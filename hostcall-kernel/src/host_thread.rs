//! A dedicated OS thread that owns a host loop.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::{DispatchError, DispatchResult, Dispatcher, IntervalTicker};

/// Settings for [`HostThread::spawn`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostThreadConfig {
    tick_interval: Duration,
    thread_name: String,
}

impl HostThreadConfig {
    /// Creates a configuration with the supplied tick period and thread name.
    #[must_use]
    pub fn new(tick_interval: Duration, thread_name: impl Into<String>) -> Self {
        Self {
            tick_interval,
            thread_name: thread_name.into(),
        }
    }

    /// Returns the tick period.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Returns the thread name.
    #[must_use]
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Overrides the tick period.
    #[must_use]
    pub const fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Overrides the thread name.
    #[must_use]
    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }
}

impl Default for HostThreadConfig {
    fn default() -> Self {
        Self::new(Duration::from_millis(16), "hostcall-host")
    }
}

/// Host thread driven by an [`IntervalTicker`] on a current-thread `tokio`
/// runtime, so tool futures may use `tokio` timers.
#[derive(Debug)]
pub struct HostThread {
    dispatcher: Dispatcher,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl HostThread {
    /// Starts the host thread for `dispatcher`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::HostStart`] when the tick period is zero or
    /// the runtime or thread cannot be created.
    pub fn spawn(dispatcher: Dispatcher, config: &HostThreadConfig) -> DispatchResult<Self> {
        if config.tick_interval().is_zero() {
            return Err(DispatchError::HostStart {
                reason: "tick interval must be non-zero".into(),
            });
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| DispatchError::HostStart {
                reason: err.to_string(),
            })?;
        let (shutdown, stop) = oneshot::channel::<()>();
        let (started, ready) = std::sync::mpsc::sync_channel::<DispatchResult<()>>(1);
        let period = config.tick_interval();
        let host_dispatcher = dispatcher.clone();

        let join = thread::Builder::new()
            .name(config.thread_name().to_owned())
            .spawn(move || {
                let host = match host_dispatcher.host_loop() {
                    Ok(host) => host,
                    Err(err) => {
                        let _ = started.send(Err(err));
                        return;
                    }
                };
                let _ = started.send(Ok(()));

                let ticker = IntervalTicker::new(period);
                let attachment = host.attach(&ticker);
                runtime.block_on(ticker.run_until(async {
                    let _ = stop.await;
                }));
                drop(attachment.detach(&ticker));
            })
            .map_err(|err| DispatchError::HostStart {
                reason: err.to_string(),
            })?;

        match ready.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let _ = join.join();
                return Err(err);
            }
            Err(_) => {
                return Err(DispatchError::HostPanicked {
                    reason: panic_reason(join.join().err()),
                });
            }
        }

        info!(
            thread = config.thread_name(),
            tick_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
            "host thread started"
        );
        Ok(Self {
            dispatcher,
            shutdown: Some(shutdown),
            join: Some(join),
        })
    }

    /// Returns a dispatcher handle feeding this host thread.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Stops ticking, drops queued actions, and joins the thread.
    ///
    /// Callers still waiting on dropped actions receive an error result.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::HostPanicked`] when the thread panicked.
    pub fn shutdown(mut self) -> DispatchResult<()> {
        self.stop()
    }

    fn stop(&mut self) -> DispatchResult<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let Some(join) = self.join.take() else {
            return Ok(());
        };
        join.join().map_err(|payload| DispatchError::HostPanicked {
            reason: panic_reason(Some(payload)),
        })?;
        info!("host thread stopped");
        Ok(())
    }
}

impl Drop for HostThread {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!(%err, "host thread did not stop cleanly");
        }
    }
}

fn panic_reason(payload: Option<Box<dyn std::any::Any + Send>>) -> String {
    let Some(payload) = payload else {
        return "unknown".to_owned();
    };
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map_or_else(|| "unknown".to_owned(), |message| (*message).to_owned()),
    }
}
