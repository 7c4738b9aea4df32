//! Configuration-driven wiring of registry, dispatcher, and host thread.

use std::sync::Arc;

use hostcall_config::BridgeConfig;
use hostcall_kernel::{
    CompositeDispatchObserver, DispatchError, DispatchObserver, DispatchResult, Dispatcher,
    HostThread, HostThreadConfig, TracingDispatchObserver,
};
use hostcall_primitives::{RequestContext, RouteResult};
use hostcall_telemetry::{DispatchSnapshot, DispatchStats};
use hostcall_tools::{Catalog, CatalogOptions, ToolRegistry};

/// A running host thread plus the handles needed to call into it.
///
/// Dropping the bridge stops the host thread; pending callers receive an
/// internal error.
#[derive(Debug)]
pub struct Bridge {
    host: HostThread,
    stats: Arc<DispatchStats>,
    catalog: CatalogOptions,
}

impl Bridge {
    /// Starts a host thread serving `registry` as described by `config`.
    ///
    /// Dispatch events are logged through `tracing` and counted in
    /// [`stats`](Self::stats).
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::HostStart`] when `config` is invalid, or the
    /// kernel error when the host thread cannot start.
    pub fn start(config: &BridgeConfig, registry: Arc<ToolRegistry>) -> DispatchResult<Self> {
        config.validate().map_err(|err| DispatchError::HostStart {
            reason: err.to_string(),
        })?;
        let stats = Arc::new(DispatchStats::new());
        let observers: [Arc<dyn DispatchObserver>; 2] =
            [Arc::new(TracingDispatchObserver), stats.clone()];
        let observer = CompositeDispatchObserver::new(observers);
        let dispatcher = Dispatcher::with_observer(registry, Arc::new(observer));
        let host = HostThread::spawn(
            dispatcher,
            &HostThreadConfig::new(config.host.tick_interval(), config.host.thread_name.clone()),
        )?;
        Ok(Self {
            host,
            stats,
            catalog: CatalogOptions::new(
                config.catalog.route_prefix.clone(),
                config.catalog.default_method.clone(),
            ),
        })
    }

    /// Returns a dispatcher handle; clone it to hand to caller threads.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        self.host.dispatcher()
    }

    /// Returns the registry served by this bridge.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.dispatcher().registry()
    }

    /// Dispatches `request` and blocks until it resolves.
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async runtime; use
    /// [`call_async`](Self::call_async) there.
    #[must_use]
    pub fn call(&self, request: &dyn RequestContext) -> RouteResult {
        self.dispatcher().dispatch_blocking(request)
    }

    /// Dispatches `request` and awaits its result.
    pub async fn call_async(&self, request: &dyn RequestContext) -> RouteResult {
        self.dispatcher().dispatch(request).await
    }

    /// Renders the registry using the configured catalog settings.
    #[must_use]
    pub fn catalog(&self) -> Catalog {
        self.registry().catalog(&self.catalog)
    }

    /// Returns the dispatch counters collected so far.
    #[must_use]
    pub fn stats(&self) -> DispatchSnapshot {
        self.stats.snapshot()
    }

    /// Stops the host thread and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::HostPanicked`](hostcall_kernel::DispatchError::HostPanicked)
    /// when the host thread panicked.
    pub fn shutdown(self) -> DispatchResult<()> {
        self.host.shutdown()
    }
}
