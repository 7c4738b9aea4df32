//! Marshal tool calls from any thread onto a single host thread.
//!
//! Depend on this crate via `cargo add hostcall`. It bundles the internal
//! crates behind feature flags so embedders can pull in only the pieces they
//! need: the registry and binder are always available, the dispatcher and
//! host thread live behind `kernel`, and [`Bridge`] (feature `bridge`) wires
//! everything together from a [`config::BridgeConfig`].

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use hostcall_primitives as primitives;

/// Tool discovery, schemas, binding, and catalog export.
pub use hostcall_tools as tools;

pub use hostcall_tools::{Describe, ToolInput, tool};

/// Execution queue, host loop, and dispatcher (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use hostcall_kernel as kernel;

/// Runtime configuration (enabled by `config` feature).
#[cfg(feature = "config")]
pub use hostcall_config as config;

/// Logging and dispatch statistics (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use hostcall_telemetry as telemetry;

#[cfg(feature = "bridge")]
mod bridge;

#[cfg(feature = "bridge")]
pub use bridge::Bridge;
