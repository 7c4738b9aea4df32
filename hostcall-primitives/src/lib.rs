//! Core shared types for the hostcall dispatch runtime.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;
mod request;
mod route;
mod schema;

/// Error type and result alias shared by the primitives.
pub use error::{Error, Result};
/// Correlation identifier attached to each dispatched call.
pub use ids::CallId;
/// Transport-agnostic view of an incoming tool request.
pub use request::{RequestContext, ToolRequest};
/// Outward-facing result of a dispatched call.
pub use route::{RouteResult, RouteStatus};
/// Structural description of value shapes.
pub use schema::{Property, Schema, SchemaBuilder};
