//! Tool discovery, classification, and argument binding.
//!
//! Free functions annotated with [`tool`] are collected at link time and
//! turned into [`ToolMetadata`] by the [`ToolRegistry`]. The
//! [`binder`] module turns an untyped [`RequestContext`] into the ordered
//! [`BoundArgs`] an [`Invoker`] expects, and [`catalog`] renders the registry
//! for external discovery tooling.
//!
//! [`RequestContext`]: hostcall_primitives::RequestContext

#![warn(missing_docs, clippy::pedantic)]

pub mod binder;
pub mod catalog;
mod describe;
mod error;
mod invocation;
pub mod registry;

pub use binder::bind_arguments;
pub use catalog::{CallTemplate, Catalog, CatalogEntry, CatalogOptions};
pub use describe::Describe;
pub use error::{ToolError, ToolResult};
pub use hostcall_primitives::{Property, Schema, SchemaBuilder};
pub use hostcall_tools_macros::{Describe, ToolInput, tool};
pub use invocation::{BoundArgs, Invocation, Invoker};
pub use registry::{
    CallingConvention, InputShape, Param, ParamSpec, Receiver, RegisteredTool, RegistryReport,
    Rejection, Signature, ToolCandidate, ToolMetadata, ToolRegistry, TypeCheck, Visibility,
};

/// Support items referenced by code generated from the macros.
#[doc(hidden)]
pub mod __private {
    pub use inventory;
    pub use serde_json;

    pub use crate::invocation::support::*;
}
