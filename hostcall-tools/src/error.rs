//! Errors produced by tool registration, binding, and invocation.

use thiserror::Error;

/// Result alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors produced by tool registration, binding, and invocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolError {
    /// Tool metadata failed validation.
    #[error("invalid tool metadata: {reason}")]
    InvalidMetadata {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Tool name collided with an existing registration.
    #[error("tool `{name}` is already registered")]
    DuplicateTool {
        /// Name of the offending tool.
        name: String,
    },

    /// Candidate needs an instance to be called.
    #[error("tool `{name}` takes a receiver and cannot be invoked without an instance")]
    InstanceMethod {
        /// Name of the offending tool.
        name: String,
    },

    /// Candidate is not externally visible.
    #[error("tool `{name}` is not public")]
    NotPublic {
        /// Name of the offending tool.
        name: String,
    },

    /// Requested tool does not exist.
    #[error("tool `{name}` is not registered")]
    UnknownTool {
        /// Name of the missing tool.
        name: String,
    },

    /// An enum-typed argument matched none of the declared members.
    #[error("invalid value `{value}` for `{field}`; expected one of: {}", expected.join(", "))]
    Binding {
        /// Parameter or field name.
        field: String,
        /// Value supplied by the caller.
        value: String,
        /// Valid member names.
        expected: Vec<String>,
    },

    /// A bound argument could not be converted into the parameter type.
    #[error("invalid arguments: {reason}")]
    InvalidArguments {
        /// Human-readable conversion failure.
        reason: String,
    },

    /// Tool execution failed.
    #[error("tool execution failed: {reason}")]
    Execution {
        /// Human-readable error returned by the tool implementation.
        reason: String,
    },

    /// Tool body panicked.
    #[error("tool panicked: {reason}")]
    Panicked {
        /// Panic payload rendered as text.
        reason: String,
    },
}

impl ToolError {
    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }

    /// Creates an argument conversion error from the supplied reason.
    #[must_use]
    pub fn invalid_arguments(reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            reason: reason.into(),
        }
    }

    /// Creates a panic error from a payload caught by `catch_unwind`.
    #[must_use]
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|message| (*message).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned());
        Self::Panicked { reason }
    }

    /// Returns `true` for errors raised while binding request arguments.
    #[must_use]
    pub const fn is_binding(&self) -> bool {
        matches!(self, Self::Binding { .. } | Self::InvalidArguments { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_error_lists_members() {
        let err = ToolError::Binding {
            field: "color".into(),
            value: "purple".into(),
            expected: vec!["Red".into(), "Green".into()],
        };
        assert_eq!(
            err.to_string(),
            "invalid value `purple` for `color`; expected one of: Red, Green"
        );
        assert!(err.is_binding());
    }

    #[test]
    fn panic_payloads_are_rendered() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(
            ToolError::from_panic(payload.as_ref()),
            ToolError::Panicked {
                reason: "boom".into()
            }
        );

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("kaboom"));
        assert!(ToolError::from_panic(payload.as_ref()).to_string().contains("kaboom"));
    }
}
