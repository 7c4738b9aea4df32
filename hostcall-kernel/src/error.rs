//! Errors surfaced to callers of the dispatcher.

use hostcall_primitives::RouteResult;
use hostcall_tools::ToolError;
use thiserror::Error;

/// Result alias for kernel operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors produced while dispatching a call or running the host thread.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// No tool is registered under the requested name.
    #[error("tool `{name}` is not registered")]
    NotFound {
        /// Requested tool name.
        name: String,
    },

    /// Request arguments could not be bound to the tool's inputs.
    #[error("tool `{tool}` rejected its arguments: {source}")]
    Binding {
        /// Tool being called.
        tool: String,
        /// Binder failure.
        source: ToolError,
    },

    /// The tool body or its continuation failed.
    #[error("tool `{tool}` failed: {reason}")]
    Execution {
        /// Tool being called.
        tool: String,
        /// Failure reported by the tool.
        reason: String,
    },

    /// An earlier fire-and-forget call failed and this call received its error.
    #[error("a previous fire-and-forget call failed: {message}")]
    PendingFailure {
        /// Message captured from the failed call.
        message: String,
    },

    /// The host loop is closed and accepts no new actions.
    #[error("host loop is not accepting calls")]
    HostStopped,

    /// Another host loop is already draining this dispatcher.
    #[error("a host loop is already running for this dispatcher")]
    HostAlreadyRunning,

    /// The queued action was dropped before it produced a result.
    #[error("call was dropped before the host loop completed it")]
    Abandoned,

    /// The host thread could not be started.
    #[error("failed to start host thread: {reason}")]
    HostStart {
        /// Underlying I/O or runtime failure.
        reason: String,
    },

    /// The host thread panicked.
    #[error("host thread panicked: {reason}")]
    HostPanicked {
        /// Panic payload rendered as text.
        reason: String,
    },
}

impl DispatchError {
    /// Wraps a tool failure with the name of the tool that raised it.
    #[must_use]
    pub fn execution(tool: impl Into<String>, error: &ToolError) -> Self {
        let reason = match error {
            ToolError::Execution { reason } => reason.clone(),
            other => other.to_string(),
        };
        Self::Execution {
            tool: tool.into(),
            reason,
        }
    }

    /// Converts the error into the response a transport hands back.
    #[must_use]
    pub fn to_route_result(&self) -> RouteResult {
        match self {
            Self::NotFound { name } => RouteResult::not_found(name),
            other => RouteResult::internal_error(other.to_string()),
        }
    }
}

impl From<DispatchError> for RouteResult {
    fn from(error: DispatchError) -> Self {
        error.to_route_result()
    }
}

#[cfg(test)]
mod tests {
    use hostcall_primitives::RouteStatus;

    use super::*;

    #[test]
    fn execution_errors_name_the_tool() {
        let err = DispatchError::execution("explode", &ToolError::execution("boom"));
        assert_eq!(err.to_string(), "tool `explode` failed: boom");

        let result = RouteResult::from(err);
        assert_eq!(result.status, RouteStatus::InternalError);
        assert_eq!(result.message.as_deref(), Some("tool `explode` failed: boom"));
    }

    #[test]
    fn not_found_maps_to_not_found_status() {
        let result = DispatchError::NotFound {
            name: "missing".into(),
        }
        .to_route_result();
        assert_eq!(result.status, RouteStatus::NotFound);
    }

    #[test]
    fn binding_errors_list_valid_members() {
        let err = DispatchError::Binding {
            tool: "tint".into(),
            source: ToolError::Binding {
                field: "color".into(),
                value: "purple".into(),
                expected: vec!["Red".into(), "Green".into()],
            },
        };
        assert!(err.to_string().ends_with("expected one of: Red, Green"));
    }
}
