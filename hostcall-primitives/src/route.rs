//! Results handed back to transports.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome category of a dispatched call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteStatus {
    /// The call completed, or was accepted for delayed execution.
    Ok,
    /// No tool with the requested name is registered.
    NotFound,
    /// Binding or execution failed.
    InternalError,
}

impl RouteStatus {
    /// HTTP status code a transport would typically map this status to.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::NotFound => 404,
            Self::InternalError => 500,
        }
    }
}

/// Response produced once per awaited call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    /// Outcome category.
    pub status: RouteStatus,
    /// Result value for successful calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Failure description for error statuses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RouteResult {
    /// Successful result carrying `payload`.
    #[must_use]
    pub fn ok(payload: Value) -> Self {
        Self {
            status: RouteStatus::Ok,
            payload: Some(payload),
            message: None,
        }
    }

    /// Acknowledgement returned to fire-and-forget callers before execution.
    #[must_use]
    pub fn delayed() -> Self {
        Self::ok(Self::delayed_payload())
    }

    /// Payload shape of [`RouteResult::delayed`].
    #[must_use]
    pub fn delayed_payload() -> Value {
        serde_json::json!({ "callDelayed": true })
    }

    /// Result for an unregistered tool name.
    #[must_use]
    pub fn not_found(tool_name: &str) -> Self {
        Self {
            status: RouteStatus::NotFound,
            payload: None,
            message: Some(format!("tool `{tool_name}` is not registered")),
        }
    }

    /// Result for a failed call.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            status: RouteStatus::InternalError,
            payload: None,
            message: Some(message.into()),
        }
    }

    /// Returns `true` when the status is [`RouteStatus::Ok`].
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, RouteStatus::Ok)
    }

    /// Returns `true` when this is the fire-and-forget acknowledgement.
    #[must_use]
    pub fn is_delayed(&self) -> bool {
        self.is_ok()
            && self
                .payload
                .as_ref()
                .and_then(|payload| payload.get("callDelayed"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delayed_ack_serializes_with_camel_case_flag() {
        let rendered = serde_json::to_value(RouteResult::delayed()).expect("serialize");
        assert_eq!(
            rendered,
            serde_json::json!({ "status": "Ok", "payload": { "callDelayed": true } })
        );
        assert!(RouteResult::delayed().is_delayed());
        assert!(!RouteResult::ok(Value::from(5)).is_delayed());
    }

    #[test]
    fn error_statuses_map_to_http_codes() {
        assert_eq!(RouteResult::not_found("x").status.http_status(), 404);
        let failed = RouteResult::internal_error("boom");
        assert_eq!(failed.status.http_status(), 500);
        assert_eq!(failed.message.as_deref(), Some("boom"));
        assert!(!failed.is_ok());
    }
}
