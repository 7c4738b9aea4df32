//! Transport-agnostic request contexts.

use serde_json::{Map, Value};

use crate::{Error, Result};

/// Read-only view of one incoming tool call, supplied by the transport.
///
/// Implementations must stay immutable for the duration of a dispatch.
pub trait RequestContext: Send + Sync {
    /// Name of the tool being called.
    fn tool_name(&self) -> &str;

    /// Raw request body; empty when the transport carried none.
    fn body(&self) -> &str;

    /// Raw value of a query-style parameter, if present.
    fn param(&self, name: &str) -> Option<Value>;
}

/// Owned request context built by transports or tests.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ToolRequest {
    tool_name: String,
    body: String,
    params: Map<String, Value>,
}

impl ToolRequest {
    /// Creates a request for the given tool with no parameters and no body.
    #[must_use]
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            ..Self::default()
        }
    }

    /// Sets the raw body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds a single parameter, replacing any earlier value of the same name.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Replaces all parameters with the supplied map.
    #[must_use]
    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    /// Merges parameters decoded from a JSON object string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBody`] when `json` is not a JSON object.
    pub fn with_params_json(mut self, json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).map_err(|err| Error::InvalidBody {
            reason: err.to_string(),
        })?;
        let Value::Object(params) = value else {
            return Err(Error::InvalidBody {
                reason: "expected a JSON object of parameters".into(),
            });
        };
        self.params.extend(params);
        Ok(self)
    }

    /// Returns the parameter map.
    #[must_use]
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }
}

impl RequestContext for ToolRequest {
    fn tool_name(&self) -> &str {
        &self.tool_name
    }

    fn body(&self) -> &str {
        &self.body
    }

    fn param(&self, name: &str) -> Option<Value> {
        self.params.get(name).cloned()
    }
}
